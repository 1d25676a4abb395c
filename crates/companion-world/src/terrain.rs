//! Heightfield terrain and static obstacles for the sandbox world.
//!
//! Ground height is a flat base plus smooth conical hills. Static obstacles
//! are vertical cylinders; short ones can be jumped over. Positions outside
//! the square bounds, or inside a water pool, have no ground.

use companion_types::Vec3;
use serde::{Deserialize, Serialize};

/// Obstacles at or below this height can be cleared by a jump.
pub const JUMPABLE_HEIGHT: f32 = 1.0;

/// A conical hill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hill {
    /// Peak position (Y ignored).
    pub center: Vec3,
    /// Footprint radius.
    pub radius: f32,
    /// Peak height above the base.
    pub height: f32,
}

/// A vertical cylinder that blocks walking and sight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Base center.
    pub center: Vec3,
    /// Horizontal radius.
    pub radius: f32,
    /// Height above the base.
    pub height: f32,
}

/// A circular pool with no walkable ground.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    /// Center (Y ignored).
    pub center: Vec3,
    /// Radius.
    pub radius: f32,
}

/// Ground and obstacle layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Terrain {
    /// Height of flat ground.
    pub base_height: f32,
    /// Half the side length of the square playable area, centered on origin.
    pub half_extent: f32,
    /// Hills.
    pub hills: Vec<Hill>,
    /// Static obstacles.
    pub obstacles: Vec<Obstacle>,
    /// Water pools.
    pub pools: Vec<Pool>,
}

impl Terrain {
    /// Flat terrain with the given half extent.
    pub const fn flat(half_extent: f32) -> Self {
        Self {
            base_height: 0.0,
            half_extent,
            hills: Vec::new(),
            obstacles: Vec::new(),
            pools: Vec::new(),
        }
    }

    /// Ground height at `point`, or `None` outside bounds or over water.
    pub fn ground_height(&self, point: Vec3) -> Option<f32> {
        if point.x.abs() > self.half_extent || point.z.abs() > self.half_extent {
            return None;
        }
        if self
            .pools
            .iter()
            .any(|p| p.center.horizontal_distance(point) < p.radius)
        {
            return None;
        }
        let hills: f32 = self
            .hills
            .iter()
            .map(|h| {
                let d = h.center.horizontal_distance(point);
                if h.radius <= 0.0 || d >= h.radius {
                    0.0
                } else {
                    h.height * (1.0 - d / h.radius)
                }
            })
            .sum();
        Some(self.base_height + hills)
    }

    /// The first obstacle whose footprint (grown by `clearance`) contains
    /// `point` horizontally and whose top is above `point.y`.
    pub fn obstacle_at(&self, point: Vec3, clearance: f32) -> Option<&Obstacle> {
        self.obstacles.iter().find(|o| {
            o.center.horizontal_distance(point) < o.radius + clearance
                && point.y < o.center.y + o.height
        })
    }

    /// Whether the segment `from`→`to` passes through any obstacle.
    pub fn segment_blocked(&self, from: Vec3, to: Vec3) -> bool {
        self.obstacles.iter().any(|o| segment_hits_cylinder(from, to, o.center, o.radius, o.height))
    }
}

/// Whether the segment passes within `radius` of the cylinder axis at a
/// height below the cylinder top.
pub fn segment_hits_cylinder(from: Vec3, to: Vec3, base: Vec3, radius: f32, height: f32) -> bool {
    let seg = (to - from).horizontal();
    let len_sq = seg.dot(seg);
    let t = if len_sq <= f32::EPSILON {
        0.0
    } else {
        ((base - from).horizontal().dot(seg) / len_sq).clamp(0.0, 1.0)
    };
    let closest = from + (to - from) * t;
    closest.horizontal_distance(base) < radius
        && closest.y < base.y + height
        && closest.y > base.y - 0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_ground_inside_bounds() {
        let t = Terrain::flat(10.0);
        assert_eq!(t.ground_height(Vec3::new(3.0, 0.0, -4.0)), Some(0.0));
        assert_eq!(t.ground_height(Vec3::new(11.0, 0.0, 0.0)), None);
    }

    #[test]
    fn hill_raises_ground() {
        let mut t = Terrain::flat(50.0);
        t.hills.push(Hill {
            center: Vec3::ZERO,
            radius: 10.0,
            height: 4.0,
        });
        let peak = t.ground_height(Vec3::ZERO).unwrap_or_default();
        let slope = t.ground_height(Vec3::new(5.0, 0.0, 0.0)).unwrap_or_default();
        assert!((peak - 4.0).abs() < 1.0e-4);
        assert!((slope - 2.0).abs() < 1.0e-4);
    }

    #[test]
    fn pools_have_no_ground() {
        let mut t = Terrain::flat(50.0);
        t.pools.push(Pool {
            center: Vec3::new(5.0, 0.0, 5.0),
            radius: 2.0,
        });
        assert_eq!(t.ground_height(Vec3::new(5.0, 0.0, 5.5)), None);
    }

    #[test]
    fn segment_through_obstacle_is_blocked() {
        let mut t = Terrain::flat(50.0);
        t.obstacles.push(Obstacle {
            center: Vec3::new(0.0, 0.0, 5.0),
            radius: 1.0,
            height: 3.0,
        });
        assert!(t.segment_blocked(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 1.0, 10.0)));
        assert!(!t.segment_blocked(Vec3::new(3.0, 1.0, 0.0), Vec3::new(3.0, 1.0, 10.0)));
        assert!(!t.segment_blocked(Vec3::new(0.0, 4.0, 0.0), Vec3::new(0.0, 4.0, 10.0)));
    }
}
