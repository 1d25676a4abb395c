//! Terrain-aware stand point selection around a target.

use companion_types::Vec3;
use companion_world::{Entity, Perception};

use crate::config::HarvestConfig;

/// Number of compass directions sampled.
const DIRECTIONS: u16 = 8;

/// Eye height used for the line-of-sight term.
pub const EYE_HEIGHT: f32 = 1.5;

const HEIGHT_WEIGHT: f32 = 2.0;
const ALIGNMENT_WEIGHT: f32 = 1.5;
const SIGHT_BONUS: f32 = 2.0;

/// A chosen stand point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StandPoint {
    /// Where to stand.
    pub point: Vec3,
    /// False when no sampled direction had ground and the forward
    /// projection was used instead.
    pub grounded: bool,
}

/// Distance from the target center at which to stand.
pub fn preferred_distance(radius: f32, cfg: &HarvestConfig) -> f32 {
    (radius + cfg.stand_margin).clamp(cfg.stand_min, cfg.stand_max)
}

/// Pick the best of eight compass points around `target`.
///
/// Candidates are scored by how closely their ground matches the agent's
/// elevation, how well they line up with the agent's approach, and whether
/// they see the target's center.
pub fn solve<P: Perception + ?Sized>(
    world: &P,
    agent_position: Vec3,
    target: &Entity,
    cfg: &HarvestConfig,
) -> StandPoint {
    let distance = preferred_distance(target.radius, cfg);
    let approach = target.position.direction_to(agent_position);
    let center = target.center();

    let best = (0..DIRECTIONS)
        .filter_map(|i| {
            let yaw = f32::from(i) * core::f32::consts::TAU / f32::from(DIRECTIONS);
            let direction = Vec3::from_yaw(yaw);
            let sample = target.position + direction * distance;
            let ground = world.ground_height(sample)?;
            let point = sample.with_y(ground);
            let eye = point + Vec3::new(0.0, EYE_HEIGHT, 0.0);
            let sight = if world.line_of_sight(eye, center) {
                SIGHT_BONUS
            } else {
                0.0
            };
            let score = -(ground - agent_position.y).abs() * HEIGHT_WEIGHT
                + direction.dot(approach) * ALIGNMENT_WEIGHT
                + sight;
            Some((point, score))
        })
        .max_by(|a, b| a.1.total_cmp(&b.1));

    match best {
        Some((point, _)) => StandPoint {
            point,
            grounded: true,
        },
        None => StandPoint {
            point: forward_projection(agent_position, target.position, distance),
            grounded: false,
        },
    }
}

/// The point `distance` short of the target along the agent's line of
/// approach, at the agent's elevation.
pub fn forward_projection(agent_position: Vec3, target_position: Vec3, distance: f32) -> Vec3 {
    let toward_agent = target_position.direction_to(agent_position);
    let direction = if toward_agent == Vec3::ZERO {
        Vec3::new(0.0, 0.0, -1.0)
    } else {
        toward_agent
    };
    (target_position + direction * distance).with_y(agent_position.y)
}

/// Shift a stand point sideways around the target, to the left or right of
/// the target-to-stand line.
pub fn lateral_offset(stand: Vec3, target_position: Vec3, distance: f32, opposite: bool) -> Vec3 {
    let side = target_position.direction_to(stand).perpendicular();
    let sign = if opposite { -1.0 } else { 1.0 };
    stand + side * (distance * sign)
}
