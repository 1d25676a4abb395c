//! Minimal 3D vector math for positions and directions.
//!
//! The world is Y-up. Most behavior decisions happen in the horizontal
//! (X/Z) plane, so the horizontal helpers are the common path; the Y axis
//! is consulted only for height bands and ground matching.

use core::ops::{Add, AddAssign, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// Lengths below this are treated as zero when normalizing.
const EPSILON: f32 = 1.0e-5;

/// A point or direction in world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    /// East/west.
    pub x: f32,
    /// Up/down.
    pub y: f32,
    /// North/south.
    pub z: f32,
}

impl Vec3 {
    /// The origin.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Construct a vector.
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Unit vector in the horizontal plane for a compass angle in radians
    /// (0 = +Z, increasing clockwise toward +X).
    pub fn from_yaw(yaw: f32) -> Self {
        Self::new(yaw.sin(), 0.0, yaw.cos())
    }

    /// Dot product.
    pub fn dot(self, other: Self) -> f32 {
        self.x.mul_add(other.x, self.y.mul_add(other.y, self.z * other.z))
    }

    /// Euclidean length.
    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Straight-line distance to another point.
    pub fn distance(self, other: Self) -> f32 {
        (self - other).length()
    }

    /// Copy with the Y component zeroed.
    pub const fn horizontal(self) -> Self {
        Self::new(self.x, 0.0, self.z)
    }

    /// Distance in the X/Z plane, ignoring height.
    pub fn horizontal_distance(self, other: Self) -> f32 {
        (self - other).horizontal().length()
    }

    /// Copy with Y replaced.
    pub const fn with_y(self, y: f32) -> Self {
        Self::new(self.x, y, self.z)
    }

    /// Unit vector in the same direction, or zero for a degenerate vector.
    pub fn normalize_or_zero(self) -> Self {
        let len = self.length();
        if len < EPSILON {
            Self::ZERO
        } else {
            self * (1.0 / len)
        }
    }

    /// Horizontal unit direction from `self` toward `target`, or zero if
    /// the points coincide in the X/Z plane.
    pub fn direction_to(self, target: Self) -> Self {
        (target - self).horizontal().normalize_or_zero()
    }

    /// Horizontal perpendicular (rotated 90 degrees clockwise about Y).
    pub const fn perpendicular(self) -> Self {
        Self::new(self.z, 0.0, -self.x)
    }

    /// Compass angle of the horizontal component, in radians.
    pub fn yaw(self) -> f32 {
        self.x.atan2(self.z)
    }

    /// Unsigned angle in degrees between the horizontal components of two
    /// directions. Degenerate inputs count as aligned.
    pub fn horizontal_angle_deg(self, other: Self) -> f32 {
        let a = self.horizontal().normalize_or_zero();
        let b = other.horizontal().normalize_or_zero();
        if a == Self::ZERO || b == Self::ZERO {
            return 0.0;
        }
        a.dot(b).clamp(-1.0, 1.0).acos().to_degrees()
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vec3 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1.0e-4
    }

    #[test]
    fn horizontal_distance_ignores_height() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(3.0, 50.0, 4.0);
        assert!(close(a.horizontal_distance(b), 5.0));
        assert!(a.distance(b) > 50.0);
    }

    #[test]
    fn normalize_degenerate_is_zero() {
        assert_eq!(Vec3::ZERO.normalize_or_zero(), Vec3::ZERO);
        let n = Vec3::new(0.0, 0.0, 2.0).normalize_or_zero();
        assert!(close(n.z, 1.0));
    }

    #[test]
    fn perpendicular_is_orthogonal() {
        let d = Vec3::new(1.0, 0.0, 2.0);
        assert!(close(d.dot(d.perpendicular()), 0.0));
    }

    #[test]
    fn yaw_roundtrip() {
        let dir = Vec3::from_yaw(1.0);
        assert!(close(dir.yaw(), 1.0));
    }

    #[test]
    fn angle_between_opposites() {
        let a = Vec3::new(1.0, 0.0, 0.0);
        assert!(close(a.horizontal_angle_deg(-a), 180.0));
        assert!(close(a.horizontal_angle_deg(a.perpendicular()), 90.0));
    }
}
