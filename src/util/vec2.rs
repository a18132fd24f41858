use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/// 2D vector for positions, velocities and steering
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn from_angle(angle: f32) -> Self {
        Self {
            x: angle.cos(),
            y: angle.sin(),
        }
    }

    #[inline]
    pub fn length(&self) -> f32 {
        self.length_sq().sqrt()
    }

    #[inline]
    pub fn length_sq(&self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 0.0 {
            Self {
                x: self.x / len,
                y: self.y / len,
            }
        } else {
            Self::ZERO
        }
    }

    #[inline]
    pub fn dot(&self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    #[inline]
    pub fn distance_to(&self, other: Vec2) -> f32 {
        (*self - other).length()
    }

    #[inline]
    pub fn distance_sq_to(&self, other: Vec2) -> f32 {
        (*self - other).length_sq()
    }

    pub fn clamp_length(&self, max: f32) -> Self {
        let len = self.length();
        if len > max && len > 0.0 {
            *self * (max / len)
        } else {
            *self
        }
    }

    /// Snap each component to -1, 0 or 1.
    ///
    /// Components whose magnitude is below `dead_zone` become 0, so a target
    /// almost straight ahead does not produce a diagonal wobble.
    pub fn to_axes(&self, dead_zone: f32) -> Self {
        let snap = |v: f32| {
            if v > dead_zone {
                1.0
            } else if v < -dead_zone {
                -1.0
            } else {
                0.0
            }
        };
        Self {
            x: snap(self.x),
            y: snap(self.y),
        }
    }

    /// True when both components are exactly one of -1, 0, 1
    pub fn is_axis_direction(&self) -> bool {
        let ok = |v: f32| v == -1.0 || v == 0.0 || v == 1.0;
        ok(self.x) && ok(self.y)
    }

    /// Check if vector is approximately zero
    pub fn is_zero(&self, epsilon: f32) -> bool {
        self.x.abs() < epsilon && self.y.abs() < epsilon
    }

    /// Check if vector is approximately equal to another
    pub fn approx_eq(&self, other: Vec2, epsilon: f32) -> bool {
        (self.x - other.x).abs() < epsilon && (self.y - other.y).abs() < epsilon
    }
}

impl Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

impl Neg for Vec2 {
    type Output = Self;
    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
        }
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl MulAssign<f32> for Vec2 {
    fn mul_assign(&mut self, rhs: f32) {
        self.x *= rhs;
        self.y *= rhs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_length_and_normalize() {
        let v = Vec2::new(3.0, 4.0);
        assert!((v.length() - 5.0).abs() < EPSILON);
        let n = v.normalize();
        assert!((n.length() - 1.0).abs() < EPSILON);
        assert_eq!(Vec2::ZERO.normalize(), Vec2::ZERO);
    }

    #[test]
    fn test_distance() {
        let a = Vec2::new(1.0, 1.0);
        let b = Vec2::new(4.0, 5.0);
        assert!((a.distance_to(b) - 5.0).abs() < EPSILON);
        assert!((a.distance_sq_to(b) - 25.0).abs() < EPSILON);
    }

    #[test]
    fn test_to_axes_dead_zone() {
        assert_eq!(Vec2::new(0.9, -0.05).to_axes(0.3), Vec2::new(1.0, 0.0));
        assert_eq!(Vec2::new(-0.5, 0.5).to_axes(0.3), Vec2::new(-1.0, 1.0));
        assert_eq!(Vec2::new(0.1, 0.1).to_axes(0.3), Vec2::ZERO);
    }

    #[test]
    fn test_is_axis_direction() {
        assert!(Vec2::new(1.0, -1.0).is_axis_direction());
        assert!(Vec2::ZERO.is_axis_direction());
        assert!(!Vec2::new(0.5, 0.0).is_axis_direction());
        assert!(!Vec2::new(2.0, 0.0).is_axis_direction());
    }

    #[test]
    fn test_clamp_length() {
        let v = Vec2::new(6.0, 8.0);
        assert!((v.clamp_length(5.0).length() - 5.0).abs() < EPSILON);
        assert_eq!(Vec2::new(1.0, 0.0).clamp_length(5.0), Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_operators() {
        let mut a = Vec2::new(1.0, 2.0);
        a += Vec2::new(1.0, 1.0);
        a -= Vec2::new(0.5, 0.5);
        a *= 2.0;
        assert!(a.approx_eq(Vec2::new(3.0, 5.0), EPSILON));
        assert_eq!(-a, Vec2::new(-3.0, -5.0));
    }
}
