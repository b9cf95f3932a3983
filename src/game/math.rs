//! 2D vector math used by the simulation and the wire format

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Sub};

/// Scalar pair used for position, velocity, aim and movement intent
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing along `angle` (radians)
    pub fn from_angle(angle: f32) -> Self {
        Self::new(angle.cos(), angle.sin())
    }

    pub fn length_sq(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn length(self) -> f32 {
        self.length_sq().sqrt()
    }

    #[cfg(test)]
    pub fn distance(self, other: Self) -> f32 {
        (other - self).length()
    }

    pub fn distance_sq(self, other: Self) -> f32 {
        (other - self).length_sq()
    }

    /// Returns the zero vector for degenerate input
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len < 1e-6 {
            Self::ZERO
        } else {
            Self::new(self.x / len, self.y / len)
        }
    }

    /// Scale down to `max` length if longer
    pub fn clamp_length(self, max: f32) -> Self {
        let len = self.length();
        if len > max && len > 0.0 {
            self * (max / len)
        } else {
            self
        }
    }

    pub fn angle(self) -> f32 {
        self.y.atan2(self.x)
    }

    /// Replace non-finite components with zero
    pub fn sanitized(self) -> Self {
        Self::new(
            if self.x.is_finite() { self.x } else { 0.0 },
            if self.y.is_finite() { self.y } else { 0.0 },
        )
    }
}

impl Add for Vector2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vector2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vector2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vector2 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

/// Round to `decimals` places
pub fn round_to(value: f32, decimals: i32) -> f32 {
    let factor = 10f32.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_length_scales_long_vectors() {
        let v = Vector2::new(3.0, 4.0).clamp_length(1.0);
        assert!((v.length() - 1.0).abs() < 1e-5);
        let short = Vector2::new(0.3, 0.4);
        assert_eq!(short.clamp_length(1.0), short);
    }

    #[test]
    fn normalized_zero_stays_zero() {
        assert_eq!(Vector2::ZERO.normalized(), Vector2::ZERO);
    }

    #[test]
    fn sanitized_drops_nan() {
        let v = Vector2::new(f32::NAN, 2.0).sanitized();
        assert_eq!(v, Vector2::new(0.0, 2.0));
    }

    #[test]
    fn round_to_places() {
        assert_eq!(round_to(1.26, 1), 1.3);
        assert_eq!(round_to(-0.004, 2), 0.0);
        assert_eq!(round_to(3.14159, 2), 3.14);
    }
}
