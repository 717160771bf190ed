//! A small 3-component vector used for momenta, fields and velocities.
//!
//! Modelled after the `ParticleVector` found in the teacher crate: a plain
//! value type with component-wise arithmetic derived, plus the handful of
//! operations (dot, cross, norm) the physics actually needs.

use crate::Float;
use derive_more::{Add, AddAssign, Neg, Sub, SubAssign};

#[derive(Debug, Clone, Copy, PartialEq, Default, Add, Sub, AddAssign, SubAssign, Neg)]
pub struct Vec3 {
    pub x: Float,
    pub y: Float,
    pub z: Float,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: Float, y: Float, z: Float) -> Self {
        Vec3 { x, y, z }
    }

    pub fn dot(&self, other: &Vec3) -> Float {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Vec3) -> Vec3 {
        Vec3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn norm_sq(&self) -> Float {
        self.dot(self)
    }

    pub fn norm(&self) -> Float {
        self.norm_sq().sqrt()
    }

    pub fn scale(&self, s: Float) -> Vec3 {
        Vec3::new(self.x * s, self.y * s, self.z * s)
    }

    /// Lorentz gamma factor for a 4-velocity normalized to `c`, i.e. `self` is `u = gamma*v/c`.
    pub fn gamma(&self) -> Float {
        (1.0 + self.norm_sq()).sqrt()
    }
}

impl std::ops::Mul<Float> for Vec3 {
    type Output = Vec3;

    fn mul(self, s: Float) -> Vec3 {
        self.scale(s)
    }
}

impl From<[Float; 3]> for Vec3 {
    fn from(v: [Float; 3]) -> Self {
        Vec3::new(v[0], v[1], v[2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_is_orthogonal() {
        let a = Vec3::new(1.0, 0.0, 0.0);
        let b = Vec3::new(0.0, 1.0, 0.0);
        let c = a.cross(&b);
        assert!((c.dot(&a)).abs() < 1e-12);
        assert!((c.dot(&b)).abs() < 1e-12);
        assert!((c.z - 1.0).abs() < 1e-12);
    }

    #[test]
    fn gamma_of_zero_momentum_is_one() {
        assert!((Vec3::ZERO.gamma() - 1.0).abs() < 1e-12);
    }
}
