//! Plasma density profiles: a small capability trait plus the concrete
//! shapes a driver can select, replacing the source's function-pointer plus
//! loose parameter struct with a tagged set of variants resolved once at
//! creation time.

use crate::Float;
use lerp::Lerp;

pub trait DensityProfile: Send + Sync {
    fn density(&self, x: Float, y: Float, z: Float) -> Float;
}

pub struct BoxProfile {
    pub density: Float,
    pub r_min: [Float; 3],
    pub r_max: [Float; 3],
}

impl DensityProfile for BoxProfile {
    fn density(&self, x: Float, y: Float, z: Float) -> Float {
        let p = [x, y, z];
        for axis in 0..3 {
            if p[axis] < self.r_min[axis] || p[axis] > self.r_max[axis] {
                return 0.0;
            }
        }
        self.density
    }
}

pub struct LinearProfile {
    pub density_min: Float,
    pub density_max: Float,
    pub axis: usize,
    pub r_min: [Float; 3],
    pub r_max: [Float; 3],
}

impl DensityProfile for LinearProfile {
    fn density(&self, x: Float, y: Float, z: Float) -> Float {
        let p = [x, y, z];
        for a in 0..3 {
            if p[a] < self.r_min[a] || p[a] > self.r_max[a] {
                return 0.0;
            }
        }
        let span = self.r_max[self.axis] - self.r_min[self.axis];
        let frac = if span > 0.0 {
            (p[self.axis] - self.r_min[self.axis]) / span
        } else {
            0.0
        };
        self.density_min.lerp(self.density_max, frac)
    }
}

pub struct ExponentialProfile {
    pub density0: Float,
    pub scale_length: Float,
    pub axis: usize,
    pub r_min: [Float; 3],
    pub r_max: [Float; 3],
}

impl DensityProfile for ExponentialProfile {
    fn density(&self, x: Float, y: Float, z: Float) -> Float {
        let p = [x, y, z];
        for a in 0..3 {
            if p[a] < self.r_min[a] || p[a] > self.r_max[a] {
                return 0.0;
            }
        }
        let d = p[self.axis] - self.r_min[self.axis];
        self.density0 * (d / self.scale_length).exp()
    }
}

/// A 1-D `(x, n, u0, u1, u2)` density/drift table, linearly interpolated;
/// backs the alternate `create_from_table` species creator.
pub struct Table {
    pub x: Vec<Float>,
    pub n: Vec<Float>,
    pub u0: Vec<Float>,
    pub u1: Vec<Float>,
    pub u2: Vec<Float>,
}

impl Table {
    /// Linearly interpolates density and drift momentum at `x`, clamping to
    /// the table's end values outside its range.
    pub fn sample(&self, x: Float) -> (Float, [Float; 3]) {
        if self.x.is_empty() {
            return (0.0, [0.0, 0.0, 0.0]);
        }
        if x <= self.x[0] {
            return (self.n[0], [self.u0[0], self.u1[0], self.u2[0]]);
        }
        let last = self.x.len() - 1;
        if x >= self.x[last] {
            return (
                self.n[last],
                [self.u0[last], self.u1[last], self.u2[last]],
            );
        }
        let idx = match self.x.binary_search_by(|probe| probe.partial_cmp(&x).unwrap()) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let span = self.x[idx + 1] - self.x[idx];
        let frac = if span > 0.0 {
            (x - self.x[idx]) / span
        } else {
            0.0
        };
        (
            self.n[idx].lerp(self.n[idx + 1], frac),
            [
                self.u0[idx].lerp(self.u0[idx + 1], frac),
                self.u1[idx].lerp(self.u1[idx + 1], frac),
                self.u2[idx].lerp(self.u2[idx + 1], frac),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_profile_is_zero_outside_extent() {
        let p = BoxProfile {
            density: 1.0,
            r_min: [0.0, 0.0, 0.0],
            r_max: [1.0, 1.0, 1.0],
        };
        assert_eq!(p.density(2.0, 0.5, 0.5), 0.0);
        assert_eq!(p.density(0.5, 0.5, 0.5), 1.0);
    }

    #[test]
    fn table_interpolates_between_points() {
        let t = Table {
            x: vec![0.0, 1.0],
            n: vec![0.0, 2.0],
            u0: vec![0.0, 0.0],
            u1: vec![0.0, 0.0],
            u2: vec![0.0, 0.0],
        };
        let (n, _) = t.sample(0.5);
        assert!((n - 1.0).abs() < 1e-12);
    }
}
