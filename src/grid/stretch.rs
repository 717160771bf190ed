//! Quadratic axis stretching.
//!
//! A stretched axis keeps a uniform computational coordinate `chi` (equal
//! cell width `dchi` everywhere) while the physical coordinate `x` only
//! matches `chi` on a central uniform region; outside it, `x` follows a
//! quadratic arm chosen so that both `x` and `dx/dchi` are continuous at the
//! inner boundary. This lets a boundary layer absorb waves at much lower
//! resolution than the plasma region without a kink in the mesh spacing.

use crate::Float;

#[derive(Debug, Clone, Copy)]
struct Arm {
    /// chi at the inner edge of this arm (continuous with the uniform region).
    inner_chi: Float,
    /// physical x at the inner edge of this arm.
    inner_x: Float,
    /// +1 for the right arm, -1 for the left arm.
    sign: Float,
    /// quadratic coefficient; b == 0 degenerates to a linear (unstretched) arm.
    b: Float,
}

impl Arm {
    fn new(inner_chi: Float, inner_x: Float, sign: Float, arm_cells: Float, dchi: Float, arm_physical_length: Float) -> Self {
        let s_max = arm_cells * dchi;
        let b = if s_max > 0.0 {
            (arm_physical_length / s_max - 1.0) / s_max
        } else {
            0.0
        };
        Arm {
            inner_chi,
            inner_x,
            sign,
            b,
        }
    }

    fn x_of(&self, chi: Float) -> Float {
        let s = self.sign * (chi - self.inner_chi);
        self.inner_x + self.sign * (s + self.b * s * s)
    }

    fn dxdchi_of(&self, chi: Float) -> Float {
        let s = self.sign * (chi - self.inner_chi);
        1.0 + 2.0 * self.b * s
    }

    fn chi_of(&self, x: Float) -> Float {
        let dx = self.sign * (x - self.inner_x);
        let s = if self.b.abs() < 1e-14 {
            dx
        } else {
            (-1.0 + (1.0 + 4.0 * self.b * dx).max(0.0).sqrt()) / (2.0 * self.b)
        };
        self.inner_chi + self.sign * s
    }
}

/// A monotonic map between a uniform computational coordinate and a
/// (possibly non-uniform) physical coordinate on one axis.
#[derive(Debug, Clone, Copy)]
pub struct StretchMap {
    left: Arm,
    right: Arm,
    left_chi: Float,
    right_chi: Float,
}

impl StretchMap {
    /// `chi_lo`/`chi_hi` bound the axis in computational coordinate (equal to
    /// the physical range of the unstretched, uniform middle). `uniform_cells`
    /// sit centred between two `arm_cells`-wide stretched arms, each required
    /// to span `arm_physical_length` in physical space.
    pub fn new(
        chi_lo: Float,
        chi_hi: Float,
        ncells: usize,
        uniform_cells: usize,
        arm_cells: usize,
        arm_physical_length: Float,
    ) -> Self {
        let dchi = (chi_hi - chi_lo) / ncells as Float;
        let half_uniform = uniform_cells as Float * dchi / 2.0;
        let chi_mid = 0.5 * (chi_lo + chi_hi);
        let left_chi = chi_mid - half_uniform;
        let right_chi = chi_mid + half_uniform;

        let left = Arm::new(left_chi, left_chi, -1.0, arm_cells as Float, dchi, arm_physical_length);
        let right = Arm::new(right_chi, right_chi, 1.0, arm_cells as Float, dchi, arm_physical_length);

        StretchMap {
            left,
            right,
            left_chi,
            right_chi,
        }
    }

    pub fn stretch(&self, chi: Float) -> Float {
        if chi < self.left_chi {
            self.left.x_of(chi)
        } else if chi > self.right_chi {
            self.right.x_of(chi)
        } else {
            chi
        }
    }

    pub fn d_stretch(&self, chi: Float) -> Float {
        if chi < self.left_chi {
            self.left.dxdchi_of(chi)
        } else if chi > self.right_chi {
            self.right.dxdchi_of(chi)
        } else {
            1.0
        }
    }

    pub fn unstretch(&self, x: Float) -> Float {
        let left_x = self.left.inner_x;
        let right_x = self.right.inner_x;
        if x < left_x {
            self.left.chi_of(x)
        } else if x > right_x {
            self.right.chi_of(x)
        } else {
            x
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    fn sample_map() -> StretchMap {
        StretchMap::new(-10.0, 10.0, 40, 20, 10, 30.0)
    }

    #[quickcheck]
    fn roundtrip_holds_for_arbitrary_chi(chi: f64) -> bool {
        let map = sample_map();
        let chi = ((chi.abs() % 1000.0) * chi.signum()) as Float;
        let back = map.unstretch(map.stretch(chi));
        (back - chi).abs() < 1e-6
    }

    #[test]
    fn roundtrip_over_range() {
        let map = sample_map();
        let mut chi = -10.0;
        while chi <= 10.0 {
            let x = map.stretch(chi);
            let back = map.unstretch(x);
            assert!((back - chi).abs() < 1e-9, "chi={chi} x={x} back={back}");
            chi += 0.137;
        }
    }

    #[test]
    fn derivative_is_positive() {
        let map = sample_map();
        let mut chi = -10.0;
        while chi <= 10.0 {
            assert!(map.d_stretch(chi) > 0.0);
            chi += 0.09;
        }
    }

    #[test]
    fn uniform_middle_is_identity() {
        let map = sample_map();
        assert!((map.stretch(0.0) - 0.0).abs() < 1e-12);
        assert!((map.d_stretch(1.0) - 1.0).abs() < 1e-12);
    }
}
