//! Field gather on the quadratic-B-spline stencil and the relativistic
//! Boris momentum push, with an optional radiation-reaction friction term.

use super::Species;
use crate::constants::CLASSICAL_ELECTRON_RADIUS;
use crate::field::Field;
use crate::grid::{AxisGeometry, Grid};
use crate::vector::Vec3;
use crate::Float;
use ndarray::Array3;
use rayon::prelude::*;

/// Weights for the 3-point quadratic B-spline stencil centred on the
/// nearest node, `r` being the fractional offset to that node in `[-0.5, 0.5]`.
pub(crate) fn quadratic_weights(r: Float) -> [Float; 3] {
    let w1 = 0.75 - r * r;
    let w2 = 0.5 * (0.25 + r * r + r);
    let w0 = 1.0 - w1 - w2;
    [w0, w1, w2]
}

/// Node index (into the ghosted local array) and fractional offset for a
/// `chi`-space coordinate, on either the "whole" stagger (field component
/// defined at integer nodes on this axis) or "half" stagger (defined at
/// half-integer nodes, i.e. offset by `dchi/2`).
pub(crate) fn node_and_frac(axis: &AxisGeometry, chi: Float, ghost: usize, half: bool) -> (usize, Float) {
    let mut idx_float = (chi - axis.lo_global) / axis.dchi - axis.global_start as Float + ghost as Float;
    if half {
        idx_float -= 0.5;
    }
    let node = idx_float.round();
    let r = idx_float - node;
    (node as usize, r)
}

struct Stencil {
    idx: [usize; 3],
    w: [Float; 3],
}

fn stencil_for(axis: &AxisGeometry, chi: Float, ghost: usize, half: bool) -> Stencil {
    let (node, r) = node_and_frac(axis, chi, ghost, half);
    Stencil {
        idx: [node - 1, node, node + 1],
        w: quadratic_weights(r),
    }
}

fn gather_one(arr: &Array3<Float>, sx: &Stencil, sy: &Stencil, sz: &Stencil) -> Float {
    let mut acc = 0.0;
    for (ii, &i) in sx.idx.iter().enumerate() {
        for (jj, &j) in sy.idx.iter().enumerate() {
            for (kk, &k) in sz.idx.iter().enumerate() {
                acc += sx.w[ii] * sy.w[jj] * sz.w[kk] * arr[(i, j, k)];
            }
        }
    }
    acc
}

/// Gathers `(E, B)` at a physical position, converting to the stretched
/// axis's `chi`-space coordinate (via `unstretch`) before building the
/// stencil, per spec — gathered values themselves are not rescaled.
pub fn gather(field: &Field, grid: &Grid, pos: [Float; 3]) -> (Vec3, Vec3) {
    let ghost = field.ghost();
    let axes = grid.axes_geometry();
    let chi = [
        axes[0].unstretch(pos[0]),
        axes[1].unstretch(pos[1]),
        axes[2].unstretch(pos[2]),
    ];

    let whole: Vec<Stencil> = (0..3).map(|a| stencil_for(&axes[a], chi[a], ghost, false)).collect();
    let half: Vec<Stencil> = (0..3).map(|a| stencil_for(&axes[a], chi[a], ghost, true)).collect();

    let ex = gather_one(&field.e0, &half[0], &whole[1], &whole[2]);
    let ey = gather_one(&field.e1, &whole[0], &half[1], &whole[2]);
    let ez = gather_one(&field.e2, &whole[0], &whole[1], &half[2]);

    let bx = gather_one(&field.b0, &whole[0], &half[1], &half[2]);
    let by = gather_one(&field.b1, &half[0], &whole[1], &half[2]);
    let bz = gather_one(&field.b2, &half[0], &half[1], &whole[2]);

    (Vec3::new(ex, ey, ez), Vec3::new(bx, by, bz))
}

/// One relativistic Boris rotation: `e`/`b` already carry the particle's
/// charge-to-mass ratio folded in by the caller (scaled by `half_dt`).
fn boris_rotate(u: Vec3, e_half: Vec3, b_half: Vec3) -> Vec3 {
    let u_minus = u + e_half;
    let gamma = u_minus.gamma();
    let t = b_half.scale(1.0 / gamma);
    let s = t.scale(2.0 / (1.0 + t.norm_sq()));
    let u_prime = u_minus + u_minus.cross(&t);
    let u_plus = u_minus + u_prime.cross(&s);
    u_plus + e_half
}

/// Radiation-reaction friction (Landau-Lifshitz-like), subtracted from the
/// post-Boris momentum. `lambda` is the species' laser reference wavelength
/// and `v_mid`/`gamma_mid` use the mean of the pre- and post-push momenta.
fn radiation_reaction(q_over_m: Float, lambda: Float, e: Vec3, b: Vec3, v_mid: Vec3, gamma_mid: Float) -> Vec3 {
    let rr_coeff = 4.0 / 3.0 * std::f64::consts::PI as Float * (CLASSICAL_ELECTRON_RADIUS as Float / lambda);
    let lorentz_force = (e + v_mid.cross(&b)).scale(q_over_m);
    let f_l_sq = lorentz_force.norm_sq();
    let v_dot_e = v_mid.dot(&e) * q_over_m;
    let magnitude = rr_coeff * gamma_mid * gamma_mid * (f_l_sq - v_dot_e * v_dot_e);
    v_mid.scale(magnitude)
}

impl Species {
    /// Advances every particle's momentum under the Lorentz force gathered
    /// at its current position, using the Boris scheme; applies radiation
    /// reaction afterward if enabled. Test species are pushed the same as
    /// any other species — only current deposition (`deposit_and_advance`)
    /// treats them differently.
    pub fn advance_momenta(&mut self, field: &Field, grid: &Grid, dt: Float) {
        let q_over_m = self.particle_type.charge_to_mass();
        let half_dt_qm = 0.5 * dt * q_over_m;
        let rr_enabled = self.radiation_reaction;
        let lambda = self.laser_lambda0;

        self.u0
            .par_iter_mut()
            .zip(self.u1.par_iter_mut())
            .zip(self.u2.par_iter_mut())
            .zip(self.r0.par_iter())
            .zip(self.r1.par_iter())
            .zip(self.r2.par_iter())
            .for_each(|(((((u0, u1), u2), r0), r1), r2)| {
                let pos = [*r0, *r1, *r2];
                let (e, b) = gather(field, grid, pos);
                let u_old = Vec3::new(*u0, *u1, *u2);

                let e_half = e.scale(half_dt_qm);
                let b_half = b.scale(half_dt_qm);
                let mut u_new = boris_rotate(u_old, e_half, b_half);

                if rr_enabled {
                    let u_mid = (u_old + u_new).scale(0.5);
                    let gamma_mid = u_mid.gamma();
                    let v_mid = u_mid.scale(1.0 / gamma_mid);
                    let dp = radiation_reaction(q_over_m, lambda, e, b, v_mid, gamma_mid).scale(dt);
                    u_new -= dp;
                }

                *u0 = u_new.x;
                *u1 = u_new.y;
                *u2 = u_new.z;
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quadratic_weights_sum_to_one() {
        for r in [-0.5, -0.25, 0.0, 0.25, 0.5] {
            let w = quadratic_weights(r);
            assert!((w[0] + w[1] + w[2] - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn boris_rotation_conserves_gamma_with_zero_e_field() {
        let u0 = Vec3::new(1.0, 0.0, 0.0);
        let b_half = Vec3::new(0.0, 0.0, 0.1);
        let u1 = boris_rotate(u0, Vec3::ZERO, b_half);
        assert!((u1.gamma() - u0.gamma()).abs() < 1e-12);
    }
}
