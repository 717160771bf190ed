//! Momentum initialization distributions: thermal momenta are drawn in the
//! particle's rest frame and then Lorentz-boosted into the drift frame, so
//! every distribution shares one boost step and differs only in how it
//! samples the rest-frame momentum.

use super::Species;
use crate::rng::{normal_with, UniformDraw};
use crate::vector::Vec3;
use crate::Float;

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum MomentumDistribution {
    /// Uniform box in `p`, half-width `p0` on every axis.
    Waterbag { p0: Float },
    /// Uniform box in `p`, independent half-width per axis.
    Waterbag3T { p0: [Float; 3] },
    /// Uniform magnitude draw inside a sphere of radius `p0`.
    UniformSphere { p0: Float },
    /// `exp(-|p/p0|^alpha)`, sampled by rejection against a bounding sphere.
    SuperGaussian { p0: Float, alpha: Float },
    /// Relativistic Maxwell-Jüttner, `exp(-gamma/theta)` with `theta = kT/mc^2`.
    MaxwellJuttner { theta: Float },
    /// Non-relativistic-drift Jüttner variant: same weight but `p0` sets the
    /// momentum scale directly instead of a temperature ratio.
    Juttner { p0: Float },
    /// 1-D Maxwellian along x conditional on a fixed transverse `u`,
    /// matching a beam with prescribed transverse emittance.
    Maxwell1D { sigma_x: Float, u_transverse: [Float; 2] },
}

fn sample_rest_frame(dist: MomentumDistribution, rng: &mut impl UniformDraw) -> Vec3 {
    match dist {
        MomentumDistribution::Waterbag { p0 } => Vec3::new(
            rng.uniform_range(-p0, p0),
            rng.uniform_range(-p0, p0),
            rng.uniform_range(-p0, p0),
        ),
        MomentumDistribution::Waterbag3T { p0 } => Vec3::new(
            rng.uniform_range(-p0[0], p0[0]),
            rng.uniform_range(-p0[1], p0[1]),
            rng.uniform_range(-p0[2], p0[2]),
        ),
        MomentumDistribution::UniformSphere { p0 } => {
            // Draw a direction uniformly on the sphere and a radius with the
            // r^2 density a uniform-volume sphere requires.
            let u = rng.uniform_range(-1.0, 1.0);
            let phi = rng.uniform_range(0.0, crate::constants::TWOPI);
            let r = p0 * rng.uniform().cbrt();
            let sin_theta = (1.0 - u * u).max(0.0).sqrt();
            Vec3::new(r * sin_theta * phi.cos(), r * sin_theta * phi.sin(), r * u)
        }
        MomentumDistribution::SuperGaussian { p0, alpha } => {
            // Rejection sampling against a uniform box of half-width 4*p0,
            // generous enough that acceptance stays well above a percent for
            // the alpha range this distribution is meant to cover (1..6).
            loop {
                let p = Vec3::new(
                    rng.uniform_range(-4.0 * p0, 4.0 * p0),
                    rng.uniform_range(-4.0 * p0, 4.0 * p0),
                    rng.uniform_range(-4.0 * p0, 4.0 * p0),
                );
                let s = (p.norm() / p0).powf(alpha);
                if rng.uniform() < (-s).exp() {
                    return p;
                }
            }
        }
        MomentumDistribution::MaxwellJuttner { theta } => {
            sample_juttner_like(theta, rng)
        }
        MomentumDistribution::Juttner { p0 } => {
            // p0 plays the role of theta in momentum units; gamma(p) still
            // drives the weight, matching the Maxwell-Juttner rejection loop.
            sample_juttner_like(p0, rng)
        }
        MomentumDistribution::Maxwell1D { sigma_x, u_transverse } => Vec3::new(
            normal_with(rng, 0.0, sigma_x),
            u_transverse[0],
            u_transverse[1],
        ),
    }
}

/// Shared rejection sampler for the two gamma-weighted distributions: draw
/// `p` uniformly in a box sized to a few thermal widths and accept with
/// probability `exp(-gamma(p)/theta)`.
fn sample_juttner_like(theta: Float, rng: &mut impl UniformDraw) -> Vec3 {
    let bound = 8.0 * theta.max(0.05);
    loop {
        let p = Vec3::new(
            rng.uniform_range(-bound, bound),
            rng.uniform_range(-bound, bound),
            rng.uniform_range(-bound, bound),
        );
        let gamma = (1.0 + p.norm_sq()).sqrt();
        if rng.uniform() < (-(gamma - 1.0) / theta).exp() {
            return p;
        }
    }
}

/// Builds the 4x4 Lorentz boost matrix that takes rest-frame 4-momentum to
/// the frame drifting with `u_drift` (so applying it to a rest-frame sample
/// gives the lab-frame momentum).
fn boost_matrix(u_drift: Vec3) -> [[Float; 4]; 4] {
    let gamma = u_drift.gamma();
    if gamma - 1.0 < 1e-14 {
        return [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
    }
    let beta = u_drift.scale(1.0 / gamma);
    let beta_sq = beta.norm_sq();
    let n = [beta.x, beta.y, beta.z];
    let mut m = [[0.0 as Float; 4]; 4];
    m[0][0] = gamma;
    for i in 0..3 {
        m[0][i + 1] = gamma * n[i];
        m[i + 1][0] = gamma * n[i];
    }
    for i in 0..3 {
        for j in 0..3 {
            let delta = if i == j { 1.0 } else { 0.0 };
            m[i + 1][j + 1] = delta + (gamma - 1.0) * n[i] * n[j] / beta_sq.max(1e-30);
        }
    }
    m
}

impl Species {
    /// Replaces every particle's momentum with a draw from `distribution`,
    /// boosted into the frame drifting with `u_drift`.
    pub fn add_momenta(&mut self, u_drift: Vec3, distribution: MomentumDistribution, rng: &mut impl UniformDraw) {
        let boost = boost_matrix(u_drift);
        for idx in 0..self.len() {
            let p_rest = sample_rest_frame(distribution, rng);
            let gamma_rest = (1.0 + p_rest.norm_sq()).sqrt();
            let four_rest = [gamma_rest, p_rest.x, p_rest.y, p_rest.z];
            let mut four_lab = [0.0 as Float; 4];
            for i in 0..4 {
                for j in 0..4 {
                    four_lab[i] += boost[i][j] * four_rest[j];
                }
            }
            self.u0[idx] = four_lab[1];
            self.u1[idx] = four_lab[2];
            self.u2[idx] = four_lab[3];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn waterbag_stays_within_bound() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let p = sample_rest_frame(MomentumDistribution::Waterbag { p0: 0.3 }, &mut rng);
            assert!(p.x.abs() <= 0.3 && p.y.abs() <= 0.3 && p.z.abs() <= 0.3);
        }
    }

    #[test]
    fn zero_drift_boost_is_identity() {
        let m = boost_matrix(Vec3::ZERO);
        for i in 0..4 {
            for j in 0..4 {
                let expect = if i == j { 1.0 } else { 0.0 };
                assert!((m[i][j] - expect).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn boosted_four_momentum_has_correct_invariant_mass() {
        let mut rng = StdRng::seed_from_u64(11);
        let u_drift = Vec3::new(0.5, 0.0, 0.0);
        let boost = boost_matrix(u_drift);
        let p_rest = sample_rest_frame(MomentumDistribution::Waterbag { p0: 0.1 }, &mut rng);
        let gamma_rest = (1.0 + p_rest.norm_sq()).sqrt();
        let four_rest = [gamma_rest, p_rest.x, p_rest.y, p_rest.z];
        let mut four_lab = [0.0 as Float; 4];
        for i in 0..4 {
            for j in 0..4 {
                four_lab[i] += boost[i][j] * four_rest[j];
            }
        }
        let invariant =
            four_lab[0].powi(2) - four_lab[1].powi(2) - four_lab[2].powi(2) - four_lab[3].powi(2);
        assert!((invariant - 1.0).abs() < 1e-9);
    }
}
