//! Analytic laser pulse injection: gaussian, plane-wave and cos²-plane-wave
//! envelopes, each with P/S/circular polarization, written into the field
//! arrays at `t=0`. Multiple pulses superpose by construction since
//! `add_pulse` only ever adds into the existing arrays.

use crate::constants::TWOPI;
use crate::grid::Grid;
use crate::Float;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PulseKind {
    Gaussian,
    PlaneWave,
    Cos2PlaneWave,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarization {
    P,
    S,
    Circular,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PulseSpec {
    pub kind: PulseKind,
    pub polarization: Polarization,
    pub lambda0: Float,
    pub amplitude: Float,
    pub t_fwhm: Float,
    pub waist: Float,
    pub focus_position: Float,
    pub initial_position: Float,
    pub rotation_angle: Float,
    pub rotation_flag: bool,
}

fn envelope(kind: PulseKind, xi: Float, half_width: Float, waist: Float, transverse_sq: Float) -> Float {
    let longitudinal = match kind {
        PulseKind::Gaussian => (-xi * xi / (half_width * half_width)).exp(),
        PulseKind::PlaneWave => 1.0,
        PulseKind::Cos2PlaneWave => {
            if xi.abs() < half_width {
                (std::f64::consts::FRAC_PI_2 as Float * xi / half_width).cos().powi(2)
            } else {
                0.0
            }
        }
    };
    let transverse = match kind {
        PulseKind::PlaneWave | PulseKind::Cos2PlaneWave => 1.0,
        PulseKind::Gaussian => (-transverse_sq / (waist * waist)).exp(),
    };
    longitudinal * transverse
}

/// Writes `spec`'s analytic pattern into `field` at `t=0`, rotated by
/// `rotation_angle` about `(focus_position, 0)` in the x-y plane when
/// `rotation_flag` is set. Superposes additively onto whatever is already
/// stored in the arrays.
pub fn add_pulse(field: &mut super::Field, grid: &Grid, spec: &PulseSpec) {
    let k0 = TWOPI / spec.lambda0;
    let half_width = spec.t_fwhm / std::f64::consts::SQRT_2 as Float;
    let (nx, ny, nz) = field.shape();
    let g = field.ghost();

    let x_axis = grid.axis(0);
    let y_axis = grid.axis(1);
    let z_axis = grid.axis(2);

    for i in 0..nx {
        let x = x_axis.cell_center_ghosted(i, g);
        for j in 0..ny {
            let y = y_axis.cell_center_ghosted(j, g);
            for k in 0..nz {
                let z = z_axis.cell_center_ghosted(k, g);

                let (xr, yr) = if spec.rotation_flag {
                    rotate(x - spec.focus_position, y, spec.rotation_angle)
                } else {
                    (x - spec.focus_position, y)
                };

                let xi = xr + spec.focus_position - spec.initial_position;
                let transverse_sq = yr * yr + z * z;
                let env = envelope(spec.kind, xi, half_width, spec.waist, transverse_sq)
                    * spec.amplitude;
                let phase = k0 * xi;
                let (s, c) = phase.sin_cos();

                let (ey, ez, by, bz) = match spec.polarization {
                    Polarization::S => (env * c, 0.0, 0.0, env * c),
                    Polarization::P => (0.0, env * c, -env * c, 0.0),
                    Polarization::Circular => {
                        let amp = env * std::f64::consts::FRAC_1_SQRT_2 as Float;
                        (amp * c, amp * s, -amp * s, amp * c)
                    }
                };

                field.e1[(i, j, k)] += ey;
                field.e2[(i, j, k)] += ez;
                field.b1[(i, j, k)] += by;
                field.b2[(i, j, k)] += bz;
            }
        }
    }

    log::debug!(
        "added {:?}/{:?} pulse, lambda0={}, a0={}",
        spec.kind,
        spec.polarization,
        spec.lambda0,
        spec.amplitude
    );
}

fn rotate(x: Float, y: Float, angle: Float) -> (Float, Float) {
    let (s, c) = angle.sin_cos();
    (x * c - y * s, x * s + y * c)
}
