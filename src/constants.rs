//! Physical and numerical constants shared across the core.

use crate::Float;

/// 2*pi.
pub const TWOPI: Float = std::f64::consts::TAU as Float;

/// Mass of an electron in electron-mass units, by definition 1.
pub const ELECTRON_MASS: Float = 1.0;

/// `m_proton / m_electron`, used to derive ion charge-to-mass ratios.
pub const PROTON_ELECTRON_MASS_RATIO: Float = 1836.2;

/// Classical electron radius (metres), used by the radiation-reaction friction term.
pub const CLASSICAL_ELECTRON_RADIUS: Float = 2.817_940_322_7e-15;

/// Number of ghost cells maintained on each side of every decomposed axis.
pub const GHOST: usize = 3;
