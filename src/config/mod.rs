//! TOML-parseable settings that mirror the shapes a driver must produce to
//! construct a [`crate::grid::Grid`], [`crate::field::Field`],
//! [`crate::species::Species`] set and [`crate::pic::PicLoop`].
//!
//! Parsing a file and wiring a CLI around it remains a driver concern; this
//! module only gives the driver something concrete to target, the way
//! `stochasticsampling`'s `settings` module gives its `main()` a concrete
//! `SettingsSI` to deserialize into.

use crate::error::ResultExt;
use crate::field::pulse::{Polarization, PulseKind};
use crate::grid::BoundaryKind;
use crate::species::ParticleType;
use crate::{Float, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AxisConfig {
    pub lo: Float,
    pub hi: Float,
    pub ncells: usize,
    pub nprocs: usize,
    pub boundary: BoundaryKind,
    pub stretch: Option<StretchConfig>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StretchConfig {
    /// Number of uniform-spacing cells left untouched at the centre of the axis.
    pub uniform_cells: usize,
    /// Number of cells in each stretched arm (left and right are symmetric in cell count).
    pub arm_cells: usize,
    /// Physical length the stretched arm must span, in excess of the uniform spacing.
    pub arm_physical_length: Float,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridConfig {
    pub axes: [AxisConfig; 3],
    pub courant: Float,
    pub simulation_time: Float,
    #[serde(default)]
    pub moving_window_axis: Option<usize>,
    #[serde(default)]
    pub moving_window_frequency: Float,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "snake_case")]
pub enum PolarizationConfig {
    P,
    S,
    Circular,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "snake_case")]
pub enum PulseKindConfig {
    Gaussian,
    PlaneWave,
    Cos2PlaneWave,
}

impl From<PolarizationConfig> for Polarization {
    fn from(c: PolarizationConfig) -> Self {
        match c {
            PolarizationConfig::P => Polarization::P,
            PolarizationConfig::S => Polarization::S,
            PolarizationConfig::Circular => Polarization::Circular,
        }
    }
}

impl From<PulseKindConfig> for PulseKind {
    fn from(c: PulseKindConfig) -> Self {
        match c {
            PulseKindConfig::Gaussian => PulseKind::Gaussian,
            PulseKindConfig::PlaneWave => PulseKind::PlaneWave,
            PulseKindConfig::Cos2PlaneWave => PulseKind::Cos2PlaneWave,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PulseConfig {
    pub kind: PulseKindConfig,
    pub polarization: PolarizationConfig,
    pub lambda0: Float,
    pub amplitude: Float,
    pub t_fwhm: Float,
    pub waist: Float,
    pub focus_position: Float,
    pub initial_position: Float,
    #[serde(default)]
    pub rotation_angle: Float,
    #[serde(default)]
    pub rotation_flag: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldConfig {
    #[serde(default)]
    pub pulses: Vec<PulseConfig>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "snake_case")]
pub enum ParticleTypeConfig {
    Electron,
    Positron,
    Ion { z: Float, a: Float },
}

impl From<ParticleTypeConfig> for ParticleType {
    fn from(c: ParticleTypeConfig) -> Self {
        match c {
            ParticleTypeConfig::Electron => ParticleType::Electron,
            ParticleTypeConfig::Positron => ParticleType::Positron,
            ParticleTypeConfig::Ion { z, a } => ParticleType::Ion { z, a },
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "snake_case")]
pub enum DensityProfileConfig {
    Box {
        density: Float,
        r_min: [Float; 3],
        r_max: [Float; 3],
    },
    Linear {
        density_min: Float,
        density_max: Float,
        axis: usize,
        r_min: [Float; 3],
        r_max: [Float; 3],
    },
    Exponential {
        density0: Float,
        scale_length: Float,
        axis: usize,
        r_min: [Float; 3],
        r_max: [Float; 3],
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpeciesConfig {
    pub name: String,
    pub particle_type: ParticleTypeConfig,
    pub density_profile: DensityProfileConfig,
    pub particles_per_cell: [usize; 3],
    #[serde(default)]
    pub test_species: bool,
    #[serde(default)]
    pub radiation_reaction: bool,
    #[serde(default)]
    pub drift: [Float; 3],
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "snake_case")]
pub enum DepositionKindConfig {
    Esirkepov,
    DirectSpline,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PicConfig {
    pub nsteps: usize,
    pub deposition: DepositionKindConfig,
    #[serde(default)]
    pub checkpoint_every: Option<usize>,
    #[serde(default)]
    pub dump_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    pub grid: GridConfig,
    pub field: FieldConfig,
    pub species: Vec<SpeciesConfig>,
    pub pic: PicConfig,
}

fn read_from_file(filename: &str) -> Result<String> {
    let mut f = File::open(filename).chain_err(|| "unable to open parameter file")?;
    let mut content = String::new();
    f.read_to_string(&mut content)
        .chain_err(|| "unable to read parameter file")?;
    Ok(content)
}

/// Reads and parses a TOML parameter file, then runs [`check_settings`].
pub fn read_parameter_file(param_file: &str) -> Result<SimulationConfig> {
    let toml_string = read_from_file(param_file)?;
    let settings: SimulationConfig =
        toml::from_str(&toml_string).chain_err(|| "unable to parse parameter file")?;
    check_settings(&settings)?;
    Ok(settings)
}

/// Sanity checks that are not expressible through serde alone.
pub fn check_settings(s: &SimulationConfig) -> Result<()> {
    for (axis_idx, axis) in s.grid.axes.iter().enumerate() {
        if axis.lo >= axis.hi {
            bail!(crate::ErrorKind::ConfigError(format!(
                "axis {}: lo ({}) must be strictly less than hi ({})",
                axis_idx, axis.lo, axis.hi
            )));
        }
        if axis.ncells == 0 {
            bail!(crate::ErrorKind::ConfigError(format!(
                "axis {}: ncells must be positive",
                axis_idx
            )));
        }
        if axis.ncells % axis.nprocs != 0 {
            bail!(crate::ErrorKind::ConfigError(format!(
                "axis {}: ncells ({}) not evenly divisible by nprocs ({})",
                axis_idx, axis.ncells, axis.nprocs
            )));
        }
        if let Some(stretch) = axis.stretch {
            if 2 * stretch.arm_cells + stretch.uniform_cells != axis.ncells {
                bail!(crate::ErrorKind::ConfigError(format!(
                    "axis {}: stretch arm/uniform cell counts do not sum to ncells",
                    axis_idx
                )));
            }
        }
    }

    if s.grid.courant <= 0.0 || s.grid.courant > 1.0 {
        bail!(crate::ErrorKind::ConfigError(format!(
            "courant factor must lie in (0, 1], got {}",
            s.grid.courant
        )));
    }

    if let Some(axis) = s.grid.moving_window_axis {
        if axis >= 3 {
            bail!(crate::ErrorKind::ConfigError(
                "moving_window_axis must be 0, 1 or 2".to_string()
            ));
        }
    }

    for species in &s.species {
        if species.particles_per_cell.iter().any(|&p| p == 0) {
            bail!(crate::ErrorKind::ConfigError(format!(
                "species `{}`: particles_per_cell components must be positive",
                species.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_axis(boundary: BoundaryKind) -> AxisConfig {
        AxisConfig {
            lo: -1.0,
            hi: 1.0,
            ncells: 8,
            nprocs: 1,
            boundary,
            stretch: None,
        }
    }

    #[test]
    fn rejects_inverted_range() {
        let mut axis = sample_axis(BoundaryKind::Pbc);
        axis.hi = axis.lo;
        let cfg = SimulationConfig {
            grid: GridConfig {
                axes: [
                    axis.clone(),
                    sample_axis(BoundaryKind::Pbc),
                    sample_axis(BoundaryKind::Pbc),
                ],
                courant: 0.95,
                simulation_time: 1.0,
                moving_window_axis: None,
                moving_window_frequency: 0.0,
            },
            field: FieldConfig { pulses: vec![] },
            species: vec![],
            pic: PicConfig {
                nsteps: 1,
                deposition: DepositionKindConfig::Esirkepov,
                checkpoint_every: None,
                dump_path: None,
            },
        };
        assert!(check_settings(&cfg).is_err());
    }
}
