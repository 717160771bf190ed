//! Thin command-line driver: parses a TOML parameter file, builds one
//! simulated rank per Cartesian topology cell on its own OS thread, and runs
//! the PIC loop to completion (or until a resumed run's remaining steps are
//! exhausted).

use clap::Parser;
use colored::*;
use log::{error, info};
use pbr::ProgressBar;
use relpic::config::{DensityProfileConfig, DepositionKindConfig, SimulationConfig};
use relpic::domain::local::LocalTopology;
use relpic::domain::Topology;
use relpic::error::ResultExt;
use relpic::field::{Field, PulseSpec};
use relpic::grid::{BoundaryKind, Dim, Grid};
use relpic::pic::{NullObserver, PicLoop};
use relpic::species::density::{BoxProfile, DensityProfile, ExponentialProfile, LinearProfile};
use relpic::species::deposit::DepositionKind;
use relpic::species::momenta::MomentumDistribution;
use relpic::species::{ParticleType, Species};
use relpic::vector::Vec3;
use relpic::{Error, Result};
use std::thread;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build identifier shown by `--version`: crate version, git sha (stamped by
/// `build.rs`), and a `-s` suffix when built single-precision.
fn version() -> String {
    let mut suffix = String::new();
    if cfg!(feature = "single") {
        suffix.push_str("-s");
    }
    format!(
        "{VERSION}-{}{suffix}",
        option_env!("VERGEN_GIT_SHA").unwrap_or("unknown")
    )
}

#[derive(Parser, Debug, Clone)]
#[command(name = "relpic-driver", version)]
struct Cli {
    /// TOML parameter file describing the grid, fields, species and PIC loop.
    parameter_file: String,

    /// Show a progress bar on rank 0.
    #[arg(long)]
    progress: bool,

    /// Resume from the most recent checkpoint named in the parameter file's
    /// dump_path instead of creating particles from scratch.
    #[arg(long)]
    resume: bool,
}

fn main() {
    env_logger::init();

    if let Err(ref e) = run() {
        error!("{}: {}", "error".red(), e);
        for cause in e.iter().skip(1) {
            error!("caused by: {}", cause);
        }
        if let Some(backtrace) = e.backtrace() {
            error!("backtrace: {:?}", backtrace);
        }
        std::process::exit(1);
    }
    std::process::exit(0);
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    info!("relpic-driver {}", version());
    let config = relpic::config::read_parameter_file(&cli.parameter_file)?;

    let dims = [
        config.grid.axes[0].nprocs,
        config.grid.axes[1].nprocs,
        config.grid.axes[2].nprocs,
    ];
    let dim = if config.grid.axes[2].ncells > 1 {
        Dim::Three
    } else if config.grid.axes[1].ncells > 1 {
        Dim::Two
    } else {
        Dim::One
    };

    let topos = LocalTopology::spawn_mesh(dims);
    let total_ranks = topos.len();
    info!("starting {total_ranks} simulated rank(s) over topology {dims:?}");

    let handles: Vec<_> = topos
        .into_iter()
        .map(|topo| {
            let config = config.clone();
            let show_progress = cli.progress;
            let resume = cli.resume;
            thread::spawn(move || run_rank(topo, dim, &config, show_progress, resume))
        })
        .collect();

    for h in handles {
        h.join()
            .map_err(|_| -> Error { "a simulated rank thread panicked".into() })??;
    }
    Ok(())
}

fn rank_coords(rank: usize, dims: [usize; 3]) -> [usize; 3] {
    let x = rank % dims[0];
    let y = (rank / dims[0]) % dims[1];
    let z = rank / (dims[0] * dims[1]);
    [x, y, z]
}

fn build_grid(config: &SimulationConfig, dim: Dim, rank: usize, dims: [usize; 3]) -> Result<Grid> {
    let mut grid = Grid::new(dim);
    let mut boundaries = [BoundaryKind::Pbc; 3];
    for (axis, a) in config.grid.axes.iter().enumerate() {
        grid.set_range(axis, a.lo, a.hi)?;
        grid.set_nprocs(axis, a.nprocs)?;
        boundaries[axis] = a.boundary;
        if let Some(s) = a.stretch {
            grid.enable_stretch(axis, s.uniform_cells, s.arm_cells, s.arm_physical_length);
        }
    }
    grid.set_ncells(
        config.grid.axes[0].ncells,
        config.grid.axes[1].ncells,
        config.grid.axes[2].ncells,
    )?;
    grid.set_boundaries(boundaries);
    grid.set_courant(config.grid.courant)?;
    grid.set_simulation_time(config.grid.simulation_time);
    if let Some(axis) = config.grid.moving_window_axis {
        grid.set_moving_window(axis, config.grid.moving_window_frequency);
    }
    grid.set_rank_coords(rank_coords(rank, dims));
    grid.finalize()?;
    Ok(grid)
}

fn build_profile(cfg: &DensityProfileConfig) -> Box<dyn DensityProfile> {
    match *cfg {
        DensityProfileConfig::Box { density, r_min, r_max } => {
            Box::new(BoxProfile { density, r_min, r_max })
        }
        DensityProfileConfig::Linear {
            density_min,
            density_max,
            axis,
            r_min,
            r_max,
        } => Box::new(LinearProfile {
            density_min,
            density_max,
            axis,
            r_min,
            r_max,
        }),
        DensityProfileConfig::Exponential {
            density0,
            scale_length,
            axis,
            r_min,
            r_max,
        } => Box::new(ExponentialProfile {
            density0,
            scale_length,
            axis,
            r_min,
            r_max,
        }),
    }
}

fn build_species(config: &SimulationConfig, grid: &Grid, topo: &dyn Topology, rank: usize) -> Result<Vec<Species>> {
    let mut species = Vec::with_capacity(config.species.len());
    for s in &config.species {
        let mut sp = Species::new(s.name.clone(), ParticleType::from(s.particle_type));
        sp.test_species = s.test_species;
        sp.radiation_reaction = s.radiation_reaction;

        let profile = build_profile(&s.density_profile);
        let (r_min, r_max) = match s.density_profile {
            DensityProfileConfig::Box { r_min, r_max, .. }
            | DensityProfileConfig::Linear { r_min, r_max, .. }
            | DensityProfileConfig::Exponential { r_min, r_max, .. } => (r_min, r_max),
        };

        let local_count = {
            let axes = grid.axes_geometry();
            let mut n: i64 = 0;
            if let Some((lo, hi)) = grid.clip_box_to_local_subdomain(r_min, r_max) {
                let mut cells = 1usize;
                for axis in 0..3 {
                    let span = (hi[axis] - lo[axis]).max(0.0) / axes[axis].dchi.max(1e-30);
                    cells = cells.saturating_mul(span.ceil().max(1.0) as usize);
                }
                n = (cells * s.particles_per_cell.iter().product::<usize>()) as i64;
            }
            n
        };
        let counts_per_rank = topo
            .all_gather_i64(local_count)
            .chain_err(|| "all-gather of species particle counts failed")?;

        sp.create_from_profile(
            grid,
            profile.as_ref(),
            r_min,
            r_max,
            s.particles_per_cell,
            rank,
            &counts_per_rank,
            0,
        )?;

        if s.drift != [0.0, 0.0, 0.0] {
            let mut rng = rand::thread_rng();
            let u_drift = Vec3::from(s.drift);
            sp.add_momenta(u_drift, MomentumDistribution::Waterbag { p0: 0.0 }, &mut rng);
        }

        species.push(sp);
    }
    Ok(species)
}

fn run_rank(topo: LocalTopology, dim: Dim, config: &SimulationConfig, show_progress: bool, resume: bool) -> Result<()> {
    let rank = topo.rank();
    let dims = [topo.nprocs(0), topo.nprocs(1), topo.nprocs(2)];
    let grid = build_grid(config, dim, rank, dims)?;

    let mut field = Field::allocate(&grid)?;
    for p in &config.field.pulses {
        let spec = PulseSpec {
            kind: p.kind.into(),
            polarization: p.polarization.into(),
            lambda0: p.lambda0,
            amplitude: p.amplitude,
            t_fwhm: p.t_fwhm,
            waist: p.waist,
            focus_position: p.focus_position,
            initial_position: p.initial_position,
            rotation_angle: p.rotation_angle,
            rotation_flag: p.rotation_flag,
        };
        field.add_pulse(&grid, &spec);
    }

    let current = relpic::current::Current::allocate(&grid)?;
    let species = build_species(config, &grid, &topo, rank)?;
    let deposition = match config.pic.deposition {
        DepositionKindConfig::Esirkepov => DepositionKind::Esirkepov,
        DepositionKindConfig::DirectSpline => DepositionKind::DirectSpline,
    };

    let mut pic = PicLoop::new(
        grid,
        field,
        current,
        species,
        deposition,
        config.pic.checkpoint_every,
        config.pic.dump_path.clone(),
    );

    if resume {
        let path = config
            .pic
            .dump_path
            .as_deref()
            .ok_or_else(|| -> Error { "cannot resume: no dump_path configured".into() })?;
        pic.reload(path, rank)?;
    }

    let mut pb = if rank == 0 {
        let mut pb = ProgressBar::new(config.pic.nsteps as u64);
        pb.format("┫██░┣");
        pb.show_bar = show_progress;
        pb.show_counter = show_progress;
        pb.show_percent = show_progress;
        pb.show_speed = show_progress;
        pb.show_time_left = show_progress;
        pb.show_message = show_progress;
        Some(pb)
    } else {
        None
    };

    let mut observer = NullObserver;
    let start_step = pic.grid.istep;
    for _ in start_step..config.pic.nsteps {
        pic.step(&topo, rank, &mut observer)?;
        if let Some(pb) = pb.as_mut() {
            pb.inc();
        }
    }

    if let Some(mut pb) = pb {
        pb.finish_print(&format!("{} {}", "done".green().bold(), version()));
    }
    Ok(())
}
