//! Orchestrates one PIC timestep in the fixed phase order the grid, field,
//! current and species modules each individually assume, plus checkpoint
//! dump/restart.
//!
//! The phase order (open-E1 / half-B / boundary / clear-J / deposit /
//! J-reduce / migrate / open-B / advance-E / boundary / open-E2 / half-B /
//! boundary / advance-p / move-window) is not incidental: each phase leaves
//! field or particle state consistent only for the phase that immediately
//! follows, and reordering silently breaks charge conservation or the
//! leapfrog symmetry of the push.

use crate::current::Current;
use crate::domain::Topology;
use crate::error::ResultExt;
use crate::field::Field;
use crate::grid::Grid;
use crate::species::deposit::DepositionKind;
use crate::species::Species;
use crate::{Float, Result};
use std::fs::File;
use std::io::{Read, Write};

/// Called once per step with the state as of the fixed diagnostics point
/// (right before any field/particle update), and again after a window shift
/// with a chance to create particles on the newly exposed leading face.
pub trait StepObserver {
    fn diagnostics(&mut self, _grid: &Grid, _field: &Field, _current: &Current, _species: &[Species]) {}

    fn refill_leading_face(&mut self, _grid: &Grid, _species: &mut [Species], _rank: usize) -> Result<()> {
        Ok(())
    }
}

/// A no-op observer for drivers that want neither diagnostics nor moving-window refill.
pub struct NullObserver;
impl StepObserver for NullObserver {}

pub struct PicLoop {
    pub grid: Grid,
    pub field: Field,
    pub current: Current,
    pub species: Vec<Species>,
    pub deposition: DepositionKind,
    pub checkpoint_every: Option<usize>,
    pub dump_path: Option<String>,
}

impl PicLoop {
    pub fn new(
        grid: Grid,
        field: Field,
        current: Current,
        species: Vec<Species>,
        deposition: DepositionKind,
        checkpoint_every: Option<usize>,
        dump_path: Option<String>,
    ) -> Self {
        PicLoop {
            grid,
            field,
            current,
            species,
            deposition,
            checkpoint_every,
            dump_path,
        }
    }

    /// Advances the simulation by one step, in the fixed phase order.
    pub fn step(&mut self, topo: &dyn Topology, rank: usize, observer: &mut dyn StepObserver) -> Result<()> {
        observer.diagnostics(&self.grid, &self.field, &self.current, &self.species);

        self.field.open_boundaries_e1();
        self.field.half_advance_b(self.grid.dt);
        self.field.boundary_conditions(topo)?;

        self.current.zero();
        for s in &mut self.species {
            s.deposit_and_advance(&mut self.current, &self.grid, self.grid.dt, self.deposition);
        }
        self.current.pbc(topo)?;

        for axis in 0..3 {
            for s in &mut self.species {
                s.migrate(&self.grid, topo, axis)?;
            }
        }

        self.field.open_boundaries_b();
        self.field.advance_e(&self.current, self.grid.dt);
        self.field.boundary_conditions(topo)?;

        self.field.open_boundaries_e2();
        self.field.half_advance_b(self.grid.dt);
        self.field.boundary_conditions(topo)?;

        for s in &mut self.species {
            s.advance_momenta(&self.field, &self.grid, self.grid.dt);
        }

        self.grid.advance_time();

        if let Some(axis) = self.grid.moving_window_axis() {
            self.grid.accumulate_window(1.0);
            if self.grid.consume_window_shift() {
                self.field.move_window();
                let new_lo = self.grid.axis(axis).lo_local;
                for s in &mut self.species {
                    s.drop_behind(axis, new_lo);
                }
                observer.refill_leading_face(&self.grid, &mut self.species, rank)?;
            }
        }

        if let Some(every) = self.checkpoint_every {
            if every > 0 && self.grid.istep % every == 0 {
                if let Some(path) = &self.dump_path {
                    self.dump(path, rank)?;
                }
            }
        }

        Ok(())
    }

    /// Writes `<path>/DUMP_<istep>_<rank>.bin`: grid state, the six field
    /// arrays, then per species `(Np, Np*Ncomp doubles)`.
    pub fn dump(&self, path: &str, rank: usize) -> Result<()> {
        let filename = format!("{path}/DUMP_{}_{rank}.bin", self.grid.istep);
        let mut f = File::create(&filename).chain_err(|| format!("unable to create checkpoint {filename}"))?;

        f.write_all(&(self.grid.istep as i64).to_le_bytes())
            .chain_err(|| "short write of istep")?;
        f.write_all(&self.grid.t.to_le_bytes())
            .chain_err(|| "short write of time")?;
        let fmove_axes: [Float; 3] = std::array::from_fn(|a| {
            if self.grid.moving_window_axis() == Some(a) {
                self.grid.fmove
            } else {
                0.0
            }
        });
        for v in fmove_axes {
            f.write_all(&v.to_le_bytes()).chain_err(|| "short write of fmove")?;
        }

        self.field.dump(&mut f)?;
        for s in &self.species {
            s.dump(&mut f)?;
        }
        log::info!("wrote checkpoint {filename}");
        Ok(())
    }

    /// Restores grid time/step/window state and all field/species arrays
    /// from a checkpoint previously written by [`PicLoop::dump`].
    pub fn reload(&mut self, path: &str, rank: usize) -> Result<()> {
        let filename = format!("{path}/DUMP_{}_{rank}.bin", self.grid.istep);
        let mut f = File::open(&filename).chain_err(|| format!("unable to open checkpoint {filename}"))?;

        let mut buf8 = [0u8; 8];
        f.read_exact(&mut buf8).chain_err(|| "short read of istep")?;
        self.grid.istep = i64::from_le_bytes(buf8) as usize;
        f.read_exact(&mut buf8).chain_err(|| "short read of time")?;
        self.grid.t = Float::from_le_bytes(buf8);

        let mut fmove_axes = [0.0 as Float; 3];
        for v in fmove_axes.iter_mut() {
            f.read_exact(&mut buf8).chain_err(|| "short read of fmove")?;
            *v = Float::from_le_bytes(buf8);
        }
        if let Some(axis) = self.grid.moving_window_axis() {
            self.grid.fmove = fmove_axes[axis];
        }

        self.field.reload(&mut f)?;
        for s in &mut self.species {
            s.reload(&mut f)?;
        }
        log::info!("reloaded checkpoint {filename}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::local::LocalTopology;
    use crate::grid::{BoundaryKind, Dim};
    use crate::species::ParticleType;

    fn sample_grid() -> Grid {
        let mut g = Grid::new(Dim::Three);
        g.set_range(0, 0.0, 1.0).unwrap();
        g.set_range(1, 0.0, 1.0).unwrap();
        g.set_range(2, 0.0, 1.0).unwrap();
        g.set_ncells(8, 8, 8).unwrap();
        g.set_boundaries([BoundaryKind::Pbc, BoundaryKind::Pbc, BoundaryKind::Pbc]);
        g.set_courant(0.9).unwrap();
        g.finalize().unwrap();
        g
    }

    #[test]
    fn empty_species_step_leaves_vacuum_quiescent() {
        let topos = LocalTopology::spawn_mesh([1, 1, 1]);
        let topo = &topos[0];
        let grid = sample_grid();
        let field = Field::allocate(&grid).unwrap();
        let current = Current::allocate(&grid).unwrap();
        let species = vec![Species::new("e", ParticleType::Electron)];
        let mut pic = PicLoop::new(grid, field, current, species, DepositionKind::Esirkepov, None, None);
        let mut observer = NullObserver;
        pic.step(topo, 0, &mut observer).unwrap();
        assert!(pic.field.e0.iter().all(|&v| v == 0.0));
        assert_eq!(pic.grid.istep, 1);
    }
}
