//! The six Yee-staggered electromagnetic field arrays, their FDTD leapfrog
//! advance, ghost exchange / open-boundary correction, pulse injection and
//! checkpoint (de)serialization.

pub mod pulse;

use crate::constants::GHOST;
use crate::current::Current;
use crate::domain::{exchange_slab, Topology};
use crate::error::ResultExt;
use crate::grid::{BoundaryKind, Grid};
use crate::{Float, Result};
use ndarray::Array3;
use std::io::{Read, Write};

pub use pulse::PulseSpec;

/// Tags used to keep concurrent ghost-exchange messages from crossing on the
/// shared [`crate::domain::Topology`] channel.
const TAG_GHOST_AXIS: [u32; 3] = [100, 101, 102];

#[derive(Debug, Clone, Copy, Default)]
struct Shape {
    nx: usize,
    ny: usize,
    nz: usize,
}

/// Electromagnetic field state: six scalar arrays over the ghosted local
/// sub-box, plus the per-axis inverse physical spacing used to difference on
/// stretched axes.
pub struct Field {
    pub e0: Array3<Float>,
    pub e1: Array3<Float>,
    pub e2: Array3<Float>,
    pub b0: Array3<Float>,
    pub b1: Array3<Float>,
    pub b2: Array3<Float>,
    shape: Shape,
    ghost: usize,
    active: [bool; 3],
    boundary: [BoundaryKind; 3],
    /// inv_dx[axis][i] = 1 / (x(i+1) - x(i)) in the ghosted local index space.
    inv_dx: [Vec<Float>; 3],
}

fn active_axes(dim: crate::grid::Dim) -> [bool; 3] {
    match dim {
        crate::grid::Dim::One => [true, false, false],
        crate::grid::Dim::Two => [true, true, false],
        crate::grid::Dim::Three => [true, true, true],
    }
}

impl Field {
    /// Allocates all six arrays at `Nloc + 2g` per axis and precomputes the
    /// per-axis spacing used by the stretched-grid FDTD difference.
    pub fn allocate(grid: &Grid) -> Result<Field> {
        let ghost = grid.ghost();
        let axes = grid.axes_geometry();
        let shape = Shape {
            nx: axes[0].ncells_local + 2 * ghost,
            ny: axes[1].ncells_local + 2 * ghost,
            nz: axes[2].ncells_local + 2 * ghost,
        };

        let zeros = || Array3::<Float>::zeros((shape.nx, shape.ny, shape.nz));

        let mut inv_dx: [Vec<Float>; 3] = [Vec::new(), Vec::new(), Vec::new()];
        for axis in 0..3 {
            let g = axes[axis];
            let n = g.ncells_local + 2 * ghost;
            let mut edges = Vec::with_capacity(n + 1);
            for i in 0..=n {
                let global_i = g.global_start as isize - ghost as isize + i as isize;
                let chi = g.lo_global + global_i as Float * g.dchi;
                edges.push(g.stretch(chi));
            }
            let mut dx = Vec::with_capacity(n);
            for i in 0..n {
                let d = edges[i + 1] - edges[i];
                if !(d > 0.0) {
                    bail!(crate::ErrorKind::AllocationFailure(format!(
                        "axis {axis}: non-positive cell spacing while allocating field"
                    )));
                }
                dx.push(1.0 / d);
            }
            inv_dx[axis] = dx;
        }

        log::info!(
            "field allocated: local shape = ({}, {}, {})",
            shape.nx,
            shape.ny,
            shape.nz
        );

        Ok(Field {
            e0: zeros(),
            e1: zeros(),
            e2: zeros(),
            b0: zeros(),
            b1: zeros(),
            b2: zeros(),
            shape,
            ghost,
            active: active_axes(grid.dim()),
            boundary: [axes[0].boundary, axes[1].boundary, axes[2].boundary],
            inv_dx,
        })
    }

    pub fn zero(&mut self) {
        for a in [
            &mut self.e0, &mut self.e1, &mut self.e2, &mut self.b0, &mut self.b1, &mut self.b2,
        ] {
            a.fill(0.0);
        }
    }

    fn dims(&self) -> (usize, usize, usize) {
        (self.shape.nx, self.shape.ny, self.shape.nz)
    }

    fn inv_dy(&self, j: usize) -> Float {
        if self.active[1] {
            self.inv_dx[1][j]
        } else {
            0.0
        }
    }

    fn inv_dz(&self, k: usize) -> Float {
        if self.active[2] {
            self.inv_dx[2][k]
        } else {
            0.0
        }
    }

    fn inv_dxi(&self, i: usize) -> Float {
        self.inv_dx[0][i]
    }

    /// Half-step magnetic field advance: the first and second of the two
    /// half-B updates that bracket the electric field advance in one Yee step.
    pub fn half_advance_b(&mut self, dt: Float) {
        let (nx, ny, nz) = self.dims();
        let half_dt = 0.5 * dt;
        let g = self.ghost;
        for i in g..nx - g {
            for j in g..ny - g {
                for k in g..nz - g {
                    unsafe {
                        let dey_dz = if self.active[2] {
                            (self.e1.uget((i, j, k + 1)) - self.e1.uget((i, j, k))) * self.inv_dz(k)
                        } else {
                            0.0
                        };
                        let dez_dy = if self.active[1] {
                            (self.e2.uget((i, j + 1, k)) - self.e2.uget((i, j, k))) * self.inv_dy(j)
                        } else {
                            0.0
                        };
                        *self.b0.uget_mut((i, j, k)) -= half_dt * (dez_dy - dey_dz);

                        let dez_dx =
                            (self.e2.uget((i + 1, j, k)) - self.e2.uget((i, j, k))) * self.inv_dxi(i);
                        let dex_dz = if self.active[2] {
                            (self.e0.uget((i, j, k + 1)) - self.e0.uget((i, j, k))) * self.inv_dz(k)
                        } else {
                            0.0
                        };
                        *self.b1.uget_mut((i, j, k)) -= half_dt * (dex_dz - dez_dx);

                        let dex_dy = if self.active[1] {
                            (self.e0.uget((i, j + 1, k)) - self.e0.uget((i, j, k))) * self.inv_dy(j)
                        } else {
                            0.0
                        };
                        let dey_dx =
                            (self.e1.uget((i + 1, j, k)) - self.e1.uget((i, j, k))) * self.inv_dxi(i);
                        *self.b2.uget_mut((i, j, k)) -= half_dt * (dey_dx - dex_dy);
                    }
                }
            }
        }
    }

    /// Electric field advance using the current deposited this step.
    pub fn advance_e(&mut self, current: &Current, dt: Float) {
        let (nx, ny, nz) = self.dims();
        let g = self.ghost;
        for i in g..nx - g {
            for j in g..ny - g {
                for k in g..nz - g {
                    unsafe {
                        let dbz_dy = if self.active[1] {
                            (self.b2.uget((i, j, k)) - self.b2.uget((i, j - 1, k))) * self.inv_dy(j)
                        } else {
                            0.0
                        };
                        let dby_dz = if self.active[2] {
                            (self.b1.uget((i, j, k)) - self.b1.uget((i, j, k - 1))) * self.inv_dz(k)
                        } else {
                            0.0
                        };
                        *self.e0.uget_mut((i, j, k)) +=
                            dt * (dbz_dy - dby_dz) - dt * current.jx.uget((i, j, k));

                        let dbx_dz = if self.active[2] {
                            (self.b0.uget((i, j, k)) - self.b0.uget((i, j, k - 1))) * self.inv_dz(k)
                        } else {
                            0.0
                        };
                        let dbz_dx =
                            (self.b2.uget((i, j, k)) - self.b2.uget((i - 1, j, k))) * self.inv_dxi(i);
                        *self.e1.uget_mut((i, j, k)) +=
                            dt * (dbx_dz - dbz_dx) - dt * current.jy.uget((i, j, k));

                        let dby_dx =
                            (self.b1.uget((i, j, k)) - self.b1.uget((i - 1, j, k))) * self.inv_dxi(i);
                        let dbx_dy = if self.active[1] {
                            (self.b0.uget((i, j, k)) - self.b0.uget((i, j - 1, k))) * self.inv_dy(j)
                        } else {
                            0.0
                        };
                        *self.e2.uget_mut((i, j, k)) +=
                            dt * (dby_dx - dbx_dy) - dt * current.jz.uget((i, j, k));
                    }
                }
            }
        }
    }

    /// Refreshes ghost cells: PBC axes exchange interior slabs with the
    /// neighbour rank (or the same rank's opposite face, when not
    /// decomposed); open axes are left untouched here (handled by the
    /// `open_boundaries_*` passes).
    pub fn boundary_conditions(&mut self, topo: &dyn Topology) -> Result<()> {
        for axis in 0..3 {
            if !self.active[axis] {
                continue;
            }
            if self.boundary[axis] != BoundaryKind::Pbc {
                continue;
            }
            self.exchange_ghosts(topo, axis)?;
        }
        Ok(())
    }

    fn pack_slab(&self, axis: usize, start: usize) -> Vec<u8> {
        let g = self.ghost;
        let (nx, ny, nz) = self.dims();
        let mut bytes = Vec::new();
        let arrays = [&self.e0, &self.e1, &self.e2, &self.b0, &self.b1, &self.b2];
        for a in arrays {
            match axis {
                0 => {
                    for di in 0..g {
                        for j in 0..ny {
                            for k in 0..nz {
                                bytes.extend_from_slice(&a[(start + di, j, k)].to_le_bytes());
                            }
                        }
                    }
                }
                1 => {
                    for i in 0..nx {
                        for dj in 0..g {
                            for k in 0..nz {
                                bytes.extend_from_slice(&a[(i, start + dj, k)].to_le_bytes());
                            }
                        }
                    }
                }
                _ => {
                    for i in 0..nx {
                        for j in 0..ny {
                            for dk in 0..g {
                                bytes.extend_from_slice(&a[(i, j, start + dk)].to_le_bytes());
                            }
                        }
                    }
                }
            }
        }
        bytes
    }

    fn unpack_slab(&mut self, axis: usize, start: usize, bytes: &[u8]) {
        let g = self.ghost;
        let (nx, ny, nz) = self.dims();
        let mut cursor = 0usize;
        let mut arrays = [
            &mut self.e0, &mut self.e1, &mut self.e2, &mut self.b0, &mut self.b1, &mut self.b2,
        ];
        let mut read = |bytes: &[u8], cursor: &mut usize| -> Float {
            let v = Float::from_le_bytes(bytes[*cursor..*cursor + 8].try_into().unwrap());
            *cursor += 8;
            v
        };
        for a in arrays.iter_mut() {
            match axis {
                0 => {
                    for di in 0..g {
                        for j in 0..ny {
                            for k in 0..nz {
                                a[(start + di, j, k)] = read(bytes, &mut cursor);
                            }
                        }
                    }
                }
                1 => {
                    for i in 0..nx {
                        for dj in 0..g {
                            for k in 0..nz {
                                a[(i, start + dj, k)] = read(bytes, &mut cursor);
                            }
                        }
                    }
                }
                _ => {
                    for i in 0..nx {
                        for j in 0..ny {
                            for dk in 0..g {
                                a[(i, j, start + dk)] = read(bytes, &mut cursor);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Exchanges ghost slabs with the neighbours on a periodic axis. On an
    /// axis with a single rank, `neighbor()` has no peer to return: the rank
    /// is its own periodic neighbour, so each ghost is filled by folding in
    /// this rank's own opposite-face interior slab instead of exchanging.
    fn exchange_ghosts(&mut self, topo: &dyn Topology, axis: usize) -> Result<()> {
        let g = self.ghost;
        let (nx, ny, nz) = self.dims();
        let interior_hi_start = match axis {
            0 => nx - 2 * g,
            1 => ny - 2 * g,
            _ => nz - 2 * g,
        };

        let send_right = self.pack_slab(axis, interior_hi_start);
        let send_left = self.pack_slab(axis, g);

        let recv_from_right = exchange_slab(topo, axis, 1, true, TAG_GHOST_AXIS[axis], &send_right)?
            .unwrap_or_else(|| send_left.clone());
        self.unpack_slab(axis, match axis {
            0 => nx - g,
            1 => ny - g,
            _ => nz - g,
        }, &recv_from_right);

        let recv_from_left = exchange_slab(topo, axis, -1, true, TAG_GHOST_AXIS[axis], &send_left)?
            .unwrap_or_else(|| send_right.clone());
        self.unpack_slab(axis, 0, &recv_from_left);
        Ok(())
    }

    /// First half of the split open-boundary (Mur) correction, applied
    /// before the first half-B advance of the step.
    pub fn open_boundaries_e1(&mut self) {
        self.open_boundaries_e_half();
    }

    /// Second half, applied after the second half-B advance.
    pub fn open_boundaries_e2(&mut self) {
        self.open_boundaries_e_half();
    }

    fn open_boundaries_e_half(&mut self) {
        let g = self.ghost;
        let (nx, ny, nz) = self.dims();
        for axis in 0..3 {
            if !self.active[axis] || self.boundary[axis] != BoundaryKind::Open {
                continue;
            }
            let c = 1.0;
            match axis {
                0 => {
                    for j in 0..ny {
                        for k in 0..nz {
                            let lo_interior = self.e1[(g, j, k)];
                            let lo_b = self.b2[(g, j, k)];
                            self.e1[(g - 1, j, k)] = 0.5 * (lo_interior - c * lo_b) + 0.5 * self.e1[(g - 1, j, k)];
                            let hi = nx - g - 1;
                            let hi_interior = self.e1[(hi, j, k)];
                            let hi_b = self.b2[(hi, j, k)];
                            self.e1[(hi + 1, j, k)] =
                                0.5 * (hi_interior + c * hi_b) + 0.5 * self.e1[(hi + 1, j, k)];
                        }
                    }
                }
                1 => {
                    for i in 0..nx {
                        for k in 0..nz {
                            let lo_interior = self.e0[(i, g, k)];
                            let lo_b = self.b2[(i, g, k)];
                            self.e0[(i, g - 1, k)] = 0.5 * (lo_interior + c * lo_b) + 0.5 * self.e0[(i, g - 1, k)];
                            let hi = ny - g - 1;
                            let hi_interior = self.e0[(i, hi, k)];
                            let hi_b = self.b2[(i, hi, k)];
                            self.e0[(i, hi + 1, k)] =
                                0.5 * (hi_interior - c * hi_b) + 0.5 * self.e0[(i, hi + 1, k)];
                        }
                    }
                }
                _ => {
                    for i in 0..nx {
                        for j in 0..ny {
                            let lo_interior = self.e0[(i, j, g)];
                            let lo_b = self.b1[(i, j, g)];
                            self.e0[(i, j, g - 1)] = 0.5 * (lo_interior - c * lo_b) + 0.5 * self.e0[(i, j, g - 1)];
                            let hi = nz - g - 1;
                            let hi_interior = self.e0[(i, j, hi)];
                            let hi_b = self.b1[(i, j, hi)];
                            self.e0[(i, j, hi + 1)] =
                                0.5 * (hi_interior + c * hi_b) + 0.5 * self.e0[(i, j, hi + 1)];
                        }
                    }
                }
            }
        }
    }

    /// Matching absorbing condition applied to `B` between the two `E`
    /// open-boundary halves.
    pub fn open_boundaries_b(&mut self) {
        let g = self.ghost;
        let (nx, ny, nz) = self.dims();
        for axis in 0..3 {
            if !self.active[axis] || self.boundary[axis] != BoundaryKind::Open {
                continue;
            }
            match axis {
                0 => {
                    for j in 0..ny {
                        for k in 0..nz {
                            self.b2[(g - 1, j, k)] = self.b2[(g, j, k)];
                            self.b2[(nx - g, j, k)] = self.b2[(nx - g - 1, j, k)];
                        }
                    }
                }
                1 => {
                    for i in 0..nx {
                        for k in 0..nz {
                            self.b2[(i, g - 1, k)] = self.b2[(i, g, k)];
                            self.b2[(i, ny - g, k)] = self.b2[(i, ny - g - 1, k)];
                        }
                    }
                }
                _ => {
                    for i in 0..nx {
                        for j in 0..ny {
                            self.b1[(i, j, g - 1)] = self.b1[(i, j, g)];
                            self.b1[(i, j, nz - g)] = self.b1[(i, j, nz - g - 1)];
                        }
                    }
                }
            }
        }
    }

    /// Adds an analytic pulse pattern at `t=0`, superposing onto any fields
    /// already present.
    pub fn add_pulse(&mut self, grid: &Grid, spec: &PulseSpec) {
        pulse::add_pulse(self, grid, spec);
    }

    /// Shifts every array one cell toward `-x` (trailing face), zero-filling
    /// the newly exposed leading cell, for the moving-window frame shift.
    pub fn move_window(&mut self) {
        let (nx, _ny, _nz) = self.dims();
        for a in [
            &mut self.e0, &mut self.e1, &mut self.e2, &mut self.b0, &mut self.b1, &mut self.b2,
        ] {
            for i in 0..nx - 1 {
                let (lo, hi) = a.view_mut().split_at(ndarray::Axis(0), i + 1);
                let shifted = hi.index_axis(ndarray::Axis(0), 0).to_owned();
                lo.index_axis_mut(ndarray::Axis(0), i).assign(&shifted);
            }
            a.index_axis_mut(ndarray::Axis(0), nx - 1).fill(0.0);
        }
    }

    pub fn dump(&self, writer: &mut impl Write) -> Result<()> {
        for a in [
            &self.e0, &self.e1, &self.e2, &self.b0, &self.b1, &self.b2,
        ] {
            for v in a.iter() {
                writer
                    .write_all(&v.to_le_bytes())
                    .chain_err(|| "short write while dumping field checkpoint")?;
            }
        }
        Ok(())
    }

    pub fn reload(&mut self, reader: &mut impl Read) -> Result<()> {
        let mut arrays = [
            &mut self.e0, &mut self.e1, &mut self.e2, &mut self.b0, &mut self.b1, &mut self.b2,
        ];
        let mut buf = [0u8; 8];
        for a in arrays.iter_mut() {
            for v in a.iter_mut() {
                reader
                    .read_exact(&mut buf)
                    .chain_err(|| "short read while reloading field checkpoint")?;
                *v = Float::from_le_bytes(buf);
            }
        }
        Ok(())
    }

    pub fn ghost(&self) -> usize {
        self.ghost
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        self.dims()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::local::LocalTopology;
    use crate::grid::{BoundaryKind, Dim};

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
    fn zero_field_stays_zero_under_fdtd() {
        let grid = sample_grid();
        let mut field = Field::allocate(&grid).unwrap();
        let current = Current::allocate(&grid).unwrap();
        field.half_advance_b(grid.dt);
        field.advance_e(&current, grid.dt);
        field.half_advance_b(grid.dt);
        assert!(field.e0.iter().all(|&v| v == 0.0));
        assert!(field.b0.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn ghost_exchange_round_trips_on_single_rank_pbc() {
        use std::thread;
        let topos = LocalTopology::spawn_mesh([1, 1, 1]);
        let handles: Vec<_> = topos
            .into_iter()
            .map(|t| {
                thread::spawn(move || {
                    let grid = sample_grid();
                    let mut field = Field::allocate(&grid).unwrap();
                    field.e0.fill(3.0);
                    field.boundary_conditions(&t).unwrap();
                    assert!(field.e0.iter().all(|&v| v == 3.0));
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
    }
}
