//! Current and charge density arrays: the three deposited current
//! components and a diagnostic density, sharing the Yee staggering of the
//! `E` field they drive.

use crate::domain::{exchange_slab, Topology};
use crate::error::ResultExt;
use crate::grid::{BoundaryKind, Grid};
use crate::{Float, Result};
use ndarray::Array3;

const TAG_CURRENT_AXIS: [u32; 3] = [200, 201, 202];

pub struct Current {
    pub jx: Array3<Float>,
    pub jy: Array3<Float>,
    pub jz: Array3<Float>,
    pub rho: Array3<Float>,
    ghost: usize,
    active: [bool; 3],
    boundary: [BoundaryKind; 3],
}

impl Current {
    pub fn allocate(grid: &Grid) -> Result<Current> {
        let ghost = grid.ghost();
        let axes = grid.axes_geometry();
        let nx = axes[0].ncells_local + 2 * ghost;
        let ny = axes[1].ncells_local + 2 * ghost;
        let nz = axes[2].ncells_local + 2 * ghost;
        let zeros = || Array3::<Float>::zeros((nx, ny, nz));
        let active = match grid.dim() {
            crate::grid::Dim::One => [true, false, false],
            crate::grid::Dim::Two => [true, true, false],
            crate::grid::Dim::Three => [true, true, true],
        };
        Ok(Current {
            jx: zeros(),
            jy: zeros(),
            jz: zeros(),
            rho: zeros(),
            ghost,
            active,
            boundary: [axes[0].boundary, axes[1].boundary, axes[2].boundary],
        })
    }

    pub fn zero(&mut self) {
        self.jx.fill(0.0);
        self.jy.fill(0.0);
        self.jz.fill(0.0);
        self.rho.fill(0.0);
    }

    pub fn jx(&self, i: usize, j: usize, k: usize) -> Float {
        self.jx[(i, j, k)]
    }

    pub fn jy(&self, i: usize, j: usize, k: usize) -> Float {
        self.jy[(i, j, k)]
    }

    pub fn jz(&self, i: usize, j: usize, k: usize) -> Float {
        self.jz[(i, j, k)]
    }

    pub fn density(&self, i: usize, j: usize, k: usize) -> Float {
        self.rho[(i, j, k)]
    }

    pub fn ghost(&self) -> usize {
        self.ghost
    }

    /// Folds every ghost-slab deposit back into the owning interior cell
    /// across PBC neighbours, then zeroes the ghost. Required for charge
    /// conservation: a particle whose support overhung into a neighbour's
    /// ghost still needs its contribution counted exactly once, in the
    /// interior cell that really owns it.
    pub fn pbc(&mut self, topo: &dyn Topology) -> Result<()> {
        for axis in 0..3 {
            if !self.active[axis] || self.boundary[axis] != BoundaryKind::Pbc {
                continue;
            }
            self.reduce_axis(topo, axis)?;
        }
        Ok(())
    }

    fn dims(&self) -> (usize, usize, usize) {
        (self.jx.dim().0, self.jx.dim().1, self.jx.dim().2)
    }

    fn pack_ghost(&self, axis: usize, start: usize) -> Vec<u8> {
        let g = self.ghost;
        let (nx, ny, nz) = self.dims();
        let mut bytes = Vec::new();
        for a in [&self.jx, &self.jy, &self.jz, &self.rho] {
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

    fn fold_into_interior(&mut self, axis: usize, ghost_start: usize, interior_start: usize, bytes: &[u8]) {
        let g = self.ghost;
        let (nx, ny, nz) = self.dims();
        let mut cursor = 0usize;
        let mut read = |bytes: &[u8], cursor: &mut usize| -> Float {
            let v = Float::from_le_bytes(bytes[*cursor..*cursor + 8].try_into().unwrap());
            *cursor += 8;
            v
        };
        let mut arrays = [&mut self.jx, &mut self.jy, &mut self.jz, &mut self.rho];
        for a in arrays.iter_mut() {
            match axis {
                0 => {
                    for di in 0..g {
                        for j in 0..ny {
                            for k in 0..nz {
                                let incoming = read(bytes, &mut cursor);
                                a[(interior_start + di, j, k)] += incoming;
                                a[(ghost_start + di, j, k)] = 0.0;
                            }
                        }
                    }
                }
                1 => {
                    for i in 0..nx {
                        for dj in 0..g {
                            for k in 0..nz {
                                let incoming = read(bytes, &mut cursor);
                                a[(i, interior_start + dj, k)] += incoming;
                                a[(i, ghost_start + dj, k)] = 0.0;
                            }
                        }
                    }
                }
                _ => {
                    for i in 0..nx {
                        for j in 0..ny {
                            for dk in 0..g {
                                let incoming = read(bytes, &mut cursor);
                                a[(i, j, interior_start + dk)] += incoming;
                                a[(i, j, ghost_start + dk)] = 0.0;
                            }
                        }
                    }
                }
            }
        }
    }

    /// On an axis with a single rank, there is no peer to fold ghost deposits
    /// into: the rank is its own periodic neighbour, so a ghost slab's
    /// deposit rightfully belongs to this rank's own opposite-face interior
    /// slab (the low ghost wraps onto the high interior and vice versa), and
    /// is folded in place instead of exchanged.
    fn reduce_axis(&mut self, topo: &dyn Topology, axis: usize) -> Result<()> {
        let g = self.ghost;
        let (nx, ny, nz) = self.dims();
        let n = match axis {
            0 => nx,
            1 => ny,
            _ => nz,
        };

        // Send this rank's low ghost slab (accumulated from the left
        // neighbour's particles) to the left neighbour, who folds it into
        // its own rightmost interior slab; and symmetrically for the high
        // ghost slab to the right neighbour.
        let send_low = self.pack_ghost(axis, 0);
        match exchange_slab(topo, axis, -1, true, TAG_CURRENT_AXIS[axis], &send_low)? {
            Some(incoming) => self.fold_into_interior(axis, n - g, n - 2 * g, &incoming),
            None => self.fold_into_interior(axis, 0, n - 2 * g, &send_low),
        }

        let send_high = self.pack_ghost(axis, n - g);
        match exchange_slab(topo, axis, 1, true, TAG_CURRENT_AXIS[axis], &send_high)? {
            Some(incoming) => self.fold_into_interior(axis, 0, g, &incoming),
            None => self.fold_into_interior(axis, n - g, g, &send_high),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Dim;

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
    fn zero_clears_all_arrays() {
        let grid = sample_grid();
        let mut current = Current::allocate(&grid).unwrap();
        current.jx.fill(1.0);
        current.zero();
        assert!(current.jx.iter().all(|&v| v == 0.0));
    }
}
