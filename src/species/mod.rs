//! A homogeneous collection of relativistic macro-particles: creation from a
//! plasma density profile, the Boris push, current deposition, inter-rank
//! migration and momentum initialization.

pub mod density;
pub mod deposit;
pub mod migrate;
pub mod momenta;
pub mod push;

pub use density::DensityProfile;
pub use momenta::MomentumDistribution;

use crate::constants::PROTON_ELECTRON_MASS_RATIO;
use crate::error::ResultExt;
use crate::grid::Grid;
use crate::rng::UniformDraw;
use crate::{Float, Result};
use std::io::{Read, Write};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParticleType {
    Electron,
    Positron,
    Ion { z: Float, a: Float },
}

impl ParticleType {
    pub fn charge_to_mass(self) -> Float {
        match self {
            ParticleType::Electron => -1.0,
            ParticleType::Positron => 1.0,
            ParticleType::Ion { z, a } => z / (PROTON_ELECTRON_MASS_RATIO * a),
        }
    }

    pub fn mass(self) -> Float {
        match self {
            ParticleType::Electron | ParticleType::Positron => 1.0,
            ParticleType::Ion { a, .. } => PROTON_ELECTRON_MASS_RATIO * a,
        }
    }

    pub fn charge(self) -> Float {
        self.charge_to_mass() * self.mass()
    }
}

/// Struct-of-arrays macro-particle storage: one contiguous allocation per
/// component for push/deposit cache behaviour, grown geometrically as
/// particles are appended.
pub struct Species {
    pub name: String,
    pub particle_type: ParticleType,
    pub test_species: bool,
    pub radiation_reaction: bool,
    pub laser_lambda0: Float,

    pub r0: Vec<Float>,
    pub r1: Vec<Float>,
    pub r2: Vec<Float>,
    pub u0: Vec<Float>,
    pub u1: Vec<Float>,
    pub u2: Vec<Float>,
    /// Statistical weight; for a test species this slot instead holds the
    /// particle's global marker id reinterpreted as a float.
    pub w: Vec<Float>,
    pub marker: Vec<i64>,
}

impl Species {
    pub fn new(name: impl Into<String>, particle_type: ParticleType) -> Self {
        Species {
            name: name.into(),
            particle_type,
            test_species: false,
            radiation_reaction: false,
            laser_lambda0: 0.8e-6,
            r0: Vec::new(),
            r1: Vec::new(),
            r2: Vec::new(),
            u0: Vec::new(),
            u1: Vec::new(),
            u2: Vec::new(),
            w: Vec::new(),
            marker: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.r0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.r0.is_empty()
    }

    /// Drops every particle that has fallen behind `lo` on `axis`, used by
    /// the moving-window frame shift to clear particles left outside the
    /// translated domain.
    pub fn drop_behind(&mut self, axis: usize, lo: Float) {
        let keep: Vec<usize> = (0..self.len())
            .filter(|&idx| {
                let coord = match axis {
                    0 => self.r0[idx],
                    1 => self.r1[idx],
                    _ => self.r2[idx],
                };
                coord >= lo
            })
            .collect();
        if keep.len() == self.len() {
            return;
        }
        let mut new_r0 = Vec::with_capacity(keep.len());
        let mut new_r1 = Vec::with_capacity(keep.len());
        let mut new_r2 = Vec::with_capacity(keep.len());
        let mut new_u0 = Vec::with_capacity(keep.len());
        let mut new_u1 = Vec::with_capacity(keep.len());
        let mut new_u2 = Vec::with_capacity(keep.len());
        let mut new_w = Vec::with_capacity(keep.len());
        let mut new_marker = Vec::with_capacity(keep.len());
        for idx in keep {
            new_r0.push(self.r0[idx]);
            new_r1.push(self.r1[idx]);
            new_r2.push(self.r2[idx]);
            new_u0.push(self.u0[idx]);
            new_u1.push(self.u1[idx]);
            new_u2.push(self.u2[idx]);
            new_w.push(self.w[idx]);
            new_marker.push(self.marker[idx]);
        }
        self.r0 = new_r0;
        self.r1 = new_r1;
        self.r2 = new_r2;
        self.u0 = new_u0;
        self.u1 = new_u1;
        self.u2 = new_u2;
        self.w = new_w;
        self.marker = new_marker;
    }

    fn push_particle(&mut self, r: [Float; 3], u: [Float; 3], w: Float, marker: i64) {
        self.r0.push(r[0]);
        self.r1.push(r[1]);
        self.r2.push(r[2]);
        self.u0.push(u[0]);
        self.u1.push(u[1]);
        self.u2.push(u[2]);
        self.w.push(w);
        self.marker.push(marker);
    }

    fn swap_remove(&mut self, idx: usize) {
        self.r0.swap_remove(idx);
        self.r1.swap_remove(idx);
        self.r2.swap_remove(idx);
        self.u0.swap_remove(idx);
        self.u1.swap_remove(idx);
        self.u2.swap_remove(idx);
        self.w.swap_remove(idx);
        self.marker.swap_remove(idx);
    }

    /// Creates particles by scanning every local cell whose centre lies in
    /// the intersection of `r_min..r_max` with this rank's sub-box, laying
    /// `ppc` sub-particles on a regular grid of cell-fraction offsets per
    /// cell, exactly as spec.md §4.4.1 describes. `last_marker` is the
    /// highest global id already assigned across all ranks (the caller
    /// supplies the inclusive prefix sum from the previous creation call).
    pub fn create_from_profile(
        &mut self,
        grid: &Grid,
        profile: &dyn DensityProfile,
        r_min: [Float; 3],
        r_max: [Float; 3],
        ppc: [usize; 3],
        rank: usize,
        counts_per_rank: &[i64],
        last_marker: i64,
    ) -> Result<usize> {
        let Some((lo, hi)) = grid.clip_box_to_local_subdomain(r_min, r_max) else {
            return Ok(0);
        };

        let axes = grid.axes_geometry();
        let mut created = Vec::new();

        for i in 0..axes[0].ncells_local {
            let cx = axes[0].cell_center(i);
            if cx < lo[0] || cx >= hi[0] {
                continue;
            }
            for j in 0..axes[1].ncells_local {
                let cy = axes[1].cell_center(j);
                if cy < lo[1] || cy >= hi[1] {
                    continue;
                }
                for k in 0..axes[2].ncells_local {
                    let cz = axes[2].cell_center(k);
                    if cz < lo[2] || cz >= hi[2] {
                        continue;
                    }

                    for pi in 0..ppc[0] {
                        for pj in 0..ppc[1] {
                            for pk in 0..ppc[2] {
                                let frac = [
                                    (pi as Float + 0.5) / ppc[0] as Float - 0.5,
                                    (pj as Float + 0.5) / ppc[1] as Float - 0.5,
                                    (pk as Float + 0.5) / ppc[2] as Float - 0.5,
                                ];

                                let chi0 = axes[0].cell_center_chi(i) + frac[0] * axes[0].dchi;
                                let chi1 = axes[1].cell_center_chi(j) + frac[1] * axes[1].dchi;
                                let chi2 = axes[2].cell_center_chi(k) + frac[2] * axes[2].dchi;

                                let x = axes[0].stretch(chi0);
                                let y = axes[1].stretch(chi1);
                                let z = axes[2].stretch(chi2);

                                let mut w = profile.density(x, y, z)
                                    / (ppc[0] * ppc[1] * ppc[2]) as Float;
                                // physical number density is preserved on a
                                // stretched axis by weighting with dchi/dx.
                                w *= axes[0].d_stretch(chi0).recip();
                                w *= axes[1].d_stretch(chi1).recip();
                                w *= axes[2].d_stretch(chi2).recip();

                                if w > 0.0 {
                                    created.push(([x, y, z], w));
                                }
                            }
                        }
                    }
                }
            }
        }

        let base_marker = last_marker + counts_per_rank[..rank].iter().sum::<i64>();
        let n_created = created.len();
        for (idx, (r, w)) in created.into_iter().enumerate() {
            let marker = base_marker + idx as i64 + 1;
            let u = [0.0, 0.0, 0.0];
            let w_or_marker = if self.test_species { marker as Float } else { w };
            self.push_particle(r, u, w_or_marker, marker);
        }

        log::info!(
            "species `{}`: created {} particles on rank {}",
            self.name,
            n_created,
            rank
        );
        Ok(n_created)
    }

    /// Alternate creator: reads a 1-D `(x, n, u0, u1, u2)` table and linearly
    /// interpolates density and momenta onto every particle created on a
    /// regular grid along x (transverse position drawn uniformly in the
    /// local box).
    pub fn create_from_table(
        &mut self,
        grid: &Grid,
        table: &density::Table,
        r_min: [Float; 3],
        r_max: [Float; 3],
        ppc: [usize; 3],
        rng: &mut impl UniformDraw,
        last_marker: i64,
    ) -> Result<usize> {
        let Some((lo, hi)) = grid.clip_box_to_local_subdomain(r_min, r_max) else {
            return Ok(0);
        };
        let axes = grid.axes_geometry();
        let mut created = Vec::new();

        for i in 0..axes[0].ncells_local {
            let x = axes[0].cell_center(i);
            if x < lo[0] || x >= hi[0] {
                continue;
            }
            let (n, u_drift) = table.sample(x);
            for _pj in 0..ppc[1].max(1) {
                for _pk in 0..ppc[2].max(1) {
                    let y = rng.uniform_range(lo[1], hi[1]);
                    let z = rng.uniform_range(lo[2], hi[2]);
                    let w = n / (ppc[0] * ppc[1].max(1) * ppc[2].max(1)) as Float;
                    if w > 0.0 {
                        created.push(([x, y, z], u_drift, w));
                    }
                }
            }
        }

        let n_created = created.len();
        for (idx, (r, u, w)) in created.into_iter().enumerate() {
            let marker = last_marker + idx as i64 + 1;
            self.push_particle(r, u, w, marker);
        }
        Ok(n_created)
    }

    /// Local min/max of `|p|` and `gamma`, for diagnostics collaborators to
    /// read (the core performs no file I/O itself).
    pub fn momentum_extrema(&self) -> Option<(Float, Float, Float, Float)> {
        if self.is_empty() {
            return None;
        }
        let mut p_min = Float::INFINITY;
        let mut p_max = 0.0;
        let mut g_min = Float::INFINITY;
        let mut g_max = 0.0;
        for idx in 0..self.len() {
            let p = (self.u0[idx].powi(2) + self.u1[idx].powi(2) + self.u2[idx].powi(2)).sqrt();
            let gamma = (1.0 + p * p).sqrt();
            p_min = p_min.min(p);
            p_max = p_max.max(p);
            g_min = g_min.min(gamma);
            g_max = g_max.max(gamma);
        }
        Some((p_min, p_max, g_min, g_max))
    }

    pub fn dump(&self, writer: &mut impl Write) -> Result<()> {
        let np = self.len() as i64;
        writer
            .write_all(&np.to_le_bytes())
            .chain_err(|| "short write of particle count")?;
        for idx in 0..self.len() {
            for v in [
                self.r0[idx],
                self.r1[idx],
                self.r2[idx],
                self.u0[idx],
                self.u1[idx],
                self.u2[idx],
                self.w[idx],
            ] {
                writer
                    .write_all(&v.to_le_bytes())
                    .chain_err(|| "short write of particle record")?;
            }
        }
        Ok(())
    }

    pub fn reload(&mut self, reader: &mut impl Read) -> Result<()> {
        self.r0.clear();
        self.r1.clear();
        self.r2.clear();
        self.u0.clear();
        self.u1.clear();
        self.u2.clear();
        self.w.clear();
        self.marker.clear();

        let mut buf8 = [0u8; 8];
        reader
            .read_exact(&mut buf8)
            .chain_err(|| "short read of particle count")?;
        let np = i64::from_le_bytes(buf8);

        for idx in 0..np {
            let mut comps = [0.0 as Float; 7];
            for c in comps.iter_mut() {
                reader
                    .read_exact(&mut buf8)
                    .chain_err(|| "short read of particle record")?;
                *c = Float::from_le_bytes(buf8);
            }
            self.push_particle(
                [comps[0], comps[1], comps[2]],
                [comps[3], comps[4], comps[5]],
                comps[6],
                idx,
            );
        }
        Ok(())
    }
}
