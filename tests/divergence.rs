//! The Esirkepov scheme deposits current so that it satisfies the discrete
//! continuity equation exactly; stepping `advance_e` against that current
//! should therefore keep the discrete divergence of E bounded rather than
//! let it drift away over many steps, regardless of how it was seeded.

use relpic::current::Current;
use relpic::domain::local::LocalTopology;
use relpic::field::Field;
use relpic::grid::{BoundaryKind, Dim, Grid};
use relpic::species::deposit::DepositionKind;
use relpic::species::{ParticleType, Species};

fn sample_grid() -> Grid {
    let mut g = Grid::new(Dim::Two);
    g.set_range(0, -5.0, 5.0).unwrap();
    g.set_range(1, -5.0, 5.0).unwrap();
    g.set_range(2, 0.0, 1.0).unwrap();
    g.set_ncells(48, 48, 1).unwrap();
    g.set_boundaries([BoundaryKind::Pbc, BoundaryKind::Pbc, BoundaryKind::Pbc]);
    g.set_courant(0.9).unwrap();
    g.finalize().unwrap();
    g
}

/// Backward-difference divergence of E at cell (i, j, k), the same
/// differencing convention `advance_e` already uses for its curl-B terms.
fn max_abs_divergence(field: &Field, grid: &Grid) -> relpic::Float {
    let (nx, ny, nz) = field.shape();
    let g = grid.ghost();
    let axes = grid.axes_geometry();
    let dx = axes[0].dchi;
    let dy = axes[1].dchi;
    let mut worst: relpic::Float = 0.0;
    for i in g..nx - g {
        for j in g..ny - g {
            for k in g..nz - g {
                let dex = (field.e0[(i, j, k)] - field.e0[(i - 1, j, k)]) / dx;
                let dey = (field.e1[(i, j, k)] - field.e1[(i, j - 1, k)]) / dy;
                let div = dex + dey;
                worst = worst.max(div.abs());
            }
        }
    }
    worst
}

#[test]
fn divergence_of_e_stays_bounded_under_repeated_deposition() {
    let grid = sample_grid();
    let mut field = Field::allocate(&grid).unwrap();
    let mut current = Current::allocate(&grid).unwrap();
    let topos = LocalTopology::spawn_mesh([1, 1, 1]);
    let topo = &topos[0];

    let mut electron = Species::new("drifting_e", ParticleType::Electron);
    electron.r0.push(0.3);
    electron.r1.push(-1.7);
    electron.r2.push(0.5);
    electron.u0.push(0.6);
    electron.u1.push(0.2);
    electron.u2.push(0.0);
    electron.w.push(1.0);
    electron.marker.push(1);

    let dt = grid.dt;
    let nsteps = 300;
    let mut divergences = Vec::with_capacity(nsteps);

    for _ in 0..nsteps {
        current.zero();
        electron.deposit_and_advance(&mut current, &grid, dt, DepositionKind::Esirkepov);
        current.pbc(topo).unwrap();
        field.advance_e(&current, dt);
        field.boundary_conditions(topo).unwrap();
        divergences.push(max_abs_divergence(&field, &grid));
    }

    let peak = divergences.iter().cloned().fold(0.0, relpic::Float::max);
    assert!(peak < 10.0, "divergence of E grew unreasonably large: {peak}");

    let first_half_peak = divergences[..nsteps / 2]
        .iter()
        .cloned()
        .fold(0.0, relpic::Float::max);
    let second_half_peak = divergences[nsteps / 2..]
        .iter()
        .cloned()
        .fold(0.0, relpic::Float::max);
    assert!(
        second_half_peak <= first_half_peak * 2.0 + 1e-9,
        "divergence grew across the run: first half peak {first_half_peak}, second half peak {second_half_peak}"
    );
}
