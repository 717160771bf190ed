//! A single particle in a uniform Bz with zero E traces a closed circle and
//! keeps gamma fixed to machine precision (the Boris rotation is an exact
//! rotation in momentum space).

use relpic::current::Current;
use relpic::field::Field;
use relpic::grid::{BoundaryKind, Dim, Grid};
use relpic::species::deposit::DepositionKind;
use relpic::species::{ParticleType, Species};

fn sample_grid() -> Grid {
    let mut g = Grid::new(Dim::Two);
    g.set_range(0, -10.0, 10.0).unwrap();
    g.set_range(1, -10.0, 10.0).unwrap();
    g.set_range(2, 0.0, 1.0).unwrap();
    g.set_ncells(64, 64, 1).unwrap();
    g.set_boundaries([BoundaryKind::Pbc, BoundaryKind::Pbc, BoundaryKind::Pbc]);
    g.set_courant(0.95).unwrap();
    g.finalize().unwrap();
    g
}

#[test]
fn closed_orbit_in_uniform_bz_conserves_gamma_and_returns_home() {
    let grid = sample_grid();
    let mut field = Field::allocate(&grid).unwrap();
    field.b2.fill(1.0);
    let mut current = Current::allocate(&grid).unwrap();

    let mut electron = Species::new("test_e", ParticleType::Electron);
    electron.test_species = true;
    electron.r0.push(0.0);
    electron.r1.push(0.0);
    electron.r2.push(0.0);
    electron.u0.push(1.0);
    electron.u1.push(0.0);
    electron.u2.push(0.0);
    electron.w.push(0.0);
    electron.marker.push(1);

    let gamma0 = (1.0 + electron.u0[0].powi(2)).sqrt();
    // Relativistic cyclotron frequency: omega = |q/m| * B / gamma.
    let q_over_m = electron.particle_type.charge_to_mass().abs();
    let omega = q_over_m * 1.0 / gamma0;
    let period = 2.0 * std::f64::consts::PI as relpic::Float / omega;

    let nsteps = 2000;
    let dt = period / nsteps as relpic::Float;

    for _ in 0..nsteps {
        electron.advance_momenta(&field, &grid, dt);
        electron.deposit_and_advance(&mut current, &grid, dt, DepositionKind::Esirkepov);
    }

    let gamma_final = (1.0
        + electron.u0[0].powi(2)
        + electron.u1[0].powi(2)
        + electron.u2[0].powi(2))
    .sqrt();
    assert!((gamma_final - gamma0).abs() < 1e-10);

    assert!(electron.r0[0].abs() < 1e-3);
    assert!(electron.r1[0].abs() < 1e-3);
}
