//! Total energy is conserved in two regimes: a pure vacuum pulse bouncing
//! around a periodic 1-D box, and a laser pulse overlapping a thin electron
//! layer where field energy and particle kinetic energy trade back and
//! forth but their sum stays flat.

use relpic::current::Current;
use relpic::field::pulse::{Polarization, PulseKind};
use relpic::field::{Field, PulseSpec};
use relpic::grid::{BoundaryKind, Dim, Grid};
use relpic::pic::{NullObserver, PicLoop};
use relpic::species::deposit::DepositionKind;
use relpic::species::density::BoxProfile;
use relpic::species::{ParticleType, Species};
use relpic::Float;

fn field_energy(field: &Field, grid: &Grid) -> Float {
    let (nx, ny, nz) = field.shape();
    let g = grid.ghost();
    let mut total = 0.0;
    for i in g..nx - g {
        for j in g..ny - g {
            for k in g..nz - g {
                total += field.e0[(i, j, k)].powi(2)
                    + field.e1[(i, j, k)].powi(2)
                    + field.e2[(i, j, k)].powi(2)
                    + field.b0[(i, j, k)].powi(2)
                    + field.b1[(i, j, k)].powi(2)
                    + field.b2[(i, j, k)].powi(2);
            }
        }
    }
    total
}

fn kinetic_energy(species: &[Species]) -> Float {
    species
        .iter()
        .map(|s| {
            let m = s.particle_type.mass();
            (0..s.len())
                .map(|i| {
                    let gamma = (1.0 + s.u0[i].powi(2) + s.u1[i].powi(2) + s.u2[i].powi(2)).sqrt();
                    s.w[i] * m * (gamma - 1.0)
                })
                .sum::<Float>()
        })
        .sum()
}

#[test]
fn vacuum_pulse_in_a_periodic_box_conserves_field_energy() {
    let mut grid = Grid::new(Dim::One);
    grid.set_range(0, -10.0, 10.0).unwrap();
    grid.set_range(1, 0.0, 1.0).unwrap();
    grid.set_range(2, 0.0, 1.0).unwrap();
    grid.set_ncells(512, 1, 1).unwrap();
    grid.set_boundaries([BoundaryKind::Pbc, BoundaryKind::Pbc, BoundaryKind::Pbc]);
    grid.set_courant(0.9).unwrap();
    grid.finalize().unwrap();

    let mut field = Field::allocate(&grid).unwrap();
    let spec = PulseSpec {
        kind: PulseKind::Cos2PlaneWave,
        polarization: Polarization::S,
        lambda0: 1.0,
        amplitude: 1.0,
        t_fwhm: 4.0,
        waist: 1.0,
        focus_position: 0.0,
        initial_position: 0.0,
        rotation_angle: 0.0,
        rotation_flag: false,
    };
    field.add_pulse(&grid, &spec);

    let current = Current::allocate(&grid).unwrap();
    let topos = relpic::domain::local::LocalTopology::spawn_mesh([1, 1, 1]);
    let topo = &topos[0];

    let mut pic = PicLoop::new(grid, field, current, vec![], DepositionKind::Esirkepov, None, None);
    let e0 = field_energy(&pic.field, &pic.grid);
    let mut observer = NullObserver;
    for _ in 0..1000 {
        pic.step(topo, 0, &mut observer).unwrap();
    }
    let e1 = field_energy(&pic.field, &pic.grid);

    let rel_drift = (e1 - e0).abs() / e0;
    assert!(rel_drift < 1e-8, "relative field energy drift {rel_drift} too large");
}

#[test]
fn laser_pulse_overlapping_electron_layer_conserves_total_energy() {
    let mut grid = Grid::new(Dim::Two);
    grid.set_range(0, -8.0, 8.0).unwrap();
    grid.set_range(1, -8.0, 8.0).unwrap();
    grid.set_range(2, 0.0, 1.0).unwrap();
    grid.set_ncells(96, 96, 1).unwrap();
    grid.set_boundaries([BoundaryKind::Open, BoundaryKind::Pbc, BoundaryKind::Pbc]);
    grid.set_courant(0.9).unwrap();
    grid.finalize().unwrap();

    let mut field = Field::allocate(&grid).unwrap();
    let spec = PulseSpec {
        kind: PulseKind::Cos2PlaneWave,
        polarization: Polarization::S,
        lambda0: 0.8,
        amplitude: 0.3,
        t_fwhm: 3.0,
        waist: 3.0,
        focus_position: 0.0,
        initial_position: -4.0,
        rotation_angle: 0.0,
        rotation_flag: false,
    };
    field.add_pulse(&grid, &spec);

    let current = Current::allocate(&grid).unwrap();

    let profile = BoxProfile {
        density: 0.05,
        r_min: [-1.0, -8.0, 0.0],
        r_max: [1.0, 8.0, 1.0],
    };
    let mut electrons = Species::new("e", ParticleType::Electron);
    let counts_per_rank = [0i64];
    electrons
        .create_from_profile(&grid, &profile, profile.r_min, profile.r_max, [4, 4, 1], 0, &counts_per_rank, 0)
        .unwrap();

    let topos = relpic::domain::local::LocalTopology::spawn_mesh([1, 1, 1]);
    let topo = &topos[0];

    let mut pic = PicLoop::new(
        grid,
        field,
        current,
        vec![electrons],
        DepositionKind::Esirkepov,
        None,
        None,
    );
    let total0 = field_energy(&pic.field, &pic.grid) + kinetic_energy(&pic.species);

    let mut observer = NullObserver;
    for _ in 0..200 {
        pic.step(topo, 0, &mut observer).unwrap();
    }
    let total1 = field_energy(&pic.field, &pic.grid) + kinetic_energy(&pic.species);

    let rel_drift = (total1 - total0).abs() / total0.max(1e-12);
    assert!(rel_drift < 0.01, "relative total energy drift {rel_drift} too large");
}
