//! Adding the same pulse spec twice must produce exactly 2x the single-add
//! fields, since `add_pulse` only ever superposes additively.

use relpic::field::{Field, PulseSpec};
use relpic::field::pulse::{Polarization, PulseKind};
use relpic::grid::{BoundaryKind, Dim, Grid};

fn sample_grid() -> Grid {
    let mut g = Grid::new(Dim::Two);
    g.set_range(0, -5.0, 5.0).unwrap();
    g.set_range(1, -5.0, 5.0).unwrap();
    g.set_range(2, 0.0, 1.0).unwrap();
    g.set_ncells(64, 64, 1).unwrap();
    g.set_boundaries([BoundaryKind::Open, BoundaryKind::Open, BoundaryKind::Pbc]);
    g.set_courant(0.9).unwrap();
    g.finalize().unwrap();
    g
}

fn sample_pulse() -> PulseSpec {
    PulseSpec {
        kind: PulseKind::Gaussian,
        polarization: Polarization::Circular,
        lambda0: 0.8,
        amplitude: 1.0,
        t_fwhm: 2.0,
        waist: 1.5,
        focus_position: 0.0,
        initial_position: -2.0,
        rotation_angle: 0.0,
        rotation_flag: false,
    }
}

#[test]
fn double_add_is_exactly_twice_single_add() {
    let grid = sample_grid();
    let spec = sample_pulse();

    let mut once = Field::allocate(&grid).unwrap();
    once.add_pulse(&grid, &spec);

    let mut twice = Field::allocate(&grid).unwrap();
    twice.add_pulse(&grid, &spec);
    twice.add_pulse(&grid, &spec);

    for (a, b) in once.e1.iter().zip(twice.e1.iter()) {
        assert!((2.0 * a - b).abs() < 1e-9 * a.abs().max(1.0));
    }
    for (a, b) in once.b2.iter().zip(twice.b2.iter()) {
        assert!((2.0 * a - b).abs() < 1e-9 * a.abs().max(1.0));
    }
}
