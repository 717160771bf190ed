//! A particle parked just past rank 0's local boundary must appear on rank
//! 1's species with identical momentum, weight and marker after exactly one
//! `migrate` call on the crossed axis.

use relpic::domain::local::LocalTopology;
use relpic::domain::Topology;
use relpic::grid::{BoundaryKind, Dim, Grid};
use relpic::species::{ParticleType, Species};
use std::thread;

fn rank_coords(rank: usize, dims: [usize; 3]) -> [usize; 3] {
    let x = rank % dims[0];
    let y = (rank / dims[0]) % dims[1];
    let z = rank / (dims[0] * dims[1]);
    [x, y, z]
}

fn build_grid(rank: usize, dims: [usize; 3]) -> Grid {
    let mut g = Grid::new(Dim::One);
    g.set_range(0, 0.0, 10.0).unwrap();
    g.set_range(1, 0.0, 1.0).unwrap();
    g.set_range(2, 0.0, 1.0).unwrap();
    g.set_nprocs(0, dims[0]).unwrap();
    g.set_ncells(10, 1, 1).unwrap();
    g.set_boundaries([BoundaryKind::Pbc, BoundaryKind::Pbc, BoundaryKind::Pbc]);
    g.set_courant(0.9).unwrap();
    g.set_rank_coords(rank_coords(rank, dims));
    g.finalize().unwrap();
    g
}

#[test]
fn particle_crossing_rank_boundary_arrives_on_neighbor_after_one_migrate() {
    let dims = [2, 1, 1];
    let topos = LocalTopology::spawn_mesh(dims);

    let handles: Vec<_> = topos
        .into_iter()
        .map(|topo| {
            thread::spawn(move || {
                let rank = topo.rank();
                let grid = build_grid(rank, dims);
                let mut species = Species::new("e", ParticleType::Electron);

                if rank == 0 {
                    let hi_local = grid.axis(0).hi_local;
                    species.r0.push(hi_local + 0.1);
                    species.r1.push(0.5);
                    species.r2.push(0.5);
                    species.u0.push(0.3);
                    species.u1.push(-0.2);
                    species.u2.push(0.1);
                    species.w.push(0.75);
                    species.marker.push(99);
                }

                species.migrate(&grid, &topo, 0).unwrap();

                if rank == 0 {
                    assert!(species.is_empty(), "particle should have left rank 0");
                } else {
                    assert_eq!(species.len(), 1);
                    assert!((species.u0[0] - 0.3).abs() < 1e-12);
                    assert!((species.u1[0] - (-0.2)).abs() < 1e-12);
                    assert!((species.u2[0] - 0.1).abs() < 1e-12);
                    assert!((species.w[0] - 0.75).abs() < 1e-12);
                    assert_eq!(species.marker[0], 99);
                    let lo_local = grid.axis(0).lo_local;
                    let hi_local = grid.axis(0).hi_local;
                    assert!(species.r0[0] >= lo_local && species.r0[0] < hi_local);
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }
}
