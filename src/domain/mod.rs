//! Rank topology abstraction: neighbour lookup, paired send/receive, and the
//! two collectives the core needs (all-gather of small int vectors, all-reduce
//! of small float vectors). Ghost-cell exchange for a field array is built
//! out of these primitives rather than specialised per-field.

pub mod local;

use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    Min,
    Max,
    Sum,
}

/// A Cartesian rank topology of shape (Px, Py, Pz). Implementations may back
/// this with real inter-process message passing or, as [`local::LocalTopology`]
/// does, with in-process threads — the core only relies on the confluence
/// guarantee that counts are exchanged before payloads.
pub trait Topology: Send + Sync {
    /// This rank's coordinate along `axis` in the Cartesian communicator.
    fn rank_coord(&self, axis: usize) -> usize;

    /// Number of ranks along `axis`.
    fn nprocs(&self, axis: usize) -> usize;

    /// Neighbour rank id on `axis` in the given direction (-1 or +1), or
    /// `None` if there is no neighbour (non-periodic boundary at the edge).
    fn neighbor(&self, axis: usize, direction: i32, periodic: bool) -> Option<usize>;

    /// This rank's linear id.
    fn rank(&self) -> usize;

    /// Total number of ranks.
    fn size(&self) -> usize;

    /// Sends `out` to `peer` and receives into the returned buffer from
    /// `peer`, matched by an implicit tag derived by the implementation so
    /// concurrent exchanges on different axes never cross.
    fn send_recv(&self, peer: usize, tag: u32, out: &[u8]) -> Result<Vec<u8>>;

    /// Gathers one `i64` per rank from every rank, in rank order.
    fn all_gather_i64(&self, value: i64) -> Result<Vec<i64>>;

    /// Reduces a small vector of `f64` across all ranks element-wise.
    fn all_reduce_f64(&self, values: &[f64], op: ReduceOp) -> Result<Vec<f64>>;
}

/// Packs the `g`-cell-thick outgoing slab of a 3-D array into a flat buffer,
/// exchanges it with the neighbour on `axis`/`direction`, and returns the
/// incoming slab bytes to be unpacked by the caller. Ghost exchange for any
/// field component reduces to this one call per axis per direction.
pub fn exchange_slab(
    topo: &dyn Topology,
    axis: usize,
    direction: i32,
    periodic: bool,
    tag: u32,
    outgoing: &[u8],
) -> Result<Option<Vec<u8>>> {
    match topo.neighbor(axis, direction, periodic) {
        Some(peer) => Ok(Some(topo.send_recv(peer, tag, outgoing)?)),
        None => Ok(None),
    }
}
