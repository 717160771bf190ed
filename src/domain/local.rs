//! In-process simulator of a Cartesian rank topology, used in place of a real
//! MPI binding: each "rank" is an OS thread inside this process, talking
//! through channels instead of sockets. Point-to-point traffic uses one
//! `mpsc` channel per destination rank (shared by every possible sender);
//! messages are tagged with their source rank and an operation tag so a
//! `send_recv` call can pick its matching reply out of an otherwise
//! interleaved inbox. Collectives use a pair of reusable barriers around a
//! shared buffer: the first barrier guarantees every rank's contribution is
//! visible before any rank reads, the second prevents a fast rank from
//! overwriting the buffer for its next collective before a slow rank has
//! finished reading this one.

use super::{ReduceOp, Topology};
use crate::Result;
use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Barrier, Mutex};

type Envelope = (usize, u32, Vec<u8>);

struct CollectiveState {
    size: usize,
    enter: Barrier,
    exit: Barrier,
    gather_buf: Mutex<Vec<i64>>,
    reduce_buf: Mutex<Vec<Vec<f64>>>,
}

/// A rank's view of an in-process, thread-backed Cartesian topology.
pub struct LocalTopology {
    rank: usize,
    dims: [usize; 3],
    inboxes: Arc<Vec<Sender<Envelope>>>,
    my_rx: Mutex<Receiver<Envelope>>,
    pending: Mutex<HashMap<(usize, u32), Vec<u8>>>,
    collective: Arc<CollectiveState>,
}

fn coords_of(rank: usize, dims: [usize; 3]) -> [usize; 3] {
    let x = rank % dims[0];
    let y = (rank / dims[0]) % dims[1];
    let z = rank / (dims[0] * dims[1]);
    [x, y, z]
}

fn rank_of(coords: [usize; 3], dims: [usize; 3]) -> usize {
    coords[0] + dims[0] * (coords[1] + dims[1] * coords[2])
}

impl LocalTopology {
    /// Builds `Px*Py*Pz` linked topology handles, one per simulated rank.
    /// Hand one handle to each worker thread the driver spawns.
    pub fn spawn_mesh(dims: [usize; 3]) -> Vec<LocalTopology> {
        let size = dims[0] * dims[1] * dims[2];
        let mut senders = Vec::with_capacity(size);
        let mut receivers = Vec::with_capacity(size);
        for _ in 0..size {
            let (tx, rx) = mpsc::channel();
            senders.push(tx);
            receivers.push(rx);
        }
        let inboxes = Arc::new(senders);
        let collective = Arc::new(CollectiveState {
            size,
            enter: Barrier::new(size),
            exit: Barrier::new(size),
            gather_buf: Mutex::new(vec![0; size]),
            reduce_buf: Mutex::new(vec![Vec::new(); size]),
        });

        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, rx)| LocalTopology {
                rank,
                dims,
                inboxes: inboxes.clone(),
                my_rx: Mutex::new(rx),
                pending: Mutex::new(HashMap::new()),
                collective: collective.clone(),
            })
            .collect()
    }
}

impl Topology for LocalTopology {
    fn rank_coord(&self, axis: usize) -> usize {
        coords_of(self.rank, self.dims)[axis]
    }

    fn nprocs(&self, axis: usize) -> usize {
        self.dims[axis]
    }

    fn neighbor(&self, axis: usize, direction: i32, periodic: bool) -> Option<usize> {
        let mut coords = coords_of(self.rank, self.dims);
        let n = self.dims[axis] as i32;
        let next = coords[axis] as i32 + direction;
        if next < 0 || next >= n {
            if !periodic || n == 1 {
                return None;
            }
            coords[axis] = next.rem_euclid(n) as usize;
        } else {
            coords[axis] = next as usize;
        }
        Some(rank_of(coords, self.dims))
    }

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    fn send_recv(&self, peer: usize, tag: u32, out: &[u8]) -> Result<Vec<u8>> {
        self.inboxes[peer]
            .send((self.rank, tag, out.to_vec()))
            .map_err(|_| -> crate::Error { "peer rank inbox closed".into() })?;

        let key = (peer, tag);
        {
            let mut pending = self.pending.lock().unwrap();
            if let Some(payload) = pending.remove(&key) {
                return Ok(payload);
            }
        }

        let rx = self.my_rx.lock().unwrap();
        loop {
            let (src, recv_tag, payload) = rx
                .recv()
                .map_err(|_| -> crate::Error { "inbox sender disconnected".into() })?;
            if (src, recv_tag) == key {
                return Ok(payload);
            }
            self.pending.lock().unwrap().insert((src, recv_tag), payload);
        }
    }

    fn all_gather_i64(&self, value: i64) -> Result<Vec<i64>> {
        {
            let mut buf = self.collective.gather_buf.lock().unwrap();
            buf[self.rank] = value;
        }
        self.collective.enter.wait();
        let result = self.collective.gather_buf.lock().unwrap().clone();
        self.collective.exit.wait();
        Ok(result)
    }

    fn all_reduce_f64(&self, values: &[f64], op: ReduceOp) -> Result<Vec<f64>> {
        {
            let mut buf = self.collective.reduce_buf.lock().unwrap();
            buf[self.rank] = values.to_vec();
        }
        self.collective.enter.wait();
        let reduced = {
            let buf = self.collective.reduce_buf.lock().unwrap();
            let len = values.len();
            let init = match op {
                ReduceOp::Min => f64::INFINITY,
                ReduceOp::Max => f64::NEG_INFINITY,
                ReduceOp::Sum => 0.0,
            };
            let mut acc = vec![init; len];
            for contribution in buf.iter() {
                for i in 0..len {
                    acc[i] = match op {
                        ReduceOp::Min => acc[i].min(contribution[i]),
                        ReduceOp::Max => acc[i].max(contribution[i]),
                        ReduceOp::Sum => acc[i] + contribution[i],
                    };
                }
            }
            acc
        };
        self.collective.exit.wait();
        let _ = self.collective.size;
        Ok(reduced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn ring_send_recv_exchanges_payloads() {
        let topos = LocalTopology::spawn_mesh([2, 1, 1]);
        let handles: Vec<_> = topos
            .into_iter()
            .map(|t| {
                thread::spawn(move || {
                    let peer = t.neighbor(0, 1, true).unwrap();
                    let payload = vec![t.rank() as u8; 4];
                    let got = t.send_recv(peer, 7, &payload).unwrap();
                    assert_eq!(got, vec![peer as u8; 4]);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn all_gather_collects_every_rank() {
        let topos = LocalTopology::spawn_mesh([4, 1, 1]);
        let handles: Vec<_> = topos
            .into_iter()
            .map(|t| {
                thread::spawn(move || {
                    let gathered = t.all_gather_i64(t.rank() as i64).unwrap();
                    assert_eq!(gathered, vec![0, 1, 2, 3]);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn all_reduce_sum_matches_expected() {
        let topos = LocalTopology::spawn_mesh([3, 1, 1]);
        let handles: Vec<_> = topos
            .into_iter()
            .map(|t| {
                thread::spawn(move || {
                    let sum = t
                        .all_reduce_f64(&[1.0, 2.0], ReduceOp::Sum)
                        .unwrap();
                    assert_eq!(sum, vec![3.0, 6.0]);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
    }
}
