//! Inter-rank particle migration: after current deposition, particles that
//! crossed this rank's sub-box boundary on one axis are exchanged with the
//! neighbour on that axis. Counts are exchanged before payloads so a
//! mismatch is detectable as a collective failure rather than silently
//! truncating or overrunning the incoming buffer.

use super::Species;
use crate::domain::Topology;
use crate::error::ResultExt;
use crate::grid::{BoundaryKind, Grid};
use crate::{Float, Result};

/// `r0,r1,r2,u0,u1,u2,w,marker` packed as little-endian `f64`s (the marker
/// id round-trips exactly through `f64` for any id this simulation could
/// plausibly reach).
const RECORD_FLOATS: usize = 8;
const RECORD_BYTES: usize = RECORD_FLOATS * 8;

fn encode(buf: &mut Vec<u8>, r: [Float; 3], u: [Float; 3], w: Float, marker: i64) {
    for v in [r[0], r[1], r[2], u[0], u[1], u[2], w, marker as Float] {
        buf.extend_from_slice(&v.to_le_bytes());
    }
}

fn decode_all(bytes: &[u8]) -> Vec<(Float, Float, Float, Float, Float, Float, Float, i64)> {
    let mut out = Vec::with_capacity(bytes.len() / RECORD_BYTES);
    let mut cursor = 0usize;
    while cursor + RECORD_BYTES <= bytes.len() {
        let mut comps = [0.0 as Float; RECORD_FLOATS];
        for c in comps.iter_mut() {
            *c = Float::from_le_bytes(bytes[cursor..cursor + 8].try_into().unwrap());
            cursor += 8;
        }
        out.push((
            comps[0], comps[1], comps[2], comps[3], comps[4], comps[5], comps[6],
            comps[7].round() as i64,
        ));
    }
    out
}

impl Species {
    /// Migrates particles across the boundary on a single axis. Call once
    /// per axis, in a fixed order, after current deposition.
    pub fn migrate(&mut self, grid: &Grid, topo: &dyn Topology, axis: usize) -> Result<()> {
        let axes = grid.axes_geometry();
        let ax = &axes[axis];
        let rmin = ax.lo_local;
        let rmax = ax.hi_local;
        let periodic = ax.boundary == BoundaryKind::Pbc;
        let global_len = ax.hi_global - ax.lo_global;
        let is_left_edge = ax.global_start == 0;
        let is_right_edge = ax.global_start + ax.ncells_local == ax.ncells_global;

        let left_peer = topo.neighbor(axis, -1, periodic);
        let right_peer = topo.neighbor(axis, 1, periodic);
        // A lone rank on a periodic axis is its own neighbour: there is no
        // peer to exchange with, so particles crossing the seam wrap in
        // place instead of being dropped.
        let self_periodic = periodic && ax.nprocs == 1;

        let mut keep_idx = Vec::with_capacity(self.len());
        let mut left_payload = Vec::new();
        let mut right_payload = Vec::new();
        let mut n_left: i64 = 0;
        let mut n_right: i64 = 0;

        for idx in 0..self.len() {
            let mut r = [self.r0[idx], self.r1[idx], self.r2[idx]];
            let u = [self.u0[idx], self.u1[idx], self.u2[idx]];
            let coord = r[axis];

            if coord < rmin {
                if self_periodic {
                    let wrapped = coord + global_len;
                    match axis {
                        0 => self.r0[idx] = wrapped,
                        1 => self.r1[idx] = wrapped,
                        _ => self.r2[idx] = wrapped,
                    }
                    keep_idx.push(idx);
                } else if left_peer.is_some() {
                    if periodic && is_left_edge {
                        r[axis] += global_len;
                    }
                    encode(&mut left_payload, r, u, self.w[idx], self.marker[idx]);
                    n_left += 1;
                }
                // dropped: open boundary with no neighbour to receive it
            } else if coord >= rmax {
                if self_periodic {
                    let wrapped = coord - global_len;
                    match axis {
                        0 => self.r0[idx] = wrapped,
                        1 => self.r1[idx] = wrapped,
                        _ => self.r2[idx] = wrapped,
                    }
                    keep_idx.push(idx);
                } else if right_peer.is_some() {
                    if periodic && is_right_edge {
                        r[axis] -= global_len;
                    }
                    encode(&mut right_payload, r, u, self.w[idx], self.marker[idx]);
                    n_right += 1;
                }
            } else {
                keep_idx.push(idx);
            }
        }

        let tag_count = 300 + axis as u32;
        let tag_payload = 310 + axis as u32;

        let count_from_left = exchange(topo, left_peer, tag_count, &n_left.to_le_bytes())?;
        let count_from_right = exchange(topo, right_peer, tag_count, &n_right.to_le_bytes())?;
        let payload_from_left = exchange(topo, left_peer, tag_payload, &left_payload)?;
        let payload_from_right = exchange(topo, right_peer, tag_payload, &right_payload)?;

        for (count_bytes, payload) in [
            (&count_from_left, &payload_from_left),
            (&count_from_right, &payload_from_right),
        ] {
            if let (Some(cnt), Some(bytes)) = (count_bytes, payload) {
                let expected = i64::from_le_bytes(cnt[..8].try_into().unwrap()) as usize;
                if bytes.len() != expected * RECORD_BYTES {
                    bail!(crate::ErrorKind::CollectiveFailure(format!(
                        "migration axis {axis}: announced {expected} particles but payload holds {} bytes",
                        bytes.len()
                    )));
                }
            }
        }

        // Compact kept particles, then append whatever arrived.
        let mut new_r0 = Vec::with_capacity(keep_idx.len());
        let mut new_r1 = Vec::with_capacity(keep_idx.len());
        let mut new_r2 = Vec::with_capacity(keep_idx.len());
        let mut new_u0 = Vec::with_capacity(keep_idx.len());
        let mut new_u1 = Vec::with_capacity(keep_idx.len());
        let mut new_u2 = Vec::with_capacity(keep_idx.len());
        let mut new_w = Vec::with_capacity(keep_idx.len());
        let mut new_marker = Vec::with_capacity(keep_idx.len());
        for idx in keep_idx {
            new_r0.push(self.r0[idx]);
            new_r1.push(self.r1[idx]);
            new_r2.push(self.r2[idx]);
            new_u0.push(self.u0[idx]);
            new_u1.push(self.u1[idx]);
            new_u2.push(self.u2[idx]);
            new_w.push(self.w[idx]);
            new_marker.push(self.marker[idx]);
        }

        for payload in [payload_from_left, payload_from_right].into_iter().flatten() {
            for (r0, r1, r2, u0, u1, u2, w, marker) in decode_all(&payload) {
                new_r0.push(r0);
                new_r1.push(r1);
                new_r2.push(r2);
                new_u0.push(u0);
                new_u1.push(u1);
                new_u2.push(u2);
                new_w.push(w);
                new_marker.push(marker);
            }
        }

        self.r0 = new_r0;
        self.r1 = new_r1;
        self.r2 = new_r2;
        self.u0 = new_u0;
        self.u1 = new_u1;
        self.u2 = new_u2;
        self.w = new_w;
        self.marker = new_marker;

        for idx in 0..self.len() {
            let r = [self.r0[idx], self.r1[idx], self.r2[idx]];
            if r[axis] < rmin - 1e-9 || r[axis] >= rmax + 1e-9 {
                log::error!(
                    "particle escaped bounds after migration on axis {axis}: {:?}",
                    r
                );
                bail!(crate::ErrorKind::ParticleEscape(
                    r[0] as f64, r[1] as f64, r[2] as f64
                ));
            }
        }

        Ok(())
    }
}

fn exchange(topo: &dyn Topology, peer: Option<usize>, tag: u32, out: &[u8]) -> Result<Option<Vec<u8>>> {
    match peer {
        Some(p) => Ok(Some(topo.send_recv(p, tag, out).chain_err(|| "migration exchange failed")?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trips() {
        let mut buf = Vec::new();
        encode(&mut buf, [1.0, 2.0, 3.0], [0.1, 0.2, 0.3], 0.5, 42);
        let decoded = decode_all(&buf);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].7, 42);
    }
}
