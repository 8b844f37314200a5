//! Live "right neighbor" graph reported by the cubes.
//!
//! Each cube publishes the id of the cube it currently sees on its right, or
//! nothing. The graph keeps only the latest report per sender and answers
//! chain queries over it; it never interprets the chains itself.

use crate::types::DeviceId;
use std::collections::{HashMap, HashSet};
use tracing::trace;

/// Longest chain that matters for start detection.
pub const START_CHAIN_LEN: usize = 3;

/// Directed `sender -> neighbor` edges, at most one per sender.
#[derive(Debug, Default, Clone)]
pub struct NeighborGraph {
    edges: HashMap<DeviceId, DeviceId>,
    reported: HashSet<DeviceId>,
}

impl NeighborGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the edge for `sender`.
    ///
    /// `None` and self-links clear the edge. Returns `true` when the stored
    /// edge actually changed.
    pub fn report(&mut self, sender: DeviceId, neighbor: Option<DeviceId>) -> bool {
        self.reported.insert(sender);

        let previous = match neighbor.filter(|n| *n != sender) {
            Some(n) => self.edges.insert(sender, n),
            None => self.edges.remove(&sender),
        };
        let changed = previous != self.edges.get(&sender).copied();
        trace!(%sender, ?neighbor, changed, "neighbor report");
        changed
    }

    /// Current right neighbor of `device`.
    pub fn neighbor_of(&self, device: DeviceId) -> Option<DeviceId> {
        self.edges.get(&device).copied()
    }

    /// Whether `device` has sent at least one report since the last clear.
    pub fn reported(&self, device: DeviceId) -> bool {
        self.reported.contains(&device)
    }

    /// Longest simple path starting at `start`, capped at [`START_CHAIN_LEN`]
    /// devices. The result always contains `start`.
    pub fn chain_from(&self, start: DeviceId) -> Vec<DeviceId> {
        self.walk(start, START_CHAIN_LEN, |_| true)
    }

    /// Follows edges from `start` while `within` accepts the next device,
    /// stopping at a cycle, a missing edge or `max_len` devices.
    pub fn walk(
        &self,
        start: DeviceId,
        max_len: usize,
        within: impl Fn(DeviceId) -> bool,
    ) -> Vec<DeviceId> {
        let mut chain = vec![start];
        let mut current = start;
        while chain.len() < max_len {
            match self.edges.get(&current) {
                Some(next) if within(*next) && !chain.contains(next) => {
                    chain.push(*next);
                    current = *next;
                }
                _ => break,
            }
        }
        chain
    }

    /// Word chains formed inside `devices`.
    ///
    /// A chain starts at every device with an in-set edge and no in-set
    /// predecessor, and runs until the edge leaves the set. Heads are taken in
    /// the order of `devices`. Returns nothing at all if any chain loops or
    /// two chains share a device, since the physical layout is then ambiguous.
    pub fn word_chains(&self, devices: &[DeviceId]) -> Vec<Vec<DeviceId>> {
        let members: HashSet<DeviceId> = devices.iter().copied().collect();
        let inner = |d: &DeviceId| self.neighbor_of(*d).filter(|n| members.contains(n));

        let targets: HashSet<DeviceId> = devices.iter().filter_map(inner).collect();
        let has_edges = devices.iter().any(|d| inner(d).is_some());
        let heads: Vec<DeviceId> = devices
            .iter()
            .copied()
            .filter(|d| inner(d).is_some() && !targets.contains(d))
            .collect();

        // Edges present but no head: everything sits on a loop
        if has_edges && heads.is_empty() {
            return Vec::new();
        }

        let mut used = HashSet::new();
        let mut chains = Vec::with_capacity(heads.len());
        for head in heads {
            let mut chain = vec![head];
            let mut current = head;
            while let Some(next) = inner(&current) {
                if chain.contains(&next) || chain.len() >= devices.len() {
                    return Vec::new();
                }
                chain.push(next);
                current = next;
            }
            if chain.iter().any(|d| !used.insert(*d)) {
                return Vec::new();
            }
            chains.push(chain);
        }
        chains
    }

    /// Drops every edge and forgets which devices reported.
    pub fn clear(&mut self) {
        self.edges.clear();
        self.reported.clear();
    }
}
