//! Cross-rack letter propagation.
//!
//! Racks are linked by slot identity, never by shared memory: the synchronizer
//! owns every rack outright and mirrors each replacement by issuing the same
//! explicit write to every rack in turn.

use super::{player_rack::Rack, tile::Tile};
use crate::error::SessionError;
use crate::types::{PlayerId, SlotId, RACK_SIZE};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Keeps every player's rack letter-multiset-equivalent.
///
/// # Invariants
///
/// * Between calls, all racks map each slot identity to the same letter.
/// * Position order is private per rack and never propagated.
/// * A failing call leaves every rack untouched.
#[derive(Debug, Default)]
pub struct RackSynchronizer {
    racks: BTreeMap<PlayerId, Rack>,
}

impl RackSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deals `pool` to every player in `players`, replacing any existing racks.
    ///
    /// Slot `k` of every rack starts with `pool[k]`, so all racks start
    /// identical in both letters and order.
    ///
    /// # Errors
    ///
    /// [`SessionError::NoPlayers`] when `players` is empty.
    pub fn initialize(
        &mut self,
        players: &[PlayerId],
        pool: [char; RACK_SIZE],
    ) -> Result<(), SessionError> {
        if players.is_empty() {
            return Err(SessionError::NoPlayers);
        }

        self.racks.clear();
        for player in players {
            self.racks.insert(*player, Rack::new(pool));
        }
        info!(
            "🎲 Dealt '{}' to {} rack(s)",
            pool.iter().collect::<String>(),
            players.len()
        );
        Ok(())
    }

    /// Gives a late-joining player a rack carrying the session's current
    /// shared letters. Joining twice returns the existing rack unchanged.
    ///
    /// # Errors
    ///
    /// [`SessionError::NoPlayers`] when no rack has been dealt yet.
    pub fn join(&mut self, player: PlayerId) -> Result<&Rack, SessionError> {
        if !self.racks.contains_key(&player) {
            let letters = self.shared_letters().ok_or(SessionError::NoPlayers)?;
            info!(
                "➕ {} joins with shared letters '{}'",
                player,
                letters.iter().collect::<String>()
            );
            self.racks.insert(player, Rack::new(letters));
        }
        self.racks.get(&player).ok_or_else(|| SessionError::no_rack(player))
    }

    /// Replaces the letter of `slot` in the owner's rack and mirrors it to
    /// the tile with the same identity in every other rack.
    ///
    /// Returns the players whose racks changed, owner first.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidRackReference`] when `owner` has no rack; no
    /// rack is modified in that case.
    pub fn replace(
        &mut self,
        owner: PlayerId,
        slot: SlotId,
        letter: char,
    ) -> Result<Vec<PlayerId>, SessionError> {
        if !self.racks.contains_key(&owner) {
            return Err(SessionError::no_rack(owner));
        }

        let mut updated = Vec::with_capacity(self.racks.len());
        updated.push(owner);
        updated.extend(self.racks.keys().copied().filter(|p| *p != owner));

        for player in &updated {
            if let Some(rack) = self.racks.get_mut(player) {
                rack.set_letter(slot, letter);
            }
        }
        debug!("🔁 Slot {} -> '{}' mirrored across {:?}", slot, letter, updated);
        Ok(updated)
    }

    /// Rearranges the owner's rack. Purely local: no other rack changes and
    /// no slot letter changes.
    pub fn reorder(&mut self, owner: PlayerId, order: &[SlotId]) -> Result<(), SessionError> {
        let rack = self
            .racks
            .get_mut(&owner)
            .ok_or_else(|| SessionError::no_rack(owner))?;
        rack.reorder(order)
            .map_err(|detail| SessionError::InvalidReorder { player: owner, detail })
    }

    /// Moves the given slots to the front of the owner's rack.
    pub fn move_to_front(&mut self, owner: PlayerId, front: &[SlotId]) -> Result<(), SessionError> {
        let rack = self
            .racks
            .get_mut(&owner)
            .ok_or_else(|| SessionError::no_rack(owner))?;
        rack.move_to_front(front)
            .map_err(|detail| SessionError::InvalidReorder { player: owner, detail })
    }

    /// Independent copy of the owner's tiles in position order.
    pub fn snapshot(&self, owner: PlayerId) -> Result<Vec<Tile>, SessionError> {
        self.racks
            .get(&owner)
            .map(Rack::snapshot)
            .ok_or_else(|| SessionError::no_rack(owner))
    }

    pub fn rack(&self, owner: PlayerId) -> Option<&Rack> {
        self.racks.get(&owner)
    }

    /// Players holding a rack, ascending.
    pub fn players(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.racks.keys().copied()
    }

    /// Slot-indexed letters shared by every rack, if any rack exists.
    pub fn shared_letters(&self) -> Option<[char; RACK_SIZE]> {
        self.racks.values().next().map(Rack::slot_letters)
    }

    pub fn is_empty(&self) -> bool {
        self.racks.is_empty()
    }

    /// Drops every rack (session teardown).
    pub fn clear(&mut self) {
        self.racks.clear();
    }
}
