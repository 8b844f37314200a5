//! A player's rack of six tiles.
//!
//! The rack keeps two views over the same tiles: position order (private to
//! the owning player, freely reorderable) and slot identity (shared with every
//! other rack of the session). Both lookups are O(1).

use super::tile::Tile;
use crate::types::{SlotId, RACK_SIZE};

/// Ordered collection of exactly [`RACK_SIZE`] tiles owned by one player.
///
/// Only the [`super::RackSynchronizer`] mutates racks, so a letter change can
/// never reach one rack without reaching its linked tiles in the others.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rack {
    /// Tiles in position order
    tiles: [Tile; RACK_SIZE],
    /// Slot index -> position in `tiles`
    positions: [usize; RACK_SIZE],
}

impl Rack {
    /// Deals a rack where slot `k` holds `letters[k]` at position `k`.
    pub fn new(letters: [char; RACK_SIZE]) -> Self {
        Self {
            tiles: std::array::from_fn(|i| Tile::new(SlotId(i as u8), letters[i])),
            positions: std::array::from_fn(|i| i),
        }
    }

    /// Current letter of the tile carrying `slot`.
    pub fn letter_at(&self, slot: SlotId) -> char {
        self.tiles[self.positions[slot.index()]].letter
    }

    /// Tile at `position` in this player's order, if the position exists.
    pub fn tile_at(&self, position: usize) -> Option<Tile> {
        self.tiles.get(position).copied()
    }

    /// Position of the tile carrying `slot`.
    pub fn position_of(&self, slot: SlotId) -> usize {
        self.positions[slot.index()]
    }

    /// Independent copy of the tiles in position order.
    pub fn snapshot(&self) -> Vec<Tile> {
        self.tiles.to_vec()
    }

    /// Letters in position order.
    pub fn letters(&self) -> String {
        self.tiles.iter().map(|t| t.letter).collect()
    }

    /// Letters indexed by slot identity, independent of position order.
    pub fn slot_letters(&self) -> [char; RACK_SIZE] {
        std::array::from_fn(|i| self.tiles[self.positions[i]].letter)
    }

    /// Resolves a word to the slots that spell it.
    ///
    /// Each letter takes the first tile in position order that carries it and
    /// was not already taken. Returns `None` when the rack cannot spell the
    /// word.
    pub fn slots_for_word(&self, word: &str) -> Option<Vec<SlotId>> {
        let mut taken = [false; RACK_SIZE];
        let mut slots = Vec::with_capacity(word.len());
        for letter in word.chars() {
            let position = (0..RACK_SIZE).find(|&pos| {
                !taken[pos] && self.tiles[pos].letter.eq_ignore_ascii_case(&letter)
            })?;
            taken[position] = true;
            slots.push(self.tiles[position].id);
        }
        Some(slots)
    }

    /// Replaces the letter of the tile carrying `slot`. Identity is untouched.
    pub(crate) fn set_letter(&mut self, slot: SlotId, letter: char) {
        let position = self.positions[slot.index()];
        self.tiles[position].letter = letter;
    }

    /// Rearranges tiles into `order` (slot identities, new position order).
    ///
    /// `order` must name every slot exactly once; otherwise the rack is left
    /// unchanged and the reason is returned.
    pub(crate) fn reorder(&mut self, order: &[SlotId]) -> Result<(), String> {
        if order.len() != RACK_SIZE {
            return Err(format!("expected {RACK_SIZE} slots, got {}", order.len()));
        }
        let mut seen = [false; RACK_SIZE];
        for slot in order {
            if std::mem::replace(&mut seen[slot.index()], true) {
                return Err(format!("slot {slot} listed twice"));
            }
        }

        let letters = self.slot_letters();
        for (position, slot) in order.iter().enumerate() {
            self.tiles[position] = Tile::new(*slot, letters[slot.index()]);
            self.positions[slot.index()] = position;
        }
        Ok(())
    }

    /// Moves `front` to the first positions (in the given order) and keeps
    /// the remaining tiles in their current relative order.
    pub(crate) fn move_to_front(&mut self, front: &[SlotId]) -> Result<(), String> {
        let mut order: Vec<SlotId> = front.to_vec();
        order.extend(self.tiles.iter().map(|t| t.id).filter(|id| !front.contains(id)));
        self.reorder(&order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(i: u8) -> SlotId {
        SlotId::new(i).unwrap()
    }

    #[test]
    fn test_new_rack_positions_match_slots() {
        let rack = Rack::new(['W', 'O', 'R', 'D', 'S', 'X']);
        assert_eq!(rack.letters(), "WORDSX");
        for s in SlotId::all() {
            assert_eq!(rack.position_of(s), s.index());
            assert_eq!(rack.tile_at(s.index()).unwrap().id, s);
        }
        assert!(rack.tile_at(6).is_none());
    }

    #[test]
    fn test_reorder_keeps_slot_letters() {
        let mut rack = Rack::new(['A', 'B', 'C', 'D', 'E', 'F']);
        let before = rack.slot_letters();
        rack.reorder(&[slot(5), slot(4), slot(3), slot(2), slot(1), slot(0)]).unwrap();
        assert_eq!(rack.letters(), "FEDCBA");
        assert_eq!(rack.slot_letters(), before);
        assert_eq!(rack.position_of(slot(0)), 5);
        assert_eq!(rack.letter_at(slot(0)), 'A');
    }

    #[test]
    fn test_reorder_rejects_non_permutation() {
        let mut rack = Rack::new(['A', 'B', 'C', 'D', 'E', 'F']);
        let original = rack.clone();
        assert!(rack.reorder(&[slot(0), slot(1)]).is_err());
        assert!(rack
            .reorder(&[slot(0), slot(0), slot(2), slot(3), slot(4), slot(5)])
            .is_err());
        assert_eq!(rack, original);
    }

    #[test]
    fn test_slots_for_word() {
        let rack = Rack::new(['T', 'E', 'A', 'T', 'S', 'X']);
        assert_eq!(
            rack.slots_for_word("TEA"),
            Some(vec![slot(0), slot(1), slot(2)])
        );
        // Second T comes from the next free tile carrying it
        assert_eq!(
            rack.slots_for_word("TATE"),
            Some(vec![slot(0), slot(2), slot(3), slot(1)])
        );
        assert_eq!(rack.slots_for_word("tea"), Some(vec![slot(0), slot(1), slot(2)]));
        assert_eq!(rack.slots_for_word("ZOO"), None);
        assert_eq!(rack.slots_for_word("TTT"), None);
    }

    #[test]
    fn test_move_to_front() {
        let mut rack = Rack::new(['A', 'B', 'C', 'D', 'E', 'F']);
        rack.move_to_front(&[slot(4), slot(2)]).unwrap();
        assert_eq!(rack.letters(), "ECABDF");
    }

    #[test]
    fn test_set_letter_follows_identity() {
        let mut rack = Rack::new(['A', 'B', 'C', 'D', 'E', 'F']);
        rack.reorder(&[slot(2), slot(0), slot(1), slot(3), slot(4), slot(5)]).unwrap();
        rack.set_letter(slot(2), 'Z');
        assert_eq!(rack.letters(), "ZABDEF");
        assert_eq!(rack.letter_at(slot(2)), 'Z');
    }
}
