//! Single letter slot.

use crate::types::SlotId;
use serde::Serialize;
use std::fmt;

/// One letter slot in a rack.
///
/// `id` is fixed when the rack is dealt and never changes; `letter` is
/// replaced in place when a falling letter lands on the tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Tile {
    pub id: SlotId,
    pub letter: char,
}

impl Tile {
    pub fn new(id: SlotId, letter: char) -> Self {
        Self { id, letter }
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.letter, self.id)
    }
}
