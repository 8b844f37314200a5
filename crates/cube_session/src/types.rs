//! # Core Type Definitions
//!
//! Identifier newtypes shared by every component of the session core.
//!
//! ## Key Types
//!
//! - [`DeviceId`] - a physical letter cube as addressed on the bus
//! - [`DeviceGroupId`] - a physical player station (a fixed set of cubes)
//! - [`PlayerId`] - a logical player slot handed out by the mapper
//! - [`SlotId`] - the permanent 0..=5 identity of a tile inside a rack
//!
//! Wrapper types keep these apart at compile time; a cube id can never be
//! passed where a slot identity is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Milliseconds on the session clock.
///
/// The runtime measures from process start; tests pass literal values.
pub type Millis = u64;

/// Number of tiles in every rack, and number of cubes in every station.
pub const RACK_SIZE: usize = 6;

/// Identifier of a physical letter cube (`cube/{id}/...` on the bus).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub u16);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for DeviceId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u16>().map(Self)
    }
}

/// Identifier of a player station: the fixed set of cubes one player uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceGroupId(pub u8);

impl fmt::Display for DeviceGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "station-{}", self.0)
    }
}

/// Logical player slot (0, 1, ...).
///
/// Allocated by [`crate::players::PlayerCubeSetMapper`] and stable for the
/// lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u8);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Permanent identity of a tile within a rack.
///
/// Tiles carrying the same `SlotId` in different racks are linked: a letter
/// change on one is mirrored to all others by the
/// [`crate::rack::RackSynchronizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SlotId(pub(crate) u8);

impl SlotId {
    /// Returns the slot identity for `index`, or `None` outside `0..RACK_SIZE`.
    pub fn new(index: u8) -> Option<Self> {
        ((index as usize) < RACK_SIZE).then_some(Self(index))
    }

    /// The slot identity as an index into per-slot tables.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Every slot identity in ascending order.
    pub fn all() -> impl Iterator<Item = SlotId> {
        (0..RACK_SIZE as u8).map(SlotId)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Non-hardware input devices that can join a session without a start chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Keyboard,
    Gamepad,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputKind::Keyboard => write!(f, "keyboard"),
            InputKind::Gamepad => write!(f, "gamepad"),
        }
    }
}
