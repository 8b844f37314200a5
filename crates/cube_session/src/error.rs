//! Error types and handling for the session core.
//!
//! Every variant here is recoverable: the coordinator logs the failure, drops
//! the triggering message and keeps the session running.

use crate::types::{DeviceGroupId, PlayerId};

/// Failures raised by the in-memory session components.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// A rack operation named a player without a rack, or a slot/position
    /// outside the rack. No rack was modified.
    #[error("Invalid rack reference: player {player}, {detail}")]
    InvalidRackReference { player: PlayerId, detail: String },

    /// A reorder request was not a permutation of the rack's slot identities.
    #[error("Invalid reorder for player {player}: {detail}")]
    InvalidReorder { player: PlayerId, detail: String },

    /// A station id that is not part of the configured layout.
    #[error("Unknown device group: {0}")]
    UnknownDeviceGroup(DeviceGroupId),

    /// A player id that the mapper never handed out.
    #[error("Unknown player: {0}")]
    UnknownPlayer(PlayerId),

    /// An operation that needs at least one mapped player ran without any.
    #[error("No players are mapped in this session")]
    NoPlayers,
}

impl SessionError {
    pub(crate) fn bad_position(player: PlayerId, position: usize) -> Self {
        Self::InvalidRackReference {
            player,
            detail: format!("no tile at position {position}"),
        }
    }

    pub(crate) fn no_rack(player: PlayerId) -> Self {
        Self::InvalidRackReference {
            player,
            detail: "no rack for player".to_string(),
        }
    }
}

/// Failures decoding bus messages into the closed inbound message set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The topic is not one the coordinator subscribes to.
    #[error("Unrecognized topic: {0}")]
    UnknownTopic(String),

    /// The topic matched but its payload could not be parsed.
    #[error("Malformed payload on {topic}: {reason}")]
    MalformedPayload { topic: String, reason: String },
}

/// Failures at the transport boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The bus could not accept a publish.
    #[error("Publish to {topic} failed: {reason}")]
    Publish { topic: String, reason: String },

    /// A subscription request was rejected.
    #[error("Subscribe to {filter} failed: {reason}")]
    Subscribe { filter: String, reason: String },

    /// The connection to the bus is gone.
    #[error("Transport closed: {0}")]
    Closed(String),
}
