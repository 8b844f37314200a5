//! Decoding bus traffic into the closed set of inbound messages.
//!
//! Topic strings are matched exactly once, here at the transport boundary.
//! Everything past [`decode`] works with [`InboundMessage`] variants.

use super::params::{FinalScore, GameParams};
use crate::error::ProtocolError;
use crate::types::{DeviceId, PlayerId};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{trace, warn};

/// Inbound topic names and filters.
pub mod topics {
    pub const NEIGHBOR_PREFIX: &str = "cube/right/";
    pub const NEIGHBOR_FILTER: &str = "cube/right/+";
    pub const GUESS: &str = "game/guess";
    pub const FORCE_START: &str = "app/start";
    pub const ABORT: &str = "app/abort";
    pub const GAME_START: &str = "game/start";
    pub const LETTER: &str = "game/letter";
    pub const LOCK: &str = "game/lock";
    pub const FINISHED: &str = "game/finished";

    /// Every filter the coordinator subscribes to.
    pub const SUBSCRIPTIONS: [&str; 8] = [
        NEIGHBOR_FILTER,
        GUESS,
        FORCE_START,
        ABORT,
        GAME_START,
        LETTER,
        LOCK,
        FINISHED,
    ];
}

/// Every message the session coordinator reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// `sender` now sees `neighbor` on its right, or nothing.
    NeighborReport {
        sender: DeviceId,
        neighbor: Option<DeviceId>,
    },
    /// Word typed on a non-hardware input.
    Guess { word: String },
    /// Start without waiting for a physical start sequence.
    ForceStart,
    /// Tear the session down.
    Abort,
    /// New game requested; `params` is `None` when absent or unreadable.
    GameStart { params: Option<GameParams> },
    /// A falling letter landed on `position` of `player`'s rack.
    LetterLanded {
        player: PlayerId,
        position: usize,
        letter: char,
    },
    /// The falling letter is now aimed at `position`, or at nothing.
    LetterLock {
        player: PlayerId,
        position: Option<usize>,
    },
    /// The game ended with this summary.
    GameFinished(FinalScore),
}

#[derive(Deserialize)]
struct LetterPayload {
    player: u8,
    position: usize,
    letter: char,
}

#[derive(Deserialize)]
struct LockPayload {
    player: u8,
    #[serde(default)]
    position: Option<usize>,
}

/// Decodes one bus message.
///
/// # Arguments
///
/// * `topic` - The topic the message arrived on
/// * `payload` - Raw payload bytes
///
/// # Returns
///
/// The decoded message, or a [`ProtocolError`] if the topic is unknown or
/// the payload cannot be used. Neighbor reports never fail on their payload:
/// anything that is not a device id reads as "no neighbor".
pub fn decode(topic: &str, payload: &[u8]) -> Result<InboundMessage, ProtocolError> {
    trace!("📥 {} ({} bytes)", topic, payload.len());

    if let Some(sender) = topic.strip_prefix(topics::NEIGHBOR_PREFIX) {
        let sender = sender
            .parse::<DeviceId>()
            .map_err(|e| malformed(topic, format!("bad sender id '{sender}': {e}")))?;
        let neighbor = std::str::from_utf8(payload)
            .ok()
            .and_then(|text| text.parse::<DeviceId>().ok());
        return Ok(InboundMessage::NeighborReport { sender, neighbor });
    }

    match topic {
        topics::GUESS => {
            let word = text(topic, payload)?.trim().to_uppercase();
            if word.is_empty() {
                return Err(malformed(topic, "empty guess"));
            }
            Ok(InboundMessage::Guess { word })
        }
        topics::FORCE_START => Ok(InboundMessage::ForceStart),
        topics::ABORT => Ok(InboundMessage::Abort),
        topics::GAME_START => {
            let params = GameParams::from_payload(payload).unwrap_or_else(|reason| {
                warn!("⚠️ Ignoring unreadable game parameters: {}", reason);
                None
            });
            Ok(InboundMessage::GameStart { params })
        }
        topics::LETTER => {
            let landed: LetterPayload = json(topic, payload)?;
            Ok(InboundMessage::LetterLanded {
                player: PlayerId(landed.player),
                position: landed.position,
                letter: landed.letter.to_ascii_uppercase(),
            })
        }
        topics::LOCK => {
            let lock: LockPayload = json(topic, payload)?;
            Ok(InboundMessage::LetterLock {
                player: PlayerId(lock.player),
                position: lock.position,
            })
        }
        topics::FINISHED => Ok(InboundMessage::GameFinished(json(topic, payload)?)),
        _ => Err(ProtocolError::UnknownTopic(topic.to_string())),
    }
}

fn malformed(topic: &str, reason: impl Into<String>) -> ProtocolError {
    ProtocolError::MalformedPayload {
        topic: topic.to_string(),
        reason: reason.into(),
    }
}

fn text<'a>(topic: &str, payload: &'a [u8]) -> Result<&'a str, ProtocolError> {
    std::str::from_utf8(payload).map_err(|e| malformed(topic, e.to_string()))
}

fn json<T: DeserializeOwned>(topic: &str, payload: &[u8]) -> Result<T, ProtocolError> {
    serde_json::from_slice(payload).map_err(|e| malformed(topic, e.to_string()))
}
