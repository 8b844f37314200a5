//! Messages the session publishes to cube displays and the control channel.

use super::params::FinalScore;
use crate::types::DeviceId;
use serde::Serialize;
use std::fmt;

/// Published when a game ends.
pub const FINAL_SCORE_TOPIC: &str = "game/final_score";

/// Letter shown on a cube with nothing to display.
pub const BLANK: char = ' ';

/// Border color reflecting how the word on a chain of cubes was judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BorderColor {
    /// New valid word
    Good,
    /// Valid but already played
    Old,
    /// Not a word
    Bad,
}

impl BorderColor {
    /// RGB565 code understood by the cube firmware.
    pub fn code(self) -> &'static str {
        match self {
            BorderColor::Good => "0x07E0",
            BorderColor::Old => "0xFFE0",
            BorderColor::Bad => "0xFFFF",
        }
    }
}

/// Border drawn around one cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Border {
    /// No border at all.
    Clear,
    /// Part of a word: top and bottom always, west on the first tile and
    /// east on the last.
    Word {
        first: bool,
        last: bool,
        color: BorderColor,
    },
}

impl fmt::Display for Border {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Border::Clear => write!(f, ":"),
            Border::Word { first, last, color } => {
                let mut sides = vec!['N', 'S'];
                if *first {
                    sides.push('W');
                }
                if *last {
                    sides.push('E');
                }
                sides.sort_unstable();
                let sides: String = sides.into_iter().collect();
                write!(f, "{}:{}", sides, color.code())
            }
        }
    }
}

/// One message ready for the bus.
///
/// `epoch` is the coordinator epoch the message was produced in; the
/// publisher drops messages from an epoch that has since been reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
    pub epoch: u64,
}

impl OutboundMessage {
    fn new(topic: String, payload: String, retain: bool, epoch: u64) -> Self {
        Self {
            topic,
            payload,
            retain,
            epoch,
        }
    }

    /// Retained letter assignment for a cube.
    pub fn letter(device: DeviceId, letter: char, epoch: u64) -> Self {
        Self::new(format!("cube/{device}/letter"), letter.to_string(), true, epoch)
    }

    /// Non-retained repeat of a letter already assigned.
    pub fn letter_refresh(device: DeviceId, letter: char, epoch: u64) -> Self {
        Self::new(format!("cube/{device}/letter"), letter.to_string(), false, epoch)
    }

    pub fn lock(device: DeviceId, locked: bool, epoch: u64) -> Self {
        let payload = if locked { "1" } else { "" };
        Self::new(format!("cube/{device}/lock"), payload.to_string(), true, epoch)
    }

    /// Transient flash; never retained.
    pub fn flash(device: DeviceId, epoch: u64) -> Self {
        Self::new(format!("cube/{device}/flash"), "1".to_string(), false, epoch)
    }

    pub fn border(device: DeviceId, border: Border, epoch: u64) -> Self {
        Self::new(format!("cube/{device}/border"), border.to_string(), true, epoch)
    }

    /// End-of-game summary for the control channel.
    pub fn final_score(score: &FinalScore, epoch: u64) -> Result<Self, serde_json::Error> {
        let payload = serde_json::to_string(score)?;
        Ok(Self::new(FINAL_SCORE_TOPIC.to_string(), payload, true, epoch))
    }
}

impl fmt::Display for OutboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} <- '{}'{}",
            self.topic,
            self.payload,
            if self.retain { " (retained)" } else { "" }
        )
    }
}
