//! Structured payloads on the control channel.
//!
//! These records configure and report on the descent and scoring
//! collaborators. The session core never interprets them; it only stores the
//! last valid [`GameParams`] and forwards [`FinalScore`] unmodified.

use serde::{Deserialize, Serialize};

fn default_descent_mode() -> String {
    "discrete".to_string()
}

fn default_descent_duration() -> u32 {
    120
}

/// Game configuration received on `game/start`.
///
/// Every field is optional on the wire; missing fields take the defaults
/// below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameParams {
    #[serde(default = "default_descent_mode")]
    pub descent_mode: String,
    /// Seconds for a letter to reach the bottom
    #[serde(default = "default_descent_duration", rename = "descent_duration")]
    pub descent_duration_s: u32,
    #[serde(default)]
    pub one_round: bool,
    #[serde(default)]
    pub min_win_score: u32,
    #[serde(default)]
    pub stars: bool,
    #[serde(default)]
    pub level: u32,
}

impl Default for GameParams {
    fn default() -> Self {
        Self {
            descent_mode: default_descent_mode(),
            descent_duration_s: default_descent_duration(),
            one_round: false,
            min_win_score: 0,
            stars: false,
            level: 0,
        }
    }
}

impl GameParams {
    /// Parses a `game/start` payload.
    ///
    /// # Returns
    ///
    /// `Ok(None)` for an empty payload, `Ok(Some(params))` for valid JSON and
    /// `Err` with the parser message otherwise.
    pub fn from_payload(payload: &[u8]) -> Result<Option<Self>, String> {
        let text = std::str::from_utf8(payload).map_err(|e| e.to_string())?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(text).map(Some).map_err(|e| e.to_string())
    }
}

/// End-of-game summary published on `game/final_score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalScore {
    pub score: u32,
    pub stars: u8,
    pub exit_code: i32,
    pub min_win_score: u32,
    pub duration_s: f64,
}
