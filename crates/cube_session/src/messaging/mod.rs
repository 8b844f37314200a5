//! Bus message model: inbound decoding, outbound construction and the
//! control-channel payloads.

pub mod inbound;
pub mod outbound;
pub mod params;

pub use inbound::{decode, topics, InboundMessage};
pub use outbound::{Border, BorderColor, OutboundMessage, BLANK, FINAL_SCORE_TOPIC};
pub use params::{FinalScore, GameParams};
