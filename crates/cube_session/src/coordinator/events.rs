//! What a dispatch produced: bus messages plus session events.

use crate::collaborators::Judgement;
use crate::messaging::{FinalScore, GameParams, OutboundMessage};
use crate::types::{DeviceGroupId, DeviceId, Millis, PlayerId, SlotId};
use serde::Serialize;

/// Session milestones reported to collaborators outside the core (game
/// engine, sound, scoreboard).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    SessionStarted {
        players: Vec<PlayerId>,
        letters: String,
        params: GameParams,
        at: Millis,
    },
    PlayerJoined {
        player: PlayerId,
        group: DeviceGroupId,
        at: Millis,
    },
    CountdownArmed {
        group: DeviceGroupId,
        chain: Vec<DeviceId>,
        deadline: Millis,
    },
    CountdownCancelled {
        group: DeviceGroupId,
    },
    LetterReplaced {
        owner: PlayerId,
        slot: SlotId,
        letter: char,
        players: Vec<PlayerId>,
    },
    GuessJudged {
        player: PlayerId,
        word: String,
        slots: Vec<SlotId>,
        judgement: Judgement,
    },
    SessionReset {
        epoch: u64,
    },
    SessionFinished {
        score: FinalScore,
    },
}

/// Output of one coordinator step, in emission order.
#[derive(Debug, Default, Clone)]
pub struct Dispatch {
    pub messages: Vec<OutboundMessage>,
    pub events: Vec<SessionEvent>,
}

impl Dispatch {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.events.is_empty()
    }

    pub(crate) fn publish(&mut self, message: OutboundMessage) {
        self.messages.push(message);
    }

    pub(crate) fn emit(&mut self, event: SessionEvent) {
        self.events.push(event);
    }

    /// Messages published on `topic`, oldest first.
    pub fn on_topic<'a>(
        &'a self,
        topic: &'a str,
    ) -> impl Iterator<Item = &'a OutboundMessage> + 'a {
        self.messages.iter().filter(move |m| m.topic == topic)
    }

    /// Last payload published on `topic`, if any.
    pub fn last_payload(&self, topic: &str) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.topic == topic)
            .map(|m| m.payload.as_str())
    }
}
