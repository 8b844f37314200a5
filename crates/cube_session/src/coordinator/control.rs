//! Session-level control state: phase, start gating, stored parameters and
//! the per-station display bookkeeping the coordinator needs between calls.

use crate::messaging::GameParams;
use crate::start::START_CHAIN_LEN;
use crate::types::{DeviceGroupId, DeviceId, Millis};
use serde::Serialize;
use std::collections::HashMap;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "phase")]
pub enum Phase {
    /// Waiting for a station to complete its start sequence.
    Waiting,
    /// Racks are dealt and gameplay messages are accepted.
    Running { started_at: Millis },
}

impl Phase {
    pub fn is_running(&self) -> bool {
        matches!(self, Phase::Running { .. })
    }
}

/// Countdown display progress for one armed station.
#[derive(Debug, Clone)]
pub(crate) struct Countdown {
    /// Devices in the order they turn into `?`
    pub order: Vec<DeviceId>,
    /// How many of `order` already show `?`
    pub shown: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct SessionControl {
    pub phase: Phase,
    /// Cleared after a game with a win threshold ends; set again by the next
    /// `game/start` or reset.
    pub start_enabled: bool,
    pub params: GameParams,
    pub prompts: HashMap<DeviceGroupId, [DeviceId; START_CHAIN_LEN]>,
    pub countdowns: HashMap<DeviceGroupId, Countdown>,
    pub locks: HashMap<DeviceGroupId, DeviceId>,
    pub last_rebroadcast: Millis,
}

impl SessionControl {
    pub fn new(params: GameParams) -> Self {
        Self {
            phase: Phase::Waiting,
            start_enabled: true,
            params,
            prompts: HashMap::new(),
            countdowns: HashMap::new(),
            locks: HashMap::new(),
            last_rebroadcast: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase.is_running()
    }

    /// Back to waiting with no per-station state. Parameters and the start
    /// gate are left to the caller.
    pub fn end_session(&mut self) {
        self.phase = Phase::Waiting;
        self.prompts.clear();
        self.countdowns.clear();
        self.locks.clear();
    }
}
