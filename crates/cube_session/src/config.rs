//! Session configuration types and defaults.
//!
//! Describes the physical layout (which cubes belong to which station), the
//! start countdown timing and the stations reserved for non-hardware inputs.

use crate::types::{DeviceGroupId, DeviceId, InputKind, Millis, RACK_SIZE};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Default length of one countdown stage.
fn default_countdown_stage_ms() -> Millis {
    1000
}

/// Default seconds between letter rebroadcasts.
fn default_rebroadcast_s() -> u64 {
    8
}

fn default_stations() -> Vec<StationConfig> {
    vec![
        StationConfig {
            id: DeviceGroupId(0),
            devices: (1..=6).map(DeviceId).collect(),
        },
        StationConfig {
            id: DeviceGroupId(1),
            devices: (11..=16).map(DeviceId).collect(),
        },
    ]
}

/// One player station: a fixed set of six cubes.
///
/// Slot identity `k` of the player mapped to this station is shown on
/// `devices[k]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationConfig {
    pub id: DeviceGroupId,
    pub devices: Vec<DeviceId>,
}

/// Stations used by non-hardware inputs joining without a start chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputReservations {
    #[serde(default = "InputReservations::default_keyboard")]
    pub keyboard: DeviceGroupId,
    #[serde(default = "InputReservations::default_gamepad")]
    pub gamepad: DeviceGroupId,
}

impl InputReservations {
    fn default_keyboard() -> DeviceGroupId {
        DeviceGroupId(0)
    }

    fn default_gamepad() -> DeviceGroupId {
        DeviceGroupId(1)
    }

    /// Station reserved for `kind`.
    pub fn station_for(&self, kind: InputKind) -> DeviceGroupId {
        match kind {
            InputKind::Keyboard => self.keyboard,
            InputKind::Gamepad => self.gamepad,
        }
    }
}

impl Default for InputReservations {
    fn default() -> Self {
        Self {
            keyboard: Self::default_keyboard(),
            gamepad: Self::default_gamepad(),
        }
    }
}

/// Configuration for a [`crate::SessionCoordinator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Length of one countdown stage in milliseconds
    #[serde(default = "default_countdown_stage_ms")]
    pub countdown_stage_ms: Millis,

    /// Show `A`, `B`, `C` prompts and arm only on that exact chain
    #[serde(default)]
    pub designated_prompts: bool,

    /// Seconds between periodic letter rebroadcasts (0 disables)
    #[serde(default = "default_rebroadcast_s")]
    pub rebroadcast_s: u64,

    /// Physical stations, in priority order
    #[serde(default = "default_stations")]
    pub stations: Vec<StationConfig>,

    /// Reserved stations for keyboard and gamepad players
    #[serde(default)]
    pub inputs: InputReservations,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            countdown_stage_ms: default_countdown_stage_ms(),
            designated_prompts: false,
            rebroadcast_s: default_rebroadcast_s(),
            stations: default_stations(),
            inputs: InputReservations::default(),
        }
    }
}

impl SessionConfig {
    /// Validates the station layout and timing.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is usable, or `Err(String)` describing
    /// the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.countdown_stage_ms == 0 {
            return Err("countdown_stage_ms must be greater than 0".to_string());
        }
        if self.stations.is_empty() {
            return Err("At least one station must be configured".to_string());
        }

        let mut ids = HashSet::new();
        let mut devices = HashSet::new();
        for station in &self.stations {
            if !ids.insert(station.id) {
                return Err(format!("Duplicate station id {}", station.id.0));
            }
            if station.devices.len() != RACK_SIZE {
                return Err(format!(
                    "Station {} has {} devices, expected {}",
                    station.id.0,
                    station.devices.len(),
                    RACK_SIZE
                ));
            }
            for device in &station.devices {
                if !devices.insert(*device) {
                    return Err(format!("Device {device} is listed in more than one station"));
                }
            }
        }

        for kind in [InputKind::Keyboard, InputKind::Gamepad] {
            let station = self.inputs.station_for(kind);
            if !ids.contains(&station) {
                return Err(format!(
                    "Input {kind} is reserved to unknown station {}",
                    station.0
                ));
            }
        }
        Ok(())
    }

    /// Station owning `device`, if any.
    pub fn station_of(&self, device: DeviceId) -> Option<&StationConfig> {
        self.stations.iter().find(|s| s.devices.contains(&device))
    }

    pub fn station(&self, id: DeviceGroupId) -> Option<&StationConfig> {
        self.stations.iter().find(|s| s.id == id)
    }

    /// Every configured device, station by station.
    pub fn all_devices(&self) -> impl Iterator<Item = DeviceId> + '_ {
        self.stations.iter().flat_map(|s| s.devices.iter().copied())
    }
}
