//! Mapping from physical stations to logical players.
//!
//! The first station to complete a start sequence becomes player 0, the next
//! one player 1, and so on. A mapping is never undone mid-session, so a player
//! joining late always lands on a fresh id and never displaces anyone.

use crate::config::{InputReservations, SessionConfig};
use crate::error::SessionError;
use crate::types::{DeviceGroupId, InputKind, Millis, PlayerId};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::info;

/// A logical player bound to one station for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlayerSlot {
    pub logical_id: PlayerId,
    pub device_group: DeviceGroupId,
    pub mapped_at: Millis,
}

/// Allocates [`PlayerId`]s to stations.
#[derive(Debug, Clone)]
pub struct PlayerCubeSetMapper {
    known_groups: Vec<DeviceGroupId>,
    inputs: InputReservations,
    slots: BTreeMap<PlayerId, PlayerSlot>,
    by_group: HashMap<DeviceGroupId, PlayerId>,
}

impl PlayerCubeSetMapper {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            known_groups: config.stations.iter().map(|s| s.id).collect(),
            inputs: config.inputs,
            slots: BTreeMap::new(),
            by_group: HashMap::new(),
        }
    }

    /// Returns the player bound to `group`, binding the lowest unused id
    /// first if the station was never seen this session.
    ///
    /// # Errors
    ///
    /// [`SessionError::UnknownDeviceGroup`] if `group` is not a configured
    /// station.
    pub fn assign(&mut self, group: DeviceGroupId, now: Millis) -> Result<PlayerId, SessionError> {
        if let Some(player) = self.by_group.get(&group) {
            return Ok(*player);
        }
        if !self.known_groups.contains(&group) {
            return Err(SessionError::UnknownDeviceGroup(group));
        }

        let logical_id = (0..=u8::MAX)
            .map(PlayerId)
            .find(|p| !self.slots.contains_key(p))
            .ok_or(SessionError::UnknownDeviceGroup(group))?;

        self.slots.insert(
            logical_id,
            PlayerSlot {
                logical_id,
                device_group: group,
                mapped_at: now,
            },
        );
        self.by_group.insert(group, logical_id);
        info!("👤 {} mapped to {} at {}", group, logical_id, now);
        Ok(logical_id)
    }

    /// Assigns through the station reserved for a non-hardware input.
    pub fn assign_input(&mut self, kind: InputKind, now: Millis) -> Result<PlayerId, SessionError> {
        let group = self.inputs.station_for(kind);
        self.assign(group, now)
    }

    pub fn slot(&self, player: PlayerId) -> Option<&PlayerSlot> {
        self.slots.get(&player)
    }

    pub fn player_for(&self, group: DeviceGroupId) -> Option<PlayerId> {
        self.by_group.get(&group).copied()
    }

    /// Mapped players in logical id order.
    pub fn slots(&self) -> impl Iterator<Item = &PlayerSlot> {
        self.slots.values()
    }

    pub fn players(&self) -> Vec<PlayerId> {
        self.slots.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Forgets every mapping (session teardown only).
    pub fn reset(&mut self) {
        self.slots.clear();
        self.by_group.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> PlayerCubeSetMapper {
        PlayerCubeSetMapper::new(&SessionConfig::default())
    }

    #[test]
    fn test_assign_is_idempotent() {
        let mut mapper = mapper();
        let first = mapper.assign(DeviceGroupId(1), 10).unwrap();
        let second = mapper.assign(DeviceGroupId(1), 20).unwrap();
        assert_eq!(first, PlayerId(0));
        assert_eq!(first, second);
        assert_eq!(mapper.slot(first).unwrap().mapped_at, 10);
    }

    #[test]
    fn test_assign_allocates_in_completion_order() {
        let mut mapper = mapper();
        assert_eq!(mapper.assign(DeviceGroupId(1), 0).unwrap(), PlayerId(0));
        assert_eq!(mapper.assign(DeviceGroupId(0), 5).unwrap(), PlayerId(1));
        assert_eq!(mapper.player_for(DeviceGroupId(0)), Some(PlayerId(1)));
        assert_eq!(mapper.players(), vec![PlayerId(0), PlayerId(1)]);
    }

    #[test]
    fn test_unknown_group_rejected() {
        let mut mapper = mapper();
        assert_eq!(
            mapper.assign(DeviceGroupId(7), 0),
            Err(SessionError::UnknownDeviceGroup(DeviceGroupId(7)))
        );
        assert!(mapper.is_empty());
    }

    #[test]
    fn test_input_uses_reserved_station() {
        let mut mapper = mapper();
        let player = mapper.assign_input(InputKind::Gamepad, 0).unwrap();
        assert_eq!(mapper.slot(player).unwrap().device_group, DeviceGroupId(1));
        // Hardware start on the same station reuses the player
        assert_eq!(mapper.assign(DeviceGroupId(1), 3).unwrap(), player);
    }

    #[test]
    fn test_reset_clears_table() {
        let mut mapper = mapper();
        mapper.assign(DeviceGroupId(0), 0).unwrap();
        mapper.reset();
        assert!(mapper.is_empty());
        assert_eq!(mapper.player_for(DeviceGroupId(0)), None);
        assert_eq!(mapper.assign(DeviceGroupId(1), 0).unwrap(), PlayerId(0));
    }
}
