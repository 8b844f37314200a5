//! Core session coordinator implementation.
//!
//! This module contains the `SessionCoordinator` struct and its public entry
//! points. Message-specific handling lives in `handlers`, display
//! construction in `display` and cube-word evaluation in `words`.

use super::control::{Phase, SessionControl};
use super::events::{Dispatch, SessionEvent};
use crate::collaborators::{GuessJudge, LetterPool};
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::messaging::{GameParams, InboundMessage};
use crate::players::PlayerCubeSetMapper;
use crate::rack::RackSynchronizer;
use crate::start::{NeighborGraph, StartSequenceDetector, StartTransition};
use crate::types::{DeviceGroupId, DeviceId, Millis, PlayerId};
use tracing::{debug, info, warn};

/// Top-level orchestrator of a cube session.
///
/// `SessionCoordinator` owns every session component outright and drives them
/// in a fixed order for each inbound message. It performs no I/O: each call
/// returns the outbound messages and events it produced, and the caller is
/// responsible for delivering them.
///
/// # Architecture
///
/// * **NeighborGraph**: live right-neighbor links reported by the cubes
/// * **StartSequenceDetector**: one per station, arms and completes the start
///   countdown
/// * **PlayerCubeSetMapper**: binds stations to logical players
/// * **RackSynchronizer**: owns the racks and mirrors letter replacements
/// * **Collaborators**: letter pool and guess judge supplied at construction
///
/// # Epochs
///
/// Every reset increments the epoch, and every outbound message carries the
/// epoch it was produced in so a publisher can drop stale output.
pub struct SessionCoordinator {
    pub(super) config: SessionConfig,
    pub(super) graph: NeighborGraph,
    pub(super) detectors: Vec<StartSequenceDetector>,
    pub(super) mapper: PlayerCubeSetMapper,
    pub(super) racks: RackSynchronizer,
    pub(super) pool: Box<dyn LetterPool>,
    pub(super) judge: Box<dyn GuessJudge>,
    pub(super) control: SessionControl,
    pub(super) epoch: u64,
}

impl SessionCoordinator {
    /// Creates a coordinator for the stations in `config`.
    ///
    /// # Arguments
    ///
    /// * `config` - Station layout and timing; expected to be validated
    /// * `pool` - Source of the letters dealt at session start
    /// * `judge` - Dictionary used for cube and keyboard guesses
    pub fn new(
        config: SessionConfig,
        pool: Box<dyn LetterPool>,
        judge: Box<dyn GuessJudge>,
    ) -> Self {
        let detectors = config
            .stations
            .iter()
            .map(|s| StartSequenceDetector::new(s.id, s.devices.clone(), config.countdown_stage_ms))
            .collect();
        let mapper = PlayerCubeSetMapper::new(&config);

        Self {
            config,
            graph: NeighborGraph::new(),
            detectors,
            mapper,
            racks: RackSynchronizer::new(),
            pool,
            judge,
            control: SessionControl::new(GameParams::default()),
            epoch: 0,
        }
    }

    /// Replaces the game parameters used until the next valid `game/start`.
    pub fn with_params(mut self, params: GameParams) -> Self {
        self.control.params = params;
        self
    }

    /// Blanks every configured cube: letter, border and lock.
    pub fn boot(&mut self, now: Millis) -> Dispatch {
        info!(
            "🔌 Booting session over {} station(s) at {}",
            self.config.stations.len(),
            now
        );
        let mut out = Dispatch::default();
        self.clear_all_devices(&mut out);
        out
    }

    /// Processes one inbound message through the full pipeline.
    ///
    /// # Errors
    ///
    /// Returns the [`SessionError`] that made the message unusable. The error
    /// is already logged and the session state is unchanged by the failed
    /// step; callers just drop the message.
    pub fn dispatch(
        &mut self,
        message: InboundMessage,
        now: Millis,
    ) -> Result<Dispatch, SessionError> {
        let mut out = Dispatch::default();
        let result = match message {
            InboundMessage::NeighborReport { sender, neighbor } => {
                self.on_neighbor_report(sender, neighbor, now, &mut out);
                Ok(())
            }
            InboundMessage::Guess { word } => self.on_guess(&word, now, &mut out),
            InboundMessage::ForceStart => self.on_force_start(now, &mut out),
            InboundMessage::Abort => {
                self.reset_into(now, &mut out);
                Ok(())
            }
            InboundMessage::GameStart { params } => {
                self.on_game_start(params, now, &mut out);
                Ok(())
            }
            InboundMessage::LetterLanded {
                player,
                position,
                letter,
            } => self.on_letter_landed(player, position, letter, &mut out),
            InboundMessage::LetterLock { player, position } => {
                self.on_letter_lock(player, position, &mut out)
            }
            InboundMessage::GameFinished(score) => {
                self.on_game_finished(score, &mut out);
                Ok(())
            }
        };

        match result {
            Ok(()) => Ok(out),
            Err(e) => {
                warn!("⚠️ Dropping message: {}", e);
                Err(e)
            }
        }
    }

    /// Advances time-driven behavior: countdown display, countdown
    /// completion and the periodic letter rebroadcast.
    pub fn tick(&mut self, now: Millis) -> Dispatch {
        let mut out = Dispatch::default();

        for index in 0..self.detectors.len() {
            self.advance_countdown(index, now, &mut out);
        }

        let triggered: Vec<DeviceGroupId> = self
            .detectors
            .iter_mut()
            .filter_map(|d| d.tick(now))
            .filter_map(|t| match t {
                StartTransition::Triggered { group, .. } => Some(group),
                _ => None,
            })
            .collect();

        for group in triggered {
            self.control.countdowns.remove(&group);
            let result = if self.control.is_running() {
                self.late_join(group, now, &mut out).map(|_| ())
            } else {
                self.start_session(Some(group), now, &mut out)
            };
            if let Err(e) = result {
                warn!("⚠️ Could not bring {} into the session: {}", group, e);
            }
        }

        self.rebroadcast_if_due(now, &mut out);
        out
    }

    /// Hard reset: clears the graph, every detector, the player table and the
    /// racks, then bumps the epoch. Start detection is re-enabled.
    pub fn reset(&mut self, now: Millis) -> Dispatch {
        let mut out = Dispatch::default();
        self.reset_into(now, &mut out);
        out
    }

    pub(super) fn reset_into(&mut self, now: Millis, out: &mut Dispatch) {
        self.epoch += 1;
        info!("🔄 Session reset at {} (epoch {})", now, self.epoch);

        self.graph.clear();
        for detector in &mut self.detectors {
            detector.reset();
        }
        self.mapper.reset();
        self.racks.clear();
        self.judge.reset();
        self.control.end_session();
        self.control.start_enabled = true;

        self.clear_all_devices(out);
        out.emit(SessionEvent::SessionReset { epoch: self.epoch });
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn phase(&self) -> Phase {
        self.control.phase
    }

    /// Parameters the next game will be played with.
    pub fn params(&self) -> &GameParams {
        &self.control.params
    }

    /// Whether a completed start sequence may start a session right now.
    pub fn start_enabled(&self) -> bool {
        self.control.start_enabled
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn graph(&self) -> &NeighborGraph {
        &self.graph
    }

    pub fn detector(&self, group: DeviceGroupId) -> Option<&StartSequenceDetector> {
        self.detectors.iter().find(|d| d.group() == group)
    }

    pub fn mapper(&self) -> &PlayerCubeSetMapper {
        &self.mapper
    }

    pub fn racks(&self) -> &RackSynchronizer {
        &self.racks
    }

    /// Station owning `device`.
    pub(super) fn group_of(&self, device: DeviceId) -> Option<DeviceGroupId> {
        self.config.station_of(device).map(|s| s.id)
    }

    /// Cubes of the station `player` is bound to, in slot order.
    pub(super) fn devices_of(&self, player: PlayerId) -> Result<Vec<DeviceId>, SessionError> {
        let slot = self
            .mapper
            .slot(player)
            .ok_or(SessionError::UnknownPlayer(player))?;
        self.config
            .station(slot.device_group)
            .map(|s| s.devices.clone())
            .ok_or(SessionError::UnknownDeviceGroup(slot.device_group))
    }

    pub(super) fn detector_index(&self, group: DeviceGroupId) -> Option<usize> {
        self.detectors.iter().position(|d| d.group() == group)
    }

    fn rebroadcast_if_due(&mut self, now: Millis, out: &mut Dispatch) {
        let interval = self.config.rebroadcast_s * 1000;
        if interval == 0 || !self.control.is_running() {
            return;
        }
        if now.saturating_sub(self.control.last_rebroadcast) < interval {
            return;
        }
        self.control.last_rebroadcast = now;
        let before = out.messages.len();
        for player in self.mapper.players() {
            self.refresh_rack(player, out);
        }
        debug!(
            "📡 Rebroadcast {} letter(s) at {}",
            out.messages.len() - before,
            now
        );
    }
}

impl std::fmt::Debug for SessionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCoordinator")
            .field("epoch", &self.epoch)
            .field("phase", &self.control.phase)
            .field("players", &self.mapper.players())
            .finish()
    }
}
