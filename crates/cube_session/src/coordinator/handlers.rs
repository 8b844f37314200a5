//! Per-message handling for the session coordinator.
//!
//! Each handler validates everything it needs before touching session state,
//! so an error always leaves the session exactly as it was.

use super::control::Phase;
use super::core::SessionCoordinator;
use super::events::{Dispatch, SessionEvent};
use crate::collaborators::Judgement;
use crate::error::SessionError;
use crate::messaging::{FinalScore, GameParams, OutboundMessage, BLANK};
use crate::start::{choose_prompt_devices, StartState, StartTransition};
use crate::types::{DeviceGroupId, DeviceId, InputKind, Millis, PlayerId, SlotId};
use tracing::{debug, error, info};

impl SessionCoordinator {
    /// Records a neighbor report and reacts to it.
    ///
    /// # Flow
    ///
    /// 1. Update the graph (always, even for unknown cubes)
    /// 2. On a mapped station of a running session, re-judge its cube words
    /// 3. Otherwise, while starting is allowed, place prompts and feed the
    ///    station's start detector
    pub(super) fn on_neighbor_report(
        &mut self,
        sender: DeviceId,
        neighbor: Option<DeviceId>,
        now: Millis,
        out: &mut Dispatch,
    ) {
        let changed = self.graph.report(sender, neighbor);
        let Some(group) = self.group_of(sender) else {
            debug!("Cube {} is not part of any station", sender);
            return;
        };

        if self.control.is_running() && self.mapper.player_for(group).is_some() {
            if changed {
                self.evaluate_words(group, out);
            }
            return;
        }

        if !self.control.start_enabled {
            return;
        }
        if self.config.designated_prompts && !self.control.is_running() {
            self.assign_prompts(group, out);
        }
        self.observe_group(group, now, out);
    }

    /// Feeds the live graph to one station's detector and mirrors the
    /// transition on the cubes.
    pub(super) fn observe_group(&mut self, group: DeviceGroupId, now: Millis, out: &mut Dispatch) {
        let Some(index) = self.detector_index(group) else {
            return;
        };
        match self.detectors[index].observe(&self.graph, now) {
            Some(StartTransition::Armed {
                group,
                chain,
                deadline,
            }) => {
                self.begin_countdown(group, &chain, out);
                out.emit(SessionEvent::CountdownArmed {
                    group,
                    chain,
                    deadline,
                });
            }
            Some(StartTransition::Cancelled { group }) => {
                self.revert_countdown(group, out);
                out.emit(SessionEvent::CountdownCancelled { group });
            }
            Some(StartTransition::Triggered { .. }) | None => {}
        }
    }

    /// Picks and shows the `A`, `B`, `C` prompts once a station has enough
    /// reporting cubes.
    fn assign_prompts(&mut self, group: DeviceGroupId, out: &mut Dispatch) {
        if self.control.prompts.contains_key(&group) {
            return;
        }
        let Some(index) = self.detector_index(group) else {
            return;
        };
        let devices = self.detectors[index].devices();
        let Some(prompts) = choose_prompt_devices(&self.graph, devices) else {
            return;
        };
        info!("🅰️ {} start prompts on {:?}", group, prompts);
        self.detectors[index].designate(Some(prompts));
        self.control.prompts.insert(group, prompts);
        self.show_prompts(prompts, out);
    }

    pub(super) fn on_force_start(
        &mut self,
        now: Millis,
        out: &mut Dispatch,
    ) -> Result<(), SessionError> {
        if self.control.is_running() {
            debug!("Force start ignored, session already running");
            return Ok(());
        }
        self.start_session(None, now, out)
    }

    /// Deals the racks and starts gameplay.
    ///
    /// `group` is the station whose start sequence completed; `None` starts
    /// on the keyboard station without hardware detection.
    pub(super) fn start_session(
        &mut self,
        group: Option<DeviceGroupId>,
        now: Millis,
        out: &mut Dispatch,
    ) -> Result<(), SessionError> {
        match group {
            Some(group) => self.mapper.assign(group, now)?,
            None => self.mapper.assign_input(InputKind::Keyboard, now)?,
        };

        let players = self.mapper.players();
        let letters = self.pool.deal();
        self.racks.initialize(&players, letters)?;
        self.control.phase = Phase::Running { started_at: now };
        self.control.last_rebroadcast = now;
        self.control.prompts.clear();

        info!(
            "🚀 Session started at {} with {:?} on '{}'",
            now,
            players,
            letters.iter().collect::<String>()
        );

        let slots: Vec<_> = self.mapper.slots().copied().collect();
        for slot in &slots {
            out.emit(SessionEvent::PlayerJoined {
                player: slot.logical_id,
                group: slot.device_group,
                at: slot.mapped_at,
            });
        }
        out.emit(SessionEvent::SessionStarted {
            players: players.clone(),
            letters: letters.iter().collect(),
            params: self.control.params.clone(),
            at: now,
        });

        let stations: Vec<DeviceGroupId> = self.config.stations.iter().map(|s| s.id).collect();
        for station in stations {
            match self.mapper.player_for(station) {
                Some(player) => {
                    self.control.countdowns.remove(&station);
                    if let Some(index) = self.detector_index(station) {
                        self.detectors[index].reset();
                    }
                    self.show_rack(player, out);
                    self.evaluate_words(station, out);
                }
                None => {
                    let Some(index) = self.detector_index(station) else {
                        continue;
                    };
                    // An armed or just-completed station keeps its countdown
                    // and joins at its own deadline.
                    if matches!(
                        self.detectors[index].state(),
                        StartState::Armed { .. } | StartState::Complete
                    ) {
                        continue;
                    }
                    // Prompts of stations that missed the start go away; a
                    // full chain there starts a late-join countdown.
                    self.control.countdowns.remove(&station);
                    self.detectors[index].reset();
                    self.blank_group(station, out);
                    self.observe_group(station, now, out);
                }
            }
        }
        Ok(())
    }

    /// Brings a station into a running session with a rack copying the
    /// current shared letters. Already-mapped stations are left alone.
    pub(super) fn late_join(
        &mut self,
        group: DeviceGroupId,
        now: Millis,
        out: &mut Dispatch,
    ) -> Result<PlayerId, SessionError> {
        if let Some(player) = self.mapper.player_for(group) {
            return Ok(player);
        }
        if self.racks.is_empty() {
            return Err(SessionError::NoPlayers);
        }

        let player = self.mapper.assign(group, now)?;
        self.racks.join(player)?;
        if let Some(index) = self.detector_index(group) {
            self.detectors[index].reset();
        }
        self.control.countdowns.remove(&group);
        info!("🙋 {} joined the running session as {}", group, player);

        out.emit(SessionEvent::PlayerJoined {
            player,
            group,
            at: now,
        });
        self.clear_borders(group, out);
        self.show_rack(player, out);
        self.evaluate_words(group, out);
        Ok(player)
    }

    /// Keyboard guess: spelled from the keyboard player's rack, moved to the
    /// front of it and judged.
    pub(super) fn on_guess(
        &mut self,
        word: &str,
        now: Millis,
        out: &mut Dispatch,
    ) -> Result<(), SessionError> {
        if !self.control.is_running() {
            debug!("Guess '{}' ignored, no session running", word);
            return Ok(());
        }

        let group = self.config.inputs.station_for(InputKind::Keyboard);
        let player = self.late_join(group, now, out)?;
        let rack = self.racks.rack(player).ok_or_else(|| SessionError::no_rack(player))?;

        let Some(slots) = rack.slots_for_word(word) else {
            debug!("{} cannot spell '{}'", player, word);
            out.emit(SessionEvent::GuessJudged {
                player,
                word: word.to_string(),
                slots: Vec::new(),
                judgement: Judgement::Bad,
            });
            return Ok(());
        };

        self.racks.move_to_front(player, &slots)?;
        let judgement = self.judge.judge(player, word);
        info!("⌨️ {} guessed '{}': {:?}", player, word, judgement);

        if judgement == Judgement::Good {
            let devices = self.devices_of(player)?;
            for slot in &slots {
                if let Some(device) = devices.get(slot.index()) {
                    out.publish(OutboundMessage::flash(*device, self.epoch));
                }
            }
        }
        out.emit(SessionEvent::GuessJudged {
            player,
            word: word.to_string(),
            slots,
            judgement,
        });
        Ok(())
    }

    /// Stores new parameters when readable, then resets into a fresh
    /// waiting session with start detection enabled.
    pub(super) fn on_game_start(
        &mut self,
        params: Option<GameParams>,
        now: Millis,
        out: &mut Dispatch,
    ) {
        match params {
            Some(params) => {
                info!("🎮 New game parameters: {:?}", params);
                self.control.params = params;
            }
            None => debug!("Keeping game parameters {:?}", self.control.params),
        }
        self.reset_into(now, out);
    }

    /// A falling letter landed: replace the tile under it in every rack and
    /// update every station showing that slot.
    pub(super) fn on_letter_landed(
        &mut self,
        player: PlayerId,
        position: usize,
        letter: char,
        out: &mut Dispatch,
    ) -> Result<(), SessionError> {
        if !self.control.is_running() {
            debug!("Letter '{}' for {} ignored, no session running", letter, player);
            return Ok(());
        }
        let slot = self.slot_at(player, position)?;
        let updated = self.racks.replace(player, slot, letter)?;

        for p in &updated {
            if let Some(device) = self.device_for(*p, slot) {
                out.publish(OutboundMessage::letter(device, letter, self.epoch));
            }
        }
        out.emit(SessionEvent::LetterReplaced {
            owner: player,
            slot,
            letter,
            players: updated.clone(),
        });

        for p in updated {
            if let Some(group) = self.mapper.slot(p).map(|s| s.device_group) {
                if self.slot_in_words(group, slot) {
                    self.evaluate_words(group, out);
                }
            }
        }
        Ok(())
    }

    /// Moves the lock indicator to the cube bound to `position`'s slot on
    /// every station, or removes it.
    pub(super) fn on_letter_lock(
        &mut self,
        player: PlayerId,
        position: Option<usize>,
        out: &mut Dispatch,
    ) -> Result<(), SessionError> {
        if !self.control.is_running() {
            return Ok(());
        }
        let slot = match position {
            Some(position) => Some(self.slot_at(player, position)?),
            None => {
                self.racks.rack(player).ok_or_else(|| SessionError::no_rack(player))?;
                None
            }
        };

        for p in self.mapper.players() {
            let Some(group) = self.mapper.slot(p).map(|s| s.device_group) else {
                continue;
            };
            let cube = slot.and_then(|s| self.device_for(p, s));
            let previous = self.control.locks.get(&group).copied();
            if previous == cube {
                continue;
            }
            if let Some(previous) = previous {
                out.publish(OutboundMessage::lock(previous, false, self.epoch));
            }
            match cube {
                Some(cube) => {
                    self.control.locks.insert(group, cube);
                    out.publish(OutboundMessage::lock(cube, true, self.epoch));
                }
                None => {
                    self.control.locks.remove(&group);
                }
            }
        }
        Ok(())
    }

    /// Publishes the final score and winds the session down to waiting.
    pub(super) fn on_game_finished(&mut self, score: FinalScore, out: &mut Dispatch) {
        if !self.control.is_running() {
            debug!("Final score ignored, no session running");
            return;
        }

        match OutboundMessage::final_score(&score, self.epoch) {
            Ok(message) => out.publish(message),
            Err(e) => error!("❌ Could not encode final score: {}", e),
        }
        for player in self.mapper.players() {
            if let Ok(devices) = self.devices_of(player) {
                for device in devices {
                    out.publish(OutboundMessage::letter(device, BLANK, self.epoch));
                }
            }
        }
        for cube in self.control.locks.values() {
            out.publish(OutboundMessage::lock(*cube, false, self.epoch));
        }
        for station in &self.config.stations {
            self.clear_borders(station.id, out);
        }

        self.mapper.reset();
        self.racks.clear();
        self.judge.reset();
        for detector in &mut self.detectors {
            detector.reset();
        }
        self.control.end_session();
        self.control.start_enabled = self.control.params.min_win_score == 0;

        info!(
            "🏁 Game finished with score {} ({} stars), start detection {}",
            score.score,
            score.stars,
            if self.control.start_enabled { "enabled" } else { "disabled" }
        );
        out.emit(SessionEvent::SessionFinished { score });
    }

    /// Slot identity of the tile at `position` in `player`'s rack.
    fn slot_at(&self, player: PlayerId, position: usize) -> Result<SlotId, SessionError> {
        let rack = self.racks.rack(player).ok_or_else(|| SessionError::no_rack(player))?;
        rack.tile_at(position)
            .map(|tile| tile.id)
            .ok_or_else(|| SessionError::bad_position(player, position))
    }

    /// Cube showing `slot` for `player`.
    fn device_for(&self, player: PlayerId, slot: SlotId) -> Option<DeviceId> {
        self.devices_of(player).ok()?.get(slot.index()).copied()
    }
}
