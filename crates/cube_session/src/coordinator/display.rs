//! Cube display output: rack letters, start prompts, countdown progress and
//! bulk clearing.

use super::control::Countdown;
use super::core::SessionCoordinator;
use super::events::Dispatch;
use crate::messaging::{Border, OutboundMessage, BLANK};
use crate::start::START_CHAIN_LEN;
use crate::types::{DeviceGroupId, DeviceId, Millis, PlayerId, SlotId};
use tracing::{debug, trace};

/// Letters shown on the designated start cubes, in chain order.
pub(crate) const PROMPT_LETTERS: [char; START_CHAIN_LEN] = ['A', 'B', 'C'];

/// Shown on a cube once its countdown stage has elapsed.
pub(crate) const COUNTDOWN_LETTER: char = '?';

impl SessionCoordinator {
    /// Publishes the player's letters on the cubes of their station, slot
    /// `k` on device `k`.
    pub(super) fn show_rack(&self, player: PlayerId, out: &mut Dispatch) {
        self.each_rack_cube(player, |device, letter| {
            out.publish(OutboundMessage::letter(device, letter, self.epoch));
        });
    }

    /// Non-retained repeat of [`Self::show_rack`].
    pub(super) fn refresh_rack(&self, player: PlayerId, out: &mut Dispatch) {
        self.each_rack_cube(player, |device, letter| {
            out.publish(OutboundMessage::letter_refresh(device, letter, self.epoch));
        });
    }

    fn each_rack_cube(&self, player: PlayerId, mut f: impl FnMut(DeviceId, char)) {
        let (Some(rack), Ok(devices)) = (self.racks.rack(player), self.devices_of(player)) else {
            debug!("No rack or station to display for {}", player);
            return;
        };
        for (slot, device) in SlotId::all().zip(devices) {
            f(device, rack.letter_at(slot));
        }
    }

    /// Blank letters and no borders on every cube of `group`.
    pub(super) fn blank_group(&self, group: DeviceGroupId, out: &mut Dispatch) {
        if let Some(station) = self.config.station(group) {
            for device in &station.devices {
                out.publish(OutboundMessage::letter(*device, BLANK, self.epoch));
                out.publish(OutboundMessage::border(*device, Border::Clear, self.epoch));
            }
        }
    }

    pub(super) fn clear_borders(&self, group: DeviceGroupId, out: &mut Dispatch) {
        if let Some(station) = self.config.station(group) {
            for device in &station.devices {
                out.publish(OutboundMessage::border(*device, Border::Clear, self.epoch));
            }
        }
    }

    /// Blank letter, no border and no lock on every configured cube.
    pub(super) fn clear_all_devices(&self, out: &mut Dispatch) {
        for device in self.config.all_devices() {
            out.publish(OutboundMessage::letter(device, BLANK, self.epoch));
            out.publish(OutboundMessage::border(device, Border::Clear, self.epoch));
            out.publish(OutboundMessage::lock(device, false, self.epoch));
        }
    }

    pub(super) fn show_prompts(&self, prompts: [DeviceId; START_CHAIN_LEN], out: &mut Dispatch) {
        for (device, letter) in prompts.iter().zip(PROMPT_LETTERS) {
            out.publish(OutboundMessage::letter(*device, letter, self.epoch));
        }
    }

    /// Starts countdown bookkeeping for a freshly armed station.
    ///
    /// Cubes turn into `?` one stage at a time: first the cubes outside the
    /// start chain, then the chain itself in order.
    pub(super) fn begin_countdown(
        &mut self,
        group: DeviceGroupId,
        chain: &[DeviceId],
        out: &mut Dispatch,
    ) {
        self.revert_countdown(group, out);
        let Some(station) = self.config.station(group) else {
            return;
        };
        let mut order: Vec<DeviceId> = station
            .devices
            .iter()
            .copied()
            .filter(|d| !chain.contains(d))
            .collect();
        order.extend_from_slice(chain);
        self.control.countdowns.insert(group, Countdown { order, shown: 0 });
    }

    /// Publishes `?` on every cube whose countdown stage has elapsed.
    pub(super) fn advance_countdown(&mut self, index: usize, now: Millis, out: &mut Dispatch) {
        let Some(detector) = self.detectors.get(index) else {
            return;
        };
        let group = detector.group();
        let elapsed = detector.elapsed_stages(now) as usize;
        let Some(countdown) = self.control.countdowns.get_mut(&group) else {
            return;
        };
        while countdown.shown < elapsed.min(countdown.order.len()) {
            let device = countdown.order[countdown.shown];
            trace!("{} countdown stage {} on cube {}", group, countdown.shown + 1, device);
            out.publish(OutboundMessage::letter(device, COUNTDOWN_LETTER, self.epoch));
            countdown.shown += 1;
        }
    }

    /// Undoes the countdown display of `group`, putting prompts back where
    /// they were.
    pub(super) fn revert_countdown(&mut self, group: DeviceGroupId, out: &mut Dispatch) {
        let Some(countdown) = self.control.countdowns.remove(&group) else {
            return;
        };
        let prompts = self.control.prompts.get(&group).copied();
        for device in countdown.order.iter().take(countdown.shown) {
            let letter = prompts
                .and_then(|p| p.iter().position(|d| d == device))
                .map(|i| PROMPT_LETTERS[i])
                .unwrap_or(BLANK);
            out.publish(OutboundMessage::letter(*device, letter, self.epoch));
        }
    }
}
