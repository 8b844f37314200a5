//! Words spelled by physically chained cubes.
//!
//! While a session runs, every chain of cubes on a mapped station spells a
//! word from that player's rack. Each word is judged and the station's
//! borders are redrawn to show the verdicts.

use super::core::SessionCoordinator;
use super::events::{Dispatch, SessionEvent};
use crate::collaborators::Judgement;
use crate::messaging::{Border, BorderColor, OutboundMessage};
use crate::types::{DeviceGroupId, DeviceId, SlotId};
use std::collections::HashMap;
use tracing::debug;

fn border_color(judgement: Judgement) -> BorderColor {
    match judgement {
        Judgement::Good => BorderColor::Good,
        Judgement::Old => BorderColor::Old,
        Judgement::Bad => BorderColor::Bad,
    }
}

impl SessionCoordinator {
    /// Slot chains currently formed on `group`, translated through the fixed
    /// slot-to-cube binding.
    pub(super) fn word_slots(&self, group: DeviceGroupId) -> Vec<(Vec<DeviceId>, Vec<SlotId>)> {
        let Some(station) = self.config.station(group) else {
            return Vec::new();
        };
        self.graph
            .word_chains(&station.devices)
            .into_iter()
            .map(|chain| {
                let slots = chain
                    .iter()
                    .filter_map(|d| station.devices.iter().position(|s| s == d))
                    .filter_map(|i| SlotId::new(i as u8))
                    .collect();
                (chain, slots)
            })
            .collect()
    }

    /// Whether any word on `group` uses `slot`.
    pub(super) fn slot_in_words(&self, group: DeviceGroupId, slot: SlotId) -> bool {
        self.word_slots(group)
            .iter()
            .any(|(_, slots)| slots.contains(&slot))
    }

    /// Judges every word on `group` and redraws its borders.
    ///
    /// Good words flash their cubes. Cubes outside any word lose their
    /// border.
    pub(super) fn evaluate_words(&mut self, group: DeviceGroupId, out: &mut Dispatch) {
        let Some(player) = self.mapper.player_for(group) else {
            return;
        };
        let Some(station_devices) = self.config.station(group).map(|s| s.devices.clone()) else {
            return;
        };

        let mut borders: HashMap<DeviceId, Border> = HashMap::new();
        for (chain, slots) in self.word_slots(group) {
            let Some(rack) = self.racks.rack(player) else {
                return;
            };
            let word: String = slots.iter().map(|s| rack.letter_at(*s)).collect();
            let judgement = self.judge.judge(player, &word);
            debug!("🔤 {} spelled '{}' on {:?}: {:?}", player, word, chain, judgement);

            let color = border_color(judgement);
            let last = chain.len().saturating_sub(1);
            for (i, device) in chain.iter().enumerate() {
                borders.insert(
                    *device,
                    Border::Word {
                        first: i == 0,
                        last: i == last,
                        color,
                    },
                );
                if judgement == Judgement::Good {
                    out.publish(OutboundMessage::flash(*device, self.epoch));
                }
            }
            out.emit(SessionEvent::GuessJudged {
                player,
                word,
                slots,
                judgement,
            });
        }

        for device in station_devices {
            let border = borders.remove(&device).unwrap_or(Border::Clear);
            out.publish(OutboundMessage::border(device, border, self.epoch));
        }
    }
}
