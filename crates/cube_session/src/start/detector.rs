//! Per-station start detection.
//!
//! A station starts a game when three of its cubes are placed side by side in
//! order and stay that way through the whole countdown. The detector is a
//! small state machine fed by [`NeighborGraph`] snapshots and clock ticks:
//!
//! ```text
//! EMPTY ──edge──▶ CHAINING ──3-chain──▶ ARMED ──deadline──▶ COMPLETE
//!   ▲                 ▲                   │
//!   └─────────────────┴──── chain broken ─┘
//! ```
//!
//! Breaking the chain while armed drops the countdown entirely; a reformed
//! chain has to sit out the full window again.

use super::neighbor_graph::{NeighborGraph, START_CHAIN_LEN};
use crate::types::{DeviceGroupId, DeviceId, Millis, RACK_SIZE};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

/// Countdown stages, one per cube of the station.
pub const COUNTDOWN_STAGES: u64 = RACK_SIZE as u64;

/// Detector state for one station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum StartState {
    Empty,
    Chaining,
    Armed { armed_at: Millis, deadline: Millis },
    Complete,
}

impl fmt::Display for StartState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartState::Empty => write!(f, "EMPTY"),
            StartState::Chaining => write!(f, "CHAINING"),
            StartState::Armed { deadline, .. } => write!(f, "ARMED(until {deadline})"),
            StartState::Complete => write!(f, "COMPLETE"),
        }
    }
}

/// Transitions callers care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartTransition {
    /// A start chain formed; the countdown runs until `deadline`.
    Armed {
        group: DeviceGroupId,
        chain: Vec<DeviceId>,
        deadline: Millis,
    },
    /// The chain broke before the deadline.
    Cancelled { group: DeviceGroupId },
    /// The chain held through the countdown. Emitted once per arming cycle.
    Triggered {
        group: DeviceGroupId,
        chain: Vec<DeviceId>,
    },
}

/// Start sequence state machine for a single station.
#[derive(Debug, Clone)]
pub struct StartSequenceDetector {
    group: DeviceGroupId,
    devices: Vec<DeviceId>,
    stage_ms: Millis,
    state: StartState,
    chain: Vec<DeviceId>,
    designated: Option<[DeviceId; START_CHAIN_LEN]>,
}

impl StartSequenceDetector {
    /// Creates an empty detector for `group` owning `devices`.
    ///
    /// # Arguments
    ///
    /// * `stage_ms` - Length of one countdown stage; the full countdown is
    ///   [`COUNTDOWN_STAGES`] stages long.
    pub fn new(group: DeviceGroupId, devices: Vec<DeviceId>, stage_ms: Millis) -> Self {
        Self {
            group,
            devices,
            stage_ms,
            state: StartState::Empty,
            chain: Vec::new(),
            designated: None,
        }
    }

    pub fn group(&self) -> DeviceGroupId {
        self.group
    }

    pub fn devices(&self) -> &[DeviceId] {
        &self.devices
    }

    pub fn state(&self) -> StartState {
        self.state
    }

    /// The chain the countdown runs on while armed or complete, otherwise
    /// the longest in-station chain seen by the last observation.
    pub fn chain(&self) -> &[DeviceId] {
        &self.chain
    }

    pub fn deadline(&self) -> Option<Millis> {
        match self.state {
            StartState::Armed { deadline, .. } => Some(deadline),
            _ => None,
        }
    }

    pub fn countdown_ms(&self) -> Millis {
        self.stage_ms * COUNTDOWN_STAGES
    }

    /// Restricts arming to the exact chain `a -> b -> c`, or lifts the
    /// restriction with `None`.
    pub fn designate(&mut self, chain: Option<[DeviceId; START_CHAIN_LEN]>) {
        self.designated = chain;
    }

    pub fn designated(&self) -> Option<[DeviceId; START_CHAIN_LEN]> {
        self.designated
    }

    /// Countdown stages fully elapsed at `now`, 0 when not armed.
    pub fn elapsed_stages(&self, now: Millis) -> u64 {
        match self.state {
            StartState::Armed { armed_at, .. } if self.stage_ms > 0 => {
                (now.saturating_sub(armed_at) / self.stage_ms).min(COUNTDOWN_STAGES)
            }
            _ => 0,
        }
    }

    /// Re-evaluates the station against the live graph.
    ///
    /// Ignored once the detector is complete; the graph keeps recording.
    pub fn observe(&mut self, graph: &NeighborGraph, now: Millis) -> Option<StartTransition> {
        if self.state == StartState::Complete {
            return None;
        }

        if matches!(self.state, StartState::Armed { .. }) && self.armed_chain_intact(graph) {
            return None;
        }

        let longest = self.longest_chain(graph);
        match (self.state, self.armable_chain(&longest, graph)) {
            (_, Some(chain)) => {
                let deadline = now + self.countdown_ms();
                self.state = StartState::Armed { armed_at: now, deadline };
                self.chain = chain.clone();
                info!(
                    "⏳ {} armed on {:?}, countdown ends at {}",
                    self.group, chain, deadline
                );
                Some(StartTransition::Armed {
                    group: self.group,
                    chain,
                    deadline,
                })
            }
            (previous, None) => {
                self.state = if longest.len() > 1 {
                    StartState::Chaining
                } else {
                    StartState::Empty
                };
                self.chain = longest;
                if matches!(previous, StartState::Armed { .. }) {
                    info!("✋ {} chain broken, countdown cancelled", self.group);
                    Some(StartTransition::Cancelled { group: self.group })
                } else {
                    if previous != self.state {
                        debug!("{}: {} -> {}", self.group, previous, self.state);
                    }
                    None
                }
            }
        }
    }

    /// Completes the countdown once `now` reaches the deadline.
    pub fn tick(&mut self, now: Millis) -> Option<StartTransition> {
        match self.state {
            StartState::Armed { deadline, .. } if now >= deadline => {
                self.state = StartState::Complete;
                info!("🚦 {} start sequence complete on {:?}", self.group, self.chain);
                Some(StartTransition::Triggered {
                    group: self.group,
                    chain: self.chain.clone(),
                })
            }
            _ => None,
        }
    }

    /// Back to EMPTY, forgetting any designated chain.
    pub fn reset(&mut self) {
        self.state = StartState::Empty;
        self.chain.clear();
        self.designated = None;
    }

    fn contains(&self, device: DeviceId) -> bool {
        self.devices.contains(&device)
    }

    fn longest_chain(&self, graph: &NeighborGraph) -> Vec<DeviceId> {
        let mut best: Vec<DeviceId> = Vec::new();
        for device in &self.devices {
            let chain = graph.walk(*device, START_CHAIN_LEN, |d| self.contains(d));
            if chain.len() > best.len() {
                best = chain;
            }
        }
        best
    }

    /// The chain that may arm the countdown right now, if any.
    fn armable_chain(&self, longest: &[DeviceId], graph: &NeighborGraph) -> Option<Vec<DeviceId>> {
        match self.designated {
            Some(designated) => {
                let chain = graph.walk(designated[0], START_CHAIN_LEN, |d| self.contains(d));
                (chain == designated).then_some(chain)
            }
            None => (longest.len() == START_CHAIN_LEN).then(|| longest.to_vec()),
        }
    }

    fn armed_chain_intact(&self, graph: &NeighborGraph) -> bool {
        match self.chain.first() {
            Some(head) => graph.walk(*head, START_CHAIN_LEN, |d| self.contains(d)) == self.chain,
            None => false,
        }
    }
}

/// Picks three reported, mutually non-adjacent devices of a station to show
/// the `A`, `B`, `C` prompts on, in device order.
pub fn choose_prompt_devices(
    graph: &NeighborGraph,
    devices: &[DeviceId],
) -> Option<[DeviceId; START_CHAIN_LEN]> {
    let touching = |a: DeviceId, b: DeviceId| {
        graph.neighbor_of(a) == Some(b) || graph.neighbor_of(b) == Some(a)
    };

    let mut picked: Vec<DeviceId> = Vec::with_capacity(START_CHAIN_LEN);
    for device in devices.iter().copied().filter(|d| graph.reported(*d)) {
        if picked.len() == START_CHAIN_LEN {
            break;
        }
        if !picked.iter().any(|p| touching(*p, device)) {
            picked.push(device);
        }
    }
    picked.try_into().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAGE: Millis = 100;
    const COUNTDOWN: Millis = STAGE * COUNTDOWN_STAGES;

    fn d(id: u16) -> DeviceId {
        DeviceId(id)
    }

    fn detector() -> StartSequenceDetector {
        StartSequenceDetector::new(DeviceGroupId(0), (1..=6).map(d).collect(), STAGE)
    }

    fn report(
        graph: &mut NeighborGraph,
        det: &mut StartSequenceDetector,
        from: u16,
        to: Option<u16>,
        now: Millis,
    ) -> Option<StartTransition> {
        graph.report(d(from), to.map(d));
        det.observe(graph, now)
    }

    #[test]
    fn test_two_device_chain_stays_chaining() {
        let mut graph = NeighborGraph::new();
        let mut det = detector();
        assert_eq!(det.state(), StartState::Empty);

        assert!(report(&mut graph, &mut det, 1, Some(2), 0).is_none());
        assert_eq!(det.state(), StartState::Chaining);
        assert_eq!(det.chain(), &[d(1), d(2)]);
        assert!(det.tick(10 * COUNTDOWN).is_none());
        assert_eq!(det.state(), StartState::Chaining);
    }

    #[test]
    fn test_three_chain_completes_exactly_once() {
        let mut graph = NeighborGraph::new();
        let mut det = detector();
        report(&mut graph, &mut det, 1, Some(2), 0);
        let armed = report(&mut graph, &mut det, 2, Some(3), 50);
        assert_eq!(
            armed,
            Some(StartTransition::Armed {
                group: DeviceGroupId(0),
                chain: vec![d(1), d(2), d(3)],
                deadline: 50 + COUNTDOWN,
            })
        );

        assert!(det.tick(50 + COUNTDOWN - 1).is_none());
        assert!(matches!(
            det.tick(50 + COUNTDOWN),
            Some(StartTransition::Triggered { .. })
        ));
        assert_eq!(det.state(), StartState::Complete);
        assert!(det.tick(50 + COUNTDOWN + 1).is_none());

        // Complete ignores further reports for starting purposes
        assert!(report(&mut graph, &mut det, 2, None, 2000).is_none());
        assert_eq!(det.state(), StartState::Complete);
    }

    #[test]
    fn test_break_cancels_and_rearm_needs_full_countdown() {
        let mut graph = NeighborGraph::new();
        let mut det = detector();
        report(&mut graph, &mut det, 1, Some(2), 0);
        report(&mut graph, &mut det, 2, Some(3), 0);

        let cancelled = report(&mut graph, &mut det, 2, None, COUNTDOWN - 10);
        assert_eq!(cancelled, Some(StartTransition::Cancelled { group: DeviceGroupId(0) }));
        assert_eq!(det.state(), StartState::Chaining);
        assert!(det.tick(COUNTDOWN).is_none());

        report(&mut graph, &mut det, 2, Some(3), COUNTDOWN);
        assert_eq!(det.deadline(), Some(2 * COUNTDOWN));
        assert!(det.tick(2 * COUNTDOWN - 1).is_none());
        assert!(det.tick(2 * COUNTDOWN).is_some());
    }

    #[test]
    fn test_break_to_empty() {
        let mut graph = NeighborGraph::new();
        let mut det = detector();
        report(&mut graph, &mut det, 1, Some(2), 0);
        report(&mut graph, &mut det, 2, Some(3), 0);
        report(&mut graph, &mut det, 1, None, 10);
        // 2 -> 3 still forms a chain
        assert_eq!(det.state(), StartState::Chaining);
        let cancelled = report(&mut graph, &mut det, 2, None, 20);
        assert!(cancelled.is_none());
        assert_eq!(det.state(), StartState::Empty);
    }

    #[test]
    fn test_unrelated_reports_keep_deadline() {
        let mut graph = NeighborGraph::new();
        let mut det = detector();
        report(&mut graph, &mut det, 1, Some(2), 0);
        report(&mut graph, &mut det, 2, Some(3), 0);
        assert!(report(&mut graph, &mut det, 5, Some(6), 200).is_none());
        assert_eq!(det.deadline(), Some(COUNTDOWN));
    }

    #[test]
    fn test_chain_truncated_at_foreign_device() {
        let mut graph = NeighborGraph::new();
        let mut det = detector();
        report(&mut graph, &mut det, 5, Some(6), 0);
        report(&mut graph, &mut det, 6, Some(11), 0);
        assert_eq!(det.state(), StartState::Chaining);
        assert_eq!(det.chain(), &[d(5), d(6)]);
    }

    #[test]
    fn test_designated_chain_required() {
        let mut graph = NeighborGraph::new();
        let mut det = detector();
        det.designate(Some([d(1), d(3), d(5)]));

        report(&mut graph, &mut det, 1, Some(2), 0);
        assert!(report(&mut graph, &mut det, 2, Some(3), 0).is_none());
        assert_eq!(det.state(), StartState::Chaining);

        report(&mut graph, &mut det, 1, Some(3), 10);
        let armed = report(&mut graph, &mut det, 3, Some(5), 20);
        assert!(matches!(
            armed,
            Some(StartTransition::Armed { ref chain, .. }) if chain == &vec![d(1), d(3), d(5)]
        ));
    }

    #[test]
    fn test_elapsed_stages() {
        let mut graph = NeighborGraph::new();
        let mut det = detector();
        assert_eq!(det.elapsed_stages(500), 0);
        report(&mut graph, &mut det, 1, Some(2), 1000);
        report(&mut graph, &mut det, 2, Some(3), 1000);
        assert_eq!(det.elapsed_stages(1000), 0);
        assert_eq!(det.elapsed_stages(1000 + STAGE * 2 + 5), 2);
        assert_eq!(det.elapsed_stages(1000 + 100 * STAGE), COUNTDOWN_STAGES);
    }

    #[test]
    fn test_reset() {
        let mut graph = NeighborGraph::new();
        let mut det = detector();
        det.designate(Some([d(1), d(2), d(3)]));
        report(&mut graph, &mut det, 1, Some(2), 0);
        report(&mut graph, &mut det, 2, Some(3), 0);
        det.tick(COUNTDOWN);
        det.reset();
        assert_eq!(det.state(), StartState::Empty);
        assert!(det.chain().is_empty());
        assert!(det.designated().is_none());
    }

    #[test]
    fn test_choose_prompt_devices() {
        let mut graph = NeighborGraph::new();
        let devices: Vec<DeviceId> = (1..=6).map(d).collect();
        graph.report(d(1), Some(d(2)));
        graph.report(d(2), None);
        assert_eq!(choose_prompt_devices(&graph, &devices), None);

        graph.report(d(3), None);
        graph.report(d(4), None);
        // 2 touches 1, so 1, 3, 4 are chosen
        assert_eq!(
            choose_prompt_devices(&graph, &devices),
            Some([d(1), d(3), d(4)])
        );
    }
}
