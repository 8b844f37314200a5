//! Physical start detection: the neighbor graph and the per-station
//! countdown state machine built on top of it.

pub mod detector;
pub mod neighbor_graph;

pub use detector::{
    choose_prompt_devices, StartSequenceDetector, StartState, StartTransition, COUNTDOWN_STAGES,
};
pub use neighbor_graph::{NeighborGraph, START_CHAIN_LEN};
