//! Session orchestration.
//!
//! The [`SessionCoordinator`] receives decoded inbound messages and clock
//! ticks, drives the graph, detectors, mapper and racks in a fixed order, and
//! returns a [`Dispatch`] of outbound messages and [`SessionEvent`]s.
//!
//! ## Pipeline
//!
//! 1. Neighbor report updates the [`crate::start::NeighborGraph`]
//! 2. The station's detector re-evaluates its chains
//! 3. A completed countdown maps the station to a player and deals racks
//! 4. Gameplay messages go through the [`crate::rack::RackSynchronizer`]
//! 5. Display messages reflect the new state on every affected cube

pub mod control;
pub mod core;
pub mod display;
pub mod events;
pub mod handlers;
pub mod words;

pub use control::Phase;
pub use core::SessionCoordinator;
pub use events::{Dispatch, SessionEvent};
