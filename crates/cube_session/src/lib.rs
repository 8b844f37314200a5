//! # Cube Session - BlockWords Session Coordination Core
//!
//! Session coordination for BlockWords, a word game played on physical
//! letter cubes. Each player owns a station of six cubes that talk to the
//! game over a publish/subscribe bus. This crate decides when a game starts,
//! which station belongs to which player and how letters stay consistent
//! across every player's rack.
//!
//! ## Design Philosophy
//!
//! The core is **synchronous and I/O free**:
//!
//! * [`SessionCoordinator`] owns every component outright and is driven by
//!   decoded [`InboundMessage`]s and clock ticks
//! * Each call returns a [`Dispatch`] of outbound messages and
//!   [`SessionEvent`]s; nothing is published from inside the core
//! * The [`transport`] module is the only place that touches a bus
//!
//! ## Architecture Overview
//!
//! ### Components
//!
//! * **NeighborGraph** - latest "right neighbor" report per cube
//! * **StartSequenceDetector** - one per station; a three-cube chain held
//!   through the countdown starts the game
//! * **PlayerCubeSetMapper** - binds stations to logical players in
//!   completion order
//! * **RackSynchronizer** - owns every rack and mirrors letter replacements
//!   by slot identity
//! * **Publisher** - writes outbound messages in order, dropping stale
//!   epochs and retained duplicates
//!
//! ### Message Flow
//!
//! 1. The transport receives `(topic, payload)` and [`decode`] turns it into
//!    an [`InboundMessage`]
//! 2. The dispatch task calls [`SessionCoordinator::dispatch`] or
//!    [`SessionCoordinator::tick`]
//! 3. The returned messages are queued to the [`Publisher`]
//! 4. The returned events go to whoever listens (game engine, logs)
//!
//! ## Error Handling
//!
//! * [`SessionError`] - a message referenced something that does not exist;
//!   the message is dropped and the session continues
//! * [`ProtocolError`] - a bus message could not be decoded
//! * [`TransportError`] - the bus refused a publish or subscription
//!
//! ## Example
//!
//! ```rust
//! use cube_session::{
//!     FixedLetterPool, InboundMessage, SessionConfig, SessionCoordinator, WordListJudge,
//! };
//! use cube_session::types::DeviceId;
//!
//! let mut coordinator = SessionCoordinator::new(
//!     SessionConfig::default(),
//!     Box::new(FixedLetterPool::new(['S', 'T', 'O', 'R', 'E', 'D'])),
//!     Box::new(WordListJudge::from_words(["STORE"])),
//! );
//!
//! for (sender, neighbor) in [(1, 2), (2, 3)] {
//!     coordinator
//!         .dispatch(
//!             InboundMessage::NeighborReport {
//!                 sender: DeviceId(sender),
//!                 neighbor: Some(DeviceId(neighbor)),
//!             },
//!             0,
//!         )
//!         .unwrap();
//! }
//!
//! let out = coordinator.tick(6_000);
//! assert!(coordinator.phase().is_running());
//! assert_eq!(out.last_payload("cube/1/letter"), Some("S"));
//! ```

// Re-export core types for easy access
pub use collaborators::{
    FixedLetterPool, GuessJudge, Judgement, LetterPool, RandomLetterPool, WordListJudge,
};
pub use config::{InputReservations, SessionConfig, StationConfig};
pub use coordinator::{Dispatch, Phase, SessionCoordinator, SessionEvent};
pub use error::{ProtocolError, SessionError, TransportError};
pub use messaging::{decode, FinalScore, GameParams, InboundMessage, OutboundMessage};
pub use shutdown::ShutdownState;
pub use transport::{MemoryBus, Publisher, Transport};
pub use utils::{create_coordinator, create_coordinator_with};

// Public module declarations
pub mod collaborators;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod messaging;
pub mod players;
pub mod rack;
pub mod shutdown;
pub mod start;
pub mod transport;
pub mod types;
pub mod utils;

// Internal modules (not part of public API)
mod tests;
