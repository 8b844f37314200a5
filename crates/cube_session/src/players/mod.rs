//! Logical player allocation.

pub mod mapper;

pub use mapper::{PlayerCubeSetMapper, PlayerSlot};
