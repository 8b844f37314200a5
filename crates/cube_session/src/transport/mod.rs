//! Transport boundary: the bus abstraction, an in-memory bus and the
//! outbound publisher.

pub mod bus;
pub mod publisher;

pub use bus::{topic_matches, BusMessage, MemoryBus, Transport};
pub use publisher::{PublishOutcome, Publisher, PublisherStats};
