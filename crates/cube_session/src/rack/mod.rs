//! Tiles, racks and the synchronizer that keeps racks letter-equivalent.

pub mod player_rack;
pub mod synchronizer;
pub mod tile;

pub use player_rack::Rack;
pub use synchronizer::RackSynchronizer;
pub use tile::Tile;
