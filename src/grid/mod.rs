//! Grid representation and per-tile storage.
//!
//! Contains the tile/map data structures the planning engine reads, plus the
//! dense per-tile scalar maps used for visited sets, distance labels, prizes,
//! and cost tables.

pub mod map;
pub mod matrix;
pub mod tile;

pub use map::GameMap;
pub use matrix::{TileMask, TileMatrix};
pub use tile::{PlayerId, Tile, TileIndex, NEUTRAL};
