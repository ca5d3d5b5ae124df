//! Tile identity and attributes.

use serde::{Deserialize, Serialize};

/// Stable dense index of a tile within its map.
pub type TileIndex = usize;

/// Player identifier. `NEUTRAL` marks unowned tiles.
pub type PlayerId = i8;

/// The owner id of neutral tiles.
pub const NEUTRAL: PlayerId = -1;

/// A single map tile.
///
/// Tiles are created by the map and never by the planning engine; the engine
/// reads owner/army/terrain and tracks everything else in side tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub index: TileIndex,
    pub x: u16,
    pub y: u16,
    pub player: PlayerId,
    pub army: i32,
    pub is_city: bool,
    pub is_general: bool,
    pub is_mountain: bool,
    pub is_obstacle: bool,
}

impl Tile {
    /// Creates a neutral, empty, passable tile at the given coordinates.
    pub fn new(index: TileIndex, x: u16, y: u16) -> Self {
        Tile {
            index,
            x,
            y,
            player: NEUTRAL,
            army: 0,
            is_city: false,
            is_general: false,
            is_mountain: false,
            is_obstacle: false,
        }
    }

    /// True if no unit may enter or path through this tile.
    pub fn blocks_movement(&self) -> bool {
        self.is_mountain || self.is_obstacle
    }

    /// True if this tile is owned by any player.
    pub fn is_owned(&self) -> bool {
        self.player != NEUTRAL
    }
}
