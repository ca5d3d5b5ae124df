//! Game map: dense tile storage and grid adjacency.
//!
//! Uses a flat `Vec<Tile>` indexed by `TileIndex` for O(1) lookup. Grid
//! geometry (the 4-neighborhood) is precomputed at construction and never
//! changes; terrain passability is filtered at access time through
//! [`GameMap::movable`] so terrain edits after construction stay coherent.

use serde::{Deserialize, Serialize};

use super::tile::{PlayerId, Tile, TileIndex, NEUTRAL};

/// Complete grid map state from the planning engine's perspective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameMap {
    pub width: u16,
    pub height: u16,
    pub tiles: Vec<Tile>,
    /// Per-tile grid neighbors (geometry only, not passability).
    neighbors: Vec<Vec<TileIndex>>,
    /// Player index -> team index. Solo games map each player to itself.
    teams: Vec<i8>,
}

impl GameMap {
    /// Creates a map of neutral, empty tiles with up to `players` players,
    /// each on their own team.
    pub fn new(width: u16, height: u16, players: usize) -> Self {
        let count = width as usize * height as usize;
        let mut tiles = Vec::with_capacity(count);
        for idx in 0..count {
            let x = (idx % width as usize) as u16;
            let y = (idx / width as usize) as u16;
            tiles.push(Tile::new(idx, x, y));
        }

        let mut neighbors = vec![Vec::with_capacity(4); count];
        for idx in 0..count {
            let x = idx % width as usize;
            let y = idx / width as usize;
            if x > 0 {
                neighbors[idx].push(idx - 1);
            }
            if x + 1 < width as usize {
                neighbors[idx].push(idx + 1);
            }
            if y > 0 {
                neighbors[idx].push(idx - width as usize);
            }
            if y + 1 < height as usize {
                neighbors[idx].push(idx + width as usize);
            }
        }

        GameMap {
            width,
            height,
            tiles,
            neighbors,
            teams: (0..players as i8).collect(),
        }
    }

    /// Number of tiles on the map.
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Converts grid coordinates to a tile index.
    pub fn index_of(&self, x: u16, y: u16) -> TileIndex {
        y as usize * self.width as usize + x as usize
    }

    /// The tile at the given index.
    pub fn tile(&self, index: TileIndex) -> &Tile {
        &self.tiles[index]
    }

    /// Mutable access to the tile at the given index.
    pub fn tile_mut(&mut self, index: TileIndex) -> &mut Tile {
        &mut self.tiles[index]
    }

    /// Tiles a unit standing on `index` could move to: grid neighbors that do
    /// not block movement.
    pub fn movable(&self, index: TileIndex) -> impl Iterator<Item = TileIndex> + '_ {
        self.neighbors[index]
            .iter()
            .copied()
            .filter(|&adj| !self.tiles[adj].blocks_movement())
    }

    /// Raw grid neighbors of a tile, including blocked ones.
    pub fn grid_neighbors(&self, index: TileIndex) -> &[TileIndex] {
        &self.neighbors[index]
    }

    /// Overrides the player -> team assignment (for team games).
    pub fn set_teams(&mut self, teams: Vec<i8>) {
        self.teams = teams;
    }

    /// The team a player belongs to. Neutral maps to its own sentinel team.
    pub fn team_of(&self, player: PlayerId) -> i8 {
        if player == NEUTRAL {
            return NEUTRAL;
        }
        self.teams
            .get(player as usize)
            .copied()
            .unwrap_or(player)
    }

    /// True if the tile's owner is on the same team as `player`.
    pub fn is_tile_friendly(&self, index: TileIndex, player: PlayerId) -> bool {
        let owner = self.tiles[index].player;
        owner != NEUTRAL && self.team_of(owner) == self.team_of(player)
    }

    /// Places an owned stack at the given coordinates.
    pub fn place_army(&mut self, x: u16, y: u16, player: PlayerId, army: i32) -> TileIndex {
        let idx = self.index_of(x, y);
        let tile = &mut self.tiles[idx];
        tile.player = player;
        tile.army = army;
        idx
    }

    /// Marks the tile at the given coordinates as a mountain.
    pub fn place_mountain(&mut self, x: u16, y: u16) -> TileIndex {
        let idx = self.index_of(x, y);
        self.tiles[idx].is_mountain = true;
        idx
    }

    /// Marks the tile at the given coordinates as a city.
    pub fn place_city(&mut self, x: u16, y: u16, player: PlayerId, army: i32) -> TileIndex {
        let idx = self.place_army(x, y, player, army);
        self.tiles[idx].is_city = true;
        idx
    }

    /// Marks the tile at the given coordinates as a general.
    pub fn place_general(&mut self, x: u16, y: u16, player: PlayerId, army: i32) -> TileIndex {
        let idx = self.place_army(x, y, player, army);
        self.tiles[idx].is_general = true;
        idx
    }
}
