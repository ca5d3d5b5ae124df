//! Multi-seed BFS hop-distance maps.

use std::collections::VecDeque;

use crate::grid::{GameMap, TileIndex, TileMask, TileMatrix};

/// Distance label for tiles no seed can reach.
pub const UNREACHED: u32 = u32::MAX;

/// Shortest hop distance from the nearest seed to every tile.
///
/// Movement-blocking tiles are never entered; tiles in `skip` are treated as
/// blocked as well. Seeds get distance 0 even when skipped.
pub fn distance_map(
    map: &GameMap,
    seeds: impl IntoIterator<Item = TileIndex>,
    skip: Option<&TileMask>,
) -> TileMatrix<u32> {
    let mut dist = TileMatrix::new(map, UNREACHED);
    let mut queue = VecDeque::new();

    for seed in seeds {
        if dist[seed] == UNREACHED {
            dist[seed] = 0;
            queue.push_back(seed);
        }
    }

    while let Some(cur) = queue.pop_front() {
        let next = dist[cur] + 1;
        for adj in map.movable(cur) {
            if dist[adj] != UNREACHED {
                continue;
            }
            if skip.is_some_and(|s| s.contains(adj)) {
                continue;
            }
            dist[adj] = next;
            queue.push_back(adj);
        }
    }

    dist
}
