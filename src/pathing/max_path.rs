//! Single best value-per-turn path search.
//!
//! Frontier search that expands from a set of start tiles and returns the
//! one path with the highest gathered-army-per-turn, within a depth bound.
//! Each tile is expanded at most once (the priority order guarantees the
//! best-prefix path reaches a tile first), so the search is O(V log V).
//!
//! Priority and value records are explicit structs with a fixed field order;
//! the field order IS the tie-break priority.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::grid::{GameMap, PlayerId, TileIndex, TileMask, TileMatrix};

/// A discovered movement path, ordered from source tile to destination.
#[derive(Debug, Clone)]
pub struct Path {
    pub tiles: Vec<TileIndex>,
    /// Net army delivered to the destination by walking the path.
    pub value: f64,
}

impl Path {
    /// Number of move-turns the path costs (edges, not tiles).
    pub fn turns(&self) -> u32 {
        self.tiles.len().saturating_sub(1) as u32
    }

    /// The source tile (where the path's army starts accumulating).
    pub fn head(&self) -> TileIndex {
        self.tiles[0]
    }

    /// The destination tile.
    pub fn tail(&self) -> TileIndex {
        *self.tiles.last().expect("path is never empty")
    }
}

/// Frontier ordering: lower sorts first. Field order is the tie-break order.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PathPriority {
    /// Steps taken within this search.
    steps: u32,
    /// Negated friendly army gathered so far (lower = more gathered).
    neg_gathered: f64,
    /// Negated net army carried (lower = more army).
    neg_army: f64,
    /// Depth including the start tile's distance offset.
    depth: u32,
}

impl Eq for PathPriority {}

impl Ord for PathPriority {
    fn cmp(&self, other: &Self) -> Ordering {
        self.steps
            .cmp(&other.steps)
            .then_with(|| self.neg_gathered.total_cmp(&other.neg_gathered))
            .then_with(|| self.neg_army.total_cmp(&other.neg_army))
            .then_with(|| self.depth.cmp(&other.depth))
    }
}

impl PartialOrd for PathPriority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Result ordering: higher sorts first. Field order is the tie-break order.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PathValue {
    value_per_turn: f64,
    gathered: f64,
    depth: u32,
}

impl Eq for PathValue {}

impl Ord for PathValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value_per_turn
            .total_cmp(&other.value_per_turn)
            .then_with(|| self.gathered.total_cmp(&other.gathered))
            .then_with(|| other.depth.cmp(&self.depth))
    }
}

impl PartialOrd for PathValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A frontier entry. Min-ordered by priority, then tile index for determinism.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrontierEntry {
    prio: PathPriority,
    tile: TileIndex,
    from: Option<TileIndex>,
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; invert so the lowest priority pops first.
        other
            .prio
            .cmp(&self.prio)
            .then_with(|| other.tile.cmp(&self.tile))
            .then_with(|| other.from.cmp(&self.from))
    }
}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Finds the single highest value-per-turn path from any start tile.
///
/// `starts` pairs each start tile with its distance offset (how deep into an
/// existing plan the tile already sits). `max_turns` bounds the steps this
/// search may take; `max_depth` bounds offset-inclusive depth. Tiles in
/// `negative` contribute no army; tiles in `skip` are never entered. With
/// `use_true_value`, army lost fighting through unfriendly tiles is charged
/// against the path value.
///
/// A path qualifies only if it ends on a friendly tile while carrying
/// positive net army. Returns `None` when no qualifying path exists.
pub fn max_value_per_turn_path(
    map: &GameMap,
    player: PlayerId,
    starts: &[(TileIndex, u32)],
    max_turns: u32,
    max_depth: u32,
    negative: &TileMask,
    skip: Option<&TileMask>,
    use_true_value: bool,
) -> Option<Path> {
    if starts.is_empty() || max_turns == 0 {
        return None;
    }

    let mut visited = TileMask::new(map);
    let mut came_from: TileMatrix<Option<TileIndex>> = TileMatrix::new(map, None);
    let mut frontier = BinaryHeap::new();

    for &(tile, offset) in starts {
        // Unfriendly starts must be fought through before any army arrives.
        let start_army = if use_true_value && !map.is_tile_friendly(tile, player) {
            map.tile(tile).army as f64
        } else {
            0.0
        };
        frontier.push(FrontierEntry {
            prio: PathPriority {
                steps: 0,
                neg_gathered: 0.0,
                neg_army: start_army,
                depth: offset,
            },
            tile,
            from: None,
        });
    }

    let mut best: Option<(PathValue, TileIndex)> = None;

    while let Some(entry) = frontier.pop() {
        let FrontierEntry { prio, tile, from } = entry;
        if !visited.insert(tile) {
            continue;
        }
        came_from[tile] = from;

        if prio.steps > 0 && prio.neg_army < 0.0 && map.is_tile_friendly(tile, player) {
            let candidate = PathValue {
                value_per_turn: -prio.neg_gathered / prio.steps as f64,
                gathered: -prio.neg_gathered,
                depth: prio.depth,
            };
            if best.is_none_or(|(b, _)| candidate > b) {
                best = Some((candidate, tile));
            }
        }

        if prio.steps >= max_turns || prio.depth >= max_depth {
            continue;
        }

        for adj in map.movable(tile) {
            if visited.contains(adj) {
                continue;
            }
            if skip.is_some_and(|s| s.contains(adj)) {
                continue;
            }

            // One army stays behind on every moved-from tile.
            let mut neg_gathered = prio.neg_gathered + 1.0;
            let mut neg_army = prio.neg_army + 1.0;
            if !negative.contains(adj) {
                let army = map.tile(adj).army as f64;
                if map.is_tile_friendly(adj, player) {
                    neg_gathered -= army;
                    neg_army -= army;
                } else {
                    neg_army += army;
                    if use_true_value {
                        neg_gathered += army;
                    }
                }
            }

            frontier.push(FrontierEntry {
                prio: PathPriority {
                    steps: prio.steps + 1,
                    neg_gathered,
                    neg_army,
                    depth: prio.depth + 1,
                },
                tile: adj,
                from: Some(tile),
            });
        }
    }

    let (value, end) = best?;

    let mut tiles = vec![end];
    let mut cur = end;
    while let Some(prev) = came_from[cur] {
        tiles.push(prev);
        cur = prev;
    }
    tiles.reverse();

    Some(Path {
        tiles,
        value: value.gathered,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GameMap;

    fn line_map(armies: &[i32], player: PlayerId) -> GameMap {
        let mut map = GameMap::new(armies.len() as u16, 1, 2);
        for (x, &army) in armies.iter().enumerate() {
            map.place_army(x as u16, 0, player, army);
        }
        map
    }

    #[test]
    fn finds_highest_army_line() {
        let map = line_map(&[1, 5, 9], 0);
        let negative = TileMask::from_tiles(&map, [map.index_of(0, 0)]);
        let path = max_value_per_turn_path(
            &map,
            0,
            &[(map.index_of(0, 0), 0)],
            5,
            5,
            &negative,
            None,
            false,
        )
        .expect("a path exists");
        assert_eq!(path.tail(), map.index_of(2, 0));
        // 5 - 1 gathered at x=1, 9 - 1 at x=2.
        assert_eq!(path.value, 12.0);
    }

    #[test]
    fn rejects_paths_ending_on_enemy_tiles() {
        let mut map = GameMap::new(2, 1, 2);
        map.place_army(0, 0, 0, 1);
        map.place_army(1, 0, 1, 50);
        let negative = TileMask::from_tiles(&map, [map.index_of(0, 0)]);
        let path = max_value_per_turn_path(
            &map,
            0,
            &[(map.index_of(0, 0), 0)],
            5,
            5,
            &negative,
            None,
            false,
        );
        assert!(path.is_none());
    }

    #[test]
    fn respects_turn_bound() {
        let map = line_map(&[1, 2, 2, 2, 2], 0);
        let negative = TileMask::from_tiles(&map, [map.index_of(0, 0)]);
        let path = max_value_per_turn_path(
            &map,
            0,
            &[(map.index_of(0, 0), 0)],
            2,
            10,
            &negative,
            None,
            false,
        )
        .expect("a path exists");
        assert!(path.turns() <= 2);
    }

    #[test]
    fn negative_tiles_contribute_nothing() {
        let map = line_map(&[1, 5], 0);
        let negative = TileMask::from_tiles(&map, [map.index_of(0, 0), map.index_of(1, 0)]);
        let path = max_value_per_turn_path(
            &map,
            0,
            &[(map.index_of(0, 0), 0)],
            5,
            5,
            &negative,
            None,
            false,
        );
        // The only neighbor gathers -1 net; no qualifying path.
        assert!(path.is_none());
    }
}
