//! Budgeted spanning-tree builders.
//!
//! Pure connectivity: both builders attach every permitted tile to a forest
//! rooted at the supplied roots and leave `value`/`gather_turns` at their
//! construction defaults. Value recomputation is a separate step.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use tracing::debug;

use crate::gather::forest::{GatherForest, NodeId};
use crate::gather::GatherError;
use crate::grid::{GameMap, PlayerId, TileIndex, TileMask, TileMatrix};
use crate::pathing::{distance_map, UNREACHED};

/// Builds a gather forest over `allowed`, rooted at `roots`.
///
/// Breadth-first expansion from all roots simultaneously; a tile attaches the
/// first time it is reached. Ties between frontier tiles are broken by
/// draining a friendly-priority queue ahead of the general queue, so friendly
/// territory is explored before enemy territory.
///
/// Errors with [`GatherError::DisconnectedInput`] when some allowed tiles are
/// unreachable from every root through the allowed set.
pub fn build_gather_forest(
    map: &GameMap,
    roots: &[TileIndex],
    allowed: &TileMask,
    player: PlayerId,
) -> Result<GatherForest, GatherError> {
    let mut forest = GatherForest::new(map);
    let mut visited = TileMask::new(map);

    let mut friendly_q: VecDeque<(TileIndex, NodeId)> = VecDeque::new();
    let mut general_q: VecDeque<(TileIndex, NodeId)> = VecDeque::new();

    for &root in roots {
        if !visited.insert(root) {
            continue;
        }
        let id = forest.add_root(root);
        enqueue_neighbors(map, allowed, &visited, player, root, id, &mut friendly_q, &mut general_q);
    }

    while let Some((tile, parent)) = friendly_q.pop_front().or_else(|| general_q.pop_front()) {
        if !visited.insert(tile) {
            continue;
        }
        let id = forest.add_child(parent, tile);
        enqueue_neighbors(map, allowed, &visited, player, tile, id, &mut friendly_q, &mut general_q);
    }

    let missing = allowed.iter().filter(|&t| !visited.contains(t)).count();
    if missing > 0 {
        return Err(GatherError::DisconnectedInput { missing });
    }

    Ok(forest)
}

#[allow(clippy::too_many_arguments)]
fn enqueue_neighbors(
    map: &GameMap,
    allowed: &TileMask,
    visited: &TileMask,
    player: PlayerId,
    tile: TileIndex,
    id: NodeId,
    friendly_q: &mut VecDeque<(TileIndex, NodeId)>,
    general_q: &mut VecDeque<(TileIndex, NodeId)>,
) {
    for adj in map.movable(tile) {
        if !allowed.contains(adj) || visited.contains(adj) {
            continue;
        }
        if map.is_tile_friendly(adj, player) {
            friendly_q.push_back((adj, id));
        } else {
            general_q.push_back((adj, id));
        }
    }
}

/// Result of the capture-variant build: the forest plus any extra tiles a
/// disconnection repair pulled in.
#[derive(Debug)]
pub struct CaptureBuild {
    pub forest: GatherForest,
    /// Tiles added to the working set by the one-shot reconnection repair.
    pub repaired_tiles: Vec<TileIndex>,
}

/// Attachment order for the capture builder: farthest-from-friendly first.
/// Field order is the tie-break order. At equal distance, tiles reachable
/// from an already-attached node attach rather than opening a new root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CaptureKey {
    dist: u32,
    attached: bool,
    army: i64,
    tile: TileIndex,
}

impl Ord for CaptureKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist
            .cmp(&other.dist)
            .then_with(|| self.attached.cmp(&other.attached))
            .then_with(|| self.army.cmp(&other.army))
            .then_with(|| other.tile.cmp(&self.tile))
    }
}

impl PartialOrd for CaptureKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Builds a capture-oriented forest over `tiles`.
///
/// A BFS from every friendly tile in the set labels each tile with its
/// distance to the nearest friendly tile; nodes are then attached in
/// descending-distance order so distant leaves attach first and pruning
/// removes the least useful frontier naturally. Roots end up on the distant
/// enemy clusters.
///
/// When the set is not connected through itself, one repair attempt
/// path-finds from the connected component to a disconnected tile, adds the
/// path tiles, and retries; a second failure is
/// [`GatherError::DisconnectedInput`].
pub fn build_capture_forest(
    map: &GameMap,
    tiles: &TileMask,
    player: PlayerId,
) -> Result<CaptureBuild, GatherError> {
    let mut working = tiles.clone();
    let mut repaired_tiles = Vec::new();

    loop {
        match try_build_capture_forest(map, &working, player) {
            Ok(forest) => {
                return Ok(CaptureBuild {
                    forest,
                    repaired_tiles,
                })
            }
            Err(missing) if repaired_tiles.is_empty() => {
                let added = repair_disconnection(map, &working, player, &missing)?;
                debug!(added = added.len(), "reconnecting disconnected capture input");
                for &t in &added {
                    working.insert(t);
                }
                if added.is_empty() {
                    return Err(GatherError::DisconnectedInput {
                        missing: missing.len(),
                    });
                }
                repaired_tiles = added;
            }
            Err(missing) => {
                return Err(GatherError::DisconnectedInput {
                    missing: missing.len(),
                })
            }
        }
    }
}

/// One build attempt. Errors with the list of unreachable member tiles.
fn try_build_capture_forest(
    map: &GameMap,
    tiles: &TileMask,
    player: PlayerId,
) -> Result<GatherForest, Vec<TileIndex>> {
    let friendly: Vec<TileIndex> = tiles
        .iter()
        .filter(|&t| map.is_tile_friendly(t, player))
        .collect();
    if friendly.is_empty() {
        return Err(tiles.iter().collect());
    }

    // Hop distance from the nearest friendly member, constrained to the set.
    let mut dist = TileMatrix::new(map, UNREACHED);
    let mut queue: VecDeque<TileIndex> = VecDeque::new();
    for &t in &friendly {
        dist[t] = 0;
        queue.push_back(t);
    }
    while let Some(cur) = queue.pop_front() {
        let next = dist[cur] + 1;
        for adj in map.movable(cur) {
            if tiles.contains(adj) && dist[adj] == UNREACHED {
                dist[adj] = next;
                queue.push_back(adj);
            }
        }
    }

    let unreached: Vec<TileIndex> = tiles.iter().filter(|&t| dist[t] == UNREACHED).collect();
    if !unreached.is_empty() {
        return Err(unreached);
    }

    let mut forest = GatherForest::new(map);
    let mut heap: BinaryHeap<(CaptureKey, Option<NodeId>)> = BinaryHeap::new();
    for t in tiles.iter() {
        if map.is_tile_friendly(t, player) {
            continue;
        }
        let key = CaptureKey {
            dist: dist[t],
            attached: false,
            army: -(map.tile(t).army as i64),
            tile: t,
        };
        heap.push((key, None));
    }

    let mut visited = TileMask::new(map);
    while let Some((key, parent)) = heap.pop() {
        if !visited.insert(key.tile) {
            continue;
        }
        let id = match parent {
            Some(p) => forest.add_child(p, key.tile),
            None => forest.add_root(key.tile),
        };
        forest.node_mut(id).data = key.army;

        for adj in map.movable(key.tile) {
            if !tiles.contains(adj) || visited.contains(adj) {
                continue;
            }
            let delta = if map.is_tile_friendly(adj, player) {
                map.tile(adj).army as i64
            } else {
                -(map.tile(adj).army as i64)
            };
            let next = CaptureKey {
                dist: dist[adj],
                attached: true,
                army: key.army + delta - 1,
                tile: adj,
            };
            heap.push((next, Some(id)));
        }
    }

    Ok(forest)
}

/// Finds a shortest reconnecting path from the friendly component to the
/// nearest disconnected member, ignoring set membership but not terrain.
fn repair_disconnection(
    map: &GameMap,
    tiles: &TileMask,
    player: PlayerId,
    missing: &[TileIndex],
) -> Result<Vec<TileIndex>, GatherError> {
    let friendly: Vec<TileIndex> = tiles
        .iter()
        .filter(|&t| map.is_tile_friendly(t, player))
        .collect();
    if friendly.is_empty() {
        return Err(GatherError::DisconnectedInput {
            missing: missing.len(),
        });
    }

    let dist = distance_map(map, friendly.iter().copied(), None);
    let target = missing
        .iter()
        .copied()
        .filter(|&t| dist[t] != UNREACHED)
        .min_by_key(|&t| dist[t])
        .ok_or(GatherError::DisconnectedInput {
            missing: missing.len(),
        })?;

    // Walk the distance gradient back toward the seeds.
    let mut path = Vec::new();
    let mut cur = target;
    while dist[cur] > 0 {
        path.push(cur);
        cur = map
            .movable(cur)
            .filter(|&adj| dist[adj] < dist[cur])
            .min_by_key(|&adj| dist[adj])
            .expect("gradient descent on a BFS distance map cannot dead-end");
    }
    path.retain(|&t| !tiles.contains(t));
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GameMap;

    #[test]
    fn gather_build_attaches_every_allowed_tile() {
        let mut map = GameMap::new(3, 3, 2);
        for y in 0..3 {
            for x in 0..3 {
                map.place_army(x, y, 0, 2);
            }
        }
        let allowed = TileMask::from_tiles(&map, 0..9);
        let forest = build_gather_forest(&map, &[map.index_of(1, 1)], &allowed, 0).unwrap();
        assert_eq!(forest.tiles().len(), 9);
        assert_eq!(forest.roots().len(), 1);
    }

    #[test]
    fn gather_build_reports_disconnection() {
        let mut map = GameMap::new(3, 1, 2);
        map.place_army(0, 0, 0, 2);
        map.place_army(2, 0, 0, 2);
        // x=1 not in the allowed set, so x=2 is unreachable.
        let allowed = TileMask::from_tiles(&map, [map.index_of(0, 0), map.index_of(2, 0)]);
        let err = build_gather_forest(&map, &[map.index_of(0, 0)], &allowed, 0).unwrap_err();
        assert!(matches!(err, GatherError::DisconnectedInput { missing: 1 }));
    }

    #[test]
    fn friendly_tiles_attach_before_enemy() {
        let mut map = GameMap::new(3, 1, 2);
        map.place_army(0, 0, 0, 2);
        map.place_army(1, 0, 1, 2);
        map.place_army(2, 0, 0, 2);
        let allowed = TileMask::from_tiles(&map, 0..3);
        let forest = build_gather_forest(&map, &[map.index_of(1, 0)], &allowed, 0).unwrap();
        // Root is the enemy tile; both friendly neighbors become its children.
        let root = forest.roots()[0];
        assert_eq!(forest.node(root).children.len(), 2);
    }

    #[test]
    fn capture_build_roots_on_distant_enemy() {
        let mut map = GameMap::new(4, 1, 2);
        map.place_army(0, 0, 0, 10);
        map.place_army(1, 0, 0, 2);
        map.place_army(2, 0, 1, 3);
        map.place_army(3, 0, 1, 1);
        let tiles = TileMask::from_tiles(&map, 0..4);
        let build = build_capture_forest(&map, &tiles, 0).unwrap();
        assert!(build.repaired_tiles.is_empty());
        let root = build.forest.roots()[0];
        // The farthest tile from friendly territory becomes the root.
        assert_eq!(build.forest.node(root).tile, map.index_of(3, 0));
        assert_eq!(build.forest.tiles().len(), 4);
    }

    #[test]
    fn capture_build_repairs_one_gap() {
        let mut map = GameMap::new(5, 1, 2);
        map.place_army(0, 0, 0, 10);
        map.place_army(1, 0, 0, 2);
        // x=2 left neutral and out of the set: a one-tile gap.
        map.place_army(3, 0, 1, 3);
        map.place_army(4, 0, 1, 1);
        let tiles = TileMask::from_tiles(
            &map,
            [0, 1, 3, 4].map(|x| map.index_of(x, 0)),
        );
        let build = build_capture_forest(&map, &tiles, 0).unwrap();
        assert_eq!(build.repaired_tiles, vec![map.index_of(2, 0)]);
        assert_eq!(build.forest.tiles().len(), 5);
    }

    #[test]
    fn capture_build_fails_across_mountains() {
        let mut map = GameMap::new(5, 1, 2);
        map.place_army(0, 0, 0, 10);
        map.place_army(1, 0, 0, 2);
        map.place_mountain(2, 0);
        map.place_army(3, 0, 1, 3);
        map.place_army(4, 0, 1, 1);
        let tiles = TileMask::from_tiles(
            &map,
            [0, 1, 3, 4].map(|x| map.index_of(x, 0)),
        );
        let err = build_capture_forest(&map, &tiles, 0).unwrap_err();
        assert!(matches!(err, GatherError::DisconnectedInput { .. }));
    }
}
