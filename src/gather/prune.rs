//! Leaf-pruning engines.
//!
//! Two prune surfaces: a flat connected tile set (the budget trim used after
//! the Steiner driver) and an already-built gather forest (used by plan
//! assembly). Both always remove the least valuable currently-prunable tile
//! and never touch roots.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, VecDeque};

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use tracing::trace;

use crate::gather::forest::{GatherForest, NodeId};
use crate::gather::GatherError;
use crate::grid::{GameMap, PlayerId, TileIndex, TileMask, TileMatrix};

/// Prunes a connected tile set down to `to_turns` non-root tiles.
///
/// Each round, a fresh breadth-first walk from the roots over the working set
/// collects every currently-prunable tile: a tile with no unvisited in-set
/// neighbor at the moment it is reached (a frontier dead end). The lowest
/// weight prunable non-root tile is removed and the walk repeats until
/// `tiles.len() - roots.len() <= to_turns`.
///
/// Adjacency order is shuffled through `rng`, so ties among equal-weight
/// dead ends break randomly but reproducibly under a pinned seed. The walk
/// is recomputed from scratch per removal; the sets this engine sees are
/// already budget-bounded, and an incrementally maintained frontier heap
/// would change tie-break output on equal-weight inputs.
///
/// Errors with [`GatherError::OverPruned`] when the budget is still unmet
/// but no prunable non-root tile remains.
pub fn prune_connected_set_to_turns(
    map: &GameMap,
    roots: &TileMask,
    tiles: &mut TileMask,
    to_turns: usize,
    weights: &TileMatrix<f64>,
    rng: &mut SmallRng,
) -> Result<(), GatherError> {
    debug_assert!(
        roots.iter().all(|r| tiles.contains(r)),
        "roots must be members of the working set"
    );

    while tiles.len() - roots.len() > to_turns {
        let victim = lowest_weight_frontier_tile(map, roots, tiles, weights, rng)
            .ok_or(GatherError::OverPruned { budget: to_turns })?;
        trace!(tile = victim, weight = weights[victim], "pruning frontier tile");
        tiles.remove(victim);
    }

    Ok(())
}

/// One frontier walk: returns the lowest-weight prunable non-root tile.
fn lowest_weight_frontier_tile(
    map: &GameMap,
    roots: &TileMask,
    tiles: &TileMask,
    weights: &TileMatrix<f64>,
    rng: &mut SmallRng,
) -> Option<TileIndex> {
    let mut visited = TileMask::new(map);
    let mut queue: VecDeque<TileIndex> = VecDeque::new();
    for root in roots.iter() {
        queue.push_back(root);
    }

    let mut best: Option<TileIndex> = None;
    let mut adjacency: Vec<TileIndex> = Vec::with_capacity(4);
    while let Some(tile) = queue.pop_front() {
        if !visited.insert(tile) {
            continue;
        }

        adjacency.clear();
        adjacency.extend(map.movable(tile));
        adjacency.shuffle(rng);

        let mut any_unvisited = false;
        for &adj in &adjacency {
            if tiles.contains(adj) && !visited.contains(adj) {
                any_unvisited = true;
                queue.push_back(adj);
            }
        }

        if !any_unvisited && !roots.contains(tile) {
            let better = match best {
                None => true,
                Some(b) => weights[tile] < weights[b],
            };
            if better {
                best = Some(tile);
            }
        }
    }

    best
}

/// Heap key for forest pruning: the worst value-per-turn leaf pops first.
/// Field order is the tie-break order.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PruneKey {
    value_per_turn: f64,
    value: f64,
    neg_trunk_distance: i64,
}

impl Eq for PruneKey {}

impl Ord for PruneKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value_per_turn
            .total_cmp(&other.value_per_turn)
            .then_with(|| self.value.total_cmp(&other.value))
            .then_with(|| self.neg_trunk_distance.cmp(&other.neg_trunk_distance))
    }
}

impl PartialOrd for PruneKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn prune_key(forest: &GatherForest, id: NodeId) -> PruneKey {
    let node = forest.node(id);
    let value_per_turn = if node.gather_turns > 0 {
        node.value / node.gather_turns as f64
    } else {
        -100.0
    };
    PruneKey {
        value_per_turn,
        value: node.value,
        neg_trunk_distance: -(node.trunk_distance as i64),
    }
}

/// Prunes a forest down to `to_turns` total move-turns by repeatedly
/// detaching the worst value-per-turn leaf.
///
/// The forest must carry fresh recompute values. Detached values bubble up
/// the trunk, newly exposed parents join the heap, and a leaf whose priority
/// improved while queued is re-keyed instead of pruned. Roots survive
/// unconditionally. Returns `(turns, value)` after pruning.
pub fn prune_forest_to_turns(forest: &mut GatherForest, to_turns: u32) -> (u32, f64) {
    let mut heap: BinaryHeap<(Reverse<PruneKey>, NodeId)> = forest
        .leaves()
        .into_iter()
        .map(|id| (Reverse(prune_key(forest, id)), id))
        .collect();

    let mut turns = forest.total_turns();
    while turns > to_turns {
        let Some((Reverse(key), id)) = heap.pop() else {
            break;
        };
        // Stale entries: already detached, or no longer a leaf.
        if forest.node(id).parent.is_none() || !forest.node(id).children.is_empty() {
            continue;
        }
        let fresh = prune_key(forest, id);
        if fresh > key {
            heap.push((Reverse(fresh), id));
            continue;
        }

        if let Some(parent) = forest.detach_leaf(id) {
            turns -= 1;
            let p = forest.node(parent);
            if p.children.is_empty() && p.parent.is_some() {
                heap.push((Reverse(prune_key(forest, parent)), parent));
            }
        }
    }

    (turns, forest.total_value())
}

/// Repeatedly detaches leaves that do not represent a worthwhile move: tiles
/// with at most one army, or unfriendly leaf tiles. Used by plan assembly so
/// a finished plan never ends in a dead move.
pub fn prune_forest_invalid_leaves(map: &GameMap, forest: &mut GatherForest, player: PlayerId) {
    let mut queue: VecDeque<NodeId> = forest.leaves().into_iter().collect();
    while let Some(id) = queue.pop_front() {
        let node = forest.node(id);
        if node.parent.is_none() || !node.children.is_empty() {
            continue;
        }
        let tile = map.tile(node.tile);
        let invalid = tile.army <= 1 || !map.is_tile_friendly(node.tile, player);
        if !invalid {
            continue;
        }
        if let Some(parent) = forest.detach_leaf(id) {
            let p = forest.node(parent);
            if p.children.is_empty() && p.parent.is_some() {
                queue.push_back(parent);
            }
        }
    }
}
