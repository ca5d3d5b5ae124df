//! Gather/capture planning core.
//!
//! Contains the gather-tree data model, the spanning-tree builders, the
//! value recompute, the leaf-pruning engines, the greedy backpack gather,
//! and plan assembly. Connectivity and budget preconditions are validated at
//! the public entry points, before any search work begins.

pub mod backpack;
pub mod forest;
pub mod plan;
pub mod prune;
pub mod spanning;

use std::collections::VecDeque;

use rand::rngs::SmallRng;
use thiserror::Error;
use tracing::info;

use crate::grid::{GameMap, PlayerId, TileIndex, TileMask, TileMatrix};

pub use backpack::{gather_backpack_greedy, BackpackOptions};
pub use forest::{recompute_values, GatherForest, GatherNode, NodeId, RecomputeOptions};
pub use plan::{GatherCapturePlan, Move, PlanOptions, PlanSummary};
pub use prune::{prune_connected_set_to_turns, prune_forest_to_turns};
pub use spanning::{build_capture_forest, build_gather_forest, CaptureBuild};

/// Precondition failures of one planning invocation.
///
/// Optimization-quality shortfalls are never errors; a search that finds no
/// viable plan returns `None` instead.
#[derive(Debug, Error)]
pub enum GatherError {
    /// The supplied tile set is not reachable from the supplied roots.
    #[error("{missing} input tiles are not reachable from the supplied roots")]
    DisconnectedInput { missing: usize },
    /// The turn budget cannot be met without pruning a root tile.
    #[error("turn budget {budget} cannot be met without pruning a root tile")]
    OverPruned { budget: usize },
}

/// Members of `tiles` reachable from some root through the set itself.
fn reachable_from_roots(map: &GameMap, roots: &[TileIndex], tiles: &TileMask) -> TileMask {
    let mut visited = TileMask::new(map);
    let mut queue: VecDeque<TileIndex> = roots.iter().copied().collect();
    while let Some(cur) = queue.pop_front() {
        if !visited.insert(cur) {
            continue;
        }
        for adj in map.movable(cur) {
            if tiles.contains(adj) && !visited.contains(adj) {
                queue.push_back(adj);
            }
        }
    }
    visited
}

/// True if every member of `tiles` is reachable from some root through the
/// set itself.
pub fn is_connected_to_roots(map: &GameMap, roots: &[TileIndex], tiles: &TileMask) -> bool {
    let reachable = reachable_from_roots(map, roots, tiles);
    tiles.iter().all(|t| reachable.contains(t))
}

/// Turns a connected tile set into a finished gather/capture plan: prune the
/// set to the turn budget, build the spanning forest, recompute values, and
/// assemble the plan.
///
/// This is the shared back half of the Steiner pipeline; `weights` drives
/// the prune selection (typically signed army or a priority matrix).
#[allow(clippy::too_many_arguments)]
pub fn plan_from_connected_tiles(
    map: &GameMap,
    roots: &[TileIndex],
    tiles: &mut TileMask,
    to_turns: usize,
    player: PlayerId,
    weights: &TileMatrix<f64>,
    opts: PlanOptions<'_>,
    rng: &mut SmallRng,
) -> Result<GatherCapturePlan, GatherError> {
    for &root in roots {
        tiles.insert(root);
    }
    let reachable = reachable_from_roots(map, roots, tiles);
    let missing = tiles.iter().filter(|&t| !reachable.contains(t)).count();
    if missing > 0 {
        return Err(GatherError::DisconnectedInput { missing });
    }

    let root_mask = TileMask::from_tiles(map, roots.iter().copied());
    prune_connected_set_to_turns(map, &root_mask, tiles, to_turns, weights, rng)?;

    let forest = build_gather_forest(map, roots, tiles, player)?;
    let plan = GatherCapturePlan::build_from_forest(map, forest, player, opts);
    info!(
        turns = plan.turns,
        value = plan.gathered_army,
        econ = plan.econ_value,
        "assembled gather/capture plan"
    );
    Ok(plan)
}

/// Default prune weights: signed army, friendly positive, unfriendly
/// negative, with the priority matrix folded in when present.
pub fn default_prune_weights(
    map: &GameMap,
    player: PlayerId,
    priority_matrix: Option<&TileMatrix<f64>>,
) -> TileMatrix<f64> {
    let mut weights = TileMatrix::new(map, 0.0);
    for (idx, tile) in map.tiles.iter().enumerate() {
        let mut w = if map.is_tile_friendly(idx, player) {
            (tile.army - 1) as f64
        } else {
            -((tile.army + 1) as f64)
        };
        if let Some(pm) = priority_matrix {
            w += pm[idx];
        }
        weights[idx] = w;
    }
    weights
}
