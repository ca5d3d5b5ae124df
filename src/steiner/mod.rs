//! Prize-collecting Steiner parameter-search driver.
//!
//! The exact solver has no "target size" knob, so the driver runs two nested
//! anytime searches over solver parameters: an outer search over a cost
//! cutoff added uniformly to every edge, and an inner binary search over a
//! prize offset added to every node. Both track the best-so-far solution by
//! absolute distance from the target node count and respect a wall-clock
//! deadline checked after every solver invocation.

pub mod solver;

use std::time::Instant;

use tracing::{debug, info};

use crate::grid::{GameMap, PlayerId, TileIndex, TileMask, TileMatrix};

pub use solver::{GrowthSolver, PcstSolver, Pruning};

/// Prize floor scale: offset prizes below this are remapped into (0, scale]
/// so solver input stays strictly positive while preserving order.
const PRIZE_FLOOR_SCALE: f64 = 1.0;

/// Additive prize forcing root tiles into every solution.
const ROOT_PRIZE_BONUS: f64 = 150.0;

/// Extra cost charged per point of enemy army on a tile, by default.
pub const DEFAULT_ENEMY_ARMY_FACTOR: f64 = 0.1;

/// Enemy tiles with more army than this neither cost nor reward extra.
pub const DEFAULT_ENEMY_ARMY_LIMIT: i32 = 10;

/// Parameters of one driver invocation.
#[derive(Debug, Clone, Copy)]
pub struct SteinerParams<'a> {
    pub player: PlayerId,
    pub roots: &'a [TileIndex],
    /// The driver aims for `target_turns + roots.len()` output nodes.
    pub target_turns: usize,
    /// Hard node-count ceiling; results above it are never kept as best.
    pub max_turns: Option<usize>,
    /// Extra per-tile prize for friendly (gatherable) tiles.
    pub gather_matrix: Option<&'a TileMatrix<f64>>,
    /// Per-tile prize for capturable tiles under the enemy-army limit.
    pub capture_matrix: Option<&'a TileMatrix<f64>>,
    /// Tiles penalized out of the solution.
    pub negative: Option<&'a TileMask>,
    /// Tiles excluded from the edge graph entirely.
    pub skip: Option<&'a TileMask>,
    /// Tiles rewarded with cheaper movement so the solver favors them.
    pub hint_include: Option<&'a TileMask>,
    /// Treat enemy army as prize (capture-hungry) instead of cost.
    pub prioritize_high_army_capture: bool,
    pub enemy_army_factor: f64,
    pub enemy_army_limit: i32,
    pub cost_iterations: u32,
    pub prize_iterations: u32,
    /// Identical node counts in a row before a search gives up early.
    pub same_result_cutoff: u32,
    pub deadline: Instant,
}

impl<'a> SteinerParams<'a> {
    /// Sensible defaults for a gather toward `roots` within `target_turns`.
    pub fn new(
        player: PlayerId,
        roots: &'a [TileIndex],
        target_turns: usize,
        deadline: Instant,
    ) -> Self {
        SteinerParams {
            player,
            roots,
            target_turns,
            max_turns: None,
            gather_matrix: None,
            capture_matrix: None,
            negative: None,
            skip: None,
            hint_include: None,
            prioritize_high_army_capture: false,
            enemy_army_factor: DEFAULT_ENEMY_ARMY_FACTOR,
            enemy_army_limit: DEFAULT_ENEMY_ARMY_LIMIT,
            cost_iterations: 5,
            prize_iterations: 4,
            same_result_cutoff: 5,
            deadline,
        }
    }
}

/// Per-tile prize and extra-cost tables plus their observed ranges.
struct PrizeModel {
    prize: TileMatrix<f64>,
    extra_cost: TileMatrix<f64>,
    max_prize: f64,
    min_cost: f64,
}

fn build_prize_model(map: &GameMap, params: &SteinerParams<'_>) -> PrizeModel {
    let mut prize = TileMatrix::new(map, 0.0);
    let mut extra_cost = TileMatrix::new(map, 0.0);

    for (idx, tile) in map.tiles.iter().enumerate() {
        if tile.blocks_movement() {
            continue;
        }
        if map.is_tile_friendly(idx, params.player) {
            let mut p = tile.army as f64;
            if let Some(gm) = params.gather_matrix {
                p += gm[idx];
            }
            prize[idx] = p;
        } else if params.prioritize_high_army_capture {
            if tile.army < params.enemy_army_limit {
                let mut p = tile.army as f64 * params.enemy_army_factor;
                if let Some(cm) = params.capture_matrix {
                    p += cm[idx];
                }
                prize[idx] = p;
            }
        } else {
            extra_cost[idx] = tile.army as f64 * params.enemy_army_factor;
            if tile.army < params.enemy_army_limit {
                if let Some(cm) = params.capture_matrix {
                    prize[idx] = cm[idx];
                }
            }
        }
    }

    if let Some(negative) = params.negative {
        for t in negative.iter() {
            extra_cost[t] += 2.0;
            prize[t] = -1.0;
        }
    }
    if let Some(hint) = params.hint_include {
        for t in hint.iter() {
            extra_cost[t] = -1.0;
            prize[t] += 0.5;
        }
    }
    for &root in params.roots {
        prize[root] += ROOT_PRIZE_BONUS;
        extra_cost[root] = -1.0;
    }

    let mut max_prize = f64::MIN;
    let mut min_cost = f64::MAX;
    for (idx, tile) in map.tiles.iter().enumerate() {
        if tile.blocks_movement() {
            continue;
        }
        max_prize = max_prize.max(prize[idx]);
        min_cost = min_cost.min(extra_cost[idx]);
    }

    PrizeModel {
        prize,
        extra_cost,
        max_prize: if max_prize == f64::MIN { 0.0 } else { max_prize },
        min_cost: if min_cost == f64::MAX { 0.0 } else { min_cost },
    }
}

/// One solver invocation at fixed `(cost_basis, prize_offset)`.
///
/// Edges run right/down between passable, non-skipped neighbors; the cost of
/// both of a tile's edges carries that tile's extra cost. Root tiles are
/// chained with synthetic zero-cost edges so the solver never has to choose
/// between roots.
fn pcst_iteration(
    map: &GameMap,
    solver: &dyn PcstSolver,
    cost_basis: f64,
    model: &PrizeModel,
    skip: Option<&TileMask>,
    prize_offset: f64,
    roots: &[TileIndex],
) -> Vec<usize> {
    let count = map.tile_count();
    let mut prizes = Vec::with_capacity(count);
    let mut edges = Vec::new();
    let mut costs = Vec::new();

    let basis = cost_basis + PRIZE_FLOOR_SCALE;

    for idx in 0..count {
        let mut p = model.prize[idx] + prize_offset;
        if p < PRIZE_FLOOR_SCALE {
            p = PRIZE_FLOOR_SCALE / ((PRIZE_FLOOR_SCALE + 1.0) - p);
        }
        prizes.push(p);

        let tile = map.tile(idx);
        if tile.blocks_movement() || skip.is_some_and(|s| s.contains(idx)) {
            continue;
        }

        let edge_cost = (basis + model.extra_cost[idx]).max(0.0);
        if tile.x + 1 < map.width {
            let right = idx + 1;
            if !map.tile(right).blocks_movement() && !skip.is_some_and(|s| s.contains(right)) {
                edges.push((idx, right));
                costs.push(edge_cost);
            }
        }
        if tile.y + 1 < map.height {
            let down = idx + map.width as usize;
            if !map.tile(down).blocks_movement() && !skip.is_some_and(|s| s.contains(down)) {
                edges.push((idx, down));
                costs.push(edge_cost);
            }
        }
    }

    let mut last: Option<TileIndex> = None;
    for &root in roots {
        if let Some(prev) = last {
            edges.push((root, prev));
            costs.push(0.0);
        }
        last = Some(root);
    }

    solver.solve(
        &edges,
        &prizes,
        &costs,
        roots.first().copied(),
        1,
        Pruning::Strong,
    )
}

/// Inner anytime search: binary-searches the prize offset toward the target
/// node count at a fixed cost cutoff.
fn prize_offset_search(
    map: &GameMap,
    solver: &dyn PcstSolver,
    model: &PrizeModel,
    params: &SteinerParams<'_>,
    target_node_count: usize,
    cost_cutoff: f64,
    iteration_limit: u32,
) -> Option<Vec<usize>> {
    let root_len = params.roots.len() as i64;
    let target = target_node_count as i64;

    let mut min_offset = -model.max_prize;
    let mut max_offset = 0.0f64;
    let mut next_offset = -1.0f64;
    let mut best: Option<Vec<usize>> = None;
    let mut best_diff = i64::MAX;
    let mut last_count = i64::MIN;
    let mut same_results = 0u32;
    // Early iterations react conservatively; leniency decays toward 1.0.
    let mut leniency = 1.0 - (iteration_limit.saturating_sub(3)) as f64 * 0.15;

    for _ in 0..iteration_limit {
        let vertices = pcst_iteration(
            map,
            solver,
            cost_cutoff,
            model,
            params.skip,
            next_offset,
            params.roots,
        );
        let count = if vertices.len() as i64 > root_len {
            vertices.len() as i64
        } else {
            -1000
        };
        let diff = count - target;
        debug!(
            offset = next_offset,
            count,
            target,
            cost_cutoff,
            "prize offset attempt"
        );

        if diff < 0 {
            min_offset += (next_offset - min_offset) * leniency;
        } else {
            max_offset -= (max_offset - next_offset) * leniency;
        }

        same_results = if count != last_count { 0 } else { same_results + 1 };
        next_offset = (max_offset + min_offset) / 2.0;
        last_count = count;

        if diff.abs() <= best_diff && count > root_len {
            best_diff = diff.abs();
            best = Some(vertices);
        }

        if Instant::now() >= params.deadline {
            break;
        }
        if same_results >= params.same_result_cutoff {
            break;
        }
        leniency = (leniency + 0.1).min(1.0);
    }

    best
}

/// Candidate cost cutoffs for the outer sweep, thinned on larger maps.
fn cost_cutoff_candidates(map: &GameMap) -> (&'static [f64], u32) {
    let tiles = map.tile_count();
    if tiles > 2000 {
        (&[0.5, 2.0, 128.0], 2)
    } else if tiles > 1000 {
        (&[0.5, 2.0, 32.0, 128.0], 3)
    } else {
        (&[0.5, 1.0, 2.0, 8.0, 32.0, 128.0], 3)
    }
}

/// Finds a tile set of approximately `target_turns + roots.len()` nodes
/// maximizing total prize.
///
/// Anytime: expiry of `params.deadline` returns the best result found so
/// far. Returns `None` when no parameterization ever yields more nodes than
/// the roots alone, meaning there is no usable plan.
pub fn gather_steiner_prize_collecting(
    map: &GameMap,
    solver: &dyn PcstSolver,
    params: &SteinerParams<'_>,
) -> Option<Vec<TileIndex>> {
    if params.roots.is_empty() {
        return None;
    }

    let start = Instant::now();
    let model = build_prize_model(map, params);
    let target_node_count = params.target_turns + params.roots.len();
    let max_nodes = params
        .max_turns
        .map(|m| m + params.roots.len())
        .unwrap_or(2000) as i64;
    let target = target_node_count as i64;

    let (candidates, prize_iter_limit) = cost_cutoff_candidates(map);

    let mut best: Option<Vec<usize>> = None;
    let mut best_diff = i64::MAX;
    let mut best_prev = 0.0f64;
    let mut best_next = *candidates.last().expect("candidate list is never empty");
    let mut was_best = false;
    let mut prev_cutoff: Option<f64> = None;

    for &cutoff in candidates {
        // A cutoff that would clamp every edge to zero explores nothing new.
        if cutoff - 1.0 < -model.min_cost {
            continue;
        }

        let vertices = prize_offset_search(
            map,
            solver,
            &model,
            params,
            target_node_count,
            cutoff,
            prize_iter_limit,
        );
        let count = vertices.as_ref().map_or(-target, |v| v.len() as i64);
        debug!(cutoff, count, target, "cost cutoff attempt");

        if was_best {
            was_best = false;
            best_next = best_next.min(cutoff);
        }

        let diff = count - target;
        if diff.abs() <= best_diff && count > 1 && count <= max_nodes {
            if let Some(prev) = prev_cutoff {
                best_prev = prev;
            }
            was_best = true;
            best_diff = diff.abs();
            best = vertices;
        }

        if Instant::now() >= params.deadline {
            break;
        }
        prev_cutoff = Some(cutoff);
    }

    // Binary refinement of the bracket around the best candidate.
    let mut min_cutoff = best_prev;
    let mut max_cutoff = best_next;
    let mut leniency = 0.7f64;
    let mut last_count = i64::MIN;
    let mut same_results = 0u32;

    for iteration in 0..params.cost_iterations {
        if Instant::now() >= params.deadline {
            break;
        }
        let next = (min_cutoff + max_cutoff) / 2.0;
        let prize_limit = (params.prize_iterations as i64
            - ((params.cost_iterations - iteration) as i64) / 2)
            .max(2) as u32;

        let vertices = prize_offset_search(
            map,
            solver,
            &model,
            params,
            target_node_count,
            next,
            prize_limit,
        );
        let count = vertices.as_ref().map_or(-target, |v| v.len() as i64);
        let diff = count - target;
        debug!(cutoff = next, count, target, "cost refinement attempt");

        // The solver is not exact; move the bracket leniently so one noisy
        // result cannot collapse it.
        if diff > 0 {
            min_cutoff += (next - min_cutoff) * leniency;
        } else if diff < 0 {
            max_cutoff -= (max_cutoff - next) * leniency;
        } else {
            min_cutoff += (next - min_cutoff) * (leniency - 0.2);
            max_cutoff -= (max_cutoff - next) * (leniency - 0.2);
        }

        same_results = if count != last_count { 0 } else { same_results + 1 };
        last_count = count;

        if diff.abs() <= best_diff && count > 1 && count <= max_nodes {
            best_diff = diff.abs();
            best = vertices;
        }

        if same_results >= params.same_result_cutoff {
            break;
        }
        leniency = (leniency + 0.1).min(1.0);
    }

    match &best {
        Some(vertices) => info!(
            nodes = vertices.len(),
            turns = vertices.len() - params.roots.len(),
            target = target_node_count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "pcst search complete"
        ),
        None => info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            "pcst search found no usable plan"
        ),
    }

    best
}
