//! Greedy iterative-path backpack gather.
//!
//! The simpler gather strategy: repeatedly find the single best
//! value-per-turn path into the growing plan, splice it in, mark its tiles
//! consumed, and repeat until the turn budget is spent or no improving path
//! remains. Per-path bookkeeping is approximate; one full value recompute at
//! the end produces the authoritative totals.

use std::time::Instant;

use tracing::debug;

use crate::gather::forest::{recompute_values, GatherForest, RecomputeOptions};
use crate::grid::{GameMap, PlayerId, TileIndex, TileMask, TileMatrix};
use crate::pathing::max_value_per_turn_path;

/// Options for [`gather_backpack_greedy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BackpackOptions<'a> {
    /// Tiles whose army contributes nothing even when friendly.
    pub negative: Option<&'a TileMask>,
    /// Tiles the search may never path through.
    pub skip: Option<&'a TileMask>,
    /// Charge army lost fighting through unfriendly tiles against the value.
    pub use_true_value: bool,
    /// Extra per-tile value folded into the final recompute.
    pub priority_matrix: Option<&'a TileMatrix<f64>>,
    /// Absolute cutoff; the loop stops after the iteration that crosses it.
    pub deadline: Option<Instant>,
}

/// Gathers toward `roots` for up to `turns` move-turns by accumulating
/// best-value-per-turn paths. Returns `(value, turns_used, forest)`; the
/// forest holds only root nodes when no productive path exists at all.
pub fn gather_backpack_greedy(
    map: &GameMap,
    roots: &[TileIndex],
    turns: u32,
    player: PlayerId,
    opts: BackpackOptions<'_>,
) -> (f64, u32, GatherForest) {
    let mut forest = GatherForest::new(map);
    let mut consumed = match opts.negative {
        Some(n) => n.clone(),
        None => TileMask::new(map),
    };
    let mut starts: Vec<(TileIndex, u32)> = Vec::with_capacity(roots.len());

    for &root in roots {
        if forest.node_at(root).is_none() {
            forest.add_root(root);
            starts.push((root, 0));
        }
        consumed.insert(root);
    }

    let mut remaining = turns;
    let mut segments = 0u32;
    while remaining > 0 {
        if opts.deadline.is_some_and(|d| Instant::now() >= d) {
            debug!(remaining, "backpack gather stopping at deadline");
            break;
        }

        let Some(path) = max_value_per_turn_path(
            map,
            player,
            &starts,
            remaining,
            turns,
            &consumed,
            opts.skip,
            opts.use_true_value,
        ) else {
            break;
        };

        let tail = map.tile(path.tail());
        if tail.army <= 1 || !map.is_tile_friendly(path.tail(), player) {
            // Extending further would not flip another tile productively.
            break;
        }

        debug!(
            turns = path.turns(),
            value = path.value,
            "backpack gather accepting path segment"
        );

        let head = path.head();
        let mut current = forest
            .node_at(head)
            .expect("path heads are always existing plan tiles");
        let base_depth = starts
            .iter()
            .find(|(t, _)| *t == head)
            .map(|&(_, d)| d)
            .unwrap_or(0);

        for (offset, &tile) in path.tiles.iter().enumerate().skip(1) {
            current = forest.add_child(current, tile);
            consumed.insert(tile);
            starts.push((tile, base_depth + offset as u32));
        }

        remaining -= path.turns().min(remaining);
        segments += 1;
    }

    let (turns_used, value) = recompute_values(
        map,
        &mut forest,
        player,
        RecomputeOptions {
            negative: opts.negative,
            only_friendly_army: !opts.use_true_value,
            priority_matrix: opts.priority_matrix,
        },
    );
    debug!(segments, turns_used, value, "backpack gather complete");

    (value, turns_used, forest)
}
