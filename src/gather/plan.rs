//! Gather/capture plan assembly and economic bookkeeping.
//!
//! Turns a finished forest into the value object orchestrators compare
//! across candidate plans: total turns, gathered army, capture points, and a
//! derived economic score.

use serde::Serialize;

use crate::gather::forest::{recompute_values, GatherForest, NodeId, RecomputeOptions};
use crate::gather::prune::prune_forest_invalid_leaves;
use crate::grid::{GameMap, PlayerId, TileIndex, TileMask, TileMatrix};

/// Economic value of capturing an enemy player's tile.
const CAPTURE_ECON_PLAYER: f64 = 2.2;
/// Economic value of capturing a neutral tile.
const CAPTURE_ECON_NEUTRAL: f64 = 1.0;

/// A concrete unit move: all army on `from` (minus one) steps onto `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Move {
    pub from: TileIndex,
    pub to: TileIndex,
}

/// Assembly options for [`GatherCapturePlan::build_from_forest`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanOptions<'a> {
    /// Tiles whose army contributes nothing even when friendly.
    pub negative: Option<&'a TileMask>,
    /// When true, army lost fighting through unfriendly tiles is ignored.
    pub only_friendly_army: bool,
    /// Per-tile priority values folded into capture points (always) and econ
    /// value (per the include flags).
    pub priority_matrix: Option<&'a TileMatrix<f64>>,
    pub include_gather_priority_as_econ: bool,
    pub include_capture_priority_as_econ: bool,
}

/// The external-facing summary of one gather/capture plan.
#[derive(Debug)]
pub struct GatherCapturePlan {
    pub forest: GatherForest,
    /// Total move-turns in the plan, gathering and capturing combined.
    pub turns: u32,
    /// Move-turns spent on friendly (gathering) tiles.
    pub gather_turns: u32,
    /// Signed army delivered to the roots.
    pub gathered_army: f64,
    /// Army value plus priority-matrix contributions.
    pub gather_capture_points: f64,
    /// Expected economic payoff of executing the plan.
    pub econ_value: f64,
    pub friendly_city_count: u32,
    pub enemy_city_count: u32,
}

impl GatherCapturePlan {
    /// Builds a plan from a connected forest, recomputing all values.
    ///
    /// Leaves that do not represent a worthwhile move are pruned first, so
    /// the returned plan never ends in a dead move.
    pub fn build_from_forest(
        map: &GameMap,
        mut forest: GatherForest,
        player: PlayerId,
        opts: PlanOptions<'_>,
    ) -> Self {
        recompute_values(
            map,
            &mut forest,
            player,
            RecomputeOptions {
                negative: opts.negative,
                only_friendly_army: opts.only_friendly_army,
                priority_matrix: opts.priority_matrix,
            },
        );
        prune_forest_invalid_leaves(map, &mut forest, player);

        let mut plan = GatherCapturePlan {
            forest,
            turns: 0,
            gather_turns: 0,
            gathered_army: 0.0,
            gather_capture_points: 0.0,
            econ_value: 0.0,
            friendly_city_count: 0,
            enemy_city_count: 0,
        };

        for id in plan.forest.iter_reachable() {
            let node = plan.forest.node(id);
            let tile = map.tile(node.tile);
            let is_root = node.parent.is_none();
            let friendly = map.is_tile_friendly(node.tile, player);
            let counted = opts.negative.is_none_or(|n| !n.contains(node.tile));

            let mut army = 0.0;
            if !is_root {
                army = -1.0;
                if counted {
                    if friendly {
                        army += tile.army as f64;
                    } else if !opts.only_friendly_army {
                        army -= tile.army as f64;
                    }
                }
                plan.turns += 1;
                if friendly {
                    plan.gather_turns += 1;
                }
            }

            if counted && !friendly {
                // Capture payoff applies to roots too: an unfriendly root is
                // the tile the plan takes.
                if tile.is_owned() {
                    plan.econ_value += CAPTURE_ECON_PLAYER;
                } else {
                    plan.econ_value += CAPTURE_ECON_NEUTRAL;
                }
            }
            if friendly && tile.is_city {
                plan.friendly_city_count += 1;
            } else if !friendly && tile.is_owned() && tile.is_city {
                plan.enemy_city_count += 1;
            }

            let mut points = army;
            if let Some(pm) = opts.priority_matrix {
                let prio = pm[node.tile];
                if !is_root {
                    points += prio;
                    if friendly {
                        if opts.include_gather_priority_as_econ {
                            plan.econ_value += prio;
                        }
                    } else if opts.include_capture_priority_as_econ {
                        plan.econ_value += prio;
                    }
                } else if !friendly && opts.include_capture_priority_as_econ {
                    plan.econ_value += prio;
                }
            }

            plan.gathered_army += army;
            plan.gather_capture_points += points;
        }

        plan
    }

    /// Economic value per plan turn; the scalar orchestrators rank plans by.
    pub fn econ_value_per_turn(&self) -> f64 {
        self.econ_value / self.turns.max(1) as f64
    }

    /// The concrete move to play this turn: the leaf edge of the
    /// highest-value branch. `None` when the plan has no moves left.
    pub fn best_first_move(&self) -> Option<Move> {
        let mut best: Option<(f64, u32, NodeId)> = None;
        for id in self.forest.leaves() {
            let node = self.forest.node(id);
            let key = (node.trunk_value, node.trunk_distance);
            let better = match best {
                None => true,
                Some((bv, bd, _)) => {
                    key.0 > bv || (key.0 == bv && key.1 > bd)
                }
            };
            if better {
                best = Some((key.0, key.1, id));
            }
        }
        let (_, _, id) = best?;
        let node = self.forest.node(id);
        let parent = node.parent?;
        Some(Move {
            from: node.tile,
            to: self.forest.node(parent).tile,
        })
    }

    /// Serializable scalar summary for persistence and cross-plan comparison.
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            turns: self.turns,
            gather_turns: self.gather_turns,
            gathered_army: self.gathered_army,
            gather_capture_points: self.gather_capture_points,
            econ_value: self.econ_value,
            friendly_city_count: self.friendly_city_count,
            enemy_city_count: self.enemy_city_count,
        }
    }
}

/// Plain-data mirror of a plan's metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlanSummary {
    pub turns: u32,
    pub gather_turns: u32,
    pub gathered_army: f64,
    pub gather_capture_points: f64,
    pub econ_value: f64,
    pub friendly_city_count: u32,
    pub enemy_city_count: u32,
}
