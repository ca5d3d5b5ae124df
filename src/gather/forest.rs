//! Arena-allocated gather forest and bottom-up value recomputation.
//!
//! Nodes live in a flat arena and refer to each other by index: `parent` is
//! an `Option<NodeId>` and `children` is a list of ids, so the structure can
//! never form a reference cycle and all traversals are iterative.

use std::collections::VecDeque;

use crate::grid::{GameMap, PlayerId, TileIndex, TileMask, TileMatrix};

/// Node identifier (index into the forest arena).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

/// One tile's position inside a gather tree.
#[derive(Debug, Clone)]
pub struct GatherNode {
    /// The tile this node represents.
    pub tile: TileIndex,
    /// The node this tile feeds its army into. `None` for roots.
    pub parent: Option<NodeId>,
    /// Nodes feeding army into this one.
    pub children: Vec<NodeId>,
    /// Net army value of this node and its whole subtree. Signed.
    pub value: f64,
    /// Move-turns represented by this node's subtree.
    pub gather_turns: u32,
    /// Branch value from the root up to and including this node.
    pub trunk_value: f64,
    /// Hop distance from this node's root.
    pub trunk_distance: u32,
    /// Scratch accounting used by some builders (running army total).
    pub data: i64,
}

impl GatherNode {
    fn new(tile: TileIndex, parent: Option<NodeId>) -> Self {
        GatherNode {
            tile,
            parent,
            children: Vec::new(),
            value: 0.0,
            gather_turns: 0,
            trunk_value: 0.0,
            trunk_distance: 0,
            data: 0,
        }
    }
}

/// A forest of gather trees over one map, arena-allocated.
///
/// Detached (pruned) nodes stay in the arena but are unreachable from the
/// roots; every traversal walks from the roots, so they cost nothing.
#[derive(Debug, Clone)]
pub struct GatherForest {
    nodes: Vec<GatherNode>,
    roots: Vec<NodeId>,
    by_tile: TileMatrix<Option<NodeId>>,
}

impl GatherForest {
    /// Creates an empty forest sized to the map.
    pub fn new(map: &GameMap) -> Self {
        GatherForest {
            nodes: Vec::new(),
            roots: Vec::new(),
            by_tile: TileMatrix::new(map, None),
        }
    }

    /// Adds a new root node for a tile.
    pub fn add_root(&mut self, tile: TileIndex) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(GatherNode::new(tile, None));
        self.roots.push(id);
        self.by_tile[tile] = Some(id);
        id
    }

    /// Adds a child node under `parent`.
    pub fn add_child(&mut self, parent: NodeId, tile: TileIndex) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(GatherNode::new(tile, Some(parent)));
        self.nodes[parent.0].children.push(id);
        self.by_tile[tile] = Some(id);
        id
    }

    /// The root node ids.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// The node behind an id.
    pub fn node(&self, id: NodeId) -> &GatherNode {
        &self.nodes[id.0]
    }

    /// Mutable access to the node behind an id.
    pub fn node_mut(&mut self, id: NodeId) -> &mut GatherNode {
        &mut self.nodes[id.0]
    }

    /// The reachable node currently representing a tile, if any.
    pub fn node_at(&self, tile: TileIndex) -> Option<NodeId> {
        self.by_tile[tile]
    }

    /// Iterates every node reachable from the roots, parents before children.
    pub fn iter_reachable(&self) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut queue: VecDeque<NodeId> = self.roots.iter().copied().collect();
        while let Some(id) = queue.pop_front() {
            order.push(id);
            for &child in &self.nodes[id.0].children {
                queue.push_back(child);
            }
        }
        order
    }

    /// Reachable leaf nodes that have a parent (i.e. represent a move).
    pub fn leaves(&self) -> Vec<NodeId> {
        self.iter_reachable()
            .into_iter()
            .filter(|&id| {
                let n = &self.nodes[id.0];
                n.children.is_empty() && n.parent.is_some()
            })
            .collect()
    }

    /// Tiles of every reachable node.
    pub fn tiles(&self) -> Vec<TileIndex> {
        self.iter_reachable()
            .into_iter()
            .map(|id| self.nodes[id.0].tile)
            .collect()
    }

    /// Total move-turns across the forest (valid after a recompute).
    pub fn total_turns(&self) -> u32 {
        self.roots.iter().map(|&r| self.nodes[r.0].gather_turns).sum()
    }

    /// Total value across the forest (valid after a recompute).
    pub fn total_value(&self) -> f64 {
        self.roots.iter().map(|&r| self.nodes[r.0].value).sum()
    }

    /// Detaches a leaf from its parent and bubbles its value/turn totals out
    /// of every ancestor. Returns the parent id.
    ///
    /// Callers must not pass roots; roots are never removed.
    pub fn detach_leaf(&mut self, id: NodeId) -> Option<NodeId> {
        let parent = self.nodes[id.0].parent?;
        let (value, turns, tile) = {
            let n = &self.nodes[id.0];
            (n.value, n.gather_turns, n.tile)
        };

        self.nodes[parent.0].children.retain(|&c| c != id);
        self.nodes[id.0].parent = None;
        if self.by_tile[tile] == Some(id) {
            self.by_tile[tile] = None;
        }

        let mut cur = Some(parent);
        while let Some(a) = cur {
            self.nodes[a.0].value -= value;
            self.nodes[a.0].gather_turns -= turns;
            cur = self.nodes[a.0].parent;
        }

        Some(parent)
    }
}

/// Penalty applied to friendly city/general leaves so cities prefer a
/// transit role over being gathered as a dead end.
pub const CITY_LEAF_PENALTY: f64 = 0.5;

/// Accounting options for [`recompute_values`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RecomputeOptions<'a> {
    /// Tiles whose army contributes nothing even when friendly.
    pub negative: Option<&'a TileMask>,
    /// When true, army lost fighting through unfriendly tiles is ignored.
    pub only_friendly_army: bool,
    /// Extra per-tile value folded into every non-root node.
    pub priority_matrix: Option<&'a TileMatrix<f64>>,
}

/// Recomputes `value`/`gather_turns` bottom-up and `trunk_*` top-down for the
/// whole forest. Returns `(total_turns, total_value)`.
///
/// Root nodes contribute nothing (army only arrives there). Every non-root
/// node leaves one army behind; friendly tiles outside the negative set add
/// their army, unfriendly tiles subtract theirs unless `only_friendly_army`.
pub fn recompute_values(
    map: &GameMap,
    forest: &mut GatherForest,
    player: PlayerId,
    opts: RecomputeOptions<'_>,
) -> (u32, f64) {
    let order = forest.iter_reachable();

    // Children come after their parent in BFS order, so reversing gives a
    // valid bottom-up schedule.
    for &id in order.iter().rev() {
        let node = forest.node(id);
        let tile = map.tile(node.tile);
        let is_root = node.parent.is_none();

        let mut value = 0.0;
        let mut turns = 0u32;
        if !is_root {
            turns = 1;
            value = -1.0;
            let counted = opts.negative.is_none_or(|n| !n.contains(node.tile));
            let friendly = map.is_tile_friendly(node.tile, player);
            if counted {
                if friendly {
                    value += tile.army as f64;
                } else if !opts.only_friendly_army {
                    value -= tile.army as f64;
                }
            }
            if let Some(pm) = opts.priority_matrix {
                value += pm[node.tile];
            }
            if node.children.is_empty() && friendly && (tile.is_city || tile.is_general) {
                value -= CITY_LEAF_PENALTY;
            }
        }

        for &child in node.children.iter() {
            debug_assert_eq!(
                forest.node(child).parent,
                Some(id),
                "child/parent link out of sync"
            );
            value += forest.node(child).value;
            turns += forest.node(child).gather_turns;
        }

        let node = forest.node_mut(id);
        node.value = value;
        node.gather_turns = turns;
    }

    // Trunk pass: prefix value/distance from each root outward.
    for &id in order.iter() {
        let (parent, tile_idx) = {
            let n = forest.node(id);
            (n.parent, n.tile)
        };
        let (trunk_value, trunk_distance) = match parent {
            None => (0.0, 0),
            Some(p) => {
                let base = forest.node(p);
                let mut tv = base.trunk_value - 1.0;
                let counted = opts.negative.is_none_or(|n| !n.contains(tile_idx));
                if counted {
                    if map.is_tile_friendly(tile_idx, player) {
                        tv += map.tile(tile_idx).army as f64;
                    } else if !opts.only_friendly_army {
                        tv -= map.tile(tile_idx).army as f64;
                    }
                }
                (tv, base.trunk_distance + 1)
            }
        };
        let node = forest.node_mut(id);
        node.trunk_value = trunk_value;
        node.trunk_distance = trunk_distance;
    }

    (forest.total_turns(), forest.total_value())
}
