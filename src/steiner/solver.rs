//! Prize-collecting Steiner solver contract and reference implementation.
//!
//! The parameter-search driver treats the solver as a black box behind
//! [`PcstSolver`]; production deployments plug an exact native solver in
//! through the trait. [`GrowthSolver`] is the in-tree reference: it grows a
//! cheapest-attachment tree over everything reachable from the seeds, then
//! strong-prunes subtrees whose prizes do not pay for their edges. It makes
//! no approximation guarantee; it exists so the driver is runnable and
//! testable without a native dependency.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Post-processing applied by the solver to its grown solution.
///
/// `None` and `Simple` return intermediate stages without quality
/// guarantees; `Gw` and `Strong` prune unprofitable subtrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pruning {
    None,
    Simple,
    Gw,
    Strong,
}

/// An exact (or approximate) prize-collecting Steiner forest solver.
///
/// `edges[i]` is an undirected edge with cost `costs[i]`; `prizes` holds one
/// strictly positive prize per vertex. `root` forces a vertex into the
/// solution (`None` = unrooted); `num_clusters` is the number of connected
/// components the output must have. Returns the vertex set of the
/// prize-minus-cost optimal forest.
pub trait PcstSolver {
    fn solve(
        &self,
        edges: &[(usize, usize)],
        prizes: &[f64],
        costs: &[f64],
        root: Option<usize>,
        num_clusters: usize,
        pruning: Pruning,
    ) -> Vec<usize>;
}

/// Frontier-edge key for the growth phase: best prize-minus-cost first.
/// Field order is the tie-break order.
#[derive(Debug, Clone, Copy, PartialEq)]
struct GrowthKey {
    gain: f64,
    vertex: usize,
}

impl Eq for GrowthKey {}

impl Ord for GrowthKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.gain
            .total_cmp(&other.gain)
            .then_with(|| other.vertex.cmp(&self.vertex))
    }
}

impl PartialOrd for GrowthKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Deterministic grow-then-strong-prune reference solver.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrowthSolver;

impl PcstSolver for GrowthSolver {
    fn solve(
        &self,
        edges: &[(usize, usize)],
        prizes: &[f64],
        costs: &[f64],
        root: Option<usize>,
        num_clusters: usize,
        pruning: Pruning,
    ) -> Vec<usize> {
        let n = prizes.len();
        if n == 0 {
            return Vec::new();
        }

        let mut adjacency: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        for (i, &(u, v)) in edges.iter().enumerate() {
            adjacency[u].push((v, costs[i]));
            adjacency[v].push((u, costs[i]));
        }

        let seeds = pick_seeds(prizes, root, num_clusters);

        // Growth: attach every reachable vertex along its best frontier edge.
        let mut included = vec![false; n];
        let mut parent: Vec<Option<usize>> = vec![None; n];
        let mut attach_cost = vec![0.0f64; n];
        let mut order: Vec<usize> = Vec::with_capacity(n);
        let mut frontier: BinaryHeap<(GrowthKey, usize)> = BinaryHeap::new();

        for &seed in &seeds {
            if included[seed] {
                continue;
            }
            included[seed] = true;
            order.push(seed);
            push_frontier(&adjacency, prizes, &included, seed, &mut frontier);
        }

        while let Some((key, from)) = frontier.pop() {
            if included[key.vertex] {
                continue;
            }
            included[key.vertex] = true;
            parent[key.vertex] = Some(from);
            attach_cost[key.vertex] = prizes[key.vertex] - key.gain;
            order.push(key.vertex);
            push_frontier(&adjacency, prizes, &included, key.vertex, &mut frontier);
        }

        if matches!(pruning, Pruning::Gw | Pruning::Strong) {
            strong_prune(prizes, &mut included, &parent, &attach_cost, &order);
        }

        (0..n).filter(|&v| included[v]).collect()
    }
}

fn pick_seeds(prizes: &[f64], root: Option<usize>, num_clusters: usize) -> Vec<usize> {
    let wanted = num_clusters.max(1);
    let mut seeds = Vec::with_capacity(wanted);
    if let Some(r) = root {
        seeds.push(r);
    }
    if seeds.len() >= wanted {
        return seeds;
    }

    let mut by_prize: Vec<usize> = (0..prizes.len()).collect();
    by_prize.sort_by(|&a, &b| prizes[b].total_cmp(&prizes[a]).then_with(|| a.cmp(&b)));
    for v in by_prize {
        if seeds.contains(&v) {
            continue;
        }
        seeds.push(v);
        if seeds.len() >= wanted {
            break;
        }
    }
    seeds
}

fn push_frontier(
    adjacency: &[Vec<(usize, f64)>],
    prizes: &[f64],
    included: &[bool],
    from: usize,
    frontier: &mut BinaryHeap<(GrowthKey, usize)>,
) {
    for &(v, cost) in &adjacency[from] {
        if !included[v] {
            frontier.push((
                GrowthKey {
                    gain: prizes[v] - cost,
                    vertex: v,
                },
                from,
            ));
        }
    }
}

/// Drops every subtree whose prizes do not pay for its edges.
///
/// Net worth is computed bottom-up over the attachment tree (`order` lists
/// vertices parents-first): a child subtree only contributes when its net
/// worth is positive, and a non-seed vertex whose own subtree nets out at or
/// below zero is removed together with everything under it.
fn strong_prune(
    prizes: &[f64],
    included: &mut [bool],
    parent: &[Option<usize>],
    attach_cost: &[f64],
    order: &[usize],
) {
    let n = prizes.len();
    let mut net = vec![0.0f64; n];
    for &v in order.iter().rev() {
        let own = match parent[v] {
            Some(_) => prizes[v] - attach_cost[v],
            None => prizes[v],
        };
        net[v] += own;
        if let Some(p) = parent[v] {
            if net[v] > 0.0 {
                net[p] += net[v];
            }
        }
    }

    // Parents-first sweep: a vertex survives when its parent survived and its
    // own subtree is worth keeping.
    for &v in order.iter() {
        let keep = match parent[v] {
            None => true,
            Some(p) => included[p] && net[v] > 0.0,
        };
        included[v] = keep;
    }
}
