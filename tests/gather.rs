//! Integration tests for the gather planning core.
//!
//! Exercises the public API on hand-built maps: forest construction, value
//! recomputation, pruning, the greedy backpack gather, and plan assembly.

use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::SeedableRng;

use muster::gather::{
    build_capture_forest, build_gather_forest, default_prune_weights, gather_backpack_greedy,
    plan_from_connected_tiles, prune_connected_set_to_turns, recompute_values, BackpackOptions,
    GatherCapturePlan, GatherError, PlanOptions, RecomputeOptions,
};
use muster::grid::{GameMap, PlayerId, TileMask, TileMatrix};

const US: PlayerId = 0;
const THEM: PlayerId = 1;

/// A width x height map fully owned by `player` with uniform army.
fn owned_block(width: u16, height: u16, player: PlayerId, army: i32) -> GameMap {
    let mut map = GameMap::new(width, height, 2);
    for y in 0..height {
        for x in 0..width {
            map.place_army(x, y, player, army);
        }
    }
    map
}

/// JSON fixture round-trip: maps serialize, so test maps can live on disk.
#[test]
fn map_fixture_loads_from_json() {
    let map = owned_block(3, 2, US, 4);
    let json = serde_json::to_string(&map).expect("map serializes");
    let loaded: GameMap = serde_json::from_str(&json).expect("map deserializes");
    assert_eq!(loaded.tile_count(), 6);
    assert_eq!(loaded.tile(loaded.index_of(2, 1)).army, 4);
}

#[test]
fn forest_values_are_additive() {
    let map = owned_block(4, 4, US, 3);
    let allowed = TileMask::from_tiles(&map, 0..16);
    let roots = [map.index_of(0, 0)];
    let mut forest = build_gather_forest(&map, &roots, &allowed, US).unwrap();
    recompute_values(&map, &mut forest, US, RecomputeOptions::default());

    for id in forest.iter_reachable() {
        let node = forest.node(id);
        let own = if node.parent.is_none() {
            0.0
        } else {
            (map.tile(node.tile).army - 1) as f64
        };
        let child_sum: f64 = node.children.iter().map(|&c| forest.node(c).value).sum();
        assert_eq!(node.value, own + child_sum, "value additivity at {:?}", id);
    }
}

#[test]
fn forest_turns_are_additive() {
    let map = owned_block(4, 4, US, 3);
    let allowed = TileMask::from_tiles(&map, 0..16);
    let roots = [map.index_of(1, 2)];
    let mut forest = build_gather_forest(&map, &roots, &allowed, US).unwrap();
    recompute_values(&map, &mut forest, US, RecomputeOptions::default());

    for id in forest.iter_reachable() {
        let node = forest.node(id);
        let child_sum: u32 = node
            .children
            .iter()
            .map(|&c| forest.node(c).gather_turns)
            .sum();
        if node.parent.is_none() {
            assert_eq!(node.gather_turns, child_sum);
        } else {
            assert_eq!(node.gather_turns, 1 + child_sum);
        }
    }
}

#[test]
fn recompute_twice_is_identical() {
    let map = owned_block(5, 3, US, 2);
    let allowed = TileMask::from_tiles(&map, 0..15);
    let roots = [map.index_of(2, 1)];
    let mut forest = build_gather_forest(&map, &roots, &allowed, US).unwrap();

    let first = recompute_values(&map, &mut forest, US, RecomputeOptions::default());
    let snapshot: Vec<(f64, u32)> = forest
        .iter_reachable()
        .into_iter()
        .map(|id| (forest.node(id).value, forest.node(id).gather_turns))
        .collect();
    let second = recompute_values(&map, &mut forest, US, RecomputeOptions::default());
    let again: Vec<(f64, u32)> = forest
        .iter_reachable()
        .into_iter()
        .map(|id| (forest.node(id).value, forest.node(id).gather_turns))
        .collect();

    assert_eq!(first, second);
    assert_eq!(snapshot, again);
}

#[test]
fn prune_scenario_path_of_four() {
    // A-B-C-D, root A, weights 5/1/9/2, budget 1: D goes first (lowest
    // weight among prunable), then C, leaving {A, B}.
    let map = GameMap::new(4, 1, 2);
    let a = map.index_of(0, 0);
    let b = map.index_of(1, 0);
    let c = map.index_of(2, 0);
    let d = map.index_of(3, 0);
    let mut weights = TileMatrix::new(&map, 0.0);
    weights[a] = 5.0;
    weights[b] = 1.0;
    weights[c] = 9.0;
    weights[d] = 2.0;
    let roots = TileMask::from_tiles(&map, [a]);
    let mut tiles = TileMask::from_tiles(&map, [a, b, c, d]);
    let mut rng = SmallRng::seed_from_u64(42);

    prune_connected_set_to_turns(&map, &roots, &mut tiles, 1, &weights, &mut rng).unwrap();

    let remaining: Vec<_> = tiles.iter().collect();
    assert_eq!(remaining, vec![a, b]);
}

#[test]
fn prune_preserves_roots_and_exact_budget() {
    let map = owned_block(6, 6, US, 2);
    let roots_list = [map.index_of(0, 0), map.index_of(5, 5)];
    let roots = TileMask::from_tiles(&map, roots_list);
    let mut tiles = TileMask::from_tiles(&map, 0..36);
    let weights = default_prune_weights(&map, US, None);
    let mut rng = SmallRng::seed_from_u64(9);

    prune_connected_set_to_turns(&map, &roots, &mut tiles, 7, &weights, &mut rng).unwrap();

    assert_eq!(tiles.len() - roots.len(), 7);
    for r in roots.iter() {
        assert!(tiles.contains(r), "root pruned");
    }
    assert!(tiles.len() >= roots.len());
}

#[test]
fn prune_keeps_set_connected_under_many_seeds() {
    // Seed-independence of the connectivity property, not of exact output.
    for seed in 0..10u64 {
        let map = owned_block(5, 5, US, 2);
        let root = map.index_of(0, 0);
        let roots = TileMask::from_tiles(&map, [root]);
        let mut tiles = TileMask::from_tiles(&map, 0..25);
        let weights = default_prune_weights(&map, US, None);
        let mut rng = SmallRng::seed_from_u64(seed);

        prune_connected_set_to_turns(&map, &roots, &mut tiles, 6, &weights, &mut rng).unwrap();

        assert!(muster::gather::is_connected_to_roots(&map, &[root], &tiles));
        assert_eq!(tiles.len(), 7);
    }
}

#[test]
fn backpack_star_consumes_all_leaves_then_stops() {
    // One root, three army-2 leaves, budget 10: all three leaves are
    // gathered, then no positive path remains and the loop stops with
    // budget to spare.
    let mut map = GameMap::new(3, 3, 2);
    map.place_army(1, 1, US, 1);
    map.place_army(0, 1, US, 2);
    map.place_army(2, 1, US, 2);
    map.place_army(1, 0, US, 2);
    let (value, turns_used, forest) = gather_backpack_greedy(
        &map,
        &[map.index_of(1, 1)],
        10,
        US,
        BackpackOptions::default(),
    );
    assert_eq!(turns_used, 3);
    assert_eq!(value, 3.0);
    assert_eq!(forest.tiles().len(), 4);
}

#[test]
fn backpack_respects_turn_budget() {
    let map = owned_block(8, 1, US, 5);
    let (_, turns_used, _) = gather_backpack_greedy(
        &map,
        &[map.index_of(0, 0)],
        4,
        US,
        BackpackOptions::default(),
    );
    assert!(turns_used <= 4);
    assert!(turns_used > 0);
}

#[test]
fn backpack_deadline_returns_immediately() {
    let map = owned_block(10, 10, US, 5);
    let opts = BackpackOptions {
        deadline: Some(Instant::now()),
        ..Default::default()
    };
    let started = Instant::now();
    let (_, turns_used, forest) =
        gather_backpack_greedy(&map, &[map.index_of(5, 5)], 50, US, opts);
    assert!(started.elapsed() < Duration::from_millis(500));
    assert_eq!(turns_used, 0);
    assert_eq!(forest.roots().len(), 1);
}

#[test]
fn capture_forest_feeds_a_capture_plan() {
    let mut map = GameMap::new(5, 1, 2);
    map.place_army(0, 0, US, 20);
    map.place_army(1, 0, US, 3);
    map.place_army(2, 0, THEM, 2);
    map.place_army(3, 0, THEM, 2);
    map.place_army(4, 0, THEM, 4);
    let tiles = TileMask::from_tiles(&map, 0..5);

    let build = build_capture_forest(&map, &tiles, US).unwrap();
    let plan = GatherCapturePlan::build_from_forest(&map, build.forest, US, PlanOptions::default());

    assert_eq!(plan.enemy_city_count, 0);
    // Three enemy tiles captured.
    assert!((plan.econ_value - 3.0 * 2.2).abs() < 1e-9);
    assert!(plan.gathered_army > 0.0);
    assert!(plan.best_first_move().is_some());
}

#[test]
fn disconnected_plan_input_fails_fast() {
    let mut map = GameMap::new(5, 1, 2);
    for x in 0..5 {
        map.place_army(x, 0, US, 3);
    }
    map.place_mountain(2, 0);
    let roots = [map.index_of(0, 0)];
    let mut tiles = TileMask::from_tiles(&map, [0, 1, 3, 4].map(|x| map.index_of(x, 0)));
    let weights = default_prune_weights(&map, US, None);
    let mut rng = SmallRng::seed_from_u64(1);

    let err = plan_from_connected_tiles(
        &map,
        &roots,
        &mut tiles,
        3,
        US,
        &weights,
        PlanOptions::default(),
        &mut rng,
    )
    .unwrap_err();

    assert!(matches!(err, GatherError::DisconnectedInput { missing: 2 }));
}

#[test]
fn plan_pipeline_budget_and_value() {
    let map = owned_block(4, 4, US, 4);
    let roots = [map.index_of(0, 0)];
    let mut tiles = TileMask::from_tiles(&map, 0..16);
    let weights = default_prune_weights(&map, US, None);
    let mut rng = SmallRng::seed_from_u64(17);

    let plan = plan_from_connected_tiles(
        &map,
        &roots,
        &mut tiles,
        6,
        US,
        &weights,
        PlanOptions::default(),
        &mut rng,
    )
    .unwrap();

    assert_eq!(plan.turns, 6);
    // Six army-4 tiles, each delivering army - 1.
    assert_eq!(plan.gathered_army, 18.0);
    let mv = plan.best_first_move().expect("plan has moves");
    assert_ne!(mv.from, mv.to);
}

#[test]
fn priority_matrix_shifts_plan_points() {
    let mut map = GameMap::new(3, 1, 2);
    map.place_army(0, 0, US, 1);
    map.place_army(1, 0, US, 4);
    map.place_army(2, 0, US, 4);
    let allowed = TileMask::from_tiles(&map, 0..3);
    let roots = [map.index_of(0, 0)];
    let forest = build_gather_forest(&map, &roots, &allowed, US).unwrap();

    let mut priority = TileMatrix::new(&map, 0.0);
    priority[map.index_of(2, 0)] = 1.5;
    let plan = GatherCapturePlan::build_from_forest(
        &map,
        forest,
        US,
        PlanOptions {
            priority_matrix: Some(&priority),
            ..Default::default()
        },
    );

    assert_eq!(plan.gathered_army, 6.0);
    assert_eq!(plan.gather_capture_points, 7.5);
}
