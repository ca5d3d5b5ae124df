use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::SeedableRng;

use muster::gather::{
    build_gather_forest, default_prune_weights, gather_backpack_greedy,
    prune_connected_set_to_turns, recompute_values, BackpackOptions, RecomputeOptions,
};
use muster::grid::{GameMap, TileMask};
use muster::steiner::{gather_steiner_prize_collecting, GrowthSolver, SteinerParams};

/// A 20x20 map: our half, an enemy half, a mountain ridge with two passes.
fn bench_map() -> GameMap {
    let mut map = GameMap::new(20, 20, 2);
    for y in 0..20 {
        for x in 0..20 {
            if x < 10 {
                map.place_army(x, y, 0, 2 + ((x + y) % 5) as i32);
            } else {
                map.place_army(x, y, 1, 1 + ((x * y) % 4) as i32);
            }
        }
    }
    for y in 0..20 {
        if y != 4 && y != 15 {
            map.place_mountain(10, y);
        }
    }
    map
}

fn bench_spanning_build(c: &mut Criterion) {
    let map = bench_map();
    let allowed = TileMask::from_tiles(
        &map,
        (0..map.tile_count()).filter(|&t| map.tile(t).player == 0),
    );
    let roots = [map.index_of(0, 0)];
    c.bench_function("spanning_build_200_tiles", |b| {
        b.iter(|| build_gather_forest(black_box(&map), black_box(&roots), &allowed, 0).unwrap())
    });
}

fn bench_recompute(c: &mut Criterion) {
    let map = bench_map();
    let allowed = TileMask::from_tiles(
        &map,
        (0..map.tile_count()).filter(|&t| map.tile(t).player == 0),
    );
    let roots = [map.index_of(0, 0)];
    let forest = build_gather_forest(&map, &roots, &allowed, 0).unwrap();
    c.bench_function("recompute_200_nodes", |b| {
        b.iter(|| {
            let mut f = forest.clone();
            recompute_values(&map, &mut f, 0, RecomputeOptions::default())
        })
    });
}

fn bench_set_prune(c: &mut Criterion) {
    let map = bench_map();
    let tiles = TileMask::from_tiles(
        &map,
        (0..map.tile_count()).filter(|&t| map.tile(t).player == 0),
    );
    let roots = TileMask::from_tiles(&map, [map.index_of(0, 0)]);
    let weights = default_prune_weights(&map, 0, None);
    c.bench_function("set_prune_200_to_25", |b| {
        b.iter(|| {
            let mut working = tiles.clone();
            let mut rng = SmallRng::seed_from_u64(7);
            prune_connected_set_to_turns(&map, &roots, &mut working, 25, &weights, &mut rng)
                .unwrap();
            working.len()
        })
    });
}

fn bench_backpack(c: &mut Criterion) {
    let map = bench_map();
    let roots = [map.index_of(0, 0)];
    c.bench_function("backpack_gather_25_turns", |b| {
        b.iter(|| {
            gather_backpack_greedy(
                black_box(&map),
                black_box(&roots),
                25,
                0,
                BackpackOptions::default(),
            )
        })
    });
}

fn bench_steiner_driver(c: &mut Criterion) {
    let map = bench_map();
    let roots = [map.index_of(0, 0)];
    c.bench_function("steiner_driver_25_turns", |b| {
        b.iter(|| {
            let params = SteinerParams::new(
                0,
                &roots,
                25,
                Instant::now() + Duration::from_millis(200),
            );
            gather_steiner_prize_collecting(black_box(&map), &GrowthSolver, &params)
        })
    });
}

criterion_group!(
    benches,
    bench_spanning_build,
    bench_recompute,
    bench_set_prune,
    bench_backpack,
    bench_steiner_driver
);
criterion_main!(benches);
