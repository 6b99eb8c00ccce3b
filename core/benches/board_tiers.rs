use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use minesync_core::*;
use std::hint::black_box;

const TIERS: [(u32, u32); 3] = [(9, 10), (25, 65), (100, 1200)];

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");
    for (size, bombs) in TIERS {
        let config = BoardConfig::new(size, bombs).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), &config, |b, &config| {
            let mut generator = RandomBoardGenerator::from_seed(42);
            b.iter(|| generator.generate(black_box(config)));
        });
    }
    group.finish();
}

fn bench_flood(c: &mut Criterion) {
    let mut group = c.benchmark_group("flood");
    for (size, _) in TIERS {
        // one mine in the far corner leaves a single huge zero region
        let edge = size as Coord;
        let values = BoardValues::from_mine_coords(edge, &[(edge - 1, edge - 1)]).unwrap();
        let mask = empty_mask(edge);
        group.bench_with_input(BenchmarkId::from_parameter(size), &values, |b, values| {
            b.iter(|| reveal(values, &mask, &mask, black_box((0, 0))));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_generate, bench_flood);
criterion_main!(benches);
