//! Benchmarks for the octree index and the flock tick.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use octoflock::{Aabb, Flock, FlockConfig, Octree, Vec3};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

fn random_points(n: usize, half: f32) -> Vec<Vec3> {
    let mut rng = SmallRng::seed_from_u64(0);
    (0..n)
        .map(|_| Vec3::new(rng.gen_range(-half..half), rng.gen_range(-half..half), rng.gen_range(-half..half)))
        .collect()
}

fn bench_octree(c: &mut Criterion) {
    let mut group = c.benchmark_group("octree");

    for count in [1_000, 10_000] {
        let points = random_points(count, 50.0);

        group.bench_with_input(BenchmarkId::new("insert", count), &points, |b, points| {
            b.iter(|| {
                let tree = Octree::new(Aabb::cube(50.0), 16);
                for (i, p) in points.iter().enumerate() {
                    tree.insert(i as u32, *p).unwrap();
                }
                black_box(tree.count_nodes())
            })
        });

        let tree = Octree::new(Aabb::cube(50.0), 16);
        for (i, p) in points.iter().enumerate() {
            tree.insert(i as u32, *p).unwrap();
        }
        group.bench_with_input(BenchmarkId::new("query_sphere", count), &points, |b, points| {
            let mut out = Vec::new();
            b.iter(|| {
                for p in points.iter().take(256) {
                    out.clear();
                    tree.query_sphere_into(*p, 7.5, &mut out);
                }
                black_box(out.len())
            })
        });
    }

    group.finish();
}

fn bench_flock_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("flock_step");
    group.sample_size(20);

    for count in [1_000, 5_000, 20_000] {
        let config = FlockConfig::default().with_agent_count(count);
        let mut flock = Flock::from_seed(config, Aabb::cube(50.0), 1).unwrap();
        group.bench_function(BenchmarkId::from_parameter(count), |b| {
            b.iter(|| black_box(flock.step(1.0 / 60.0).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_octree, bench_flock_step);
criterion_main!(benches);
