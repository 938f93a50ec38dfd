//! Benchmark for whole-grid generation.
//!
//! Run with: cargo bench --package terravox_procedural --bench generation_benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use terravox_procedural::{
    Biome, BiomeRule, CancelToken, ChunkGrid, GenerationParams, GeneratorConfig,
    ParallelGenerator, VegetationPlacer,
};

fn benchmark_biomes(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_2x2_chunks");
    group.sample_size(10);

    for biome in Biome::ALL {
        let params = GenerationParams::for_biome(biome);
        let dims = params.dimensions().expect("default params are valid");
        let rule = BiomeRule::new(&params);
        let generator = ParallelGenerator::new(GeneratorConfig::production());

        group.throughput(Throughput::Elements((dims.cells_x() * dims.cells_z()) as u64));
        group.bench_function(format!("{biome:?}"), |b| {
            let mut grid = ChunkGrid::new(dims);
            b.iter(|| {
                generator
                    .generate(&mut grid, &rule, &CancelToken::new())
                    .expect("generation");
                black_box(grid.active_voxel_count())
            });
        });
    }

    group.finish();
}

fn benchmark_worker_scaling(c: &mut Criterion) {
    let params = GenerationParams {
        world_size: 4,
        ..GenerationParams::default()
    };
    let dims = params.dimensions().expect("valid params");
    let rule = BiomeRule::new(&params);

    let mut group = c.benchmark_group("worker_scaling_4x4");
    group.sample_size(10);

    for workers in [1usize, 2, 4, 8] {
        let generator = ParallelGenerator::new(GeneratorConfig {
            worker_threads: workers,
            queue_depth: 16,
        });
        group.bench_function(format!("{workers}_workers"), |b| {
            let mut grid = ChunkGrid::new(dims);
            b.iter(|| {
                generator
                    .generate(&mut grid, &rule, &CancelToken::new())
                    .expect("generation");
            });
        });
    }

    group.finish();
}

fn benchmark_vegetation(c: &mut Criterion) {
    let params = GenerationParams {
        tree_density: 0.1,
        ..GenerationParams::default()
    };
    let mut base = ChunkGrid::new(params.dimensions().expect("valid params"));
    ParallelGenerator::default()
        .generate(&mut base, &BiomeRule::new(&params), &CancelToken::new())
        .expect("generation");
    let placer = VegetationPlacer::new(params.seed, params.tree_density);

    c.bench_function("vegetation_density_0.1", |b| {
        b.iter(|| {
            let mut grid = base.clone();
            black_box(placer.place(&mut grid).tree_count())
        });
    });
}

criterion_group!(
    benches,
    benchmark_biomes,
    benchmark_worker_scaling,
    benchmark_vegetation
);
criterion_main!(benches);
