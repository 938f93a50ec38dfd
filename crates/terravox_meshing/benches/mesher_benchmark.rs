//! Benchmark for instanced mesh building.
//!
//! Run with: cargo bench --package terravox_meshing --bench mesher_benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use terravox_meshing::InstancedMesher;
use terravox_procedural::{BiomeRule, CancelToken, ChunkGrid, GenerationParams, ParallelGenerator};

fn benchmark_build_mesh(c: &mut Criterion) {
    let params = GenerationParams::default();
    let mut grid = ChunkGrid::new(params.dimensions().expect("valid params"));
    ParallelGenerator::default()
        .generate(&mut grid, &BiomeRule::new(&params), &CancelToken::new())
        .expect("generation");

    let mesher = InstancedMesher::new();
    let mut group = c.benchmark_group("build_mesh");
    group.throughput(Throughput::Elements(grid.active_voxel_count()));
    group.sample_size(20);

    group.bench_function("default_plains", |b| {
        b.iter(|| {
            let mesh = mesher.build_mesh(&grid, &params.palette).expect("mesh");
            black_box(mesh.instance_count())
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_build_mesh);
criterion_main!(benches);
