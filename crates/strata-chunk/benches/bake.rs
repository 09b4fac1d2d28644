use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use strata_chunk::{ChunkContainer, PatchContainer};
use strata_world::{ChunkKey, GenCtx, PatchKey, WorldGenParams};

fn bench_patch_bake(c: &mut Criterion) {
    let mut group = c.benchmark_group("patch_bake");
    let ctx = GenCtx::new(Arc::new(WorldGenParams::default()));
    for tile in [32u32, 64] {
        group.bench_function(format!("tile_{tile}"), |b| {
            b.iter(|| {
                let mut patch = PatchContainer::new(PatchKey::new(3, -2), tile, 1);
                let stats = patch.bake(&ctx);
                black_box((patch, stats));
            })
        });
    }
    group.finish();
}

fn bench_chunk_assembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_assembly");
    let ctx = GenCtx::new(Arc::new(WorldGenParams::default()));
    let mut patch = PatchContainer::new(PatchKey::new(0, 0), ctx.params.tile_size, 1);
    patch.bake(&ctx);
    group.bench_function("from_patch_y1", |b| {
        b.iter(|| {
            let chunk = ChunkContainer::from_patch(&patch, &ctx, ChunkKey::new(0, 1, 0), 1);
            black_box(chunk.occupancy());
        })
    });
    group.finish();
}

criterion_group!(benches, bench_patch_bake, bench_chunk_assembly);
criterion_main!(benches);
