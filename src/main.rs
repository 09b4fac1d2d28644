use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use strata_chunk::ChunkOccupancy;
use strata_geom::IVec2;
use strata_runtime::Runtime;
use strata_world::worldgen::load_config_from_path;
use strata_world::{World, WorldGenConfig, WorldGenParams};

#[derive(Parser, Debug)]
#[command(name = "strata", about = "Headless terrain synthesis driver")]
struct Args {
    /// Worldgen TOML; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long)]
    seed: Option<String>,
    /// View center in world coordinates, `x,z`
    #[arg(long, value_parser = parse_center, default_value = "0,0")]
    center: IVec2,
    /// Override `[cache] radius` (in patches)
    #[arg(long)]
    radius: Option<u32>,
    /// Override `[cache] workers`; 0 picks one per core
    #[arg(long)]
    workers: Option<usize>,
    /// Bake on the main thread instead of the worker pool
    #[arg(long)]
    local: bool,
    /// Assemble the chunk column of every cached patch
    #[arg(long)]
    chunks: bool,
    /// Move the view this many patches along +x after the first refresh
    #[arg(long, default_value_t = 0)]
    walk: u32,
}

fn parse_center(s: &str) -> Result<IVec2, String> {
    let (x, z) = s
        .split_once(',')
        .ok_or_else(|| format!("expected `x,z`, got `{s}`"))?;
    let x = x.trim().parse::<i32>().map_err(|e| e.to_string())?;
    let z = z.trim().parse::<i32>().map_err(|e| e.to_string())?;
    Ok(IVec2::new(x, z))
}

/// View centers visited by `--walk`: the start, then one tile further along +x per step.
fn walk_centers(start: IVec2, tile: i32, steps: u32) -> Vec<IVec2> {
    (0..=steps as i32)
        .map(|i| IVec2::new(start.x + i * tile, start.z))
        .collect()
}

fn load_config(args: &Args) -> Result<WorldGenConfig, Box<dyn Error>> {
    let mut cfg = match &args.config {
        Some(path) => {
            let cfg = load_config_from_path(path)?;
            log::info!("loaded worldgen config from {}", path.display());
            cfg
        }
        None => WorldGenConfig::default(),
    };
    if let Some(seed) = &args.seed {
        cfg.seed = seed.clone();
    }
    if let Some(radius) = args.radius {
        cfg.cache.radius = radius;
    }
    if let Some(workers) = args.workers {
        cfg.cache.workers = workers;
    }
    Ok(cfg)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let cfg = load_config(&args)?;
    let params = WorldGenParams::from_config(&cfg)?;
    log::info!(
        "seed `{}`, tile {}, margin {}, radius {}",
        params.seed,
        params.tile_size,
        params.margin,
        params.cache_radius
    );
    let world = Arc::new(World::new(params));
    let runtime = if args.local {
        Runtime::local(Arc::clone(&world))
    } else {
        Runtime::new(Arc::clone(&world))?
    };

    let tile = world.tile_size();
    for (step, center) in walk_centers(args.center, tile, args.walk).into_iter().enumerate() {
        let t0 = Instant::now();
        let Some(update) = runtime.update_view(center) else {
            log::warn!("view update at {center:?} skipped");
            continue;
        };
        log::info!(
            "step {step}: {} patches in view, {} retained, {} baked in {} ms",
            runtime.cache().keys().len(),
            update.diff.retained.len(),
            update.populated,
            t0.elapsed().as_millis()
        );
        for (key, err) in &update.failed {
            log::warn!("patch {key} still missing: {err}");
        }
    }

    if args.chunks {
        let t0 = Instant::now();
        let (mut built, mut populated, mut voxels) = (0usize, 0usize, 0usize);
        for patch in runtime.cache().keys() {
            for key in world.chunk_column(patch) {
                match runtime.build_chunk(key, world.params().margin) {
                    Ok(chunk) => {
                        built += 1;
                        if chunk.occupancy() == ChunkOccupancy::Populated {
                            populated += 1;
                            voxels += chunk.count_non_empty();
                        }
                    }
                    Err(e) => log::warn!("chunk {key} not built: {e}"),
                }
            }
        }
        log::info!(
            "assembled {built} chunks ({populated} populated, {voxels} voxels) in {} ms",
            t0.elapsed().as_millis()
        );
    }

    let stats = runtime.cache().stats();
    log::info!(
        "cache: {} entries, {} missing, {} hits, {} misses, {} evictions",
        stats.entries,
        stats.missing,
        stats.hits,
        stats.misses,
        stats.evictions
    );
    if let Some(pool) = runtime.worker_pool() {
        let s = pool.stats();
        log::info!(
            "workers: {} threads, {} submitted, {} completed, {} failed, {} dropped",
            s.workers,
            s.submitted,
            s.completed,
            s.failed,
            s.dropped
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_advances_one_tile_per_step() {
        let centers = walk_centers(IVec2::new(5, -3), 16, 3);
        assert_eq!(
            centers,
            vec![
                IVec2::new(5, -3),
                IVec2::new(21, -3),
                IVec2::new(37, -3),
                IVec2::new(53, -3),
            ]
        );
        assert_eq!(walk_centers(IVec2::ZERO, 64, 0), vec![IVec2::ZERO]);
    }

    #[test]
    fn center_parses_from_x_comma_z() {
        assert_eq!(parse_center("12, -4"), Ok(IVec2::new(12, -4)));
        assert!(parse_center("12").is_err());
    }
}
