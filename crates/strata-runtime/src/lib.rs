//! Patch cache, task delegation and worker orchestration.
#![forbid(unsafe_code)]

mod baker;
mod cache;
mod gen_ctx_pool;
pub mod handlers;
pub mod task;
pub mod worker;

use std::sync::Arc;

use strata_chunk::ChunkContainer;
use strata_geom::IVec2;
use strata_world::{ChunkKey, World};
use thiserror::Error;

pub use baker::{LocalBaker, PatchBaker, WorkerBaker};
pub use cache::{PatchCache, PatchCacheStats, Population, PopulationStep, RefreshDiff};
pub use gen_ctx_pool::{GenCtxPool, PooledGenCtx};
pub use handlers::{ChunkBuildTask, PatchBakeParams, PatchBakeTask};
pub use task::{Delegation, ProcessingTask, TaskError, TaskOutcome, TaskState};
pub use worker::{HandlerRegistry, WorkerPool, WorkerPoolStats, WorkerReply, WorkerRequest};

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("patch {0} is not cached")]
    MissingPatch(strata_world::PatchKey),
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error("worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Result of moving the view window and populating it.
#[derive(Clone, Debug, Default)]
pub struct ViewUpdate {
    pub diff: RefreshDiff,
    pub populated: usize,
    pub failed: Vec<(strata_world::PatchKey, TaskError)>,
}

/// Cache plus the machinery that fills it, either on worker threads or inline.
pub struct Runtime {
    world: Arc<World>,
    cache: PatchCache,
    contexts: Arc<GenCtxPool>,
    pool: Option<WorkerPool>,
}

impl Runtime {
    /// Worker-backed runtime sized from the `[cache]` settings.
    pub fn new(world: Arc<World>) -> Result<Self, RuntimeError> {
        let params = world.params();
        let pool = WorkerPool::new(&params, HandlerRegistry::with_defaults(), params.workers)?;
        let contexts = GenCtxPool::with_capacity_from_workers(1);
        Ok(Self {
            cache: PatchCache::new(params.tile_size),
            world,
            contexts,
            pool: Some(pool),
        })
    }

    /// Runtime that bakes on the calling thread.
    pub fn local(world: Arc<World>) -> Self {
        let params = world.params();
        Self {
            cache: PatchCache::new(params.tile_size),
            world,
            contexts: GenCtxPool::with_capacity_from_workers(1),
            pool: None,
        }
    }

    pub fn world(&self) -> &Arc<World> {
        &self.world
    }

    pub fn cache(&self) -> &PatchCache {
        &self.cache
    }

    pub fn worker_pool(&self) -> Option<&WorkerPool> {
        self.pool.as_ref()
    }

    /// Moves the window around `center` and bakes every missing patch.
    /// `None` when another refresh holds the cache.
    pub fn update_view(&self, center: IVec2) -> Option<ViewUpdate> {
        let params = self.world.params();
        let region = self.world.view_region(center, params.cache_radius);
        match &self.pool {
            Some(pool) => {
                let baker = WorkerBaker::new(
                    pool,
                    PatchBakeParams {
                        tile_size: params.tile_size,
                        margin: params.margin,
                        with_margin: true,
                    },
                );
                let population = self.cache.refresh_and_populate(region, &baker)?;
                Some(drain(population))
            }
            None => {
                let baker = LocalBaker::new(&self.world, &self.contexts);
                let population = self.cache.refresh_and_populate(region, &baker)?;
                Some(drain(population))
            }
        }
    }

    /// Assembles one chunk from its cached patch.
    pub fn build_chunk(&self, key: ChunkKey, margin: u32) -> Result<ChunkContainer, RuntimeError> {
        let patch = self
            .cache
            .get(key.patch())
            .ok_or(RuntimeError::MissingPatch(key.patch()))?;
        match &self.pool {
            Some(pool) => {
                let mut d = Delegation::new(ChunkBuildTask::new(key, &patch, margin));
                match d.delegate(pool) {
                    TaskOutcome::Postponed(e) => Err(e.into()),
                    _ => d
                        .into_task()
                        .take_chunk()
                        .ok_or_else(|| TaskError::Failed("reconciled without a chunk".into()).into()),
                }
            }
            None => {
                let ctx = self.contexts.acquire(&self.world);
                Ok(ChunkContainer::from_patch(&patch, &ctx, key, margin))
            }
        }
    }
}

fn drain<B: PatchBaker>(population: Population<'_, B>) -> ViewUpdate {
    let diff = population.diff().clone();
    let mut update = ViewUpdate {
        diff,
        ..ViewUpdate::default()
    };
    for step in population {
        match step.result {
            Ok(_) => update.populated += 1,
            Err(e) => update.failed.push((step.key, e)),
        }
    }
    log::info!(
        "view updated: {} added, {} removed, {} baked, {} failed",
        update.diff.added.len(),
        update.diff.removed.len(),
        update.populated,
        update.failed.len()
    );
    update
}
