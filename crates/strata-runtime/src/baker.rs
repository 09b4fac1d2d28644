//! Ways to fill a patch: on the calling thread or through the worker pool.

use strata_chunk::PatchContainer;
use strata_world::{PatchKey, World};

use crate::gen_ctx_pool::GenCtxPool;
use crate::handlers::{PatchBakeParams, PatchBakeTask};
use crate::task::{Delegation, TaskError, TaskOutcome};
use crate::worker::WorkerPool;

/// Two-phase bake so a population can start every patch before collecting any.
pub trait PatchBaker {
    type Ticket;

    fn start(&self, key: PatchKey) -> Self::Ticket;
    fn finish(&self, key: PatchKey, ticket: Self::Ticket) -> Result<PatchContainer, TaskError>;
}

impl<F> PatchBaker for F
where
    F: Fn(PatchKey) -> Result<PatchContainer, TaskError>,
{
    type Ticket = ();

    fn start(&self, _key: PatchKey) {}

    fn finish(&self, key: PatchKey, _ticket: ()) -> Result<PatchContainer, TaskError> {
        self(key)
    }
}

/// Bakes on the calling thread with pooled contexts.
pub struct LocalBaker<'a> {
    world: &'a World,
    contexts: &'a GenCtxPool,
}

impl<'a> LocalBaker<'a> {
    pub fn new(world: &'a World, contexts: &'a GenCtxPool) -> Self {
        Self { world, contexts }
    }
}

impl PatchBaker for LocalBaker<'_> {
    type Ticket = ();

    fn start(&self, _key: PatchKey) {}

    fn finish(&self, key: PatchKey, _ticket: ()) -> Result<PatchContainer, TaskError> {
        let ctx = self.contexts.acquire(self.world);
        let mut patch = PatchContainer::new(key, ctx.params.tile_size, ctx.params.margin);
        patch.bake_with_margin(&ctx);
        Ok(patch)
    }
}

/// Submits every bake up front and collects replies in request order.
pub struct WorkerBaker<'a> {
    pool: &'a WorkerPool,
    params: PatchBakeParams,
}

impl<'a> WorkerBaker<'a> {
    pub fn new(pool: &'a WorkerPool, params: PatchBakeParams) -> Self {
        Self { pool, params }
    }
}

impl PatchBaker for WorkerBaker<'_> {
    type Ticket = Delegation<PatchBakeTask>;

    fn start(&self, key: PatchKey) -> Delegation<PatchBakeTask> {
        let mut d = Delegation::new(PatchBakeTask::new(key, self.params));
        d.submit(self.pool);
        d
    }

    fn finish(
        &self,
        _key: PatchKey,
        mut ticket: Delegation<PatchBakeTask>,
    ) -> Result<PatchContainer, TaskError> {
        match ticket.wait() {
            TaskOutcome::Completed | TaskOutcome::AlreadyDone => ticket
                .into_task()
                .take_patch()
                .ok_or_else(|| TaskError::Failed("reconciled without a patch".into())),
            TaskOutcome::Postponed(e) => Err(e),
        }
    }
}
