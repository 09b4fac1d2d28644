use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_channel::{Receiver, Sender, bounded};
use strata_world::{GenCtx, World};

/// Lock-free pool for reusing `GenCtx` instances across local bakes.
pub struct GenCtxPool {
    available_tx: Sender<GenCtx>,
    available_rx: Receiver<GenCtx>,
    allocated: AtomicUsize,
    max_contexts: usize,
}

impl GenCtxPool {
    pub fn new(max_contexts: usize) -> Self {
        let max_contexts = max_contexts.max(1);
        let (tx, rx) = bounded(max_contexts);
        Self {
            available_tx: tx,
            available_rx: rx,
            allocated: AtomicUsize::new(0),
            max_contexts,
        }
    }

    pub fn with_capacity_from_workers(worker_count: usize) -> Arc<Self> {
        let count = worker_count.max(1) * 2;
        Arc::new(Self::new(count))
    }

    /// Acquire a context from the pool, creating a new one if under capacity.
    pub fn acquire<'pool>(&'pool self, world: &World) -> PooledGenCtx<'pool> {
        if let Ok(ctx) = self.available_rx.try_recv() {
            return self.wrap(ctx);
        }

        loop {
            let current = self.allocated.load(Ordering::Acquire);
            if current < self.max_contexts {
                let prev = self.allocated.fetch_add(1, Ordering::AcqRel);
                if prev < self.max_contexts {
                    return self.wrap(world.make_gen_ctx());
                }
                self.allocated.fetch_sub(1, Ordering::AcqRel);
            }

            match self.available_rx.recv() {
                Ok(ctx) => return self.wrap(ctx),
                Err(_) => continue,
            }
        }
    }

    /// Contexts created so far.
    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }

    fn wrap(&self, ctx: GenCtx) -> PooledGenCtx<'_> {
        PooledGenCtx {
            ctx: Some(ctx),
            pool: self,
        }
    }

    fn release(&self, ctx: GenCtx) {
        let _ = self.available_tx.send(ctx);
    }
}

pub struct PooledGenCtx<'pool> {
    ctx: Option<GenCtx>,
    pool: &'pool GenCtxPool,
}

impl<'pool> Deref for PooledGenCtx<'pool> {
    type Target = GenCtx;

    fn deref(&self) -> &Self::Target {
        self.ctx.as_ref().expect("GenCtx already released")
    }
}

impl<'pool> Drop for PooledGenCtx<'pool> {
    fn drop(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            self.pool.release(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_world::WorldGenParams;

    #[test]
    fn contexts_are_reused() {
        let world = World::new(WorldGenParams::default());
        let pool = GenCtxPool::new(2);
        {
            let _a = pool.acquire(&world);
        }
        {
            let _b = pool.acquire(&world);
        }
        assert_eq!(pool.allocated(), 1);
    }

    #[test]
    fn pooled_contexts_use_the_world_params() {
        let world = World::new(WorldGenParams::default());
        let pool = GenCtxPool::new(2);
        let a = pool.acquire(&world);
        let b = pool.acquire(&world);
        assert_eq!(pool.allocated(), 2);
        assert!(Arc::ptr_eq(&a.params, &world.params()));
        assert!(Arc::ptr_eq(&b.params, &world.params()));
    }
}
