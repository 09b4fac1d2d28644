use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use crossbeam_channel::{Receiver, Sender, TryRecvError, bounded, unbounded};
use hashbrown::HashMap;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use strata_world::{GenCtx, WorldGenParams};

use crate::task::{ProcessingTask, TaskError};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRequest {
    pub id: u64,
    pub handler_id: String,
    pub args: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerReply {
    pub id: u64,
    pub outcome: Result<Vec<u8>, TaskError>,
}

type HandlerFn = dyn Fn(&[u8], &GenCtx) -> Result<Vec<u8>, TaskError> + Send + Sync;

/// Handler id -> function that rebuilds a task from its bytes and runs it.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<&'static str, Arc<HandlerFn>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: ProcessingTask + 'static>(&mut self) -> &mut Self {
        let handler = |args: &[u8], ctx: &GenCtx| -> Result<Vec<u8>, TaskError> {
            let (input, params): (T::Input, T::Params) = bincode::deserialize(args)?;
            let mut task = T::from_parts(input, params);
            let output = task.process(ctx)?;
            Ok(bincode::serialize(&output)?)
        };
        self.handlers.insert(T::HANDLER_ID, Arc::new(handler));
        self
    }

    pub fn contains(&self, handler_id: &str) -> bool {
        self.handlers.contains_key(handler_id)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Runs a request against this registry; failures become the reply's error.
    pub fn handle(&self, request: &WorkerRequest, ctx: &GenCtx) -> WorkerReply {
        let outcome = match self.handlers.get(request.handler_id.as_str()) {
            None => Err(TaskError::UnknownHandler(request.handler_id.clone())),
            Some(handler) => match catch_unwind(AssertUnwindSafe(|| handler(&request.args, ctx))) {
                Ok(result) => result,
                Err(_) => Err(TaskError::Failed(format!(
                    "handler `{}` panicked",
                    request.handler_id
                ))),
            },
        };
        WorkerReply {
            id: request.id,
            outcome,
        }
    }
}

type PendingTable = Mutex<HashMap<u64, Sender<Vec<u8>>>>;

fn lock_pending(pending: &PendingTable) -> std::sync::MutexGuard<'_, HashMap<u64, Sender<Vec<u8>>>> {
    pending.lock().unwrap_or_else(|e| e.into_inner())
}

/// Caller-side handle for one outstanding request. Dropping it forgets the request.
pub struct Inflight {
    id: u64,
    rx: Receiver<Vec<u8>>,
    pending: Arc<PendingTable>,
}

impl Inflight {
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn recv(&self) -> Result<WorkerReply, TaskError> {
        let bytes = self.rx.recv().map_err(|_| TaskError::Disconnected)?;
        Self::decode(self.id, &bytes)
    }

    pub(crate) fn try_recv(&self) -> Option<Result<WorkerReply, TaskError>> {
        match self.rx.try_recv() {
            Ok(bytes) => Some(Self::decode(self.id, &bytes)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(TaskError::Disconnected)),
        }
    }

    fn decode(id: u64, bytes: &[u8]) -> Result<WorkerReply, TaskError> {
        let reply: WorkerReply = bincode::deserialize(bytes)?;
        if reply.id != id {
            return Err(TaskError::Codec(format!("reply {} routed to request {id}", reply.id)));
        }
        Ok(reply)
    }
}

impl Drop for Inflight {
    fn drop(&mut self) {
        lock_pending(&self.pending).remove(&self.id);
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkerPoolStats {
    pub workers: usize,
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    /// Replies that arrived after their request was cancelled.
    pub dropped: u64,
    pub queued: usize,
    pub inflight: usize,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
    queued: AtomicUsize,
    inflight: AtomicUsize,
}

/// Worker threads exchanging serialized requests and replies with the caller.
pub struct WorkerPool {
    request_tx: Sender<Vec<u8>>,
    pending: Arc<PendingTable>,
    next_id: AtomicU64,
    counters: Arc<Counters>,
    workers: usize,
    _pool: Arc<ThreadPool>,
}

impl WorkerPool {
    /// `workers == 0` picks one per available core. Each worker builds its own
    /// generation context from a private copy of `params`.
    pub fn new(
        params: &WorldGenParams,
        registry: HandlerRegistry,
        workers: usize,
    ) -> Result<Self, rayon::ThreadPoolBuildError> {
        let workers = if workers == 0 {
            thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            workers
        };
        let pool = Arc::new(
            ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("strata-worker-{i}"))
                .build()?,
        );
        let (request_tx, request_rx) = unbounded::<Vec<u8>>();
        let pending: Arc<PendingTable> = Arc::new(Mutex::new(HashMap::new()));
        let counters = Arc::new(Counters::default());
        let registry = Arc::new(registry);

        for _ in 0..workers {
            let rx = request_rx.clone();
            let pending = Arc::clone(&pending);
            let counters = Arc::clone(&counters);
            let registry = Arc::clone(&registry);
            let params = Arc::new(params.clone());
            pool.spawn(move || {
                let ctx = GenCtx::new(params);
                while let Ok(bytes) = rx.recv() {
                    counters.queued.fetch_sub(1, Ordering::Relaxed);
                    counters.inflight.fetch_add(1, Ordering::Relaxed);
                    let reply = match bincode::deserialize::<WorkerRequest>(&bytes) {
                        Ok(request) => registry.handle(&request, &ctx),
                        Err(e) => {
                            log::warn!("dropping undecodable worker request: {e}");
                            counters.inflight.fetch_sub(1, Ordering::Relaxed);
                            continue;
                        }
                    };
                    counters.inflight.fetch_sub(1, Ordering::Relaxed);
                    route_reply(&pending, &counters, reply);
                }
            });
        }
        log::info!("worker pool started with {workers} workers");

        Ok(Self {
            request_tx,
            pending,
            next_id: AtomicU64::new(1),
            counters,
            workers,
            _pool: pool,
        })
    }

    pub(crate) fn send(&self, handler_id: &str, args: Vec<u8>) -> Result<Inflight, TaskError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = WorkerRequest {
            id,
            handler_id: handler_id.to_string(),
            args,
        };
        let bytes = bincode::serialize(&request)?;
        let (tx, rx) = bounded(1);
        lock_pending(&self.pending).insert(id, tx);
        let inflight = Inflight {
            id,
            rx,
            pending: Arc::clone(&self.pending),
        };
        self.counters.queued.fetch_add(1, Ordering::Relaxed);
        if self.request_tx.send(bytes).is_err() {
            self.counters.queued.fetch_sub(1, Ordering::Relaxed);
            return Err(TaskError::Disconnected);
        }
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        Ok(inflight)
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Requests sent but not yet answered or cancelled.
    pub fn pending(&self) -> usize {
        lock_pending(&self.pending).len()
    }

    pub fn stats(&self) -> WorkerPoolStats {
        let c = &self.counters;
        WorkerPoolStats {
            workers: self.workers,
            submitted: c.submitted.load(Ordering::Relaxed),
            completed: c.completed.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
            dropped: c.dropped.load(Ordering::Relaxed),
            queued: c.queued.load(Ordering::Relaxed),
            inflight: c.inflight.load(Ordering::Relaxed),
        }
    }
}

fn route_reply(pending: &PendingTable, counters: &Counters, reply: WorkerReply) {
    match &reply.outcome {
        Ok(_) => counters.completed.fetch_add(1, Ordering::Relaxed),
        Err(e) => {
            log::warn!("worker request {} failed: {e}", reply.id);
            counters.failed.fetch_add(1, Ordering::Relaxed)
        }
    };
    let Some(tx) = lock_pending(pending).remove(&reply.id) else {
        log::debug!("reply {} arrived after cancellation; dropped", reply.id);
        counters.dropped.fetch_add(1, Ordering::Relaxed);
        return;
    };
    match bincode::serialize(&reply) {
        Ok(bytes) => {
            let _ = tx.send(bytes);
        }
        Err(e) => log::warn!("could not encode reply {}: {e}", reply.id),
    }
}
