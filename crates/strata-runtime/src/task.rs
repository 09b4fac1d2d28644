//! Processing tasks and the delegation state machine that ships them to workers.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use strata_world::GenCtx;
use thiserror::Error;

use crate::worker::{Inflight, WorkerPool, WorkerReply};

#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskError {
    #[error("task failed: {0}")]
    Failed(String),
    #[error("no handler registered for `{0}`")]
    UnknownHandler(String),
    #[error("message codec: {0}")]
    Codec(String),
    #[error("worker pool disconnected")]
    Disconnected,
    #[error("task cancelled")]
    Cancelled,
}

impl From<bincode::Error> for TaskError {
    fn from(e: bincode::Error) -> Self {
        TaskError::Codec(e.to_string())
    }
}

/// Unit of work that can run locally or on a worker.
///
/// A worker never sees the caller's instance: it rebuilds one through
/// [`ProcessingTask::from_parts`] from the serialized input and params.
pub trait ProcessingTask: Sized {
    const HANDLER_ID: &'static str;

    type Input: Serialize + DeserializeOwned;
    type Params: Serialize + DeserializeOwned;
    type Output: Serialize + DeserializeOwned;

    fn input(&self) -> Self::Input;
    fn params(&self) -> Self::Params;
    fn from_parts(input: Self::Input, params: Self::Params) -> Self;
    fn process(&mut self, ctx: &GenCtx) -> Result<Self::Output, TaskError>;
    fn reconcile(&mut self, output: Self::Output) -> Result<(), TaskError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskState {
    Waiting,
    Pending,
    Postponed,
    Done,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Output accepted by this call.
    Completed,
    /// Already reconciled earlier; nothing was sent.
    AlreadyDone,
    Postponed(TaskError),
}

impl TaskOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, TaskOutcome::Completed | TaskOutcome::AlreadyDone)
    }
}

/// Tracks one task through Waiting -> Pending -> {Done, Postponed}.
pub struct Delegation<T: ProcessingTask> {
    task: T,
    state: TaskState,
    inflight: Option<Inflight>,
    last_error: Option<TaskError>,
}

impl<T: ProcessingTask> Delegation<T> {
    pub fn new(task: T) -> Self {
        Self {
            task,
            state: TaskState::Waiting,
            inflight: None,
            last_error: None,
        }
    }

    #[inline]
    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn task(&self) -> &T {
        &self.task
    }

    pub fn into_task(self) -> T {
        self.task
    }

    pub fn last_error(&self) -> Option<&TaskError> {
        self.last_error.as_ref()
    }

    /// Sends the task and blocks for its reply.
    pub fn delegate(&mut self, pool: &WorkerPool) -> TaskOutcome {
        if self.state == TaskState::Done {
            return TaskOutcome::AlreadyDone;
        }
        if self.state != TaskState::Pending {
            self.submit(pool);
        }
        self.wait()
    }

    /// Sends the task without waiting. No-op while already pending or done.
    pub fn submit(&mut self, pool: &WorkerPool) -> TaskState {
        if matches!(self.state, TaskState::Pending | TaskState::Done) {
            return self.state;
        }
        let args = match bincode::serialize(&(self.task.input(), self.task.params())) {
            Ok(args) => args,
            Err(e) => {
                self.postpone(e.into());
                return self.state;
            }
        };
        match pool.send(T::HANDLER_ID, args) {
            Ok(inflight) => {
                self.inflight = Some(inflight);
                self.state = TaskState::Pending;
            }
            Err(e) => {
                self.postpone(e);
            }
        }
        self.state
    }

    /// Non-blocking check for a reply. `None` while still pending or never sent.
    pub fn poll(&mut self) -> Option<TaskOutcome> {
        let reply = self.inflight.as_ref()?.try_recv()?;
        Some(self.settle(reply))
    }

    /// Blocks until the pending reply arrives.
    pub fn wait(&mut self) -> TaskOutcome {
        match self.state {
            TaskState::Done => return TaskOutcome::AlreadyDone,
            TaskState::Pending => {}
            _ => {
                let err = self.last_error.clone().unwrap_or(TaskError::Cancelled);
                return TaskOutcome::Postponed(err);
            }
        }
        let reply = match self.inflight.as_ref().map(Inflight::recv) {
            Some(reply) => reply,
            None => Err(TaskError::Disconnected),
        };
        self.settle(reply)
    }

    /// Stops a pending task from reconciling a late reply. Idempotent.
    pub fn cancel(&mut self) {
        // Dropping the inflight handle removes it from the pending table.
        self.inflight = None;
        if self.state == TaskState::Pending {
            self.state = TaskState::Postponed;
            self.last_error = Some(TaskError::Cancelled);
        }
    }

    fn settle(&mut self, reply: Result<WorkerReply, TaskError>) -> TaskOutcome {
        self.inflight = None;
        let bytes = match reply.and_then(|r| r.outcome) {
            Ok(bytes) => bytes,
            Err(e) => return self.postpone(e),
        };
        let output: T::Output = match bincode::deserialize(&bytes) {
            Ok(out) => out,
            Err(e) => return self.postpone(e.into()),
        };
        match self.task.reconcile(output) {
            Ok(()) => {
                self.state = TaskState::Done;
                self.last_error = None;
                TaskOutcome::Completed
            }
            Err(e) => self.postpone(e),
        }
    }

    fn postpone(&mut self, err: TaskError) -> TaskOutcome {
        log::warn!("task `{}` postponed: {err}", T::HANDLER_ID);
        self.state = TaskState::Postponed;
        self.last_error = Some(err.clone());
        TaskOutcome::Postponed(err)
    }
}
