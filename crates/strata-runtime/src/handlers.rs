//! Built-in tasks: patch bakes and chunk assembly.

use serde::{Deserialize, Serialize};
use strata_chunk::{ChunkContainer, ChunkStub, PatchContainer, PatchStub};
use strata_world::{ChunkKey, GenCtx, PatchKey};

use crate::task::{ProcessingTask, TaskError};
use crate::worker::HandlerRegistry;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchBakeParams {
    pub tile_size: u32,
    pub margin: u32,
    pub with_margin: bool,
}

pub struct PatchBakeTask {
    key: PatchKey,
    params: PatchBakeParams,
    patch: Option<PatchContainer>,
}

impl PatchBakeTask {
    pub fn new(key: PatchKey, params: PatchBakeParams) -> Self {
        Self {
            key,
            params,
            patch: None,
        }
    }

    pub fn key(&self) -> PatchKey {
        self.key
    }

    pub fn patch(&self) -> Option<&PatchContainer> {
        self.patch.as_ref()
    }

    pub fn take_patch(&mut self) -> Option<PatchContainer> {
        self.patch.take()
    }
}

impl ProcessingTask for PatchBakeTask {
    const HANDLER_ID: &'static str = "patch.bake";

    type Input = PatchKey;
    type Params = PatchBakeParams;
    type Output = PatchStub;

    fn input(&self) -> PatchKey {
        self.key
    }

    fn params(&self) -> PatchBakeParams {
        self.params
    }

    fn from_parts(input: PatchKey, params: PatchBakeParams) -> Self {
        Self::new(input, params)
    }

    fn process(&mut self, ctx: &GenCtx) -> Result<PatchStub, TaskError> {
        if self.params.tile_size != ctx.params.tile_size {
            return Err(TaskError::Failed(format!(
                "tile size {} does not match worker config {}",
                self.params.tile_size, ctx.params.tile_size
            )));
        }
        let mut patch = PatchContainer::new(self.key, self.params.tile_size, self.params.margin);
        if self.params.with_margin {
            patch.bake_with_margin(ctx);
        } else {
            patch.bake(ctx);
        }
        Ok(patch.to_stub())
    }

    fn reconcile(&mut self, output: PatchStub) -> Result<(), TaskError> {
        let patch =
            PatchContainer::from_stub(output).map_err(|e| TaskError::Codec(e.to_string()))?;
        if patch.key() != self.key {
            return Err(TaskError::Failed(format!(
                "expected patch {}, got {}",
                self.key,
                patch.key()
            )));
        }
        self.patch = Some(patch);
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChunkBuildInput {
    pub key: ChunkKey,
    pub patch: PatchStub,
}

pub struct ChunkBuildTask {
    input: ChunkBuildInput,
    margin: u32,
    chunk: Option<ChunkContainer>,
}

impl ChunkBuildTask {
    pub fn new(key: ChunkKey, patch: &PatchContainer, margin: u32) -> Self {
        Self {
            input: ChunkBuildInput {
                key,
                patch: patch.to_stub(),
            },
            margin,
            chunk: None,
        }
    }

    pub fn take_chunk(&mut self) -> Option<ChunkContainer> {
        self.chunk.take()
    }
}

impl ProcessingTask for ChunkBuildTask {
    const HANDLER_ID: &'static str = "chunk.build";

    type Input = ChunkBuildInput;
    type Params = u32;
    type Output = ChunkStub;

    fn input(&self) -> ChunkBuildInput {
        self.input.clone()
    }

    fn params(&self) -> u32 {
        self.margin
    }

    fn from_parts(input: ChunkBuildInput, margin: u32) -> Self {
        Self {
            input,
            margin,
            chunk: None,
        }
    }

    fn process(&mut self, ctx: &GenCtx) -> Result<ChunkStub, TaskError> {
        let patch = PatchContainer::from_stub(self.input.patch.clone())
            .map_err(|e| TaskError::Codec(e.to_string()))?;
        let chunk = ChunkContainer::from_patch(&patch, ctx, self.input.key, self.margin);
        Ok(chunk.to_stub())
    }

    fn reconcile(&mut self, output: ChunkStub) -> Result<(), TaskError> {
        let chunk =
            ChunkContainer::from_stub(output).map_err(|e| TaskError::Codec(e.to_string()))?;
        self.chunk = Some(chunk);
        Ok(())
    }
}

impl HandlerRegistry {
    /// Registry with the patch bake and chunk build handlers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .register::<PatchBakeTask>()
            .register::<ChunkBuildTask>();
        registry
    }
}
