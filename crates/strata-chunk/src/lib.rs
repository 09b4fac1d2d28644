//! Patch and chunk containers, overlap merging, and their plain-data stubs.
#![forbid(unsafe_code)]

mod chunk;
mod patch;
pub mod stub;

pub use chunk::{ChunkContainer, ChunkOccupancy, OverlapMode, overlap_copy};
pub use patch::{BakeStats, CellIter, FeatureRecord, PatchCell, PatchContainer};
pub use stub::{ChunkStub, PatchStub, StubError};
