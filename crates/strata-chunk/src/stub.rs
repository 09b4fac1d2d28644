//! Plain-data forms of patches and chunks for persistence and transfer.
//!
//! Derived fields (extended sizes, parsed keys) are recomputed on rebuild.

use serde::{Deserialize, Serialize};
use strata_geom::{Box2, Box3, IVec2, IVec3};
use strata_world::{ChunkKey, PatchKey};
use thiserror::Error;

use crate::chunk::ChunkContainer;
use crate::patch::{FeatureRecord, PatchContainer};

#[derive(Debug, Error)]
pub enum StubError {
    #[error("malformed key `{0}`")]
    Key(String),
    #[error("buffer holds {actual} cells, bounds need {expected}")]
    Length { expected: usize, actual: usize },
    #[error("patch bounds must be a non-empty square")]
    Shape,
    #[error(transparent)]
    Codec(#[from] bincode::Error),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatchStub {
    pub key: String,
    pub min: [i32; 3],
    pub max: [i32; 3],
    pub margin: u32,
    pub cells: Vec<u32>,
    pub features: Vec<FeatureRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChunkStub {
    pub key: Option<String>,
    pub min: [i32; 3],
    pub max: [i32; 3],
    pub margin: u32,
    pub voxels: Vec<u16>,
}

impl PatchContainer {
    pub fn to_stub(&self) -> PatchStub {
        let b = self.bounds();
        PatchStub {
            key: self.key().to_string(),
            min: b.min.with_y(0).to_array(),
            max: b.max.with_y(0).to_array(),
            margin: self.margin(),
            cells: self.raw_cells().to_vec(),
            features: self.features().to_vec(),
        }
    }

    pub fn from_stub(stub: PatchStub) -> Result<Self, StubError> {
        let key = PatchKey::parse(&stub.key).ok_or_else(|| StubError::Key(stub.key.clone()))?;
        let bounds = Box2::new(
            IVec2::new(stub.min[0], stub.min[2]),
            IVec2::new(stub.max[0], stub.max[2]),
        );
        let size = bounds.size();
        if size.x != size.z || size.x <= 0 {
            return Err(StubError::Shape);
        }
        let ext = (size.x as usize) + 2 * stub.margin as usize;
        let actual = stub.cells.len();
        PatchContainer::from_parts(key, bounds, stub.margin, stub.cells, stub.features).ok_or(
            StubError::Length {
                expected: ext * ext,
                actual,
            },
        )
    }
}

impl ChunkContainer {
    pub fn to_stub(&self) -> ChunkStub {
        let b = self.bounds();
        ChunkStub {
            key: self.key().map(|k| k.to_string()),
            min: b.min.to_array(),
            max: b.max.to_array(),
            margin: self.margin(),
            voxels: self.voxels().to_vec(),
        }
    }

    pub fn from_stub(stub: ChunkStub) -> Result<Self, StubError> {
        let key = match stub.key.as_deref() {
            Some(s) => Some(ChunkKey::parse(s).ok_or_else(|| StubError::Key(s.to_string()))?),
            None => None,
        };
        let bounds = Box3::new(IVec3::from(stub.min), IVec3::from(stub.max));
        let expected = bounds.expanded(stub.margin as i32).volume();
        let actual = stub.voxels.len();
        ChunkContainer::from_parts(key, bounds, stub.margin, stub.voxels)
            .ok_or(StubError::Length { expected, actual })
    }
}

pub fn encode_stub<T: Serialize>(stub: &T) -> Result<Vec<u8>, StubError> {
    Ok(bincode::serialize(stub)?)
}

pub fn decode_stub<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, StubError> {
    Ok(bincode::deserialize(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_blocks::{BlockData, BlockMode, MaterialId};

    #[test]
    fn patch_stub_rebuilds_the_same_patch() {
        let mut p = PatchContainer::new(PatchKey::new(-2, 5), 4, 1);
        let i = p.index(IVec2::new(1, 2));
        p.write_block(i, BlockData::new(40, MaterialId(3), BlockMode::Snow));
        let bytes = encode_stub(&p.to_stub()).unwrap();
        let back = PatchContainer::from_stub(decode_stub(&bytes).unwrap()).unwrap();
        assert_eq!(back.key(), p.key());
        assert_eq!(back.bounds(), p.bounds());
        assert_eq!(back.raw_cells(), p.raw_cells());
        assert_eq!(back.extended_width(), 6);
    }

    #[test]
    fn bad_stubs_are_rejected() {
        let mut stub = PatchContainer::new(PatchKey::new(0, 0), 4, 0).to_stub();
        stub.cells.pop();
        assert!(matches!(
            PatchContainer::from_stub(stub.clone()),
            Err(StubError::Length { expected: 16, actual: 15 })
        ));
        stub.key = "zero".into();
        assert!(matches!(PatchContainer::from_stub(stub), Err(StubError::Key(_))));

        let mut chunk = ChunkContainer::for_key(ChunkKey::new(0, 0, 0), 2, 2, 0).to_stub();
        chunk.key = Some("chunk_0_0".into());
        assert!(matches!(ChunkContainer::from_stub(chunk), Err(StubError::Key(_))));
        assert!(decode_stub::<ChunkStub>(&[1, 2, 3]).is_err());
    }

    #[test]
    fn chunk_stub_keeps_key_and_voxels() {
        let mut c = ChunkContainer::for_key(ChunkKey::new(1, -1, 2), 4, 4, 1);
        c.set_world(IVec3::new(4, -4, 8), 12);
        let stub = c.to_stub();
        assert_eq!(stub.key.as_deref(), Some("chunk_1_-1_2"));
        let back = ChunkContainer::from_stub(stub).unwrap();
        assert_eq!(back, c);
    }
}
