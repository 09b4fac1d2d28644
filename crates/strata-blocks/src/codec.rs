//! Bit-packed block words.
//!
//! A block is stored as 22 significant bits of a `u32`:
//!
//! ```text
//!  21        13 12             3 2    0
//! [ level : 9 ][ material : 10 ][ mode : 3 ]
//! ```
//!
//! Values wider than their field are truncated by the mask, they never
//! overflow into a neighbouring field. Use [`BlockData::checked`] when
//! truncation must be reported instead.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::material::MaterialId;

pub const LEVEL_BITS: u32 = 9;
pub const MATERIAL_BITS: u32 = 10;
pub const MODE_BITS: u32 = 3;

pub const LEVEL_MASK: u32 = (1 << LEVEL_BITS) - 1;
pub const MATERIAL_MASK: u32 = (1 << MATERIAL_BITS) - 1;
pub const MODE_MASK: u32 = (1 << MODE_BITS) - 1;

pub const MAX_LEVEL: u16 = LEVEL_MASK as u16;
pub const MAX_MATERIAL: u16 = MATERIAL_MASK as u16;

/// Render/query hint stored in the low three bits of a block word.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum BlockMode {
    #[default]
    Regular = 0,
    Liquid = 1,
    Shore = 2,
    Snow = 3,
    Cave = 4,
    Checkerboard = 5,
    Boundary = 6,
    Highlight = 7,
}

impl BlockMode {
    pub const ALL: [BlockMode; 8] = [
        BlockMode::Regular,
        BlockMode::Liquid,
        BlockMode::Shore,
        BlockMode::Snow,
        BlockMode::Cave,
        BlockMode::Checkerboard,
        BlockMode::Boundary,
        BlockMode::Highlight,
    ];

    /// Every 3-bit pattern maps to a mode, so this is total.
    #[inline]
    pub fn from_bits(bits: u32) -> BlockMode {
        Self::ALL[(bits & MODE_MASK) as usize]
    }

    #[inline]
    pub fn bits(self) -> u32 {
        self as u32
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("level {0} does not fit in {LEVEL_BITS} bits")]
    LevelOutOfRange(u32),
    #[error("material {0} does not fit in {MATERIAL_BITS} bits")]
    MaterialOutOfRange(u32),
}

/// `(((level << 10) | material) << 3) | mode`, truncating each field.
#[inline]
pub fn encode(level: u32, material: u32, mode: u32) -> u32 {
    ((((level & LEVEL_MASK) << MATERIAL_BITS) | (material & MATERIAL_MASK)) << MODE_BITS)
        | (mode & MODE_MASK)
}

/// Inverse of [`encode`]: `(level, material, mode)`.
#[inline]
pub fn decode(word: u32) -> (u32, u32, u32) {
    let mode = word & MODE_MASK;
    let material = (word >> MODE_BITS) & MATERIAL_MASK;
    let level = (word >> (MODE_BITS + MATERIAL_BITS)) & LEVEL_MASK;
    (level, material, mode)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackedBlock(pub u32);

impl PackedBlock {
    pub const EMPTY: PackedBlock = PackedBlock(0);

    #[inline]
    pub fn unpack(self) -> BlockData {
        BlockData::from(self)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BlockData {
    pub level: u16,
    pub material: MaterialId,
    pub mode: BlockMode,
}

impl BlockData {
    #[inline]
    pub const fn new(level: u16, material: MaterialId, mode: BlockMode) -> Self {
        Self {
            level,
            material,
            mode,
        }
    }

    /// Like [`BlockData::new`] but rejects fields that would be truncated.
    pub fn checked(level: u32, material: u32, mode: BlockMode) -> Result<Self, CodecError> {
        if level > LEVEL_MASK {
            return Err(CodecError::LevelOutOfRange(level));
        }
        if material > MATERIAL_MASK {
            return Err(CodecError::MaterialOutOfRange(material));
        }
        Ok(Self::new(level as u16, MaterialId(material as u16), mode))
    }

    #[inline]
    pub fn pack(self) -> PackedBlock {
        PackedBlock(encode(
            u32::from(self.level),
            u32::from(self.material.0),
            self.mode.bits(),
        ))
    }

    #[inline]
    pub fn with_mode(self, mode: BlockMode) -> Self {
        Self { mode, ..self }
    }
}

impl From<PackedBlock> for BlockData {
    fn from(word: PackedBlock) -> Self {
        let (level, material, mode) = decode(word.0);
        BlockData {
            level: level as u16,
            material: MaterialId(material as u16),
            mode: BlockMode::from_bits(mode),
        }
    }
}

impl From<BlockData> for PackedBlock {
    fn from(data: BlockData) -> Self {
        data.pack()
    }
}
