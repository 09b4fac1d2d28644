//! Packed block words and the material catalog.
#![forbid(unsafe_code)]

pub mod codec;
pub mod material;

pub use codec::{BlockData, BlockMode, CodecError, PackedBlock, decode, encode};
pub use material::{MaterialCatalog, MaterialId};
