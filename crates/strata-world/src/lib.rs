//! Worldgen parameters, noise, biomes, column heights and the patch/chunk grid.
#![forbid(unsafe_code)]

pub mod biome;
pub mod caves;
mod gen_ctx;
pub mod hash;
pub mod height;
pub mod keys;
pub mod landscape;
pub mod noise;
mod world;
pub mod worldgen;

pub use biome::{BiomeInfluence, BiomeModel, BiomeType, ClimateBands};
pub use gen_ctx::GenCtx;
pub use height::TerrainSample;
pub use keys::{ChunkKey, KeyParseError, PatchKey, keys_for_region};
pub use landscape::{Decoration, LandscapeEntry, LandscapeTable};
pub use noise::{HarmonicSpec, NoiseField};
pub use world::World;
pub use worldgen::{WorldGenConfig, WorldGenParams};
