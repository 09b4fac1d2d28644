use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use strata_blocks::MaterialId;

use crate::biome::BiomeModel;
use crate::caves::CaveCarver;
use crate::noise::{NoiseField, seed_hash};
use crate::worldgen::WorldGenParams;

/// Everything one thread needs to sample terrain. Not shared between workers;
/// each builds its own from a params snapshot.
pub struct GenCtx {
    pub params: Arc<WorldGenParams>,
    pub terrain: NoiseField,
    pub amplitude: NoiseField,
    pub biomes: BiomeModel,
    pub caves: Option<CaveCarver>,
    pub seed: u32,
    pub water: MaterialId,
    pub fill: MaterialId,
    fallbacks: AtomicU64,
}

impl GenCtx {
    pub fn new(params: Arc<WorldGenParams>) -> Self {
        let seed = params.seed.as_str();
        let terrain = NoiseField::new(seed, params.terrain_noise);
        let amplitude = NoiseField::new(&format!("{seed}:amplitude"), params.amplitude_noise);
        let biomes = BiomeModel::new(
            seed,
            params.heat_noise,
            params.rain_noise,
            params.heat_bands,
            params.rain_bands,
        )
        .with_forced(params.force_biome);
        let caves = params.caves.as_ref().map(|c| CaveCarver::new(seed, c));
        let water = params.materials.resolve("water");
        let fill = params.materials.resolve("stone");
        Self {
            seed: seed_hash(seed),
            terrain,
            amplitude,
            biomes,
            caves,
            water,
            fill,
            fallbacks: AtomicU64::new(0),
            params,
        }
    }

    /// Noise samples clamped back into `[0, 1]` across every field.
    pub fn anomalies(&self) -> u64 {
        self.terrain.anomalies()
            + self.amplitude.anomalies()
            + self.biomes.anomalies()
            + self.caves.as_ref().map_or(0, CaveCarver::anomalies)
    }

    /// Samples whose dominant biome had no landscape table.
    pub fn fallbacks(&self) -> u64 {
        self.fallbacks.load(Ordering::Relaxed)
    }

    pub(crate) fn note_fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }
}

impl Clone for GenCtx {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.params))
    }
}
