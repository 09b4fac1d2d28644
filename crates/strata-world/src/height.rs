//! Column height resolution: biome-weighted landscape heights plus amplitude modulation.

use strata_blocks::{BlockData, BlockMode, MaterialId};

use crate::biome::{BiomeInfluence, BiomeType};
use crate::gen_ctx::GenCtx;
use crate::hash::rand01;
use crate::landscape::{Decoration, LandscapeEntry};

/// Highest level a resolved column can reach.
pub const MAX_SURFACE_LEVEL: u16 = 255;

const DECORATION_SALT: u32 = 0x5EED_DEC0;
const DECORATION_PICK_SALT: u32 = 0x0B1E_C7ED;

#[derive(Clone, Copy, Debug)]
pub struct TerrainSample<'a> {
    pub level: u16,
    /// Primary field value at the column.
    pub raw: f32,
    /// Biome-weighted height before amplitude modulation.
    pub nominal: f32,
    pub height: f32,
    pub influence: BiomeInfluence,
    pub biome: BiomeType,
    pub entry: &'a LandscapeEntry,
    pub material: MaterialId,
    pub mode: BlockMode,
}

impl TerrainSample<'_> {
    #[inline]
    pub fn block(&self) -> BlockData {
        BlockData::new(self.level, self.material, self.mode)
    }
}

impl GenCtx {
    pub fn sample(&self, wx: i32, wz: i32) -> TerrainSample<'_> {
        let p = &*self.params;
        let (x, z) = (wx as f32, wz as f32);
        let raw = self.terrain.eval2(x, z);
        let influence = self.biomes.influence(x, z);

        let mut nominal = 0.0_f32;
        let mut total = 0.0_f32;
        for (biome, weight) in influence.iter() {
            nominal += weight * p.landscape.table(biome).height(raw);
            total += weight;
        }
        // Rounded weights can miss 1 by a hair.
        if total > 0.0 {
            nominal /= total;
        }

        let threshold = p.amplitude_threshold;
        let height = if nominal > threshold {
            let amp = self.amplitude.eval2(x, z);
            threshold + p.blend.apply(nominal - threshold, amp, threshold)
        } else {
            nominal
        };
        let level = (height.clamp(0.0, 1.0) * f32::from(MAX_SURFACE_LEVEL)).floor() as u16;

        let biome = influence.dominant();
        let table = p.landscape.table(biome);
        if table.is_missing() {
            self.note_fallback();
        }
        let entry = table.bracket(raw).lower;

        TerrainSample {
            level,
            raw,
            nominal,
            height,
            influence,
            biome,
            entry,
            material: entry.material,
            mode: self.mode_for_level(level),
        }
    }

    /// Ground level only.
    #[inline]
    pub fn surface_level(&self, wx: i32, wz: i32) -> u16 {
        self.sample(wx, wz).level
    }

    pub fn mode_for_level(&self, level: u16) -> BlockMode {
        let p = &*self.params;
        if level < p.sea_level {
            BlockMode::Liquid
        } else if level < p.sea_level.saturating_add(p.shore_band) {
            BlockMode::Shore
        } else if level >= p.snow_level {
            BlockMode::Snow
        } else {
            BlockMode::Regular
        }
    }

    /// Decoration standing on the column, if the density roll and the entry's table allow one.
    /// Only dry regular ground carries decorations.
    pub fn decoration_at<'a>(
        &self,
        sample: &TerrainSample<'a>,
        wx: i32,
        wz: i32,
    ) -> Option<&'a Decoration> {
        if sample.mode != BlockMode::Regular || sample.entry.decorations.is_empty() {
            return None;
        }
        if rand01(self.seed, wx, wz, DECORATION_SALT) >= self.params.decoration_density {
            return None;
        }
        sample
            .entry
            .pick_decoration(rand01(self.seed, wx, wz, DECORATION_PICK_SALT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worldgen::{WorldGenConfig, WorldGenParams};
    use std::sync::Arc;

    fn ctx_with(cfg: WorldGenConfig) -> GenCtx {
        GenCtx::new(Arc::new(WorldGenParams::from_config(&cfg).unwrap()))
    }

    #[test]
    fn levels_stay_in_range_and_are_deterministic() {
        let a = ctx_with(WorldGenConfig::default());
        let b = ctx_with(WorldGenConfig::default());
        for i in 0..200 {
            let (x, z) = (i * 37 - 3000, 11 - i * 53);
            let s = a.sample(x, z);
            assert!(s.level <= MAX_SURFACE_LEVEL);
            assert!((0.0..=1.0).contains(&s.raw));
            assert_eq!(s.level, b.surface_level(x, z));
            assert_eq!(s.block().pack(), b.sample(x, z).block().pack());
        }
    }

    #[test]
    fn mode_follows_water_and_snow_lines() {
        let ctx = ctx_with(WorldGenConfig::default());
        let p = ctx.params.clone();
        assert_eq!(ctx.mode_for_level(0), BlockMode::Liquid);
        assert_eq!(ctx.mode_for_level(p.sea_level - 1), BlockMode::Liquid);
        assert_eq!(ctx.mode_for_level(p.sea_level), BlockMode::Shore);
        assert_eq!(ctx.mode_for_level(p.sea_level + p.shore_band), BlockMode::Regular);
        assert_eq!(ctx.mode_for_level(p.snow_level), BlockMode::Snow);
    }

    #[test]
    fn missing_tables_fall_back_and_are_counted() {
        let mut cfg = WorldGenConfig::default();
        cfg.landscape.clear();
        let ctx = ctx_with(cfg);
        let s = ctx.sample(10, 10);
        assert_eq!(s.material, MaterialId::MISSING);
        assert_eq!(s.level, 0);
        assert_eq!(ctx.fallbacks(), 1);
    }

    #[test]
    fn forced_biome_drives_material() {
        let mut cfg = WorldGenConfig::default();
        cfg.debug.force_biome = Some("desert".into());
        let ctx = ctx_with(cfg);
        let sand = ctx.params.materials.resolve("sand");
        let desert: Vec<MaterialId> = ctx
            .params
            .landscape
            .table(BiomeType::Desert)
            .entries()
            .iter()
            .map(|e| e.material)
            .collect();
        for i in 0..50 {
            let s = ctx.sample(i * 101, i * -7);
            assert_eq!(s.biome, BiomeType::Desert);
            assert!(desert.contains(&s.material));
        }
        assert!(desert.contains(&sand));
    }

    #[test]
    fn replace_blend_keeps_heights_above_threshold() {
        let mut cfg = WorldGenConfig::default();
        cfg.terrain.blend = crate::worldgen::AmplitudeBlend::Replace;
        let ctx = ctx_with(cfg);
        for i in 0..100 {
            let s = ctx.sample(i * 13, i * 29);
            if s.nominal > ctx.params.amplitude_threshold {
                assert!(s.height >= ctx.params.amplitude_threshold);
            } else {
                assert_eq!(s.height, s.nominal);
            }
        }
    }

    #[test]
    fn zero_density_places_nothing() {
        let mut cfg = WorldGenConfig::default();
        cfg.terrain.decoration_density = 0.0;
        let ctx = ctx_with(cfg);
        for i in 0..100 {
            let s = ctx.sample(i, i * 2);
            assert!(ctx.decoration_at(&s, i, i * 2).is_none());
        }
    }
}
