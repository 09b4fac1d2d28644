//! Heat/rain climate blending into a weighted mixture of biome types.

use serde::{Deserialize, Serialize};

use crate::noise::{HarmonicSpec, NoiseField};

pub const BIOME_COUNT: usize = 9;

/// Weights are rounded to this many steps per unit.
const WEIGHT_PRECISION: f32 = 10_000.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BiomeType {
    Tundra,
    Taiga,
    Glacier,
    Grassland,
    Forest,
    Swamp,
    Desert,
    Savanna,
    Jungle,
}

impl BiomeType {
    pub const ALL: [BiomeType; BIOME_COUNT] = [
        BiomeType::Tundra,
        BiomeType::Taiga,
        BiomeType::Glacier,
        BiomeType::Grassland,
        BiomeType::Forest,
        BiomeType::Swamp,
        BiomeType::Desert,
        BiomeType::Savanna,
        BiomeType::Jungle,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            BiomeType::Tundra => "tundra",
            BiomeType::Taiga => "taiga",
            BiomeType::Glacier => "glacier",
            BiomeType::Grassland => "grassland",
            BiomeType::Forest => "forest",
            BiomeType::Swamp => "swamp",
            BiomeType::Desert => "desert",
            BiomeType::Savanna => "savanna",
            BiomeType::Jungle => "jungle",
        }
    }

    pub fn from_name(name: &str) -> Option<BiomeType> {
        Self::ALL.iter().copied().find(|b| b.name() == name)
    }
}

/// Rows: heat low/mid/high. Columns: rain low/mid/high.
pub const BIOME_TABLE: [[BiomeType; 3]; 3] = [
    [BiomeType::Tundra, BiomeType::Taiga, BiomeType::Glacier],
    [BiomeType::Grassland, BiomeType::Forest, BiomeType::Swamp],
    [BiomeType::Desert, BiomeType::Savanna, BiomeType::Jungle],
];

#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge1 <= edge0 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Two transition bands splitting `[0, 1]` into low, mid and high.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClimateBands {
    #[serde(default = "d_low_mid")]
    pub low_mid: [f32; 2],
    #[serde(default = "d_mid_high")]
    pub mid_high: [f32; 2],
}
fn d_low_mid() -> [f32; 2] {
    [0.38, 0.46]
}
fn d_mid_high() -> [f32; 2] {
    [0.54, 0.62]
}

impl Default for ClimateBands {
    fn default() -> Self {
        Self {
            low_mid: d_low_mid(),
            mid_high: d_mid_high(),
        }
    }
}

impl ClimateBands {
    pub fn is_ordered(&self) -> bool {
        let [a, b] = self.low_mid;
        let [c, d] = self.mid_high;
        (0.0..=1.0).contains(&a) && a <= b && b <= c && c <= d && d <= 1.0
    }

    /// `[low, mid, high]` contributions of `v`; always sums to 1.
    pub fn levels(&self, v: f32) -> [f32; 3] {
        let [a, b] = self.low_mid;
        let [c, d] = self.mid_high;
        if v < a {
            [1.0, 0.0, 0.0]
        } else if v <= b {
            let s = smoothstep(a, b, v);
            [1.0 - s, s, 0.0]
        } else if v < c {
            [0.0, 1.0, 0.0]
        } else if v <= d {
            let s = smoothstep(c, d, v);
            [0.0, 1.0 - s, s]
        } else {
            [0.0, 0.0, 1.0]
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BiomeInfluence {
    weights: [f32; BIOME_COUNT],
}

impl BiomeInfluence {
    pub fn only(biome: BiomeType) -> Self {
        let mut weights = [0.0; BIOME_COUNT];
        weights[biome.index()] = 1.0;
        Self { weights }
    }

    pub fn from_levels(heat: [f32; 3], rain: [f32; 3]) -> Self {
        let mut weights = [0.0_f32; BIOME_COUNT];
        for (h, hw) in heat.iter().enumerate() {
            if *hw <= 0.0 {
                continue;
            }
            for (r, rw) in rain.iter().enumerate() {
                weights[BIOME_TABLE[h][r].index()] += hw * rw;
            }
        }
        for w in &mut weights {
            *w = (*w * WEIGHT_PRECISION).round() / WEIGHT_PRECISION;
        }
        Self { weights }
    }

    #[inline]
    pub fn weight(&self, biome: BiomeType) -> f32 {
        self.weights[biome.index()]
    }

    pub fn sum(&self) -> f32 {
        self.weights.iter().sum()
    }

    /// Biomes with a nonzero weight, in [`BiomeType::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (BiomeType, f32)> + '_ {
        BiomeType::ALL
            .iter()
            .copied()
            .map(|b| (b, self.weights[b.index()]))
            .filter(|(_, w)| *w > 0.0)
    }

    /// Heaviest biome; ties resolve to the earlier type.
    pub fn dominant(&self) -> BiomeType {
        let mut best = BiomeType::ALL[0];
        let mut best_w = f32::MIN;
        for b in BiomeType::ALL {
            let w = self.weights[b.index()];
            if w > best_w {
                best = b;
                best_w = w;
            }
        }
        best
    }
}

#[derive(Clone, Debug)]
pub struct BiomeModel {
    heat: NoiseField,
    rain: NoiseField,
    heat_bands: ClimateBands,
    rain_bands: ClimateBands,
    forced: Option<BiomeType>,
}

impl BiomeModel {
    pub fn new(
        seed: &str,
        heat: HarmonicSpec,
        rain: HarmonicSpec,
        heat_bands: ClimateBands,
        rain_bands: ClimateBands,
    ) -> Self {
        Self {
            heat: NoiseField::new(&format!("{seed}:heat"), heat),
            rain: NoiseField::new(&format!("{seed}:rain"), rain),
            heat_bands,
            rain_bands,
            forced: None,
        }
    }

    /// Every position reports `biome` with full weight.
    pub fn with_forced(mut self, biome: Option<BiomeType>) -> Self {
        self.forced = biome;
        self
    }

    #[inline]
    pub fn climate(&self, x: f32, z: f32) -> (f32, f32) {
        (self.heat.eval2(x, z), self.rain.eval2(x, z))
    }

    pub fn influence(&self, x: f32, z: f32) -> BiomeInfluence {
        if let Some(b) = self.forced {
            return BiomeInfluence::only(b);
        }
        let (heat, rain) = self.climate(x, z);
        BiomeInfluence::from_levels(self.heat_bands.levels(heat), self.rain_bands.levels(rain))
    }

    pub fn anomalies(&self) -> u64 {
        self.heat.anomalies() + self.rain.anomalies()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_cover_every_band() {
        let bands = ClimateBands::default();
        assert_eq!(bands.levels(0.0), [1.0, 0.0, 0.0]);
        assert_eq!(bands.levels(0.5), [0.0, 1.0, 0.0]);
        assert_eq!(bands.levels(1.0), [0.0, 0.0, 1.0]);
        let mid = bands.levels(0.42);
        assert!((mid[0] - 0.5).abs() < 1e-6);
        assert!((mid[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn pure_levels_pick_the_table_entry() {
        let inf = BiomeInfluence::from_levels([0.0, 0.0, 1.0], [1.0, 0.0, 0.0]);
        assert_eq!(inf.weight(BiomeType::Desert), 1.0);
        assert_eq!(inf.dominant(), BiomeType::Desert);
        assert_eq!(inf.iter().count(), 1);
    }

    #[test]
    fn mixed_levels_split_weight() {
        let inf = BiomeInfluence::from_levels([0.25, 0.75, 0.0], [0.0, 0.5, 0.5]);
        assert!((inf.weight(BiomeType::Taiga) - 0.125).abs() < 1e-4);
        assert!((inf.weight(BiomeType::Glacier) - 0.125).abs() < 1e-4);
        assert!((inf.weight(BiomeType::Forest) - 0.375).abs() < 1e-4);
        assert!((inf.weight(BiomeType::Swamp) - 0.375).abs() < 1e-4);
        assert!((inf.sum() - 1.0).abs() < 1e-3);
    }

    #[test]
    fn forced_biome_overrides_climate() {
        let model = BiomeModel::new(
            "s",
            HarmonicSpec::default(),
            HarmonicSpec::default(),
            ClimateBands::default(),
            ClimateBands::default(),
        )
        .with_forced(Some(BiomeType::Jungle));
        assert_eq!(model.influence(123.0, -77.0), BiomeInfluence::only(BiomeType::Jungle));
    }

    #[test]
    fn names_round_trip() {
        for b in BiomeType::ALL {
            assert_eq!(BiomeType::from_name(b.name()), Some(b));
        }
        assert_eq!(BiomeType::from_name("ocean"), None);
    }
}
