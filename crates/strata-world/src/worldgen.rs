use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::error::Error;
use std::fs;
use std::path::Path;

use strata_blocks::material::{MaterialEntry, MaterialError};
use strata_blocks::{MaterialCatalog, MaterialId};
use thiserror::Error;

use crate::biome::{BiomeType, ClimateBands};
use crate::landscape::{Decoration, LandscapeEntry, LandscapeError, LandscapeSet, LandscapeTable};
use crate::noise::HarmonicSpec;

#[derive(Clone, Debug, Deserialize)]
pub struct WorldGenConfig {
    #[serde(default = "default_seed")]
    pub seed: String,
    #[serde(default)]
    pub patch: PatchSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub terrain: Terrain,
    #[serde(default)]
    pub climate: Climate,
    #[serde(default = "default_landscape")]
    pub landscape: HashMap<String, Vec<LandscapeEntryDef>>,
    #[serde(default)]
    pub caves: Caves,
    #[serde(default = "default_materials")]
    pub materials: Vec<MaterialEntry>,
    #[serde(default)]
    pub debug: DebugOverrides,
}

impl Default for WorldGenConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            patch: PatchSettings::default(),
            cache: CacheSettings::default(),
            terrain: Terrain::default(),
            climate: Climate::default(),
            landscape: default_landscape(),
            caves: Caves::default(),
            materials: default_materials(),
            debug: DebugOverrides::default(),
        }
    }
}

fn default_seed() -> String {
    "strata".into()
}

#[derive(Clone, Debug, Deserialize)]
pub struct PatchSettings {
    #[serde(default = "default_tile_size_log2")]
    pub tile_size_log2: u32,
    #[serde(default = "default_margin")]
    pub margin: u32,
    #[serde(default = "default_chunk_height")]
    pub chunk_height: u32,
}
fn default_tile_size_log2() -> u32 {
    6
}
fn default_margin() -> u32 {
    1
}
fn default_chunk_height() -> u32 {
    64
}
impl Default for PatchSettings {
    fn default() -> Self {
        Self {
            tile_size_log2: default_tile_size_log2(),
            margin: default_margin(),
            chunk_height: default_chunk_height(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_cache_radius")]
    pub radius: u32,
    /// 0 picks one worker per available core.
    #[serde(default)]
    pub workers: usize,
}
fn default_cache_radius() -> u32 {
    2
}
impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            radius: default_cache_radius(),
            workers: 0,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Terrain {
    #[serde(default = "default_terrain_noise")]
    pub noise: HarmonicSpec,
    #[serde(default = "default_amplitude_noise")]
    pub amplitude: HarmonicSpec,
    #[serde(default = "default_amplitude_threshold")]
    pub amplitude_threshold: f32,
    #[serde(default)]
    pub blend: AmplitudeBlend,
    #[serde(default = "default_sea_level")]
    pub sea_level: u16,
    #[serde(default = "default_shore_band")]
    pub shore_band: u16,
    #[serde(default = "default_snow_level")]
    pub snow_level: u16,
    #[serde(default = "default_decoration_density")]
    pub decoration_density: f32,
}
fn default_terrain_noise() -> HarmonicSpec {
    HarmonicSpec::new(5, 512.0, 2.0, 0.5)
}
fn default_amplitude_noise() -> HarmonicSpec {
    HarmonicSpec::new(3, 192.0, 2.2, 0.45)
}
fn default_amplitude_threshold() -> f32 {
    0.318
}
fn default_sea_level() -> u16 {
    62
}
fn default_shore_band() -> u16 {
    3
}
fn default_snow_level() -> u16 {
    176
}
fn default_decoration_density() -> f32 {
    0.02
}
impl Default for Terrain {
    fn default() -> Self {
        Self {
            noise: default_terrain_noise(),
            amplitude: default_amplitude_noise(),
            amplitude_threshold: default_amplitude_threshold(),
            blend: AmplitudeBlend::default(),
            sea_level: default_sea_level(),
            shore_band: default_shore_band(),
            snow_level: default_snow_level(),
            decoration_density: default_decoration_density(),
        }
    }
}

/// How the amplitude field is composited onto the height above the threshold.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum AmplitudeBlend {
    /// `excess * (1 - weight + weight * amp)`
    Multiply { weight: f32 },
    /// `excess + weight * (amp - 0.5)`, floored at 0
    Add { weight: f32 },
    /// `amp * (1 - threshold)`
    Replace,
}

impl Default for AmplitudeBlend {
    fn default() -> Self {
        AmplitudeBlend::Multiply { weight: 0.6 }
    }
}

impl AmplitudeBlend {
    pub fn apply(self, excess: f32, amp: f32, threshold: f32) -> f32 {
        match self {
            AmplitudeBlend::Multiply { weight } => excess * (1.0 - weight + weight * amp),
            AmplitudeBlend::Add { weight } => (excess + weight * (amp - 0.5)).max(0.0),
            AmplitudeBlend::Replace => amp * (1.0 - threshold),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Climate {
    #[serde(default = "default_climate_noise")]
    pub heat: HarmonicSpec,
    #[serde(default = "default_climate_noise")]
    pub rain: HarmonicSpec,
    #[serde(default)]
    pub heat_bands: ClimateBands,
    #[serde(default)]
    pub rain_bands: ClimateBands,
}
fn default_climate_noise() -> HarmonicSpec {
    HarmonicSpec::new(3, 1024.0, 2.0, 0.5)
}
impl Default for Climate {
    fn default() -> Self {
        Self {
            heat: default_climate_noise(),
            rain: default_climate_noise(),
            heat_bands: ClimateBands::default(),
            rain_bands: ClimateBands::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct LandscapeEntryDef {
    pub x: f32,
    pub y: f32,
    pub material: String,
    #[serde(default)]
    pub decorations: HashMap<String, f32>,
}

fn entry(x: f32, y: f32, material: &str, decorations: &[(&str, f32)]) -> LandscapeEntryDef {
    LandscapeEntryDef {
        x,
        y,
        material: material.into(),
        decorations: decorations
            .iter()
            .map(|(k, w)| ((*k).to_string(), *w))
            .collect(),
    }
}

fn default_landscape() -> HashMap<String, Vec<LandscapeEntryDef>> {
    let mut m = HashMap::new();
    m.insert(
        "tundra".into(),
        vec![
            entry(0.0, 0.10, "gravel", &[]),
            entry(0.35, 0.24, "gravel", &[]),
            entry(0.45, 0.27, "podzol", &[("dead_bush", 1.0), ("boulder", 1.0)]),
            entry(0.75, 0.45, "stone", &[("boulder", 1.0)]),
            entry(1.0, 0.70, "snow", &[]),
        ],
    );
    m.insert(
        "taiga".into(),
        vec![
            entry(0.0, 0.10, "gravel", &[]),
            entry(0.35, 0.24, "sand", &[]),
            entry(0.42, 0.27, "podzol", &[("spruce_tree", 4.0), ("fern", 2.0)]),
            entry(0.80, 0.55, "stone", &[("spruce_tree", 1.0)]),
            entry(1.0, 0.80, "snow", &[]),
        ],
    );
    m.insert(
        "glacier".into(),
        vec![
            entry(0.0, 0.12, "ice", &[]),
            entry(0.40, 0.30, "ice", &[]),
            entry(0.70, 0.55, "snow", &[]),
            entry(1.0, 0.85, "snow", &[]),
        ],
    );
    m.insert(
        "grassland".into(),
        vec![
            entry(0.0, 0.10, "sand", &[]),
            entry(0.35, 0.24, "sand", &[]),
            entry(0.40, 0.26, "grass", &[("tall_grass", 8.0), ("flower", 2.0)]),
            entry(0.85, 0.42, "grass", &[("tall_grass", 4.0), ("oak_tree", 0.5)]),
            entry(1.0, 0.60, "stone", &[]),
        ],
    );
    m.insert(
        "forest".into(),
        vec![
            entry(0.0, 0.08, "sand", &[]),
            entry(0.33, 0.24, "sand", &[]),
            entry(0.38, 0.27, "grass", &[("oak_tree", 4.0), ("tall_grass", 3.0), ("flower", 1.0)]),
            entry(0.70, 0.45, "grass", &[("oak_tree", 2.0), ("fern", 1.0)]),
            entry(0.90, 0.65, "stone", &[]),
            entry(1.0, 0.78, "snow", &[]),
        ],
    );
    m.insert(
        "swamp".into(),
        vec![
            entry(0.0, 0.15, "mud", &[]),
            entry(0.45, 0.24, "mud", &[("reeds", 3.0)]),
            entry(0.55, 0.26, "clay", &[("reeds", 2.0), ("oak_tree", 1.0)]),
            entry(1.0, 0.36, "grass", &[("oak_tree", 1.0)]),
        ],
    );
    m.insert(
        "desert".into(),
        vec![
            entry(0.0, 0.12, "sand", &[]),
            entry(0.40, 0.26, "sand", &[("cactus", 1.0), ("dead_bush", 2.0)]),
            entry(0.80, 0.40, "sandstone", &[("dead_bush", 1.0)]),
            entry(1.0, 0.55, "terracotta", &[]),
        ],
    );
    m.insert(
        "savanna".into(),
        vec![
            entry(0.0, 0.10, "sand", &[]),
            entry(0.36, 0.25, "red_sand", &[]),
            entry(0.42, 0.27, "grass", &[("acacia_tree", 1.0), ("tall_grass", 6.0)]),
            entry(0.85, 0.48, "terracotta", &[]),
            entry(1.0, 0.62, "stone", &[]),
        ],
    );
    m.insert(
        "jungle".into(),
        vec![
            entry(0.0, 0.10, "sand", &[]),
            entry(0.34, 0.24, "mud", &[]),
            entry(0.40, 0.28, "grass", &[("jungle_tree", 6.0), ("fern", 3.0), ("flower", 1.0)]),
            entry(0.80, 0.55, "grass", &[("jungle_tree", 3.0)]),
            entry(1.0, 0.75, "stone", &[]),
        ],
    );
    m
}

fn default_materials() -> Vec<MaterialEntry> {
    let mut v: Vec<MaterialEntry> = [
        "stone", "dirt", "grass", "sand", "red_sand", "sandstone", "terracotta", "gravel",
        "podzol", "mud", "clay", "snow", "ice",
    ]
    .iter()
    .map(|n| MaterialEntry::Name((*n).to_string()))
    .collect();
    v.push(MaterialEntry::Detail {
        name: "water".into(),
        liquid: true,
    });
    v.extend(
        [
            "oak_tree", "spruce_tree", "jungle_tree", "acacia_tree", "cactus", "dead_bush",
            "tall_grass", "fern", "flower", "reeds", "boulder",
        ]
        .iter()
        .map(|n| MaterialEntry::Name((*n).to_string())),
    );
    v
}

#[derive(Clone, Debug, Deserialize)]
pub struct Caves {
    #[serde(default = "default_caves_enable")]
    pub enable: bool,
    #[serde(default = "default_cave_noise")]
    pub noise: HarmonicSpec,
    #[serde(default = "default_cave_threshold")]
    pub threshold: f32,
    #[serde(default = "default_cave_min_level")]
    pub min_level: u16,
    #[serde(default = "default_cave_surface_offset")]
    pub surface_offset: u16,
}
fn default_caves_enable() -> bool {
    true
}
fn default_cave_noise() -> HarmonicSpec {
    HarmonicSpec::new(3, 48.0, 2.0, 0.5)
}
fn default_cave_threshold() -> f32 {
    0.68
}
fn default_cave_min_level() -> u16 {
    4
}
fn default_cave_surface_offset() -> u16 {
    5
}
impl Default for Caves {
    fn default() -> Self {
        Self {
            enable: default_caves_enable(),
            noise: default_cave_noise(),
            threshold: default_cave_threshold(),
            min_level: default_cave_min_level(),
            surface_offset: default_cave_surface_offset(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct DebugOverrides {
    #[serde(default)]
    pub checkerboard: bool,
    #[serde(default)]
    pub patch_boundary: bool,
    #[serde(default)]
    pub force_biome: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("tile_size_log2 must be within 2..=10, got {0}")]
    TileSize(u32),
    #[error("margin {margin} must be smaller than the tile size {tile}")]
    Margin { margin: u32, tile: u32 },
    #[error("chunk_height must be positive")]
    ChunkHeight,
    #[error("{0} bands must be ordered within [0, 1]")]
    Bands(&'static str),
    #[error("{0} noise needs a positive period and spread")]
    Harmonics(&'static str),
    #[error("amplitude_threshold must be within [0, 1], got {0}")]
    Threshold(f32),
    #[error("landscape `{biome}`: {source}")]
    Landscape {
        biome: String,
        #[source]
        source: LandscapeError,
    },
    #[error(transparent)]
    Material(#[from] MaterialError),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CaveParams {
    pub noise: HarmonicSpec,
    pub threshold: f32,
    pub min_level: u16,
    pub surface_offset: u16,
}

// Flattened params used in tight loops (snapshot of config)
#[derive(Clone, Debug)]
pub struct WorldGenParams {
    pub seed: String,
    pub tile_size: u32,
    pub margin: u32,
    pub chunk_height: u32,
    pub cache_radius: u32,
    pub workers: usize,
    pub terrain_noise: HarmonicSpec,
    pub amplitude_noise: HarmonicSpec,
    pub amplitude_threshold: f32,
    pub blend: AmplitudeBlend,
    pub sea_level: u16,
    pub shore_band: u16,
    pub snow_level: u16,
    pub decoration_density: f32,
    pub heat_noise: HarmonicSpec,
    pub rain_noise: HarmonicSpec,
    pub heat_bands: ClimateBands,
    pub rain_bands: ClimateBands,
    pub landscape: LandscapeSet,
    pub materials: MaterialCatalog,
    pub caves: Option<CaveParams>,
    pub debug_checkerboard: bool,
    pub debug_patch_boundary: bool,
    pub force_biome: Option<BiomeType>,
}

impl Default for WorldGenParams {
    fn default() -> Self {
        // The built-in config is validated by tests; fall back to missing tables otherwise.
        Self::from_config(&WorldGenConfig::default()).unwrap_or_else(|e| {
            log::error!("built-in worldgen config rejected: {e}");
            Self::fallback()
        })
    }
}

impl WorldGenParams {
    fn fallback() -> Self {
        let cfg = WorldGenConfig::default();
        Self {
            seed: cfg.seed,
            tile_size: 1 << default_tile_size_log2(),
            margin: default_margin(),
            chunk_height: default_chunk_height(),
            cache_radius: default_cache_radius(),
            workers: 0,
            terrain_noise: cfg.terrain.noise,
            amplitude_noise: cfg.terrain.amplitude,
            amplitude_threshold: cfg.terrain.amplitude_threshold,
            blend: cfg.terrain.blend,
            sea_level: cfg.terrain.sea_level,
            shore_band: cfg.terrain.shore_band,
            snow_level: cfg.terrain.snow_level,
            decoration_density: 0.0,
            heat_noise: cfg.climate.heat,
            rain_noise: cfg.climate.rain,
            heat_bands: cfg.climate.heat_bands,
            rain_bands: cfg.climate.rain_bands,
            landscape: LandscapeSet::default(),
            materials: MaterialCatalog::new(),
            caves: None,
            debug_checkerboard: false,
            debug_patch_boundary: false,
            force_biome: None,
        }
    }

    pub fn from_config(cfg: &WorldGenConfig) -> Result<Self, ConfigError> {
        let log2 = cfg.patch.tile_size_log2;
        if !(2..=10).contains(&log2) {
            return Err(ConfigError::TileSize(log2));
        }
        let tile_size = 1u32 << log2;
        if cfg.patch.margin >= tile_size {
            return Err(ConfigError::Margin {
                margin: cfg.patch.margin,
                tile: tile_size,
            });
        }
        if cfg.patch.chunk_height == 0 {
            return Err(ConfigError::ChunkHeight);
        }
        if !cfg.climate.heat_bands.is_ordered() {
            return Err(ConfigError::Bands("heat"));
        }
        if !cfg.climate.rain_bands.is_ordered() {
            return Err(ConfigError::Bands("rain"));
        }
        for (name, spec) in [
            ("terrain", &cfg.terrain.noise),
            ("amplitude", &cfg.terrain.amplitude),
            ("heat", &cfg.climate.heat),
            ("rain", &cfg.climate.rain),
            ("caves", &cfg.caves.noise),
        ] {
            if spec.base_period <= 0.0 || spec.spread <= 0.0 {
                return Err(ConfigError::Harmonics(name));
            }
        }
        let threshold = cfg.terrain.amplitude_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Threshold(threshold));
        }

        let materials = MaterialCatalog::from_entries(&cfg.materials)?;
        let landscape = build_landscape(&cfg.landscape, &materials)?;

        let force_biome = cfg.debug.force_biome.as_deref().and_then(|name| {
            let b = BiomeType::from_name(name);
            if b.is_none() {
                log::warn!("debug.force_biome `{name}` is not a biome; ignoring");
            }
            b
        });

        Ok(Self {
            seed: cfg.seed.clone(),
            tile_size,
            margin: cfg.patch.margin,
            chunk_height: cfg.patch.chunk_height,
            cache_radius: cfg.cache.radius,
            workers: cfg.cache.workers,
            terrain_noise: cfg.terrain.noise,
            amplitude_noise: cfg.terrain.amplitude,
            amplitude_threshold: threshold,
            blend: cfg.terrain.blend,
            sea_level: cfg.terrain.sea_level,
            shore_band: cfg.terrain.shore_band,
            snow_level: cfg.terrain.snow_level,
            decoration_density: cfg.terrain.decoration_density.clamp(0.0, 1.0),
            heat_noise: cfg.climate.heat,
            rain_noise: cfg.climate.rain,
            heat_bands: cfg.climate.heat_bands,
            rain_bands: cfg.climate.rain_bands,
            landscape,
            materials,
            caves: if cfg.caves.enable {
                Some(CaveParams {
                    noise: cfg.caves.noise,
                    threshold: cfg.caves.threshold,
                    min_level: cfg.caves.min_level,
                    surface_offset: cfg.caves.surface_offset,
                })
            } else {
                None
            },
            debug_checkerboard: cfg.debug.checkerboard,
            debug_patch_boundary: cfg.debug.patch_boundary,
            force_biome,
        })
    }

    #[inline]
    pub fn tile_size_i32(&self) -> i32 {
        self.tile_size as i32
    }

    /// Cells per side including the margin on both ends.
    #[inline]
    pub fn extended_width(&self) -> usize {
        (self.tile_size + 2 * self.margin) as usize
    }
}

fn build_landscape(
    defs: &HashMap<String, Vec<LandscapeEntryDef>>,
    materials: &MaterialCatalog,
) -> Result<LandscapeSet, ConfigError> {
    let mut set = LandscapeSet::default();
    let mut warned: HashSet<String> = HashSet::new();
    let mut resolve = |name: &str| -> MaterialId {
        let id = materials.resolve(name);
        if id == MaterialId::MISSING && name != "missing" && warned.insert(name.to_string()) {
            log::warn!("material `{name}` is not in the catalog; using the missing sentinel");
        }
        id
    };

    // Sorted so warnings and errors come out in a stable order.
    let sorted: BTreeMap<&String, &Vec<LandscapeEntryDef>> = defs.iter().collect();
    for (name, entries) in sorted {
        let Some(biome) = BiomeType::from_name(name) else {
            log::warn!("landscape table `{name}` does not name a biome; ignoring");
            continue;
        };
        let mut built = Vec::with_capacity(entries.len());
        for def in entries.iter() {
            let mut decorations: Vec<Decoration> = def
                .decorations
                .iter()
                .map(|(item, weight)| Decoration {
                    item: item.clone(),
                    material: resolve(item),
                    weight: *weight,
                })
                .collect();
            // HashMap iteration order is nondeterministic; sort so picks are stable.
            decorations.sort_by(|a, b| a.item.cmp(&b.item));
            built.push(LandscapeEntry {
                threshold: def.x,
                height: def.y,
                material: resolve(&def.material),
                decorations,
            });
        }
        let table = LandscapeTable::new(built).map_err(|source| ConfigError::Landscape {
            biome: name.clone(),
            source,
        })?;
        set.set(biome, table);
    }
    for b in BiomeType::ALL {
        if set.table(b).is_missing() {
            log::warn!("no landscape table for biome `{}`; using the missing sentinel", b.name());
        }
    }
    Ok(set)
}

pub fn load_config_from_path(path: &Path) -> Result<WorldGenConfig, Box<dyn Error>> {
    let s = fs::read_to_string(path)?;
    let cfg: WorldGenConfig = toml::from_str(&s)?;
    Ok(cfg)
}

pub fn load_params_from_path(path: &Path) -> Result<WorldGenParams, Box<dyn Error>> {
    let cfg = load_config_from_path(path)?;
    let params = WorldGenParams::from_config(&cfg)?;
    log::info!(
        "worldgen config loaded from {} (seed `{}`, tile {})",
        path.display(),
        params.seed,
        params.tile_size
    );
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_config_is_valid() {
        let params = WorldGenParams::from_config(&WorldGenConfig::default()).unwrap();
        assert_eq!(params.tile_size, 64);
        assert_eq!(params.extended_width(), 66);
        for b in BiomeType::ALL {
            assert!(!params.landscape.table(b).is_missing(), "{}", b.name());
        }
    }

    #[test]
    fn builtin_tables_resolve_every_material() {
        let params = WorldGenParams::default();
        for b in BiomeType::ALL {
            for e in params.landscape.table(b).entries() {
                assert_ne!(e.material, MaterialId::MISSING);
                for d in &e.decorations {
                    assert_ne!(d.material, MaterialId::MISSING, "{}", d.item);
                }
            }
        }
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let cfg: WorldGenConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.seed, "strata");
        assert_eq!(cfg.patch.tile_size_log2, 6);
        assert_eq!(cfg.terrain.amplitude_threshold, 0.318);
        assert_eq!(cfg.landscape.len(), 9);
    }

    #[test]
    fn partial_toml_overrides() {
        let cfg: WorldGenConfig = toml::from_str(
            r#"
            seed = "alpha"
            [patch]
            tile_size_log2 = 5
            [terrain]
            blend = { op = "add", weight = 0.25 }
            [debug]
            force_biome = "desert"
            "#,
        )
        .unwrap();
        let params = WorldGenParams::from_config(&cfg).unwrap();
        assert_eq!(params.seed, "alpha");
        assert_eq!(params.tile_size, 32);
        assert_eq!(params.blend, AmplitudeBlend::Add { weight: 0.25 });
        assert_eq!(params.force_biome, Some(BiomeType::Desert));
    }

    #[test]
    fn unknown_material_falls_back_to_missing() {
        let cfg: WorldGenConfig = toml::from_str(
            r#"
            [[landscape.desert]]
            x = 0.0
            y = 0.2
            material = "glass"
            "#,
        )
        .unwrap();
        let params = WorldGenParams::from_config(&cfg).unwrap();
        let table = params.landscape.table(BiomeType::Desert);
        assert_eq!(table.entries()[0].material, MaterialId::MISSING);
        // Biomes absent from an explicit landscape map get the sentinel table.
        assert!(params.landscape.table(BiomeType::Forest).is_missing());
    }

    #[test]
    fn repeated_unknown_material_resolves_in_every_table() {
        let cfg: WorldGenConfig = toml::from_str(
            r#"
            [[landscape.desert]]
            x = 0.0
            y = 0.2
            material = "glass"
            [[landscape.desert]]
            x = 1.0
            y = 0.4
            material = "glass"
            [[landscape.swamp]]
            x = 0.0
            y = 0.1
            material = "glass"
            "#,
        )
        .unwrap();
        let params = WorldGenParams::from_config(&cfg).unwrap();
        let desert = params.landscape.table(BiomeType::Desert);
        assert!(desert.entries().iter().all(|e| e.material == MaterialId::MISSING));
        let swamp = params.landscape.table(BiomeType::Swamp);
        assert_eq!(swamp.entries()[0].material, MaterialId::MISSING);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let mut cfg = WorldGenConfig::default();
        cfg.patch.tile_size_log2 = 1;
        assert!(matches!(
            WorldGenParams::from_config(&cfg),
            Err(ConfigError::TileSize(1))
        ));

        let mut cfg = WorldGenConfig::default();
        cfg.climate.heat_bands.low_mid = [0.7, 0.6];
        assert!(matches!(
            WorldGenParams::from_config(&cfg),
            Err(ConfigError::Bands("heat"))
        ));

        let mut cfg = WorldGenConfig::default();
        cfg.landscape
            .insert("desert".into(), vec![entry(0.5, 0.1, "sand", &[]), entry(0.2, 0.1, "sand", &[])]);
        assert!(matches!(
            WorldGenParams::from_config(&cfg),
            Err(ConfigError::Landscape { .. })
        ));
    }

    #[test]
    fn blend_operators() {
        let m = AmplitudeBlend::Multiply { weight: 0.5 };
        assert!((m.apply(0.2, 1.0, 0.3) - 0.2).abs() < 1e-6);
        assert!((m.apply(0.2, 0.0, 0.3) - 0.1).abs() < 1e-6);
        let a = AmplitudeBlend::Add { weight: 0.2 };
        assert_eq!(a.apply(0.0, 0.0, 0.3), 0.0);
        assert!((AmplitudeBlend::Replace.apply(0.1, 0.5, 0.3) - 0.35).abs() < 1e-6);
    }
}
