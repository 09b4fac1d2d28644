//! Underground cavity carving from a 3D noise field.

use crate::noise::NoiseField;
use crate::worldgen::CaveParams;

#[derive(Clone, Debug)]
pub struct CaveCarver {
    field: NoiseField,
    threshold: f32,
    min_level: i32,
    surface_offset: i32,
}

impl CaveCarver {
    pub fn new(seed: &str, params: &CaveParams) -> Self {
        Self {
            field: NoiseField::new(&format!("{seed}:caves"), params.noise),
            threshold: params.threshold,
            min_level: i32::from(params.min_level),
            surface_offset: i32::from(params.surface_offset),
        }
    }

    /// Whether the voxel at `(x, y, z)` is hollow for a column whose ground is `surface`.
    ///
    /// Carving stays within `[min_level, surface - surface_offset)`.
    pub fn carved(&self, x: i32, y: i32, z: i32, surface: i32) -> bool {
        if y < self.min_level || y >= surface - self.surface_offset {
            return false;
        }
        self.field.eval3(x as f32, y as f32, z as f32) >= self.threshold
    }

    pub fn anomalies(&self) -> u64 {
        self.field.anomalies()
    }
}
