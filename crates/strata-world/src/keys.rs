//! Grid keys for patches and chunks, and their string forms.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strata_geom::{Box2, Box3, IVec2, IVec3};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyParseError {
    #[error("malformed patch key `{0}` (expected `<x>:<z>`)")]
    Patch(String),
    #[error("malformed chunk key `{0}` (expected `chunk_<x>_<y>_<z>`)")]
    Chunk(String),
}

/// Integer grid cell of one patch. String form `"<x>:<z>"`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatchKey {
    pub x: i32,
    pub z: i32,
}

impl PatchKey {
    #[inline]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Patch containing the world column `(wx, wz)`.
    #[inline]
    pub fn containing(wx: i32, wz: i32, tile_size: i32) -> Self {
        Self::new(wx.div_euclid(tile_size), wz.div_euclid(tile_size))
    }

    /// `None` for anything that is not two signed integers split by `:`.
    pub fn parse(s: &str) -> Option<Self> {
        let (x, z) = s.split_once(':')?;
        Some(Self::new(x.parse().ok()?, z.parse().ok()?))
    }

    #[inline]
    pub fn origin(self, tile_size: i32) -> IVec2 {
        IVec2::new(self.x * tile_size, self.z * tile_size)
    }

    #[inline]
    pub fn bounds(self, tile_size: i32) -> Box2 {
        let min = self.origin(tile_size);
        Box2::new(min, min + IVec2::splat(tile_size))
    }

    #[inline]
    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.z + dz)
    }
}

impl fmt::Display for PatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.x, self.z)
    }
}

impl FromStr for PatchKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| KeyParseError::Patch(s.to_string()))
    }
}

impl From<(i32, i32)> for PatchKey {
    fn from(value: (i32, i32)) -> Self {
        Self::new(value.0, value.1)
    }
}

/// Vertical slab of a patch column. String form `"chunk_<x>_<y>_<z>"`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkKey {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl ChunkKey {
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn with_y(self, y: i32) -> Self {
        Self { y, ..self }
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }

    #[inline]
    pub fn patch(self) -> PatchKey {
        PatchKey::new(self.x, self.z)
    }

    pub fn parse(s: &str) -> Option<Self> {
        let rest = s.strip_prefix("chunk_")?;
        let mut parts = rest.splitn(3, '_');
        let x = parts.next()?.parse().ok()?;
        let y = parts.next()?.parse().ok()?;
        let z = parts.next()?.parse().ok()?;
        Some(Self::new(x, y, z))
    }

    pub fn bounds(self, tile_size: i32, chunk_height: i32) -> Box3 {
        let min = IVec3::new(self.x * tile_size, self.y * chunk_height, self.z * tile_size);
        Box3::new(min, min + IVec3::new(tile_size, chunk_height, tile_size))
    }

}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chunk_{}_{}_{}", self.x, self.y, self.z)
    }
}

impl FromStr for ChunkKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| KeyParseError::Chunk(s.to_string()))
    }
}

impl From<(i32, i32, i32)> for ChunkKey {
    fn from(value: (i32, i32, i32)) -> Self {
        Self::new(value.0, value.1, value.2)
    }
}

impl From<ChunkKey> for (i32, i32, i32) {
    fn from(value: ChunkKey) -> Self {
        (value.x, value.y, value.z)
    }
}

/// Keys whose tiles cover `region`, row-major (x outer, z inner).
///
/// The lower corner rounds down and the upper corner rounds up, so a region
/// that only touches a tile partially still includes it.
pub fn keys_for_region(region: Box2, tile_size: i32) -> Vec<PatchKey> {
    if region.is_empty() || tile_size <= 0 {
        return Vec::new();
    }
    let x0 = region.min.x.div_euclid(tile_size);
    let z0 = region.min.z.div_euclid(tile_size);
    let x1 = ceil_div(region.max.x, tile_size);
    let z1 = ceil_div(region.max.z, tile_size);
    let mut keys = Vec::with_capacity(((x1 - x0) * (z1 - z0)).max(0) as usize);
    for x in x0..x1 {
        for z in z0..z1 {
            keys.push(PatchKey::new(x, z));
        }
    }
    keys
}

#[inline]
fn ceil_div(a: i32, b: i32) -> i32 {
    -((-a).div_euclid(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_key_text_form() {
        assert_eq!(PatchKey::new(-3, 12).to_string(), "-3:12");
        assert_eq!(PatchKey::parse("-3:12"), Some(PatchKey::new(-3, 12)));
        assert_eq!(PatchKey::parse("3"), None);
        assert_eq!(PatchKey::parse("a:1"), None);
        assert_eq!(PatchKey::parse("1:2:3"), None);
        assert!("x:y".parse::<PatchKey>().is_err());
    }

    #[test]
    fn chunk_key_text_form_with_negatives() {
        let k = ChunkKey::new(-1, 2, -30);
        assert_eq!(k.to_string(), "chunk_-1_2_-30");
        assert_eq!(ChunkKey::parse("chunk_-1_2_-30"), Some(k));
        assert_eq!(ChunkKey::parse("chunk_1_2"), None);
        assert_eq!(ChunkKey::parse("1_2_3"), None);
        assert_eq!(ChunkKey::parse("chunk_1_2_3_4"), None);
    }

    #[test]
    fn region_rounding() {
        let region = Box2::new(IVec2::new(0, 0), IVec2::new(128, 64));
        assert_eq!(
            keys_for_region(region, 64),
            vec![PatchKey::new(0, 0), PatchKey::new(1, 0)]
        );
        let partial = Box2::new(IVec2::new(-1, 10), IVec2::new(65, 20));
        assert_eq!(
            keys_for_region(partial, 64),
            vec![PatchKey::new(-1, 0), PatchKey::new(0, 0), PatchKey::new(1, 0)]
        );
    }

    #[test]
    fn ceil_div_rounds_up_for_negatives() {
        assert_eq!(ceil_div(-64, 64), -1);
        assert_eq!(ceil_div(-63, 64), 0);
        assert_eq!(ceil_div(65, 64), 2);
        assert_eq!(ceil_div(64, 64), 1);
    }
}
