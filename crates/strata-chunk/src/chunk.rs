use strata_blocks::MaterialId;
use strata_geom::{Box3, IVec3};
use strata_world::{ChunkKey, GenCtx};

use crate::patch::PatchContainer;

/// Voxels below the surface that keep the column's surface material.
const TOPSOIL_DEPTH: i32 = 3;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChunkOccupancy {
    Empty,
    Populated,
}

impl ChunkOccupancy {
    #[inline]
    pub fn is_empty(self) -> bool {
        matches!(self, ChunkOccupancy::Empty)
    }

    #[inline]
    pub fn has_blocks(self) -> bool {
        matches!(self, ChunkOccupancy::Populated)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OverlapMode {
    /// Target takes the source value wherever the source is nonzero.
    Copy,
    /// Target is cleared wherever the source is zero.
    Mask,
}

/// Dense material-id voxels over a box plus a margin on every side. 0 is empty.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkContainer {
    key: Option<ChunkKey>,
    bounds: Box3,
    margin: u32,
    sx: usize,
    sy: usize,
    sz: usize,
    voxels: Vec<u16>,
}

impl ChunkContainer {
    pub fn new(bounds: Box3, margin: u32) -> Self {
        let ext = bounds.expanded(margin as i32).size();
        let (sx, sy, sz) = (
            ext.x.max(0) as usize,
            ext.y.max(0) as usize,
            ext.z.max(0) as usize,
        );
        Self {
            key: None,
            bounds,
            margin,
            sx,
            sy,
            sz,
            voxels: vec![0; sx * sy * sz],
        }
    }

    pub fn for_key(key: ChunkKey, tile_size: i32, chunk_height: i32, margin: u32) -> Self {
        let mut c = Self::new(key.bounds(tile_size, chunk_height), margin);
        c.key = Some(key);
        c
    }

    /// Rebuilds from parts, recomputing the extended sizes. `None` when the buffer length disagrees.
    pub(crate) fn from_parts(
        key: Option<ChunkKey>,
        bounds: Box3,
        margin: u32,
        voxels: Vec<u16>,
    ) -> Option<Self> {
        let mut c = Self::new(bounds, margin);
        if c.voxels.len() != voxels.len() {
            return None;
        }
        c.key = key;
        c.voxels = voxels;
        Some(c)
    }

    #[inline]
    pub fn key(&self) -> Option<ChunkKey> {
        self.key
    }

    #[inline]
    pub fn bounds(&self) -> Box3 {
        self.bounds
    }

    #[inline]
    pub fn margin(&self) -> u32 {
        self.margin
    }

    #[inline]
    pub fn extended_bounds(&self) -> Box3 {
        self.bounds.expanded(self.margin as i32)
    }

    /// Extended dimensions `(x, y, z)`.
    #[inline]
    pub fn dims(&self) -> (usize, usize, usize) {
        (self.sx, self.sy, self.sz)
    }

    pub fn voxels(&self) -> &[u16] {
        &self.voxels
    }

    #[inline]
    pub fn to_local(&self, world: IVec3) -> IVec3 {
        world - self.bounds.min
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize, z: usize) -> usize {
        (y * self.sz + z) * self.sx + x
    }

    /// Buffer index of a local position; margin voxels have negative or `>= size` coordinates.
    #[inline]
    pub fn index(&self, local: IVec3) -> usize {
        let m = self.margin as i32;
        self.idx(
            (local.x + m) as usize,
            (local.y + m) as usize,
            (local.z + m) as usize,
        )
    }

    #[inline]
    pub fn contains_world(&self, world: IVec3) -> bool {
        self.extended_bounds().contains(world)
    }

    #[inline]
    pub fn get_world(&self, world: IVec3) -> Option<u16> {
        if !self.contains_world(world) {
            return None;
        }
        Some(self.voxels[self.index(self.to_local(world))])
    }

    /// `false` when `world` is outside the extended bounds.
    pub fn set_world(&mut self, world: IVec3, value: u16) -> bool {
        if !self.contains_world(world) {
            return false;
        }
        let i = self.index(self.to_local(world));
        self.voxels[i] = value;
        true
    }

    pub fn fill(&mut self, value: u16) {
        self.voxels.fill(value);
    }

    pub fn count_non_empty(&self) -> usize {
        self.voxels.iter().filter(|v| **v != 0).count()
    }

    #[inline]
    pub fn occupancy(&self) -> ChunkOccupancy {
        if self.voxels.iter().any(|v| *v != 0) {
            ChunkOccupancy::Populated
        } else {
            ChunkOccupancy::Empty
        }
    }

    /// Ground, water, caves and surface items for one chunk of `patch`.
    ///
    /// Ground and caves cover the margin; items only the core. Columns outside
    /// the patch's extended bounds stay empty.
    pub fn from_patch(patch: &PatchContainer, ctx: &GenCtx, key: ChunkKey, margin: u32) -> Self {
        let p = &*ctx.params;
        let tile = patch.tile_size() as i32;
        let mut chunk = Self::for_key(key, tile, p.chunk_height as i32, margin);
        let ext = chunk.extended_bounds();
        let sea = i32::from(p.sea_level);

        for wx in ext.min.x..ext.max.x {
            for wz in ext.min.z..ext.max.z {
                let Some(block) = patch.block_at(wx, wz) else {
                    continue;
                };
                let level = i32::from(block.level);
                let surface = block.material.0;
                for wy in ext.min.y..ext.max.y {
                    let v = if wy < level - TOPSOIL_DEPTH {
                        ctx.fill.0
                    } else if wy < level {
                        surface
                    } else if wy < sea {
                        ctx.water.0
                    } else {
                        0
                    };
                    if v != 0 {
                        chunk.set_world(IVec3::new(wx, wy, wz), v);
                    }
                }
            }
        }

        if let Some(carver) = ctx.caves.as_ref() {
            let mut mask = ChunkContainer::new(ext, 0);
            mask.fill(1);
            for wx in ext.min.x..ext.max.x {
                for wz in ext.min.z..ext.max.z {
                    let Some(level) = patch.level_at(wx, wz) else {
                        continue;
                    };
                    for wy in ext.min.y..ext.max.y {
                        if carver.carved(wx, wy, wz, i32::from(level)) {
                            mask.set_world(IVec3::new(wx, wy, wz), 0);
                        }
                    }
                }
            }
            overlap_copy(&mask, &mut chunk, OverlapMode::Mask);
        }

        let features: Vec<_> = patch
            .features()
            .iter()
            .filter(|f| chunk.bounds.contains(f.pos()))
            .collect();
        if !features.is_empty() {
            let mut overlay = ChunkContainer::new(chunk.bounds, 0);
            for f in features {
                if f.material != MaterialId::AIR {
                    overlay.set_world(f.pos(), f.material.0);
                }
            }
            overlap_copy(&overlay, &mut chunk, OverlapMode::Copy);
        }
        chunk
    }
}

/// Merges `source` into `target` over the intersection of their extended bounds.
///
/// Each side computes its own index, so margins and origins may differ.
/// Returns the number of voxels visited.
pub fn overlap_copy(source: &ChunkContainer, target: &mut ChunkContainer, mode: OverlapMode) -> usize {
    let Some(shared) = source
        .extended_bounds()
        .intersection(&target.extended_bounds())
    else {
        return 0;
    };
    let mut visited = 0;
    for x in shared.min.x..shared.max.x {
        for z in shared.min.z..shared.max.z {
            for y in shared.min.y..shared.max.y {
                let w = IVec3::new(x, y, z);
                let si = source.index(source.to_local(w));
                let ti = target.index(target.to_local(w));
                let s = source.voxels[si];
                match mode {
                    OverlapMode::Copy => {
                        if s != 0 {
                            target.voxels[ti] = s;
                        }
                    }
                    OverlapMode::Mask => {
                        if s == 0 {
                            target.voxels[ti] = 0;
                        }
                    }
                }
                visited += 1;
            }
        }
    }
    visited
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube(min: i32, size: i32, margin: u32) -> ChunkContainer {
        ChunkContainer::new(
            Box3::new(IVec3::splat(min), IVec3::splat(min + size)),
            margin,
        )
    }

    #[test]
    fn dims_include_margin() {
        let c = cube(0, 4, 1);
        assert_eq!(c.dims(), (6, 6, 6));
        assert_eq!(c.voxels().len(), 216);
        assert_eq!(c.index(IVec3::splat(-1)), 0);
        assert_eq!(c.index(IVec3::splat(4)), 215);
    }

    #[test]
    fn get_and_set_respect_extended_bounds() {
        let mut c = cube(10, 4, 1);
        assert!(c.set_world(IVec3::new(9, 9, 9), 5));
        assert_eq!(c.get_world(IVec3::new(9, 9, 9)), Some(5));
        assert!(!c.set_world(IVec3::new(8, 9, 9), 5));
        assert_eq!(c.get_world(IVec3::new(15, 10, 10)), None);
        assert_eq!(c.occupancy(), ChunkOccupancy::Populated);
    }

    #[test]
    fn mask_clears_only_zero_cells() {
        let mut target = cube(0, 2, 0);
        target.fill(3);
        let mut mask = cube(0, 2, 0);
        mask.fill(1);
        mask.set_world(IVec3::new(1, 1, 1), 0);
        assert_eq!(overlap_copy(&mask, &mut target, OverlapMode::Mask), 8);
        assert_eq!(target.count_non_empty(), 7);
        assert_eq!(target.get_world(IVec3::new(1, 1, 1)), Some(0));
    }

    #[test]
    fn copy_skips_empty_source_cells() {
        let mut target = cube(0, 2, 0);
        target.fill(3);
        let mut src = cube(0, 2, 0);
        src.set_world(IVec3::new(0, 0, 0), 9);
        overlap_copy(&src, &mut target, OverlapMode::Copy);
        assert_eq!(target.get_world(IVec3::ZERO), Some(9));
        assert_eq!(target.get_world(IVec3::new(1, 0, 0)), Some(3));
    }
}
