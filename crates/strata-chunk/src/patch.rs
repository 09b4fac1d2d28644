use std::time::Instant;

use serde::{Deserialize, Serialize};
use strata_blocks::{BlockData, BlockMode, MaterialId, PackedBlock};
use strata_geom::{Box2, IVec2, IVec3};
use strata_world::{GenCtx, PatchKey};

/// Decoration placed on top of a column during bake.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub item: String,
    pub material: MaterialId,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl FeatureRecord {
    #[inline]
    pub fn pos(&self) -> IVec3 {
        IVec3::new(self.x, self.y, self.z)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BakeStats {
    pub cells: u32,
    pub features: u32,
    /// Noise samples that needed clamping while this patch baked.
    pub anomalies: u64,
    /// Columns resolved against a missing landscape table.
    pub fallbacks: u64,
    pub elapsed_us: u64,
}

/// One cell visited by [`CellIter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PatchCell {
    pub index: usize,
    pub local: IVec2,
    pub world: IVec2,
}

/// Row-major walk (x outer, z inner) over a region of a patch.
///
/// Holds no reference to the patch, so writes may interleave with iteration.
#[derive(Clone, Debug)]
pub struct CellIter {
    region: Box2,
    origin: IVec2,
    margin: i32,
    ext: i32,
    x: i32,
    z: i32,
}

impl CellIter {
    fn new(region: Box2, origin: IVec2, margin: i32, ext: i32) -> Self {
        Self {
            region,
            origin,
            margin,
            ext,
            x: region.min.x,
            z: region.min.z,
        }
    }

    fn remaining(&self) -> usize {
        if self.region.is_empty() || self.x >= self.region.max.x {
            return 0;
        }
        let depth = (self.region.max.z - self.region.min.z) as usize;
        let full_rows = (self.region.max.x - self.x - 1) as usize;
        full_rows * depth + (self.region.max.z - self.z) as usize
    }
}

impl Iterator for CellIter {
    type Item = PatchCell;

    fn next(&mut self) -> Option<PatchCell> {
        if self.region.is_empty() || self.x >= self.region.max.x {
            return None;
        }
        let world = IVec2::new(self.x, self.z);
        let local = world - self.origin;
        let index = ((local.x + self.margin) * self.ext + local.z + self.margin) as usize;
        self.z += 1;
        if self.z >= self.region.max.z {
            self.z = self.region.min.z;
            self.x += 1;
        }
        Some(PatchCell {
            index,
            local,
            world,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining();
        (n, Some(n))
    }
}

impl ExactSizeIterator for CellIter {}

/// Square tile of packed surface words plus a margin ring shared with neighbours.
#[derive(Clone, Debug)]
pub struct PatchContainer {
    key: PatchKey,
    bounds: Box2,
    margin: u32,
    ext: usize,
    cells: Vec<u32>,
    features: Vec<FeatureRecord>,
    baked: bool,
}

impl PatchContainer {
    pub fn new(key: PatchKey, tile_size: u32, margin: u32) -> Self {
        let ext = (tile_size + 2 * margin) as usize;
        Self {
            key,
            bounds: key.bounds(tile_size as i32),
            margin,
            ext,
            cells: vec![PackedBlock::EMPTY.0; ext * ext],
            features: Vec::new(),
            baked: false,
        }
    }

    /// Rebuilds from parts, recomputing derived sizes. `None` when the buffer length disagrees.
    pub(crate) fn from_parts(
        key: PatchKey,
        bounds: Box2,
        margin: u32,
        cells: Vec<u32>,
        features: Vec<FeatureRecord>,
    ) -> Option<Self> {
        let size = bounds.size();
        if size.x != size.z || size.x <= 0 {
            return None;
        }
        let ext = (size.x as u32 + 2 * margin) as usize;
        if cells.len() != ext * ext {
            return None;
        }
        Some(Self {
            key,
            bounds,
            margin,
            ext,
            cells,
            features,
            baked: true,
        })
    }

    #[inline]
    pub fn key(&self) -> PatchKey {
        self.key
    }

    #[inline]
    pub fn bounds(&self) -> Box2 {
        self.bounds
    }

    /// Bounds grown by the margin on every side.
    #[inline]
    pub fn extended_bounds(&self) -> Box2 {
        self.bounds.expanded(self.margin as i32)
    }

    #[inline]
    pub fn margin(&self) -> u32 {
        self.margin
    }

    #[inline]
    pub fn extended_width(&self) -> usize {
        self.ext
    }

    #[inline]
    pub fn tile_size(&self) -> u32 {
        self.bounds.size().x as u32
    }

    pub fn is_baked(&self) -> bool {
        self.baked
    }

    pub fn raw_cells(&self) -> &[u32] {
        &self.cells
    }

    pub fn features(&self) -> &[FeatureRecord] {
        &self.features
    }

    #[inline]
    pub fn to_local(&self, world: IVec2) -> IVec2 {
        world - self.bounds.min
    }

    /// Buffer index of a local position; margin cells have negative or `>= tile` coordinates.
    #[inline]
    pub fn index(&self, local: IVec2) -> usize {
        let m = self.margin as i32;
        ((local.x + m) as usize) * self.ext + (local.z + m) as usize
    }

    pub fn index_of_world(&self, world: IVec2) -> Option<usize> {
        if !self.extended_bounds().contains(world) {
            return None;
        }
        Some(self.index(self.to_local(world)))
    }

    #[inline]
    pub fn read_block(&self, index: usize) -> BlockData {
        PackedBlock(self.cells[index]).unpack()
    }

    /// # Panics
    /// When `index` lies outside the buffer.
    #[inline]
    pub fn write_block(&mut self, index: usize, data: BlockData) {
        assert!(
            index < self.cells.len(),
            "patch {} write at {index} overruns buffer of {}",
            self.key,
            self.cells.len()
        );
        self.cells[index] = data.pack().0;
    }

    /// Cells of `sub` (or the whole patch) in row-major order. Each call starts fresh.
    pub fn cells(&self, sub: Option<Box2>, skip_margin: bool) -> CellIter {
        let outer = if skip_margin {
            self.bounds
        } else {
            self.extended_bounds()
        };
        let region = match sub {
            Some(s) => s.intersection(&outer).unwrap_or(Box2::new(outer.min, outer.min)),
            None => outer,
        };
        CellIter::new(
            region,
            self.bounds.min,
            self.margin as i32,
            self.ext as i32,
        )
    }

    pub fn block_at(&self, wx: i32, wz: i32) -> Option<BlockData> {
        self.index_of_world(IVec2::new(wx, wz))
            .map(|i| self.read_block(i))
    }

    pub fn level_at(&self, wx: i32, wz: i32) -> Option<u16> {
        self.block_at(wx, wz).map(|b| b.level)
    }

    /// Fills every non-margin cell from the height resolver.
    pub fn bake(&mut self, ctx: &GenCtx) -> BakeStats {
        self.bake_cells(ctx, true)
    }

    /// Like [`PatchContainer::bake`] but also samples the margin ring.
    pub fn bake_with_margin(&mut self, ctx: &GenCtx) -> BakeStats {
        self.bake_cells(ctx, false)
    }

    fn bake_cells(&mut self, ctx: &GenCtx, skip_margin: bool) -> BakeStats {
        let start = Instant::now();
        let anomalies_before = ctx.anomalies();
        let fallbacks_before = ctx.fallbacks();
        let params = &*ctx.params;
        let tile = self.tile_size() as i32;
        let checker = params.debug_checkerboard && (self.key.x + self.key.z).rem_euclid(2) == 1;

        self.features.clear();
        let mut stats = BakeStats::default();
        for cell in self.cells(None, skip_margin) {
            let sample = ctx.sample(cell.world.x, cell.world.z);
            let mut block = sample.block();
            let inside = (0..tile).contains(&cell.local.x) && (0..tile).contains(&cell.local.z);
            if checker {
                block = block.with_mode(BlockMode::Checkerboard);
            }
            if params.debug_patch_boundary && inside && on_ring(cell.local, tile) {
                block = block.with_mode(BlockMode::Boundary);
            }
            self.write_block(cell.index, block);
            stats.cells += 1;

            if inside {
                if let Some(d) = ctx.decoration_at(&sample, cell.world.x, cell.world.z) {
                    self.features.push(FeatureRecord {
                        item: d.item.clone(),
                        material: d.material,
                        x: cell.world.x,
                        y: i32::from(sample.level),
                        z: cell.world.z,
                    });
                }
            }
        }
        self.baked = true;
        stats.features = self.features.len() as u32;
        stats.anomalies = ctx.anomalies() - anomalies_before;
        stats.fallbacks = ctx.fallbacks() - fallbacks_before;
        stats.elapsed_us = start.elapsed().as_micros() as u64;
        log::debug!(
            "baked patch {} ({} cells, {} features) in {}us",
            self.key,
            stats.cells,
            stats.features,
            stats.elapsed_us
        );
        stats
    }
}

#[inline]
fn on_ring(local: IVec2, tile: i32) -> bool {
    local.x == 0 || local.z == 0 || local.x == tile - 1 || local.z == tile - 1
}
