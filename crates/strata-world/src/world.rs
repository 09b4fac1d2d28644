use std::sync::Arc;

use strata_geom::{Box2, Box3, IVec2};

use crate::gen_ctx::GenCtx;
use crate::height::MAX_SURFACE_LEVEL;
use crate::keys::{ChunkKey, PatchKey};
use crate::worldgen::WorldGenParams;

/// Worldgen parameters fixed for the life of the world, and the grid they imply.
pub struct World {
    gen_params: Arc<WorldGenParams>,
}

impl World {
    pub fn new(params: WorldGenParams) -> Self {
        Self {
            gen_params: Arc::new(params),
        }
    }

    pub fn params(&self) -> Arc<WorldGenParams> {
        Arc::clone(&self.gen_params)
    }

    pub fn make_gen_ctx(&self) -> GenCtx {
        GenCtx::new(self.params())
    }

    #[inline]
    pub fn tile_size(&self) -> i32 {
        self.params().tile_size_i32()
    }

    pub fn patch_bounds(&self, key: PatchKey) -> Box2 {
        key.bounds(self.tile_size())
    }

    pub fn chunk_bounds(&self, key: ChunkKey) -> Box3 {
        let p = self.params();
        key.bounds(p.tile_size_i32(), p.chunk_height as i32)
    }

    /// Chunk keys stacked over a patch, from y = 0 up to the highest surface level.
    pub fn chunk_column(&self, key: PatchKey) -> Vec<ChunkKey> {
        let height = self.params().chunk_height as i32;
        let count = (i32::from(MAX_SURFACE_LEVEL) + 1 + height - 1) / height;
        (0..count).map(|y| ChunkKey::new(key.x, y, key.z)).collect()
    }

    /// Square region of `radius` patches around the patch holding `center`.
    pub fn view_region(&self, center: IVec2, radius: u32) -> Box2 {
        let tile = self.tile_size();
        let c = PatchKey::containing(center.x, center.z, tile);
        let r = radius as i32;
        let min = PatchKey::new(c.x - r, c.z - r).origin(tile);
        let max = PatchKey::new(c.x + r + 1, c.z + r + 1).origin(tile);
        Box2::new(min, max)
    }
}
