use glam::{Mat4, Vec3};

use super::frustum::Frustum;
use super::height_field::{HeightField, OUT_OF_RANGE_HEIGHT};

/// The level terrain: a row-major mosaic of [`HeightField`] chunks.
/// Missing or failed chunks are holes (`None`) and behave as unwalkable,
/// flat-normal, sentinel-height ground. Immutable after level load.
pub struct ChunkedWorld {
    chunks: Vec<Option<HeightField>>,
    chunks_x: i32,
    chunks_z: i32,
    chunk_size: f32,
    origin_x: f32,
    origin_z: f32,
}

impl ChunkedWorld {
    pub fn new(chunks_x: i32, chunks_z: i32, chunk_size: f32, origin_x: f32, origin_z: f32) -> Self {
        assert!(chunks_x > 0 && chunks_z > 0, "empty world grid");
        assert!(chunk_size > 0.0, "non-positive chunk size");
        Self {
            chunks: (0..chunks_x * chunks_z).map(|_| None).collect(),
            chunks_x,
            chunks_z,
            chunk_size,
            origin_x,
            origin_z,
        }
    }

    #[inline(always)]
    pub fn chunks_x(&self) -> i32 {
        self.chunks_x
    }

    #[inline(always)]
    pub fn chunks_z(&self) -> i32 {
        self.chunks_z
    }

    #[inline(always)]
    pub fn chunk_size(&self) -> f32 {
        self.chunk_size
    }

    #[inline(always)]
    pub fn origin(&self) -> (f32, f32) {
        (self.origin_x, self.origin_z)
    }

    /// World-space min corner of grid slot (ix, iz).
    #[inline(always)]
    pub fn slot_origin(&self, ix: i32, iz: i32) -> (f32, f32) {
        (
            self.origin_x + ix as f32 * self.chunk_size,
            self.origin_z + iz as f32 * self.chunk_size,
        )
    }

    /// Install a chunk into grid slot (ix, iz). The chunk footprint must
    /// match the slot; this is the mosaic invariant everything else relies
    /// on.
    pub fn insert_chunk(&mut self, ix: i32, iz: i32, chunk: HeightField) {
        assert!(self.slot_in_range(ix, iz), "chunk slot ({ix},{iz}) out of range");
        debug_assert_eq!(chunk.world_size(), self.chunk_size);
        debug_assert_eq!(chunk.offset(), self.slot_origin(ix, iz));
        self.chunks[(iz * self.chunks_x + ix) as usize] = Some(chunk);
    }

    #[inline(always)]
    fn slot_in_range(&self, ix: i32, iz: i32) -> bool {
        ix >= 0 && ix < self.chunks_x && iz >= 0 && iz < self.chunks_z
    }

    /// Chunk in grid slot (ix, iz); `None` for out-of-range slots and holes.
    pub fn chunk(&self, ix: i32, iz: i32) -> Option<&HeightField> {
        if !self.slot_in_range(ix, iz) {
            return None;
        }
        self.chunks[(iz * self.chunks_x + ix) as usize].as_ref()
    }

    /// Grid slot containing world (x, z), if inside the level footprint.
    /// A query exactly on a chunk seam belongs to the chunk on the
    /// positive side (floor semantics), so seams are never double counted.
    pub fn chunk_index_at(&self, x: f32, z: f32) -> Option<(i32, i32)> {
        let ix = ((x - self.origin_x) / self.chunk_size).floor() as i32;
        let iz = ((z - self.origin_z) / self.chunk_size).floor() as i32;
        self.slot_in_range(ix, iz).then_some((ix, iz))
    }

    /// Chunk owning world (x, z).
    pub fn chunk_at(&self, x: f32, z: f32) -> Option<&HeightField> {
        let (ix, iz) = self.chunk_index_at(x, z)?;
        self.chunk(ix, iz)
    }

    /// Terrain height at world (x, z); sentinel where no chunk is loaded.
    pub fn height_at(&self, x: f32, z: f32) -> f32 {
        match self.chunk_at(x, z) {
            Some(c) => c.height_at(x, z),
            None => OUT_OF_RANGE_HEIGHT,
        }
    }

    /// Slope normal at world (x, z); +Y where no chunk is loaded.
    pub fn normal_at(&self, x: f32, z: f32) -> Vec3 {
        match self.chunk_at(x, z) {
            Some(c) => c.normal_at(x, z),
            None => Vec3::Y,
        }
    }

    /// Full-resolution walkmask query; holes are unwalkable.
    pub fn is_walkable(&self, x: f32, z: f32) -> bool {
        match self.chunk_at(x, z) {
            Some(c) => c.is_walkable(x, z),
            None => false,
        }
    }

    /// Frustum-cull every loaded chunk against `view_proj` and emit the
    /// survivors. Emission order is row-major and deterministic. Drawing is
    /// the caller's business; culling is ours.
    pub fn visible_chunks(&self, view_proj: &Mat4, mut emit: impl FnMut((i32, i32), &HeightField)) {
        let frustum = Frustum::from_view_proj(view_proj);
        for iz in 0..self.chunks_z {
            for ix in 0..self.chunks_x {
                if let Some(chunk) = self.chunk(ix, iz) {
                    let (min, max) = chunk.bounds();
                    if frustum.intersects_aabb(min, max) {
                        emit((ix, iz), chunk);
                    }
                }
            }
        }
    }
}
