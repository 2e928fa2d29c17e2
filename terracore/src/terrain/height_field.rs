use glam::Vec3;
use image::{ImageBuffer, Luma};

use crate::errors::AssetError;
use crate::nav::path_grid::PathGrid;

/// Height encoding contract, shared with the baker. A 16-bit texel value v
/// decodes to `HEIGHT_MIN + v/65535 * (HEIGHT_MAX - HEIGHT_MIN)`. Changing
/// either constant requires re-baking every heightmap.
pub const HEIGHT_MIN: f32 = -64.0;
pub const HEIGHT_MAX: f32 = 192.0;

/// Returned by height queries outside the sampled area so misuse is
/// detectable without a panic.
pub const OUT_OF_RANGE_HEIGHT: f32 = -100.0;

/// Walkmask texels strictly above this value are walkable.
pub const WALKMASK_THRESHOLD: u8 = 127;

/// Step used for the central-difference slope normal, in meters.
const NORMAL_EPS: f32 = 0.5;

#[inline(always)]
pub fn decode_height(v: u16) -> f32 {
    HEIGHT_MIN + (v as f32 / 65535.0) * (HEIGHT_MAX - HEIGHT_MIN)
}

#[inline(always)]
pub fn encode_height(h: f32) -> u16 {
    let t = ((h - HEIGHT_MIN) / (HEIGHT_MAX - HEIGHT_MIN)).clamp(0.0, 1.0);
    (t * 65535.0).round() as u16
}

/// One terrain chunk: a dense height grid, a same-sized walkmask and the
/// downsampled path grid derived from it. Immutable after construction.
pub struct HeightField {
    heights: Vec<f32>,
    walkmask: Vec<u8>,
    width: u32,
    height: u32,
    world_size: f32,
    offset_x: f32,
    offset_z: f32,
    min_y: f32,
    max_y: f32,
    path_grid: PathGrid,
}

impl HeightField {
    /// Build from decoded grids. Grids must be non-empty, same-sized, and
    /// `world_size` positive.
    pub fn from_parts(
        heights: Vec<f32>,
        walkmask: Vec<u8>,
        width: u32,
        height: u32,
        world_size: f32,
        offset_x: f32,
        offset_z: f32,
    ) -> Result<Self, AssetError> {
        if width < 2 || height < 2 {
            return Err(AssetError::malformed(format!(
                "height grid too small: {width}x{height}"
            )));
        }
        if heights.len() != (width * height) as usize {
            return Err(AssetError::malformed(format!(
                "height grid size mismatch: {} texels for {width}x{height}",
                heights.len()
            )));
        }
        if walkmask.len() != heights.len() {
            return Err(AssetError::malformed(format!(
                "walkmask size mismatch: {} texels, heightmap has {}",
                walkmask.len(),
                heights.len()
            )));
        }
        if world_size <= 0.0 {
            return Err(AssetError::malformed(format!(
                "non-positive chunk world size: {world_size}"
            )));
        }

        let mut min_y = f32::INFINITY;
        let mut max_y = f32::NEG_INFINITY;
        for &h in &heights {
            min_y = min_y.min(h);
            max_y = max_y.max(h);
        }

        let path_grid = PathGrid::build(&walkmask, width as usize, height as usize);

        Ok(Self {
            heights,
            walkmask,
            width,
            height,
            world_size,
            offset_x,
            offset_z,
            min_y,
            max_y,
            path_grid,
        })
    }

    /// Build from a decoded 16-bit heightmap and an optional 8-bit walkmask.
    /// A missing walkmask means the whole chunk is walkable.
    pub fn from_images(
        heightmap: &ImageBuffer<Luma<u16>, Vec<u16>>,
        walkmask: Option<&ImageBuffer<Luma<u8>, Vec<u8>>>,
        world_size: f32,
        offset_x: f32,
        offset_z: f32,
    ) -> Result<Self, AssetError> {
        let (w, h) = heightmap.dimensions();
        if let Some(mask) = walkmask {
            if mask.dimensions() != (w, h) {
                return Err(AssetError::malformed(format!(
                    "walkmask is {}x{}, heightmap is {w}x{h}",
                    mask.dimensions().0,
                    mask.dimensions().1
                )));
            }
        }

        let heights: Vec<f32> = heightmap.as_raw().iter().map(|&v| decode_height(v)).collect();
        let walkmask_bytes = match walkmask {
            Some(mask) => mask.as_raw().clone(),
            None => vec![255u8; (w * h) as usize],
        };
        Self::from_parts(heights, walkmask_bytes, w, h, world_size, offset_x, offset_z)
    }

    #[inline(always)]
    pub fn grid_width(&self) -> u32 {
        self.width
    }

    #[inline(always)]
    pub fn grid_height(&self) -> u32 {
        self.height
    }

    #[inline(always)]
    pub fn world_size(&self) -> f32 {
        self.world_size
    }

    #[inline(always)]
    pub fn offset(&self) -> (f32, f32) {
        (self.offset_x, self.offset_z)
    }

    pub fn path_grid(&self) -> &PathGrid {
        &self.path_grid
    }

    #[inline(always)]
    pub fn contains(&self, x: f32, z: f32) -> bool {
        x >= self.offset_x
            && x < self.offset_x + self.world_size
            && z >= self.offset_z
            && z < self.offset_z + self.world_size
    }

    /// AABB for frustum culling: the chunk footprint spanned vertically by
    /// the precomputed height extremes.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        (
            Vec3::new(self.offset_x, self.min_y, self.offset_z),
            Vec3::new(
                self.offset_x + self.world_size,
                self.max_y,
                self.offset_z + self.world_size,
            ),
        )
    }

    #[inline(always)]
    fn texel(&self, gx: u32, gz: u32) -> f32 {
        self.heights[(gz * self.width + gx) as usize]
    }

    /// Bilinear sample with grid coordinates clamped into range. Only for
    /// internal callers that have already decided the query is near-valid
    /// (normal sampling at chunk borders).
    fn height_clamped(&self, x: f32, z: f32) -> f32 {
        let gx = ((x - self.offset_x) / self.world_size * (self.width - 1) as f32)
            .clamp(0.0, (self.width - 1) as f32);
        let gz = ((z - self.offset_z) / self.world_size * (self.height - 1) as f32)
            .clamp(0.0, (self.height - 1) as f32);

        let x0 = gx.floor() as u32;
        let z0 = gz.floor() as u32;
        let x1 = (x0 + 1).min(self.width - 1);
        let z1 = (z0 + 1).min(self.height - 1);
        let fx = gx - x0 as f32;
        let fz = gz - z0 as f32;

        let h00 = self.texel(x0, z0);
        let h10 = self.texel(x1, z0);
        let h01 = self.texel(x0, z1);
        let h11 = self.texel(x1, z1);

        let h0 = h00 * (1.0 - fx) + h10 * fx;
        let h1 = h01 * (1.0 - fx) + h11 * fx;
        h0 * (1.0 - fz) + h1 * fz
    }

    /// Bilinearly interpolated terrain height at world (x, z).
    /// Out-of-range queries return [`OUT_OF_RANGE_HEIGHT`].
    pub fn height_at(&self, x: f32, z: f32) -> f32 {
        if !self.contains(x, z) {
            return OUT_OF_RANGE_HEIGHT;
        }
        self.height_clamped(x, z)
    }

    /// Slope normal by central differences over a +-NORMAL_EPS step.
    /// Samples are clamped into the chunk so border normals stay sane.
    pub fn normal_at(&self, x: f32, z: f32) -> Vec3 {
        if !self.contains(x, z) {
            return Vec3::Y;
        }
        let hl = self.height_clamped(x - NORMAL_EPS, z);
        let hr = self.height_clamped(x + NORMAL_EPS, z);
        let hd = self.height_clamped(x, z - NORMAL_EPS);
        let hu = self.height_clamped(x, z + NORMAL_EPS);
        Vec3::new(hl - hr, 2.0 * NORMAL_EPS, hd - hu).normalize()
    }

    /// Nearest walkmask texel at world (x, z).
    pub fn walkmask_at(&self, x: f32, z: f32) -> Option<u8> {
        if !self.contains(x, z) {
            return None;
        }
        let gx = ((x - self.offset_x) / self.world_size * (self.width - 1) as f32)
            .round()
            .clamp(0.0, (self.width - 1) as f32) as u32;
        let gz = ((z - self.offset_z) / self.world_size * (self.height - 1) as f32)
            .round()
            .clamp(0.0, (self.height - 1) as f32) as u32;
        Some(self.walkmask[(gz * self.width + gx) as usize])
    }

    /// Walkable iff inside the chunk and the nearest walkmask texel is above
    /// the threshold.
    pub fn is_walkable(&self, x: f32, z: f32) -> bool {
        match self.walkmask_at(x, z) {
            Some(v) => v > WALKMASK_THRESHOLD,
            None => false,
        }
    }

    /// Walkability with an additional slope gate: rejects ground steeper
    /// than `max_slope_cos` (cosine of the maximum slope angle against +Y).
    /// Not used by the default queries.
    pub fn is_walkable_sloped(&self, x: f32, z: f32, max_slope_cos: f32) -> bool {
        self.is_walkable(x, z) && self.normal_at(x, z).y >= max_slope_cos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_field(h: f32) -> HeightField {
        HeightField::from_parts(
            vec![h; 16 * 16],
            vec![255; 16 * 16],
            16,
            16,
            32.0,
            0.0,
            0.0,
        )
        .unwrap()
    }

    #[test]
    fn encode_decode_round_trip_is_within_one_quantum() {
        let quantum = (HEIGHT_MAX - HEIGHT_MIN) / 65535.0;
        for h in [-64.0, -12.5, 0.0, 0.33, 100.0, 191.9] {
            let back = decode_height(encode_height(h));
            assert!((back - h).abs() <= quantum, "{h} -> {back}");
        }
    }

    #[test]
    fn out_of_range_query_returns_sentinel() {
        let field = flat_field(3.0);
        assert_eq!(field.height_at(-0.1, 5.0), OUT_OF_RANGE_HEIGHT);
        assert_eq!(field.height_at(5.0, 32.0), OUT_OF_RANGE_HEIGHT);
        assert_eq!(field.height_at(10.0, 10.0), 3.0);
    }

    #[test]
    fn flat_field_normal_is_up() {
        let field = flat_field(7.0);
        let n = field.normal_at(10.0, 10.0);
        assert!((n - Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn mismatched_walkmask_dimensions_fail() {
        let err = HeightField::from_parts(vec![0.0; 16], vec![255; 15], 4, 4, 8.0, 0.0, 0.0);
        assert!(matches!(err, Err(AssetError::Malformed(_))));
    }
}
