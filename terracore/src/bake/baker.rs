use std::path::Path;

use glam::{Vec2, Vec3};
use image::{ImageBuffer, Luma};
use log::info;

use crate::errors::AssetError;
use crate::terrain::height_field::{encode_height, HEIGHT_MIN};

use super::obj::TriangleSoup;

/// Ray origins sit this far above the mesh's highest point.
const RAY_CLEARANCE: f32 = 10.0;

/// Möller-Trumbore parameter cutoff: hits closer than this along the ray
/// are rejected as numerical noise.
const HIT_EPS: f32 = 1e-6;

#[derive(Clone, Copy, Debug)]
pub struct BakeParams {
    /// Output image is resolution x resolution.
    pub resolution: u32,
    /// World extent covered by the image, centered on the origin.
    pub world_size: f32,
}

impl Default for BakeParams {
    fn default() -> Self {
        Self {
            resolution: 1024,
            world_size: 64.0,
        }
    }
}

pub struct BakedHeightmap {
    pub pixels: Vec<u16>,
    pub resolution: u32,
}

struct Triangle {
    a: Vec3,
    b: Vec3,
    c: Vec3,
    aabb_min: Vec2,
    aabb_max: Vec2,
}

/// Orthographic top-down bake: one straight-down ray per output pixel
/// against every triangle whose XZ AABB contains it, keeping the closest
/// hit. Deliberately naive (O(pixels x triangles)) — this runs offline;
/// a uniform XZ grid would speed it up without changing a single pixel.
pub fn bake(mesh: &TriangleSoup, params: BakeParams) -> BakedHeightmap {
    assert!(params.resolution >= 2, "bake resolution must be at least 2");
    assert!(params.world_size > 0.0, "bake world size must be positive");

    let triangles: Vec<Triangle> = mesh
        .triangles
        .iter()
        .map(|&[i0, i1, i2]| {
            let (a, b, c) = (
                mesh.positions[i0 as usize],
                mesh.positions[i1 as usize],
                mesh.positions[i2 as usize],
            );
            Triangle {
                a,
                b,
                c,
                aabb_min: Vec2::new(
                    a.x.min(b.x).min(c.x),
                    a.z.min(b.z).min(c.z),
                ),
                aabb_max: Vec2::new(
                    a.x.max(b.x).max(c.x),
                    a.z.max(b.z).max(c.z),
                ),
            }
        })
        .collect();

    let mesh_max_y = mesh
        .positions
        .iter()
        .map(|p| p.y)
        .fold(f32::NEG_INFINITY, f32::max);
    let ray_origin_y = if mesh_max_y.is_finite() {
        mesh_max_y + RAY_CLEARANCE
    } else {
        RAY_CLEARANCE
    };

    let n = params.resolution;
    let mut pixels = vec![0u16; (n * n) as usize];
    for pz in 0..n {
        let world_z = (pz as f32 / (n - 1) as f32 - 0.5) * params.world_size;
        for px in 0..n {
            let world_x = (px as f32 / (n - 1) as f32 - 0.5) * params.world_size;
            let point = Vec2::new(world_x, world_z);

            let mut nearest_t = f32::INFINITY;
            for tri in &triangles {
                if point.x < tri.aabb_min.x
                    || point.x > tri.aabb_max.x
                    || point.y < tri.aabb_min.y
                    || point.y > tri.aabb_max.y
                {
                    continue;
                }
                let origin = Vec3::new(world_x, ray_origin_y, world_z);
                if let Some(t) = ray_down_hits(origin, tri) {
                    nearest_t = nearest_t.min(t);
                }
            }

            let height = if nearest_t.is_finite() {
                ray_origin_y - nearest_t
            } else {
                HEIGHT_MIN
            };
            pixels[(pz * n + px) as usize] = encode_height(height);
        }
    }

    BakedHeightmap {
        pixels,
        resolution: n,
    }
}

/// Bake and write the result as a 16-bit grayscale PNG, ready for the
/// level loader to decode with the same height contract.
pub fn bake_to_png(
    mesh: &TriangleSoup,
    params: BakeParams,
    out_path: &Path,
) -> Result<(), AssetError> {
    let baked = bake(mesh, params);
    let image: ImageBuffer<Luma<u16>, Vec<u16>> =
        ImageBuffer::from_raw(baked.resolution, baked.resolution, baked.pixels)
            .expect("pixel buffer matches declared resolution");
    image
        .save(out_path)
        .map_err(|e| AssetError::malformed(format!("writing '{}': {e}", out_path.display())))?;
    info!(
        "baked {}x{} heightmap to '{}'",
        params.resolution,
        params.resolution,
        out_path.display()
    );
    Ok(())
}

/// Möller-Trumbore specialized for a (0, -1, 0) ray direction; returns the
/// ray parameter of the hit.
fn ray_down_hits(origin: Vec3, tri: &Triangle) -> Option<f32> {
    let dir = Vec3::NEG_Y;
    let edge1 = tri.b - tri.a;
    let edge2 = tri.c - tri.a;

    let pvec = dir.cross(edge2);
    let det = edge1.dot(pvec);
    if det.abs() < HIT_EPS {
        return None; // ray parallel to the triangle plane
    }
    let inv_det = 1.0 / det;

    let tvec = origin - tri.a;
    let u = tvec.dot(pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let qvec = tvec.cross(edge1);
    let v = dir.dot(qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = edge2.dot(qvec) * inv_det;
    (t > HIT_EPS).then_some(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ray_hits_a_horizontal_triangle() {
        let tri = Triangle {
            a: Vec3::new(-1.0, 2.0, -1.0),
            b: Vec3::new(1.0, 2.0, -1.0),
            c: Vec3::new(0.0, 2.0, 1.0),
            aabb_min: Vec2::new(-1.0, -1.0),
            aabb_max: Vec2::new(1.0, 1.0),
        };
        let t = ray_down_hits(Vec3::new(0.0, 5.0, 0.0), &tri).unwrap();
        assert!((t - 3.0).abs() < 1e-5);
        assert!(ray_down_hits(Vec3::new(3.0, 5.0, 0.0), &tri).is_none());
    }
}
