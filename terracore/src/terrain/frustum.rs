use glam::{Mat4, Vec3, Vec4};

/// Six view-frustum planes extracted from a combined view-projection
/// matrix. Plane vectors are (nx, ny, nz, d) with the normal pointing
/// inside the frustum; a point p is inside a plane iff `n.p + d >= 0`.
pub struct Frustum {
    planes: [Vec4; 6],
}

impl Frustum {
    /// Row-sum / row-difference extraction: left = r3+r0, right = r3-r0,
    /// bottom = r3+r1, top = r3-r1, near = r3+r2, far = r3-r2.
    pub fn from_view_proj(view_proj: &Mat4) -> Self {
        let r0 = view_proj.row(0);
        let r1 = view_proj.row(1);
        let r2 = view_proj.row(2);
        let r3 = view_proj.row(3);

        let mut planes = [
            r3 + r0,
            r3 - r0,
            r3 + r1,
            r3 - r1,
            r3 + r2,
            r3 - r2,
        ];
        for p in &mut planes {
            let len = p.truncate().length();
            if len > f32::EPSILON {
                *p /= len;
            }
        }
        Self { planes }
    }

    /// Standard positive-vertex test: per plane, pick the AABB corner
    /// farthest along the plane normal; if even that corner is outside, the
    /// whole box is.
    pub fn intersects_aabb(&self, min: Vec3, max: Vec3) -> bool {
        for p in &self.planes {
            let positive = Vec3::new(
                if p.x >= 0.0 { max.x } else { min.x },
                if p.y >= 0.0 { max.y } else { min.y },
                if p.z >= 0.0 { max.z } else { min.z },
            );
            if p.truncate().dot(positive) + p.w < 0.0 {
                return false;
            }
        }
        true
    }
}
