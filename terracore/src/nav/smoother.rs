use glam::{Vec2, Vec3};

use crate::terrain::ChunkedWorld;

use super::Path;

/// Raymarch step for segment visibility, in meters.
pub const SMOOTH_STEP: f32 = 0.2;

/// Segments shorter than this are trivially visible.
const TRIVIAL_SEGMENT: f32 = 0.1;

/// String pulling: drop interior waypoints wherever a straight XZ line
/// between two survivors stays walkable. Visibility is tested against the
/// full-resolution walkmask, not the PathGrid: the grid was deliberately
/// conservative, the walkmask is the ground truth, so smoothing may cut
/// corners the planner refused to.
pub fn smooth(world: &ChunkedWorld, path: &Path) -> Path {
    let points = &path.waypoints;
    if points.len() <= 2 {
        return path.clone();
    }

    let mut waypoints = Vec::with_capacity(points.len());
    waypoints.push(points[0]);

    let mut i = 0;
    while i < points.len() - 1 {
        // Farthest future waypoint still in line of sight. The immediate
        // successor is always accepted so the walk is guaranteed to make
        // progress.
        let mut next = i + 1;
        for j in (i + 2..points.len()).rev() {
            if segment_walkable(world, points[i], points[j]) {
                next = j;
                break;
            }
        }
        waypoints.push(points[next]);
        i = next;
    }

    Path { waypoints }
}

/// March the XZ segment in SMOOTH_STEP increments and test every sample
/// point, endpoints included.
pub fn segment_walkable(world: &ChunkedWorld, a: Vec3, b: Vec3) -> bool {
    let from = Vec2::new(a.x, a.z);
    let to = Vec2::new(b.x, b.z);
    let len = from.distance(to);
    if len < TRIVIAL_SEGMENT {
        return true;
    }

    let steps = (len / SMOOTH_STEP).ceil() as u32;
    for s in 0..=steps {
        let p = from.lerp(to, s as f32 / steps as f32);
        if !world.is_walkable(p.x, p.y) {
            return false;
        }
    }
    true
}
