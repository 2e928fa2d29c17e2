pub mod path_grid;
pub mod planner;
pub mod smoother;

use glam::Vec3;

pub use path_grid::PathGrid;
pub use planner::WindowPlanner;

/// A planned route: ordered waypoints, first at the effective start and
/// last at the effective goal, with Y sampled from the terrain. Uniquely
/// owned by whoever requested it; superseding a request is just dropping
/// the old value.
#[derive(Clone, Debug, PartialEq)]
pub struct Path {
    pub waypoints: Vec<Vec3>,
}

impl Path {
    /// Total world-space length of the polyline.
    pub fn length(&self) -> f32 {
        self.waypoints
            .windows(2)
            .map(|w| w[0].distance(w[1]))
            .sum()
    }
}
