use glam::Vec3;
use log::{debug, warn};

use crate::errors::{PathEnd, PlanError};
use crate::terrain::ChunkedWorld;

use super::path_grid::PATHGRID_SIZE;
use super::{smoother, Path};

/// Planning is a local operation: a single query spans at most this many
/// chunks per axis. Callers wanting to go farther re-pose the query in
/// stages.
pub const MAX_WINDOW_CHUNKS: i32 = 3;

const WINDOW_CELLS_1D: usize = MAX_WINDOW_CHUNKS as usize * PATHGRID_SIZE; // 192
const MAX_WINDOW_CELLS: usize = WINDOW_CELLS_1D * WINDOW_CELLS_1D; // 36864

/// Upper bound on A* node allocations per query. A cell can be re-opened
/// with an improved g-cost, so the pool is sized above the cell count;
/// exhausting it is a structured failure, never a silent truncation.
const NODE_POOL_CAP: usize = MAX_WINDOW_CELLS * 2;

const AXIAL_COST: f32 = 1.0;
const DIAGONAL_COST: f32 = std::f32::consts::SQRT_2;

const NEIGHBORS: [(i32, i32, f32); 8] = [
    (1, 0, AXIAL_COST),
    (-1, 0, AXIAL_COST),
    (0, 1, AXIAL_COST),
    (0, -1, AXIAL_COST),
    (1, 1, DIAGONAL_COST),
    (1, -1, DIAGONAL_COST),
    (-1, 1, DIAGONAL_COST),
    (-1, -1, DIAGONAL_COST),
];

#[derive(Clone, Copy)]
struct Node {
    cell: u32,
    g: f32,
    f: f32,
    /// Pool index of the predecessor, -1 for the start node. Indices, not
    /// pointers: the pool never shrinks during a query, so they stay valid.
    parent: i32,
    heap_idx: u32,
}

/// A* planner over a sliding multi-chunk window. All scratch state is
/// allocated once and reused across queries; a query performs no heap
/// allocation beyond the returned path.
pub struct WindowPlanner {
    /// Walkability of the current window, copied from chunk path grids.
    walk: Vec<u8>,
    /// Best g-cost per cell, valid only where `visited` carries the
    /// current search id.
    g_cost: Vec<f32>,
    /// Visited-tag array: a cell was touched by the current query iff
    /// `visited[cell] == search_id`. Lets every query skip the O(cells)
    /// clear.
    visited: Vec<u32>,
    search_id: u32,
    pool: Vec<Node>,
    /// Binary min-heap on f, storing pool indices.
    heap: Vec<u32>,
}

impl Default for WindowPlanner {
    fn default() -> Self {
        Self::new()
    }
}

struct Window {
    origin_x: f32,
    origin_z: f32,
    cell_size: f32,
    width: usize,
    height: usize,
}

impl Window {
    #[inline(always)]
    fn cell_of(&self, x: f32, z: f32) -> u32 {
        let cx = (((x - self.origin_x) / self.cell_size).floor() as i32)
            .clamp(0, self.width as i32 - 1);
        let cz = (((z - self.origin_z) / self.cell_size).floor() as i32)
            .clamp(0, self.height as i32 - 1);
        cz as u32 * self.width as u32 + cx as u32
    }

    #[inline(always)]
    fn center_of(&self, cell: u32) -> (f32, f32) {
        let cx = (cell % self.width as u32) as f32;
        let cz = (cell / self.width as u32) as f32;
        (
            self.origin_x + (cx + 0.5) * self.cell_size,
            self.origin_z + (cz + 0.5) * self.cell_size,
        )
    }
}

impl WindowPlanner {
    pub fn new() -> Self {
        Self {
            walk: vec![0; MAX_WINDOW_CELLS],
            g_cost: vec![0.0; MAX_WINDOW_CELLS],
            visited: vec![0; MAX_WINDOW_CELLS],
            search_id: 0,
            pool: Vec::with_capacity(NODE_POOL_CAP),
            heap: Vec::with_capacity(NODE_POOL_CAP),
        }
    }

    /// Plan a route from `start` to `goal` (XZ; Y of the inputs is
    /// ignored, output Y is sampled from the terrain).
    pub fn find_path(
        &mut self,
        world: &ChunkedWorld,
        start: Vec3,
        goal: Vec3,
    ) -> Result<Path, PlanError> {
        if !world.is_walkable(start.x, start.z) {
            warn!("path query rejected: start ({}, {}) not walkable", start.x, start.z);
            return Err(PlanError::Blocked(PathEnd::Start));
        }
        if !world.is_walkable(goal.x, goal.z) {
            warn!("path query rejected: goal ({}, {}) not walkable", goal.x, goal.z);
            return Err(PlanError::Blocked(PathEnd::Goal));
        }

        // Fast path: both endpoints in one chunk and a clear grid line
        // between them. Skips window setup entirely in the common
        // "click nearby" case. A query with start == goal resolves here
        // and yields two identical waypoints.
        let start_idx = world.chunk_index_at(start.x, start.z);
        if start_idx.is_some() && start_idx == world.chunk_index_at(goal.x, goal.z) {
            let (ix, iz) = start_idx.unwrap();
            if let Some(chunk) = world.chunk(ix, iz) {
                let cell_size = world.chunk_size() / PATHGRID_SIZE as f32;
                let (off_x, off_z) = chunk.offset();
                let cell = |x: f32, z: f32| {
                    (
                        (((x - off_x) / cell_size) as i32).clamp(0, PATHGRID_SIZE as i32 - 1),
                        (((z - off_z) / cell_size) as i32).clamp(0, PATHGRID_SIZE as i32 - 1),
                    )
                };
                let s = cell(start.x, start.z);
                let g = cell(goal.x, goal.z);
                if chunk.path_grid().line_walkable(s, g) {
                    return Ok(Path {
                        waypoints: vec![grounded(world, start), grounded(world, goal)],
                    });
                }
            }
        }

        self.plan_windowed(world, start, goal)
    }

    /// `find_path` followed by string pulling, as one call.
    pub fn find_smoothed_path(
        &mut self,
        world: &ChunkedWorld,
        start: Vec3,
        goal: Vec3,
    ) -> Result<Path, PlanError> {
        let path = self.find_path(world, start, goal)?;
        Ok(smoother::smooth(world, &path))
    }

    fn plan_windowed(
        &mut self,
        world: &ChunkedWorld,
        start: Vec3,
        goal: Vec3,
    ) -> Result<Path, PlanError> {
        let chunk_size = world.chunk_size();
        let (world_ox, world_oz) = world.origin();
        let chunk_of = |x: f32, z: f32| {
            (
                ((x - world_ox) / chunk_size).floor() as i32,
                ((z - world_oz) / chunk_size).floor() as i32,
            )
        };
        let (scx, scz) = chunk_of(start.x, start.z);
        let (gcx, gcz) = chunk_of(goal.x, goal.z);

        let min_cx = scx.min(gcx);
        let min_cz = scz.min(gcz);
        let span_x = (scx - gcx).abs() + 1;
        let span_z = (scz - gcz).abs() + 1;
        if span_x > MAX_WINDOW_CHUNKS || span_z > MAX_WINDOW_CHUNKS {
            warn!(
                "path query spans {span_x}x{span_z} chunks, window cap is \
                 {MAX_WINDOW_CHUNKS}x{MAX_WINDOW_CHUNKS}; re-pose the query in stages"
            );
            return Err(PlanError::NoRoute);
        }

        let win = Window {
            origin_x: world_ox + min_cx as f32 * chunk_size,
            origin_z: world_oz + min_cz as f32 * chunk_size,
            cell_size: chunk_size / PATHGRID_SIZE as f32,
            width: span_x as usize * PATHGRID_SIZE,
            height: span_z as usize * PATHGRID_SIZE,
        };

        self.fill_window(world, &win, min_cx, min_cz, span_x, span_z);

        let start_cell = win.cell_of(start.x, start.z);
        let goal_cell = win.cell_of(goal.x, goal.z);
        if self.walk[start_cell as usize] == 0 {
            warn!("path query rejected: start cell blocked in path grid");
            return Err(PlanError::Blocked(PathEnd::Start));
        }
        if self.walk[goal_cell as usize] == 0 {
            warn!("path query rejected: goal cell blocked in path grid");
            return Err(PlanError::Blocked(PathEnd::Goal));
        }

        // New query: bump the search id instead of clearing `visited`.
        // The wrap is explicit: the one query in four billion that would
        // wrap to 0 pays for a full clear and the counter resumes at 1.
        self.search_id = match self.search_id.checked_add(1) {
            Some(id) => id,
            None => {
                self.visited.fill(0);
                1
            }
        };

        self.run_astar(&win, start_cell, goal_cell)
            .map(|goal_node| self.reconstruct(world, &win, goal_node, start, goal))
    }

    /// Copy the window's chunk path grids into the scratch walk grid.
    /// Chunks outside the level or not loaded copy as blocked.
    fn fill_window(
        &mut self,
        world: &ChunkedWorld,
        win: &Window,
        min_cx: i32,
        min_cz: i32,
        span_x: i32,
        span_z: i32,
    ) {
        self.walk[..win.width * win.height].fill(0);
        for wj in 0..span_z {
            for wi in 0..span_x {
                let Some(chunk) = world.chunk(min_cx + wi, min_cz + wj) else {
                    continue;
                };
                let grid = chunk.path_grid();
                let col0 = wi as usize * PATHGRID_SIZE;
                for row in 0..PATHGRID_SIZE {
                    let wz = wj as usize * PATHGRID_SIZE + row;
                    let dst = wz * win.width + col0;
                    self.walk[dst..dst + PATHGRID_SIZE].copy_from_slice(grid.row(row));
                }
            }
        }
    }

    fn run_astar(&mut self, win: &Window, start_cell: u32, goal_cell: u32) -> Result<u32, PlanError> {
        #[inline(always)]
        fn heuristic(win_w: u32, from: u32, to: u32) -> f32 {
            let dx = (from % win_w) as f32 - (to % win_w) as f32;
            let dz = (from / win_w) as f32 - (to / win_w) as f32;
            (dx * dx + dz * dz).sqrt()
        }

        self.pool.clear();
        self.heap.clear();
        let win_w = win.width as u32;

        let start_node = Node {
            cell: start_cell,
            g: 0.0,
            f: heuristic(win_w, start_cell, goal_cell),
            parent: -1,
            heap_idx: 0,
        };
        let start_idx = self.alloc(start_node).ok_or(PlanError::CapacityExceeded)?;
        self.visited[start_cell as usize] = self.search_id;
        self.g_cost[start_cell as usize] = 0.0;
        self.heap_push(start_idx);

        while let Some(node_idx) = self.heap_pop() {
            let node = self.pool[node_idx as usize];
            if node.cell == goal_cell {
                debug!(
                    "plan reached goal: {} nodes allocated, {} left open",
                    self.pool.len(),
                    self.heap.len()
                );
                return Ok(node_idx);
            }
            // A better route to this cell was pushed after this node;
            // nothing useful comes from expanding the stale one.
            if node.g > self.g_cost[node.cell as usize] {
                continue;
            }

            let cx = (node.cell % win_w) as i32;
            let cz = (node.cell / win_w) as i32;
            for (dx, dz, step_cost) in NEIGHBORS {
                let nx = cx + dx;
                let nz = cz + dz;
                if nx < 0 || nx >= win.width as i32 || nz < 0 || nz >= win.height as i32 {
                    continue;
                }
                let ncell = (nz as u32) * win_w + nx as u32;
                if self.walk[ncell as usize] == 0 {
                    continue;
                }
                let g = node.g + step_cost;
                if self.visited[ncell as usize] == self.search_id
                    && g >= self.g_cost[ncell as usize]
                {
                    continue;
                }
                let next = Node {
                    cell: ncell,
                    g,
                    f: g + heuristic(win_w, ncell, goal_cell),
                    parent: node_idx as i32,
                    heap_idx: 0,
                };
                let idx = self.alloc(next).ok_or(PlanError::CapacityExceeded)?;
                self.visited[ncell as usize] = self.search_id;
                self.g_cost[ncell as usize] = g;
                self.heap_push(idx);
            }
        }

        Err(PlanError::NoRoute)
    }

    fn reconstruct(
        &self,
        world: &ChunkedWorld,
        win: &Window,
        goal_node: u32,
        start: Vec3,
        goal: Vec3,
    ) -> Path {
        let mut waypoints = Vec::new();
        let mut cur = goal_node as i32;
        while cur >= 0 {
            let node = &self.pool[cur as usize];
            let (x, z) = win.center_of(node.cell);
            waypoints.push(Vec3::new(x, world.height_at(x, z), z));
            cur = node.parent;
        }
        waypoints.reverse();

        // The lattice endpoints are cell centers; snap them to the exact
        // requested positions.
        if waypoints.len() < 2 {
            waypoints = vec![grounded(world, start), grounded(world, goal)];
        } else {
            let last = waypoints.len() - 1;
            waypoints[0] = grounded(world, start);
            waypoints[last] = grounded(world, goal);
        }
        Path { waypoints }
    }

    fn alloc(&mut self, node: Node) -> Option<u32> {
        if self.pool.len() >= NODE_POOL_CAP {
            warn!("planner node pool exhausted at {NODE_POOL_CAP} nodes");
            return None;
        }
        self.pool.push(node);
        Some((self.pool.len() - 1) as u32)
    }

    // Binary min-heap on node f, tracking each node's heap slot. Equal-f
    // ordering is fixed by the push/pop sequence alone, so identical
    // queries replay identically, bit for bit.

    fn heap_push(&mut self, node_idx: u32) {
        self.heap.push(node_idx);
        let slot = self.heap.len() - 1;
        self.pool[node_idx as usize].heap_idx = slot as u32;
        self.sift_up(slot);
    }

    fn heap_pop(&mut self) -> Option<u32> {
        if self.heap.is_empty() {
            return None;
        }
        let top = self.heap.swap_remove(0);
        if !self.heap.is_empty() {
            self.pool[self.heap[0] as usize].heap_idx = 0;
            self.sift_down(0);
        }
        Some(top)
    }

    #[inline(always)]
    fn heap_f(&self, slot: usize) -> f32 {
        self.pool[self.heap[slot] as usize].f
    }

    fn heap_swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.pool[self.heap[a] as usize].heap_idx = a as u32;
        self.pool[self.heap[b] as usize].heap_idx = b as u32;
    }

    fn sift_up(&mut self, mut slot: usize) {
        while slot > 0 {
            let parent = (slot - 1) / 2;
            if self.heap_f(slot) < self.heap_f(parent) {
                self.heap_swap(slot, parent);
                slot = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut slot: usize) {
        loop {
            let left = 2 * slot + 1;
            let right = left + 1;
            let mut smallest = slot;
            if left < self.heap.len() && self.heap_f(left) < self.heap_f(smallest) {
                smallest = left;
            }
            if right < self.heap.len() && self.heap_f(right) < self.heap_f(smallest) {
                smallest = right;
            }
            if smallest == slot {
                break;
            }
            self.heap_swap(slot, smallest);
            slot = smallest;
        }
    }
}

#[inline(always)]
fn grounded(world: &ChunkedWorld, p: Vec3) -> Vec3 {
    Vec3::new(p.x, world.height_at(p.x, p.z), p.z)
}
