use crate::terrain::height_field::WALKMASK_THRESHOLD;

/// Per-chunk planning resolution: every chunk downsamples to K x K cells.
pub const PATHGRID_SIZE: usize = 64;

/// Fraction of a cell's walkmask texels that must be walkable for the cell
/// to count as walkable. Kept high on purpose: downsampling must never
/// erase a narrow obstacle, so a cell with even a sliver of wall votes
/// blocked and the grid grows a safety border instead.
pub const WALKABLE_VOTE_MIN: f32 = 0.90;

const CELL_COUNT: usize = PATHGRID_SIZE * PATHGRID_SIZE;

/// Downsampled per-chunk walkability used by the planner. Built once at
/// chunk load, read-only afterwards.
pub struct PathGrid {
    cells: Box<[u8; CELL_COUNT]>,
}

impl PathGrid {
    /// Vote each K x K cell from the corresponding walkmask block.
    pub fn build(walkmask: &[u8], width: usize, height: usize) -> Self {
        debug_assert_eq!(walkmask.len(), width * height);
        let mut cells = Box::new([0u8; CELL_COUNT]);

        for v in 0..PATHGRID_SIZE {
            // Block bounds; for masks smaller than K a block degenerates to
            // a single texel.
            let z0 = v * height / PATHGRID_SIZE;
            let z1 = (((v + 1) * height / PATHGRID_SIZE).max(z0 + 1)).min(height);
            for u in 0..PATHGRID_SIZE {
                let x0 = u * width / PATHGRID_SIZE;
                let x1 = (((u + 1) * width / PATHGRID_SIZE).max(x0 + 1)).min(width);

                let mut walkable = 0usize;
                let mut samples = 0usize;
                for z in z0..z1 {
                    let row = &walkmask[z * width + x0..z * width + x1];
                    samples += row.len();
                    walkable += row.iter().filter(|&&t| t > WALKMASK_THRESHOLD).count();
                }
                if samples > 0 && walkable as f32 / samples as f32 >= WALKABLE_VOTE_MIN {
                    cells[v * PATHGRID_SIZE + u] = 1;
                }
            }
        }
        Self { cells }
    }

    #[inline(always)]
    pub fn is_walkable(&self, cx: usize, cz: usize) -> bool {
        cx < PATHGRID_SIZE && cz < PATHGRID_SIZE && self.cells[cz * PATHGRID_SIZE + cx] == 1
    }

    /// Raw cell row, for bulk copy into a planning window.
    #[inline(always)]
    pub fn row(&self, cz: usize) -> &[u8] {
        &self.cells[cz * PATHGRID_SIZE..(cz + 1) * PATHGRID_SIZE]
    }

    /// Integer Bresenham between two cells; true iff every visited cell is
    /// walkable. Used by the same-chunk fast path before any planner setup.
    pub fn line_walkable(&self, from: (i32, i32), to: (i32, i32)) -> bool {
        let (mut x, mut z) = from;
        let (x1, z1) = to;
        let dx = (x1 - x).abs();
        let dz = -(z1 - z).abs();
        let sx = if x < x1 { 1 } else { -1 };
        let sz = if z < z1 { 1 } else { -1 };
        let mut err = dx + dz;

        loop {
            if x < 0 || z < 0 || !self.is_walkable(x as usize, z as usize) {
                return false;
            }
            if x == x1 && z == z1 {
                return true;
            }
            let e2 = 2 * err;
            if e2 >= dz {
                err += dz;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                z += sz;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_with_wall(gap: std::ops::Range<usize>) -> PathGrid {
        // 128x128 mask, vertical wall two texels wide at the middle except
        // for the gap rows.
        let (w, h) = (128usize, 128usize);
        let mut mask = vec![255u8; w * h];
        for z in 0..h {
            if gap.contains(&z) {
                continue;
            }
            for x in 63..=64 {
                mask[z * w + x] = 0;
            }
        }
        PathGrid::build(&mask, w, h)
    }

    #[test]
    fn full_mask_votes_every_cell_walkable() {
        let g = PathGrid::build(&vec![255u8; 64 * 64], 64, 64);
        for cz in 0..PATHGRID_SIZE {
            for cx in 0..PATHGRID_SIZE {
                assert!(g.is_walkable(cx, cz));
            }
        }
    }

    #[test]
    fn a_sliver_of_wall_blocks_the_whole_cell() {
        // Each affected 2x2 block has one blocked column, a 50% walkable
        // vote, far below the 90% threshold.
        let g = grid_with_wall(0..0);
        assert!(!g.is_walkable(31, 10));
        assert!(!g.is_walkable(32, 10));
        assert!(g.is_walkable(30, 10));
        assert!(g.is_walkable(33, 10));
    }

    #[test]
    fn line_walkable_stops_at_walls() {
        let g = grid_with_wall(0..0);
        assert!(!g.line_walkable((10, 10), (50, 10)));
        assert!(g.line_walkable((10, 10), (30, 50)));
        assert!(g.line_walkable((5, 5), (5, 5)));
    }
}
