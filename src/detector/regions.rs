//! Connected-region merge of candidate blocks.
//!
//! Candidates are flood-filled on 4-connectivity over the analysis grid; a
//! region accumulator keeps the running bbox and score sums so confirmation
//! never needs a second pass over the pixels.
use super::blocks::BlockGrid;
use crate::types::Rect;

pub(crate) struct RegionAccumulator {
    pub blocks: Vec<usize>,
    min_col: usize,
    max_col: usize,
    min_row: usize,
    max_row: usize,
    sum_variance: f32,
    sum_seam: f32,
}

impl RegionAccumulator {
    fn new() -> Self {
        Self {
            blocks: Vec::new(),
            min_col: usize::MAX,
            max_col: 0,
            min_row: usize::MAX,
            max_row: 0,
            sum_variance: 0.0,
            sum_seam: 0.0,
        }
    }

    fn push(&mut self, idx: usize, col: usize, row: usize, variance: f32, seam: f32) {
        self.blocks.push(idx);
        self.min_col = self.min_col.min(col);
        self.max_col = self.max_col.max(col);
        self.min_row = self.min_row.min(row);
        self.max_row = self.max_row.max(row);
        self.sum_variance += variance;
        self.sum_seam += seam;
    }

    fn len(&self) -> usize {
        self.blocks.len()
    }
}

/// A merged candidate region, prior to periodicity confirmation.
pub(crate) struct RawRegion {
    /// Pixel bounding box, clipped to the image.
    pub bbox: Rect,
    /// Grid indices of the member blocks (for mask painting).
    pub blocks: Vec<usize>,
    pub mean_variance: f32,
    #[allow(dead_code)]
    pub mean_seam: f32,
}

/// Flood-fill candidate blocks into connected regions (4-connectivity).
pub(crate) fn merge_candidates(grid: &BlockGrid, candidates: &[bool]) -> Vec<RawRegion> {
    debug_assert_eq!(candidates.len(), grid.cols * grid.rows);
    let mut visited = vec![false; candidates.len()];
    let mut regions = Vec::new();
    let mut stack = Vec::new();

    for start in 0..candidates.len() {
        if !candidates[start] || visited[start] {
            continue;
        }
        let mut acc = RegionAccumulator::new();
        visited[start] = true;
        stack.push(start);

        while let Some(idx) = stack.pop() {
            let col = idx % grid.cols;
            let row = idx / grid.cols;
            let stats = grid.stats(idx);
            acc.push(idx, col, row, stats.variance, stats.seam_grad);

            let mut try_neighbor = |n: usize| {
                if candidates[n] && !visited[n] {
                    visited[n] = true;
                    stack.push(n);
                }
            };
            if col > 0 {
                try_neighbor(idx - 1);
            }
            if col + 1 < grid.cols {
                try_neighbor(idx + 1);
            }
            if row > 0 {
                try_neighbor(idx - grid.cols);
            }
            if row + 1 < grid.rows {
                try_neighbor(idx + grid.cols);
            }
        }

        let n = acc.len() as f32;
        let first = grid.rect_of(grid.idx(acc.min_col, acc.min_row));
        let last = grid.rect_of(grid.idx(acc.max_col, acc.max_row));
        let bbox = Rect::new(
            first.x,
            first.y,
            last.right() - first.x,
            last.bottom() - first.y,
        );
        regions.push(RawRegion {
            bbox,
            blocks: std::mem::take(&mut acc.blocks),
            mean_variance: acc.sum_variance / n,
            mean_seam: acc.sum_seam / n,
        });
    }

    regions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::grad::sobel_magnitude;
    use crate::image::ImageF32;

    fn grid_16x16(luma: &ImageF32) -> BlockGrid {
        let mag = sobel_magnitude(luma);
        BlockGrid::analyze(luma, &mag, 8)
    }

    #[test]
    fn disjoint_candidates_become_two_regions() {
        let luma = ImageF32::new(32, 8);
        let grid = grid_16x16(&luma);
        // blocks: 4 cols x 1 row; flag cols 0 and 2
        let candidates = vec![true, false, true, false];
        let regions = merge_candidates(&grid, &candidates);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].bbox, Rect::new(0, 0, 8, 8));
        assert_eq!(regions[1].bbox, Rect::new(16, 0, 8, 8));
    }

    #[test]
    fn touching_candidates_merge_into_one() {
        let luma = ImageF32::new(32, 8);
        let grid = grid_16x16(&luma);
        let candidates = vec![true, true, true, false];
        let regions = merge_candidates(&grid, &candidates);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].blocks.len(), 3);
        assert_eq!(regions[0].bbox, Rect::new(0, 0, 24, 8));
    }
}
