//! Per-block statistics over a fixed analysis grid.
//!
//! The image is partitioned into `block_px × block_px` cells (edge cells are
//! clipped). Each cell records the luma variance of its pixels and the mean
//! gradient magnitude along its one-pixel perimeter ring. Mosaic censorship
//! shows up as low variance plus a strong perimeter response; naturally flat
//! areas (sky, walls) share the low variance but not the seams.
use crate::image::ImageF32;
use crate::types::Rect;

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct BlockStats {
    pub variance: f32,
    pub seam_grad: f32,
}

pub(crate) struct BlockGrid {
    pub cols: usize,
    pub rows: usize,
    pub block_px: usize,
    img_w: usize,
    img_h: usize,
    stats: Vec<BlockStats>,
}

impl BlockGrid {
    pub(crate) fn analyze(luma: &ImageF32, mag: &ImageF32, block_px: usize) -> Self {
        debug_assert!(block_px >= 2);
        let img_w = luma.w;
        let img_h = luma.h;
        let cols = img_w.div_ceil(block_px);
        let rows = img_h.div_ceil(block_px);
        let mut stats = Vec::with_capacity(cols * rows);

        for row in 0..rows {
            for col in 0..cols {
                let rect = block_rect(col, row, block_px, img_w, img_h);
                stats.push(block_stats(luma, mag, &rect));
            }
        }

        Self {
            cols,
            rows,
            block_px,
            img_w,
            img_h,
            stats,
        }
    }

    #[inline]
    pub(crate) fn idx(&self, col: usize, row: usize) -> usize {
        row * self.cols + col
    }

    #[inline]
    pub(crate) fn stats(&self, idx: usize) -> &BlockStats {
        &self.stats[idx]
    }

    /// Pixel extent of block `idx`, clipped to the image bounds.
    pub(crate) fn rect_of(&self, idx: usize) -> Rect {
        let col = idx % self.cols;
        let row = idx / self.cols;
        block_rect(col, row, self.block_px, self.img_w, self.img_h)
    }

    /// Mosaic-candidate flags under the supplied thresholds.
    ///
    /// A block qualifies when its interior is flatter than `var_ceiling`
    /// while its perimeter gradient reaches `seam_floor`.
    pub(crate) fn candidates(&self, var_ceiling: f32, seam_floor: f32) -> Vec<bool> {
        self.stats
            .iter()
            .map(|s| s.variance <= var_ceiling && s.seam_grad >= seam_floor)
            .collect()
    }
}

fn block_rect(col: usize, row: usize, block_px: usize, img_w: usize, img_h: usize) -> Rect {
    let x = col * block_px;
    let y = row * block_px;
    Rect::new(x, y, block_px.min(img_w - x), block_px.min(img_h - y))
}

fn block_stats(luma: &ImageF32, mag: &ImageF32, rect: &Rect) -> BlockStats {
    let n = rect.area();
    if n == 0 {
        return BlockStats::default();
    }

    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    for y in rect.y..rect.bottom() {
        for x in rect.x..rect.right() {
            let v = luma.get(x, y) as f64;
            sum += v;
            sum_sq += v * v;
        }
    }
    let mean = sum / n as f64;
    let variance = (sum_sq / n as f64 - mean * mean).max(0.0) as f32;

    let mut seam_sum = 0.0f64;
    let mut seam_n = 0usize;
    let y1 = rect.bottom() - 1;
    let x1 = rect.right() - 1;
    for x in rect.x..rect.right() {
        seam_sum += mag.get(x, rect.y) as f64;
        seam_n += 1;
        if y1 != rect.y {
            seam_sum += mag.get(x, y1) as f64;
            seam_n += 1;
        }
    }
    for y in (rect.y + 1)..y1.max(rect.y + 1) {
        seam_sum += mag.get(rect.x, y) as f64;
        seam_n += 1;
        if x1 != rect.x {
            seam_sum += mag.get(x1, y) as f64;
            seam_n += 1;
        }
    }
    let seam_grad = if seam_n > 0 {
        (seam_sum / seam_n as f64) as f32
    } else {
        0.0
    };

    BlockStats {
        variance,
        seam_grad,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::grad::sobel_magnitude;

    #[test]
    fn flat_block_has_zero_variance() {
        let luma = ImageF32::new(16, 16);
        let mag = sobel_magnitude(&luma);
        let grid = BlockGrid::analyze(&luma, &mag, 8);
        assert_eq!(grid.cols, 2);
        assert_eq!(grid.rows, 2);
        for idx in 0..4 {
            assert_eq!(grid.stats(idx).variance, 0.0);
            assert_eq!(grid.stats(idx).seam_grad, 0.0);
        }
    }

    #[test]
    fn edge_blocks_are_clipped() {
        let luma = ImageF32::new(20, 12);
        let mag = sobel_magnitude(&luma);
        let grid = BlockGrid::analyze(&luma, &mag, 8);
        assert_eq!((grid.cols, grid.rows), (3, 2));
        let last = grid.rect_of(grid.idx(2, 1));
        assert_eq!(last, Rect::new(16, 8, 4, 4));
    }
}
