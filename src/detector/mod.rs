//! Mosaic censorship detector operating on raw pixel statistics.
//!
//! Overview
//! - Converts the input to a luma plane and computes Sobel gradient
//!   magnitude once for the whole image.
//! - Partitions the image into a fixed grid of analysis blocks and scores
//!   each block: interior variance (flatness) and mean perimeter gradient
//!   (seam strength). A block is a mosaic candidate when the interior is
//!   near-uniform but the perimeter shows sharp seams.
//! - Merges candidates into connected regions via 4-connectivity flood
//!   fill, then confirms each region by autocorrelating the gradient
//!   profile along both axes: a pixelation grid repeats at the cell
//!   period, naturally flat areas do not.
//! - Paints the union of confirmed regions into the output mask and
//!   dilates it so the fill safely covers the seam edges themselves.
//!
//! The candidate thresholds are linear in the caller's sensitivity, and
//! oriented so raising sensitivity only ever adds blocks; together with
//! the fixed scan order this makes detection deterministic and monotonic.
//!
//! Modules
//! - [`params`] – threshold and filter configuration.
//! - `grad` – Sobel gradient magnitude.
//! - `blocks` – per-block statistics over the analysis grid.
//! - `regions` – flood-fill merge with a region accumulator.
//! - `periodicity` – seam-period confirmation.

mod blocks;
pub mod grad;
pub mod params;
mod periodicity;
mod regions;

pub use params::DetectorParams;

use crate::diagnostics::DetectionDiagnostics;
use crate::error::RestoreError;
use crate::image::{ImageBuf, Mask};
use crate::types::{CensorRegion, DetectionMethod};
use blocks::BlockGrid;
use grad::sobel_magnitude;
use log::debug;
use std::time::Instant;

/// Detector output: the fill mask plus the confirmed regions behind it.
pub struct Detection {
    pub mask: Mask,
    pub regions: Vec<CensorRegion>,
    pub diagnostics: DetectionDiagnostics,
}

/// Block-statistics mosaic detector.
pub struct MosaicDetector {
    params: DetectorParams,
}

impl MosaicDetector {
    pub fn new(params: DetectorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    /// Locate censored regions in `image`.
    ///
    /// `sensitivity` in `[0, 1]` trades recall for precision; values outside
    /// the range are clamped. Fails only on a zero-area image. Side-effect
    /// free: identical inputs always produce the identical mask.
    pub fn detect(&self, image: &ImageBuf, sensitivity: f32) -> Result<Detection, RestoreError> {
        if image.w == 0 || image.h == 0 {
            return Err(RestoreError::validation("zero-area image"));
        }
        let start = Instant::now();
        let s = sensitivity.clamp(0.0, 1.0);

        let luma = image.to_luma();
        let mag = sobel_magnitude(&luma);

        let grid = BlockGrid::analyze(&luma, &mag, self.params.block_px);
        let var_ceiling = self.params.var_ceiling(s);
        let seam_floor = self.params.seam_floor(s);
        let candidates = grid.candidates(var_ceiling, seam_floor);
        let candidate_blocks = candidates.iter().filter(|&&c| c).count();

        let raw_regions = regions::merge_candidates(&grid, &candidates);
        debug!(
            "detector: {} candidate blocks -> {} raw regions (var<={:.4}, seam>={:.4})",
            candidate_blocks,
            raw_regions.len(),
            var_ceiling,
            seam_floor
        );

        let mut mask = Mask::new(image.w, image.h);
        let mut confirmed = Vec::new();
        let mut rejected = 0usize;

        for raw in raw_regions {
            if raw.bbox.area() < self.params.min_region_area {
                rejected += 1;
                continue;
            }
            let period = periodicity::periodicity_score(
                &mag,
                &raw.bbox,
                self.params.min_cell_px,
                self.params.max_cell_px,
            );
            if period < self.params.min_periodicity {
                rejected += 1;
                continue;
            }

            let uniformity = (1.0 - raw.mean_variance / var_ceiling.max(f32::EPSILON))
                .clamp(0.0, 1.0);
            let confidence = (0.5 * uniformity + 0.5 * period).clamp(0.0, 1.0);

            for &block in &raw.blocks {
                mask.fill_rect(&grid.rect_of(block));
            }
            confirmed.push(CensorRegion {
                bbox: raw.bbox,
                confidence,
                method: DetectionMethod::BlockStatistics,
            });
        }

        if !confirmed.is_empty() {
            mask.dilate(self.params.mask_dilate_px);
        }

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        debug!(
            "detector: {} confirmed, {} rejected in {:.2} ms",
            confirmed.len(),
            rejected,
            elapsed_ms
        );

        let diagnostics = DetectionDiagnostics {
            blocks_total: grid.cols * grid.rows,
            candidate_blocks,
            regions_confirmed: confirmed.len(),
            regions_rejected: rejected,
            elapsed_ms,
        };

        Ok(Detection {
            mask,
            regions: confirmed,
            diagnostics,
        })
    }
}
