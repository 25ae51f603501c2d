//! Parameter types configuring the mosaic detector.
//!
//! Defaults target typical mosaic censorship (4–32 px cells) on photographic
//! content. For tuning, start with the two threshold bases: `var_ceiling_*`
//! governs how flat a block must be, `seam_floor_*` how sharp its perimeter
//! seams must be.

use serde::{Deserialize, Serialize};

/// Detector-wide parameters.
///
/// The two candidate thresholds are linear in the caller's sensitivity `s`:
///
/// - variance ceiling: `var_ceiling_base + s * var_ceiling_span`
/// - seam floor: `max(0, seam_floor_base - s * seam_floor_span)`
///
/// Raising `s` raises the ceiling and lowers the floor, so the set of
/// flagged blocks only ever grows with sensitivity.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    /// Analysis block edge length in pixels.
    pub block_px: usize,
    /// Interior luma variance ceiling at sensitivity 0 (luma in [0,1]).
    pub var_ceiling_base: f32,
    /// Additional variance ceiling granted at sensitivity 1.
    pub var_ceiling_span: f32,
    /// Mean perimeter gradient floor at sensitivity 0.
    pub seam_floor_base: f32,
    /// Floor reduction granted at sensitivity 1.
    pub seam_floor_span: f32,
    /// Smallest mosaic cell period considered by the autocorrelation check.
    pub min_cell_px: usize,
    /// Largest mosaic cell period considered.
    pub max_cell_px: usize,
    /// Minimum normalized autocorrelation peak to confirm a region.
    pub min_periodicity: f32,
    /// Regions smaller than this many pixels are discarded.
    pub min_region_area: usize,
    /// Output mask dilation radius, guaranteeing the fill covers seam edges.
    pub mask_dilate_px: usize,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            block_px: 8,
            var_ceiling_base: 0.002,
            var_ceiling_span: 0.006,
            seam_floor_base: 0.055,
            seam_floor_span: 0.06,
            min_cell_px: 3,
            max_cell_px: 64,
            min_periodicity: 0.2,
            min_region_area: 100,
            mask_dilate_px: 8,
        }
    }
}

impl DetectorParams {
    /// Variance ceiling for a given sensitivity, monotonically increasing.
    pub fn var_ceiling(&self, sensitivity: f32) -> f32 {
        self.var_ceiling_base + sensitivity * self.var_ceiling_span
    }

    /// Perimeter gradient floor for a given sensitivity, monotonically
    /// decreasing and clamped at zero.
    pub fn seam_floor(&self, sensitivity: f32) -> f32 {
        (self.seam_floor_base - sensitivity * self.seam_floor_span).max(0.0)
    }
}
