//! The single immutable configuration record for a pipeline run.
//!
//! Constructed once and passed explicitly through every component call;
//! there is no ambient or global tuning state.
use crate::detector::DetectorParams;
use crate::guard::Device;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RestoreParams {
    /// Detection aggressiveness in [0, 1]; higher flags more blocks.
    pub sensitivity: f32,
    /// Preferred compute device.
    pub device: Device,
    /// Tried once if binding `device` fails.
    pub fallback_device: Option<Device>,
    /// Permit the downscale strategy. When false, over-budget images are
    /// tiled at full resolution instead.
    pub allow_downscale: bool,
    /// Longest-side cap; larger images are downscaled before processing
    /// (when downscaling is allowed), regardless of the budget.
    pub max_resolution: Option<usize>,
    /// Overlap band width between adjacent tiles. Raised to the model's
    /// context radius if that is larger.
    pub tile_overlap_px: usize,
    /// Quadrant-split attempts before escalating to the global re-plan.
    pub max_retry_depth: usize,
    /// Concurrent whole-buffer copies assumed by the peak-memory model.
    pub copies_multiplier: f32,
    /// Multiplicative slack on every memory estimate.
    pub safety_margin: f32,
    /// Worker pool size; 1 keeps tile processing strictly sequential.
    pub workers: usize,
    /// Return work finished so far when cancelled, instead of failing.
    pub partial_on_cancel: bool,
    /// Budget override for hosts without a memory probe.
    pub memory_budget_bytes: Option<u64>,
    /// Detector thresholds and filters.
    pub detector: DetectorParams,
}

impl Default for RestoreParams {
    fn default() -> Self {
        Self {
            sensitivity: 0.5,
            device: Device::Cpu,
            fallback_device: None,
            allow_downscale: true,
            max_resolution: Some(2048),
            tile_overlap_px: 32,
            max_retry_depth: 3,
            copies_multiplier: 4.0,
            safety_margin: 1.5,
            workers: 1,
            partial_on_cancel: false,
            memory_budget_bytes: None,
            detector: DetectorParams::default(),
        }
    }
}
