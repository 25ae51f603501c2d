#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod detector;
pub mod diagnostics;
pub mod image;
pub mod inpaint;
pub mod pipeline;
pub mod planner;
pub mod types;

// Lower-level building blocks – still public, but considered unstable
// internals. (You can tighten or feature-gate these later.)
pub mod compositor;
pub mod config;
pub mod error;
pub mod guard;
pub mod orchestrator;
pub mod params;
pub mod tiles;

// --- High-level re-exports -------------------------------------------------

// Main entry points: the pipeline + its configuration and result.
pub use crate::error::RestoreError;
pub use crate::params::RestoreParams;
pub use crate::pipeline::{MosaicRestorer, RestoreResult};

// The model boundary and the reference fill.
pub use crate::inpaint::{InpaintError, Inpainter, NeighborhoodFill};

// Detection as a standalone stage.
pub use crate::detector::{Detection, DetectorParams, MosaicDetector};

// Planning and guard types callers commonly touch.
pub use crate::guard::{Device, MemoryProbe, ResourceGuard};
pub use crate::planner::{MemoryBudget, Plan};
pub use crate::types::{CancelToken, CensorRegion, DetectionMethod, Rect};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use unmosaic::prelude::*;
///
/// # fn main() -> Result<(), unmosaic::RestoreError> {
/// let image = ImageBuf::new(640, 480, 3);
///
/// let mut restorer = MosaicRestorer::new(RestoreParams::default());
/// let mut inpainter = NeighborhoodFill::default();
///
/// let result = restorer.process(&image, None, &mut inpainter, None)?;
/// println!(
///     "regions={} elapsed_ms={:.3}",
///     result.regions.len(),
///     result.elapsed_ms
/// );
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::image::{ImageBuf, Mask};
    pub use crate::{
        CancelToken, Inpainter, MosaicRestorer, NeighborhoodFill, RestoreParams, RestoreResult,
    };
}
