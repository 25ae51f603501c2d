use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Axis-aligned pixel rectangle, half-open on the right and bottom edges.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
}

impl Rect {
    pub fn new(x: usize, y: usize, w: usize, h: usize) -> Self {
        Self { x, y, w, h }
    }

    #[inline]
    pub fn right(&self) -> usize {
        self.x + self.w
    }

    #[inline]
    pub fn bottom(&self) -> usize {
        self.y + self.h
    }

    #[inline]
    pub fn area(&self) -> usize {
        self.w * self.h
    }

    #[inline]
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Expand by `margin` on every side, clamped to the `bounds_w × bounds_h`
    /// image rectangle.
    pub fn expanded(&self, margin: usize, bounds_w: usize, bounds_h: usize) -> Rect {
        let x0 = self.x.saturating_sub(margin);
        let y0 = self.y.saturating_sub(margin);
        let x1 = (self.right() + margin).min(bounds_w);
        let y1 = (self.bottom() + margin).min(bounds_h);
        Rect::new(x0, y0, x1 - x0, y1 - y0)
    }
}

/// How a censored region was identified.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionMethod {
    /// Block-statistics detector (variance + seam periodicity).
    BlockStatistics,
    /// Caller-supplied mask, no detection performed.
    External,
}

/// A detected (or externally declared) censored region.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct CensorRegion {
    pub bbox: Rect,
    /// Detection confidence in [0, 1].
    pub confidence: f32,
    pub method: DetectionMethod,
}

/// Cooperative cancellation flag shared between the caller and the pipeline.
///
/// Raising the token aborts remaining scheduled tiles at the next tile
/// boundary; the in-flight model call is allowed to finish.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
