//! Memory budget planning.
//!
//! The planner decides, *before any large allocation*, how an image will be
//! processed: whole (`Native`), shrunk by a uniform factor (`Downscale`), or
//! split into overlapping tiles (`Tiled`). The peak-memory model is
//! deliberately simple — working-set bytes times a copies multiplier times a
//! safety margin — and every returned plan satisfies
//! `estimated_peak(plan) <= budget.available`.
//!
//! Planning is pure: identical inputs always yield the identical plan.
use crate::error::RestoreError;
use crate::types::Rect;
use serde::Serialize;

/// Downscale factors are chosen on a fixed 1/64 ladder so planning stays
/// bit-reproducible across platforms.
const SCALE_STEP: f64 = 1.0 / 64.0;

/// Upper bound on the tile-grid search; a budget so small that even this
/// many tiles cannot fit is treated as exhausted.
const MAX_TILES: usize = 4096;

/// Available memory for the target device plus the peak-estimate model.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct MemoryBudget {
    /// Bytes the plan may not exceed.
    pub available: u64,
    /// Concurrent whole-buffer copies the pipeline holds (input, mask,
    /// intermediate, output).
    pub copies: f32,
    /// Multiplicative slack absorbing allocator overhead.
    pub safety_margin: f32,
}

impl MemoryBudget {
    pub fn new(available: u64, copies: f32, safety_margin: f32) -> Self {
        Self {
            available,
            copies,
            safety_margin,
        }
    }

    /// Peak bytes for a `w × h × channels` working set at 8-bit depth.
    pub fn estimated_peak(&self, w: usize, h: usize, channels: usize) -> u64 {
        let base = (w * h * channels) as f64;
        (base * self.copies as f64 * self.safety_margin as f64).ceil() as u64
    }

    /// Budget with `available` scaled by `factor`, for the global re-plan.
    pub fn reduced(&self, factor: f64) -> Self {
        Self {
            available: (self.available as f64 * factor) as u64,
            ..*self
        }
    }
}

/// Chosen processing strategy.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum Plan {
    /// The whole image fits the budget at native resolution.
    Native,
    /// Process at `factor` scale and upscale the result back.
    Downscale { factor: f32 },
    /// Process as a `cols × rows` grid of overlapping tiles.
    Tiled {
        cols: usize,
        rows: usize,
        overlap: usize,
    },
}

impl Plan {
    /// Short human-readable form for logs and error diagnostics.
    pub fn summary(&self) -> String {
        match self {
            Plan::Native => "native".to_string(),
            Plan::Downscale { factor } => format!("downscale x{factor:.3}"),
            Plan::Tiled {
                cols,
                rows,
                overlap,
            } => format!("tiled {cols}x{rows} (overlap {overlap}px)"),
        }
    }
}

/// Inputs to a planning decision.
#[derive(Clone, Copy, Debug)]
pub struct PlanRequest {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub allow_downscale: bool,
    /// Longest-side cap; when exceeded (and downscaling is allowed) the
    /// planner shrinks even if the budget would fit native resolution.
    pub max_resolution: Option<usize>,
    /// Overlap band width used when a tiled plan is produced.
    pub overlap: usize,
}

/// Choose a processing strategy for the request under `budget`.
pub fn plan(req: &PlanRequest, budget: &MemoryBudget) -> Result<Plan, RestoreError> {
    if req.width == 0 || req.height == 0 || req.channels == 0 {
        return Err(RestoreError::validation(format!(
            "cannot plan a {}x{}x{} image",
            req.width, req.height, req.channels
        )));
    }

    let native_peak = budget.estimated_peak(req.width, req.height, req.channels);
    let longest = req.width.max(req.height);
    let cap_scale = req
        .max_resolution
        .map(|m| m as f64 / longest as f64)
        .filter(|s| *s < 1.0);

    let fits_native = native_peak <= budget.available;
    if fits_native && (cap_scale.is_none() || !req.allow_downscale) {
        return Ok(Plan::Native);
    }

    if req.allow_downscale {
        return plan_downscale(req, budget, native_peak, cap_scale);
    }

    plan_tiled(req, budget)
}

fn plan_downscale(
    req: &PlanRequest,
    budget: &MemoryBudget,
    native_peak: u64,
    cap_scale: Option<f64>,
) -> Result<Plan, RestoreError> {
    let budget_scale = (budget.available as f64 / native_peak as f64).sqrt().min(1.0);
    let target = budget_scale.min(cap_scale.unwrap_or(1.0));

    // Quantize down, then step further until the scaled working set fits.
    let mut s = (target / SCALE_STEP).floor() * SCALE_STEP;
    while s >= SCALE_STEP {
        let (sw, sh) = scaled_dims(req.width, req.height, s);
        if budget.estimated_peak(sw, sh, req.channels) <= budget.available {
            return Ok(Plan::Downscale { factor: s as f32 });
        }
        s -= SCALE_STEP;
    }

    Err(RestoreError::ResourceExhausted {
        plan: format!(
            "downscale below 1/64 for {}x{} within {} bytes",
            req.width, req.height, budget.available
        ),
    })
}

fn plan_tiled(req: &PlanRequest, budget: &MemoryBudget) -> Result<Plan, RestoreError> {
    // Smallest tile count first: fewer, larger tiles mean fewer model
    // invocations and fewer seams. Among factorizations of equal count,
    // prefer the squarest tiles.
    for total in 1..=MAX_TILES {
        let mut pairs = factor_pairs(total);
        pairs.sort_by(|a, b| {
            let sq_a = tile_squareness(req, *a);
            let sq_b = tile_squareness(req, *b);
            sq_a.partial_cmp(&sq_b).unwrap_or(std::cmp::Ordering::Equal)
        });
        for (cols, rows) in pairs {
            if cols > req.width || rows > req.height {
                continue;
            }
            let tw = (req.width.div_ceil(cols) + 2 * req.overlap).min(req.width);
            let th = (req.height.div_ceil(rows) + 2 * req.overlap).min(req.height);
            if budget.estimated_peak(tw, th, req.channels) <= budget.available {
                return Ok(Plan::Tiled {
                    cols,
                    rows,
                    overlap: req.overlap,
                });
            }
        }
    }

    Err(RestoreError::ResourceExhausted {
        plan: format!(
            "tiled beyond {MAX_TILES} tiles for {}x{} within {} bytes",
            req.width, req.height, budget.available
        ),
    })
}

/// Scaled dimensions, never collapsing to zero.
pub fn scaled_dims(w: usize, h: usize, factor: f64) -> (usize, usize) {
    let sw = ((w as f64 * factor).round() as usize).max(1);
    let sh = ((h as f64 * factor).round() as usize).max(1);
    (sw, sh)
}

/// Worst-case per-tile peak for a tiled plan, used to size the worker pool.
pub fn per_tile_peak(budget: &MemoryBudget, channels: usize, tiles: &[Rect]) -> u64 {
    tiles
        .iter()
        .map(|r| budget.estimated_peak(r.w, r.h, channels))
        .max()
        .unwrap_or(0)
}

fn factor_pairs(total: usize) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for cols in 1..=total {
        if total % cols == 0 {
            pairs.push((cols, total / cols));
        }
    }
    pairs
}

/// |log aspect| of the resulting tile; 0 is a perfect square.
fn tile_squareness(req: &PlanRequest, (cols, rows): (usize, usize)) -> f64 {
    let tw = req.width.div_ceil(cols) as f64;
    let th = req.height.div_ceil(rows) as f64;
    (tw / th).ln().abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget(bytes: u64) -> MemoryBudget {
        MemoryBudget::new(bytes, 4.0, 1.5)
    }

    #[test]
    fn native_when_peak_matches_budget_exactly() {
        // 4000*3000*3*4*1.5 = 216_000_000
        let req = PlanRequest {
            width: 4000,
            height: 3000,
            channels: 3,
            allow_downscale: true,
            max_resolution: None,
            overlap: 32,
        };
        let p = plan(&req, &budget(216_000_000)).unwrap();
        assert_eq!(p, Plan::Native);
    }

    #[test]
    fn tiled_when_downscale_disallowed() {
        let b = budget(100_000_000);
        let req = PlanRequest {
            width: 8000,
            height: 8000,
            channels: 3,
            allow_downscale: false,
            max_resolution: None,
            overlap: 32,
        };
        match plan(&req, &b).unwrap() {
            Plan::Tiled {
                cols,
                rows,
                overlap,
            } => {
                assert!(cols * rows > 1, "a single tile cannot fit this budget");
                let tw = (8000usize.div_ceil(cols) + 2 * overlap).min(8000);
                let th = (8000usize.div_ceil(rows) + 2 * overlap).min(8000);
                assert!(b.estimated_peak(tw, th, 3) <= b.available);
            }
            other => panic!("expected tiled plan, got {other:?}"),
        }
    }

    #[test]
    fn downscale_factor_always_fits() {
        let b = budget(10_000_000);
        let req = PlanRequest {
            width: 4096,
            height: 4096,
            channels: 3,
            allow_downscale: true,
            max_resolution: None,
            overlap: 32,
        };
        match plan(&req, &b).unwrap() {
            Plan::Downscale { factor } => {
                assert!(factor > 0.0 && factor < 1.0);
                let (sw, sh) = scaled_dims(4096, 4096, factor as f64);
                assert!(b.estimated_peak(sw, sh, 3) <= b.available);
            }
            other => panic!("expected downscale plan, got {other:?}"),
        }
    }

    #[test]
    fn resolution_cap_forces_downscale_even_within_budget() {
        let req = PlanRequest {
            width: 4000,
            height: 3000,
            channels: 3,
            allow_downscale: true,
            max_resolution: Some(2000),
            overlap: 32,
        };
        match plan(&req, &budget(1_000_000_000)).unwrap() {
            Plan::Downscale { factor } => {
                let (sw, sh) = scaled_dims(4000, 3000, factor as f64);
                assert!(sw.max(sh) <= 2000);
            }
            other => panic!("expected downscale plan, got {other:?}"),
        }
    }

    #[test]
    fn planning_is_deterministic() {
        let b = budget(50_000_000);
        let req = PlanRequest {
            width: 7000,
            height: 5000,
            channels: 3,
            allow_downscale: false,
            max_resolution: None,
            overlap: 16,
        };
        let p1 = plan(&req, &b).unwrap();
        let p2 = plan(&req, &b).unwrap();
        assert_eq!(p1, p2);
    }
}
