//! Top-level restoration pipeline.
//!
//! Wires the stages end to end: detect (or accept an external mask), plan
//! under a freshly queried budget, orchestrate the model over tiles, and
//! composite. A run that exhausts the orchestrator's split ladder is
//! restarted exactly once at a reduced global scale before failing, which
//! bounds worst-case latency.
use crate::compositor;
use crate::detector::MosaicDetector;
use crate::diagnostics::{PlanDiagnostics, RestoreDiagnostics};
use crate::error::RestoreError;
use crate::guard::{ResourceGuard, DEFAULT_BUDGET_BYTES};
use crate::image::{resize, ImageBuf, Mask};
use crate::inpaint::{InpaintError, Inpainter};
use crate::orchestrator::{self, RunOptions};
use crate::params::RestoreParams;
use crate::planner::{self, scaled_dims, MemoryBudget, Plan, PlanRequest};
use crate::tiles;
use crate::types::{CancelToken, CensorRegion, DetectionMethod};
use log::{debug, info, warn};
use std::time::Instant;

/// Final output of one processed image.
#[derive(Debug)]
pub struct RestoreResult {
    pub image: ImageBuf,
    /// Regions that were filled (empty when nothing was censored).
    pub regions: Vec<CensorRegion>,
    /// True when the result went through a downscale fallback, so
    /// reconstructed detail is bounded by the scale factor.
    pub fallback_used: bool,
    /// True when cancellation stopped the run after the caller opted into
    /// partial results.
    pub partial: bool,
    pub elapsed_ms: f64,
    pub diagnostics: RestoreDiagnostics,
}

struct Outcome {
    image: ImageBuf,
    partial: bool,
    downscaled: bool,
}

/// Mosaic censorship removal pipeline.
pub struct MosaicRestorer {
    params: RestoreParams,
    guard: ResourceGuard,
    detector: MosaicDetector,
}

impl MosaicRestorer {
    /// Build a restorer with a fixed-budget guard derived from the params.
    pub fn new(params: RestoreParams) -> Self {
        let bytes = params.memory_budget_bytes.unwrap_or(DEFAULT_BUDGET_BYTES);
        let guard = ResourceGuard::with_fixed_budget(
            params.device,
            bytes,
            params.copies_multiplier,
            params.safety_margin,
        );
        Self::with_guard(params, guard)
    }

    /// Build a restorer around a caller-supplied guard (custom memory probe).
    pub fn with_guard(params: RestoreParams, guard: ResourceGuard) -> Self {
        let detector = MosaicDetector::new(params.detector.clone());
        Self {
            params,
            guard,
            detector,
        }
    }

    pub fn params(&self) -> &RestoreParams {
        &self.params
    }

    /// Process one image.
    ///
    /// `external_mask` bypasses the detector when supplied; it must match
    /// the image dimensions. Zero detected regions is not an error: the
    /// input is returned unchanged.
    pub fn process<I>(
        &mut self,
        image: &ImageBuf,
        external_mask: Option<&Mask>,
        inpainter: &mut I,
        cancel: Option<&CancelToken>,
    ) -> Result<RestoreResult, RestoreError>
    where
        I: Inpainter + Sync + ?Sized,
    {
        let start = Instant::now();
        validate(image, external_mask)?;
        self.bind_device(inpainter)?;

        let mut diagnostics = RestoreDiagnostics::default();

        let (mask, regions) = match external_mask {
            Some(m) => (m.clone(), external_regions(m)),
            None => {
                let detection = self.detector.detect(image, self.params.sensitivity)?;
                diagnostics.detection = Some(detection.diagnostics);
                (detection.mask, detection.regions)
            }
        };

        if regions.is_empty() || mask.is_empty() {
            info!("no censored regions, returning the input unchanged");
            return Ok(RestoreResult {
                image: image.clone(),
                regions: Vec::new(),
                fallback_used: false,
                partial: false,
                elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
                diagnostics,
            });
        }

        let budget = self.guard.current_budget();
        let overlap = self.params.tile_overlap_px.max(inpainter.context_radius());
        let req = PlanRequest {
            width: image.w,
            height: image.h,
            channels: image.channels,
            allow_downscale: self.params.allow_downscale,
            max_resolution: self.params.max_resolution,
            overlap,
        };
        let plan = planner::plan(&req, &budget)?;
        diagnostics.plan = Some(PlanDiagnostics {
            plan,
            estimated_peak: budget.estimated_peak(image.w, image.h, image.channels),
            available: budget.available,
        });
        info!(
            "plan: {} for {}x{} ({} regions), estimated model time {:.1}s",
            plan.summary(),
            image.w,
            image.h,
            regions.len(),
            inpainter.estimate_cost_ms(image.w, image.h) / 1000.0
        );

        let first = self.execute(plan, image, &mask, inpainter, &budget, cancel, &mut diagnostics);
        let (outcome, replanned) = match first {
            Ok(outcome) => (outcome, false),
            Err(RestoreError::ResourceExhausted { plan: failed }) => {
                warn!("plan '{failed}' exhausted memory, re-planning at reduced scale");
                let reduced = budget.reduced(0.5);
                let replan_req = PlanRequest {
                    allow_downscale: true,
                    // force a strictly smaller working set; retrying the
                    // same allocation would only exhaust again
                    max_resolution: Some(
                        self.params
                            .max_resolution
                            .unwrap_or(image.w.max(image.h))
                            .min(image.w.max(image.h))
                            / 2,
                    ),
                    ..req
                };
                let fallback_plan = planner::plan(&replan_req, &reduced)?;
                diagnostics.replanned = true;
                info!("fallback plan: {}", fallback_plan.summary());
                let outcome = self
                    .execute(
                        fallback_plan,
                        image,
                        &mask,
                        inpainter,
                        &reduced,
                        cancel,
                        &mut diagnostics,
                    )
                    .map_err(|e| match e {
                        RestoreError::ResourceExhausted { plan: detail } => {
                            RestoreError::ResourceExhausted {
                                plan: format!("{}: {detail}", fallback_plan.summary()),
                            }
                        }
                        other => other,
                    })?;
                (outcome, true)
            }
            Err(e) => return Err(e),
        };

        Ok(RestoreResult {
            image: outcome.image,
            regions,
            fallback_used: outcome.downscaled || replanned,
            partial: outcome.partial,
            elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
            diagnostics,
        })
    }

    /// Process a batch sequentially, resetting shared allocator state
    /// between images so no image leaks memory into the next.
    pub fn process_batch<I>(
        &mut self,
        images: &[ImageBuf],
        inpainter: &mut I,
        cancel: Option<&CancelToken>,
    ) -> Vec<Result<RestoreResult, RestoreError>>
    where
        I: Inpainter + Sync + ?Sized,
    {
        let mut results = Vec::with_capacity(images.len());
        for (i, image) in images.iter().enumerate() {
            if i > 0 {
                self.guard.reset_between_images(inpainter);
            }
            if cancel.is_some_and(|c| c.is_cancelled()) {
                results.push(Err(RestoreError::Cancelled));
                continue;
            }
            results.push(self.process(image, None, inpainter, cancel));
        }
        let ok = results.iter().filter(|r| r.is_ok()).count();
        info!("batch complete: {ok} succeeded, {} failed", results.len() - ok);
        results
    }

    fn bind_device<I>(&self, inpainter: &mut I) -> Result<(), RestoreError>
    where
        I: Inpainter + ?Sized,
    {
        match inpainter.bind_device(self.params.device) {
            Ok(()) => Ok(()),
            Err(InpaintError::DeviceUnavailable(msg)) => match self.params.fallback_device {
                Some(fallback) => {
                    warn!(
                        "device {:?} unavailable ({msg}), falling back to {:?}",
                        self.params.device, fallback
                    );
                    inpainter.bind_device(fallback).map_err(|e| match e {
                        InpaintError::DeviceUnavailable(m) => RestoreError::DeviceUnavailable(m),
                        InpaintError::ResourceExhausted => RestoreError::ResourceExhausted {
                            plan: "device bind".to_string(),
                        },
                    })
                }
                None => Err(RestoreError::DeviceUnavailable(msg)),
            },
            Err(InpaintError::ResourceExhausted) => Err(RestoreError::ResourceExhausted {
                plan: "device bind".to_string(),
            }),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn execute<I>(
        &self,
        plan: Plan,
        image: &ImageBuf,
        mask: &Mask,
        inpainter: &I,
        budget: &MemoryBudget,
        cancel: Option<&CancelToken>,
        diagnostics: &mut RestoreDiagnostics,
    ) -> Result<Outcome, RestoreError>
    where
        I: Inpainter + Sync + ?Sized,
    {
        let overlap = self.params.tile_overlap_px.max(inpainter.context_radius());
        match plan {
            Plan::Native => {
                let tile_set = tiles::schedule(image.w, image.h, 1, 1, overlap, mask);
                let composed =
                    self.run_and_compose(image, mask, tile_set, inpainter, budget, cancel, diagnostics)?;
                Ok(Outcome {
                    image: composed.0,
                    partial: composed.1,
                    downscaled: false,
                })
            }
            Plan::Tiled {
                cols,
                rows,
                overlap: plan_overlap,
            } => {
                let tile_set = tiles::schedule(image.w, image.h, cols, rows, plan_overlap, mask);
                let composed =
                    self.run_and_compose(image, mask, tile_set, inpainter, budget, cancel, diagnostics)?;
                Ok(Outcome {
                    image: composed.0,
                    partial: composed.1,
                    downscaled: false,
                })
            }
            Plan::Downscale { factor } => {
                let (sw, sh) = scaled_dims(image.w, image.h, factor as f64);
                debug!("downscale fallback: working at {sw}x{sh}");
                let small_image =
                    resize::downscale(image, sw, sh).map_err(RestoreError::validation)?;
                let small_mask = mask.resize_nearest(sw, sh);
                if small_mask.is_empty() {
                    // the mask collapsed below one pixel at this scale;
                    // nothing left to reconstruct
                    return Ok(Outcome {
                        image: image.clone(),
                        partial: false,
                        downscaled: true,
                    });
                }
                let tile_set = tiles::schedule(sw, sh, 1, 1, overlap, &small_mask);
                let (composed, partial) = self.run_and_compose(
                    &small_image,
                    &small_mask,
                    tile_set,
                    inpainter,
                    budget,
                    cancel,
                    diagnostics,
                )?;
                let upscaled =
                    resize::upscale(&composed, image.w, image.h).map_err(RestoreError::validation)?;

                // merge only mask-covered pixels so untouched content stays
                // bit-exact at full resolution
                let mut merged = image.clone();
                for y in 0..image.h {
                    for x in 0..image.w {
                        if mask.get(x, y) {
                            merged
                                .pixel_mut(x, y)
                                .copy_from_slice(upscaled.pixel(x, y));
                        }
                    }
                }
                Ok(Outcome {
                    image: merged,
                    partial,
                    downscaled: true,
                })
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn run_and_compose<I>(
        &self,
        image: &ImageBuf,
        mask: &Mask,
        tile_set: Vec<tiles::Tile>,
        inpainter: &I,
        budget: &MemoryBudget,
        cancel: Option<&CancelToken>,
        diagnostics: &mut RestoreDiagnostics,
    ) -> Result<(ImageBuf, bool), RestoreError>
    where
        I: Inpainter + Sync + ?Sized,
    {
        let outer_rects: Vec<_> = tile_set.iter().map(|t| t.outer).collect();
        let per_tile_peak = planner::per_tile_peak(budget, image.channels, &outer_rects);
        let opts = RunOptions {
            max_retry_depth: self.params.max_retry_depth,
            workers: self.params.workers,
            per_tile_peak,
            available: budget.available,
            partial_on_cancel: self.params.partial_on_cancel,
        };

        let orchestration = orchestrator::run(image, mask, tile_set, inpainter, &opts, cancel)?;

        let compose_start = Instant::now();
        let composed = compositor::compose(image, &orchestration.outputs);
        diagnostics.compose_ms += compose_start.elapsed().as_secs_f64() * 1000.0;
        diagnostics.orchestrator = Some(orchestration.report);

        Ok((composed, orchestration.partial))
    }
}

fn validate(image: &ImageBuf, external_mask: Option<&Mask>) -> Result<(), RestoreError> {
    if image.w == 0 || image.h == 0 {
        return Err(RestoreError::validation("zero-area image"));
    }
    if image.channels == 0 {
        return Err(RestoreError::validation("image has zero channels"));
    }
    if let Some(mask) = external_mask {
        if mask.w != image.w || mask.h != image.h {
            return Err(RestoreError::validation(format!(
                "mask {}x{} does not match image {}x{}",
                mask.w, mask.h, image.w, image.h
            )));
        }
    }
    Ok(())
}

fn external_regions(mask: &Mask) -> Vec<CensorRegion> {
    match mask.bounding_box() {
        Some(bbox) => vec![CensorRegion {
            bbox,
            confidence: 1.0,
            method: DetectionMethod::External,
        }],
        None => Vec::new(),
    }
}
