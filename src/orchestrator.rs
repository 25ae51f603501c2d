//! Drives the inpainting model over scheduled tiles.
//!
//! Sequential by default so that peak memory stays bounded by a single
//! per-tile budget at every instant. A tile whose model call exhausts
//! memory is never retried at the same size: it is split into quadrants and
//! the children are retried, up to `max_retry_depth`. Exhausting the ladder
//! aborts the run with `ResourceExhausted`, which the pipeline answers with
//! its single global re-plan.
//!
//! An optional worker pool processes the first pass concurrently; its size
//! is capped here — never by the caller — so that
//! `concurrent_tiles * per_tile_peak` stays within the budget. Tiles that
//! exhaust inside the pool are re-run through the sequential split ladder.
use crate::compositor::TileOutput;
use crate::error::RestoreError;
use crate::image::{ImageBuf, Mask};
use crate::inpaint::{InpaintError, Inpainter};
use crate::tiles::Tile;
use crate::types::CancelToken;
use log::{debug, warn};
use rayon::prelude::*;
use std::time::Instant;

/// Orchestration knobs derived from the plan and the caller's params.
#[derive(Clone, Copy, Debug)]
pub struct RunOptions {
    /// Maximum quadrant-split depth before escalating.
    pub max_retry_depth: usize,
    /// Requested worker count; 1 disables the pool.
    pub workers: usize,
    /// Worst-case single-tile peak, for the pool cap.
    pub per_tile_peak: u64,
    /// Budget the concurrent peak may not exceed.
    pub available: u64,
    /// Return work finished so far instead of failing on cancellation.
    pub partial_on_cancel: bool,
}

/// Per-run counters surfaced in the diagnostics report.
#[derive(Clone, Copy, Debug, Default, serde::Serialize)]
pub struct OrchestratorReport {
    pub tiles_scheduled: usize,
    pub pass_through: usize,
    pub model_calls: usize,
    pub splits: usize,
    pub deepest_retry: usize,
    pub workers_used: usize,
    pub elapsed_ms: f64,
}

/// Result of driving the model over a tile set.
pub struct Orchestration {
    pub outputs: Vec<TileOutput>,
    pub partial: bool,
    pub report: OrchestratorReport,
}

/// Process `tiles` in scheduled order against `inpainter`.
pub fn run<I>(
    image: &ImageBuf,
    mask: &Mask,
    tiles: Vec<Tile>,
    inpainter: &I,
    opts: &RunOptions,
    cancel: Option<&CancelToken>,
) -> Result<Orchestration, RestoreError>
where
    I: Inpainter + Sync + ?Sized,
{
    let start = Instant::now();
    let mut report = OrchestratorReport {
        tiles_scheduled: tiles.len(),
        workers_used: 1,
        ..Default::default()
    };

    let mut outputs: Vec<TileOutput> = Vec::with_capacity(tiles.len());
    let mut pending: Vec<Tile> = Vec::new();
    for tile in tiles {
        if tile.pass_through {
            report.pass_through += 1;
            outputs.push(TileOutput { tile, pixels: None });
        } else {
            pending.push(tile);
        }
    }

    let cap = pool_cap(opts);
    let mut stack: Vec<(Tile, usize)> = Vec::new();
    let mut partial = false;

    if cap >= 2 && pending.len() >= 2 {
        report.workers_used = cap;
        debug!(
            "orchestrator: first pass over {} tiles with {} workers",
            pending.len(),
            cap
        );
        match rayon::ThreadPoolBuilder::new().num_threads(cap).build() {
            Ok(pool) => {
                let results: Vec<(Tile, Result<ImageBuf, InpaintError>)> = pool.install(|| {
                    pending
                        .par_iter()
                        .map(|tile| (*tile, infill_tile(image, mask, tile, inpainter)))
                        .collect()
                });
                for (tile, result) in results {
                    report.model_calls += 1;
                    match result {
                        Ok(filled) => {
                            check_dims(&tile, &filled)?;
                            outputs.push(TileOutput {
                                tile,
                                pixels: Some(filled),
                            });
                        }
                        Err(InpaintError::ResourceExhausted) => {
                            // re-enter the sequential ladder below
                            split_into(&tile, 0, image, mask, opts, &mut stack, &mut report)?;
                        }
                        Err(InpaintError::DeviceUnavailable(msg)) => {
                            return Err(RestoreError::DeviceUnavailable(msg));
                        }
                    }
                }
            }
            Err(e) => {
                warn!("orchestrator: worker pool unavailable ({e}), running sequentially");
                report.workers_used = 1;
                stack.extend(pending.iter().rev().map(|t| (*t, 0)));
            }
        }
    } else {
        stack.extend(pending.iter().rev().map(|t| (*t, 0)));
    }

    while let Some((tile, depth)) = stack.pop() {
        if cancel.is_some_and(|c| c.is_cancelled()) {
            if opts.partial_on_cancel {
                warn!("orchestrator: cancelled, returning partial result");
                partial = true;
                break;
            }
            return Err(RestoreError::Cancelled);
        }
        if tile.pass_through {
            report.pass_through += 1;
            outputs.push(TileOutput { tile, pixels: None });
            continue;
        }

        report.model_calls += 1;
        match infill_tile(image, mask, &tile, inpainter) {
            Ok(filled) => {
                check_dims(&tile, &filled)?;
                outputs.push(TileOutput {
                    tile,
                    pixels: Some(filled),
                });
            }
            Err(InpaintError::ResourceExhausted) => {
                split_into(&tile, depth, image, mask, opts, &mut stack, &mut report)?;
            }
            Err(InpaintError::DeviceUnavailable(msg)) => {
                return Err(RestoreError::DeviceUnavailable(msg));
            }
        }
    }

    report.elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    debug!(
        "orchestrator: {} model calls, {} splits, {:.1} ms",
        report.model_calls, report.splits, report.elapsed_ms
    );

    Ok(Orchestration {
        outputs,
        partial,
        report,
    })
}

fn infill_tile<I>(
    image: &ImageBuf,
    mask: &Mask,
    tile: &Tile,
    inpainter: &I,
) -> Result<ImageBuf, InpaintError>
where
    I: Inpainter + Sync + ?Sized,
{
    let crop = image.crop(&tile.outer);
    let mask_crop = mask.crop(&tile.outer);
    inpainter.infill(&crop, &mask_crop)
}

fn check_dims(tile: &Tile, filled: &ImageBuf) -> Result<(), RestoreError> {
    if filled.w != tile.outer.w || filled.h != tile.outer.h {
        return Err(RestoreError::validation(format!(
            "inpainter returned {}x{} for a {}x{} crop",
            filled.w, filled.h, tile.outer.w, tile.outer.h
        )));
    }
    Ok(())
}

/// Split an exhausted tile and queue its quadrants, or escalate when the
/// ladder is out of depth.
fn split_into(
    tile: &Tile,
    depth: usize,
    image: &ImageBuf,
    mask: &Mask,
    opts: &RunOptions,
    stack: &mut Vec<(Tile, usize)>,
    report: &mut OrchestratorReport,
) -> Result<(), RestoreError> {
    if depth >= opts.max_retry_depth {
        return Err(RestoreError::ResourceExhausted {
            plan: format!(
                "tile {}x{} at ({}, {}) still exhausted at retry depth {}",
                tile.outer.w, tile.outer.h, tile.outer.x, tile.outer.y, depth
            ),
        });
    }
    let children = tile.split_quadrants(image.w, image.h, mask);
    if children.is_empty() {
        return Err(RestoreError::ResourceExhausted {
            plan: format!(
                "unsplittable tile at ({}, {}) exhausted",
                tile.interior.x, tile.interior.y
            ),
        });
    }
    debug!(
        "orchestrator: splitting {}x{} tile at ({}, {}) -> {} quadrants (depth {})",
        tile.outer.w,
        tile.outer.h,
        tile.outer.x,
        tile.outer.y,
        children.len(),
        depth + 1
    );
    report.splits += 1;
    report.deepest_retry = report.deepest_retry.max(depth + 1);
    stack.extend(children.into_iter().rev().map(|t| (t, depth + 1)));
    Ok(())
}

/// Worker count such that `cap * per_tile_peak <= available`.
fn pool_cap(opts: &RunOptions) -> usize {
    if opts.workers <= 1 {
        return 1;
    }
    let by_budget = if opts.per_tile_peak == 0 {
        opts.workers as u64
    } else {
        (opts.available / opts.per_tile_peak).max(1)
    };
    opts.workers.min(by_budget as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::schedule;
    use crate::types::Rect;

    /// Fails with `ResourceExhausted` for crops wider/taller than `limit`.
    struct SizeLimited {
        limit: usize,
    }

    impl Inpainter for SizeLimited {
        fn infill(&self, image: &ImageBuf, mask: &Mask) -> Result<ImageBuf, InpaintError> {
            if image.w.max(image.h) > self.limit {
                return Err(InpaintError::ResourceExhausted);
            }
            let mut out = image.clone();
            for y in 0..image.h {
                for x in 0..image.w {
                    if mask.get(x, y) {
                        out.pixel_mut(x, y).fill(128);
                    }
                }
            }
            Ok(out)
        }
    }

    fn opts(depth: usize) -> RunOptions {
        RunOptions {
            max_retry_depth: depth,
            workers: 1,
            per_tile_peak: 0,
            available: u64::MAX,
            partial_on_cancel: false,
        }
    }

    #[test]
    fn exhausted_tile_is_split_until_it_fits() {
        let image = ImageBuf::new(128, 128, 3);
        let mut mask = Mask::new(128, 128);
        mask.fill_rect(&Rect::new(32, 32, 64, 64));
        let tiles = schedule(128, 128, 1, 1, 8, &mask);

        let res = run(&image, &mask, tiles, &SizeLimited { limit: 80 }, &opts(3), None).unwrap();
        assert!(res.report.splits >= 1);
        assert!(res.report.deepest_retry >= 1);
        // every produced crop respected the limit
        for out in &res.outputs {
            if out.pixels.is_some() {
                assert!(out.tile.outer.w.max(out.tile.outer.h) <= 80);
            }
        }
    }

    #[test]
    fn exhausting_the_ladder_escalates() {
        let image = ImageBuf::new(256, 256, 3);
        let mut mask = Mask::new(256, 256);
        mask.fill_rect(&Rect::new(0, 0, 256, 256));
        let tiles = schedule(256, 256, 1, 1, 0, &mask);

        let err = run(&image, &mask, tiles, &SizeLimited { limit: 1 }, &opts(2), None)
            .err()
            .expect("ladder should run out of depth");
        assert!(matches!(err, RestoreError::ResourceExhausted { .. }));
    }

    #[test]
    fn cancellation_without_opt_in_fails() {
        let image = ImageBuf::new(64, 64, 3);
        let mut mask = Mask::new(64, 64);
        mask.fill_rect(&Rect::new(0, 0, 64, 64));
        let tiles = schedule(64, 64, 2, 2, 4, &mask);
        let token = CancelToken::new();
        token.cancel();

        let err = run(
            &image,
            &mask,
            tiles,
            &SizeLimited { limit: 64 },
            &opts(1),
            Some(&token),
        )
        .err()
        .expect("cancellation should fail without opt-in");
        assert!(matches!(err, RestoreError::Cancelled));
    }

    #[test]
    fn pool_cap_respects_the_budget() {
        let o = RunOptions {
            max_retry_depth: 1,
            workers: 8,
            per_tile_peak: 30,
            available: 100,
            partial_on_cancel: false,
        };
        assert_eq!(pool_cap(&o), 3);
    }
}
