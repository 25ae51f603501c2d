//! The inpainting model boundary.
//!
//! The reconstruction model is opaque to this crate: a function from an
//! image crop plus a fill mask to a plausibly reconstructed crop, with typed
//! resource-exhaustion and device errors. Everything the pipeline needs
//! from a model implementation is expressed on the [`Inpainter`] trait;
//! [`NeighborhoodFill`] is a dependency-free diffusion fill used by the
//! demos and tests.
use crate::guard::Device;
use crate::image::{ImageBuf, Mask};
use thiserror::Error;

/// Errors a model call can signal.
#[derive(Debug, Error)]
pub enum InpaintError {
    /// The call could not allocate; the orchestrator reacts by splitting
    /// the tile, never by retrying the same size.
    #[error("inpainting ran out of memory")]
    ResourceExhausted,
    /// The compute device is gone; fatal unless a fallback device is
    /// configured.
    #[error("inpainting device unavailable: {0}")]
    DeviceUnavailable(String),
}

/// External reconstruction model.
///
/// `infill` takes `&self` so one model handle can be shared by reference
/// across tile calls (and across a bounded worker pool); the mutating
/// lifecycle hooks (`bind_device`, `release_cached`) run only between runs
/// or between images, under exclusive access.
pub trait Inpainter {
    /// Reconstruct the masked pixels of `image`. Unmasked pixels must be
    /// returned unchanged; the output dimensions must equal the input's.
    fn infill(&self, image: &ImageBuf, mask: &Mask) -> Result<ImageBuf, InpaintError>;

    /// Attach the model to a compute device before a run.
    fn bind_device(&mut self, _device: Device) -> Result<(), InpaintError> {
        Ok(())
    }

    /// Release cached allocator state between images of a batch.
    fn release_cached(&mut self) {}

    /// Pixels of surrounding context the model actually looks at; the
    /// scheduler sizes overlap bands to at least this.
    fn context_radius(&self) -> usize {
        0
    }

    /// Rough per-call latency estimate in milliseconds, for progress
    /// reporting. The default models a CPU at ~15 s per megapixel.
    fn estimate_cost_ms(&self, w: usize, h: usize) -> f64 {
        (w * h) as f64 / 1_000_000.0 * 15_000.0
    }
}

/// Diffusion-based reference fill.
///
/// Masked pixels start from the mean of the unmasked pixels, then a fixed
/// number of Jacobi passes average each masked pixel with its 4-neighbors.
/// Not a plausible reconstruction — just smooth, deterministic, and cheap —
/// which is exactly what demos and tests need.
#[derive(Clone, Debug)]
pub struct NeighborhoodFill {
    /// Jacobi smoothing passes over the masked set.
    pub passes: usize,
}

impl Default for NeighborhoodFill {
    fn default() -> Self {
        Self { passes: 48 }
    }
}

impl Inpainter for NeighborhoodFill {
    fn infill(&self, image: &ImageBuf, mask: &Mask) -> Result<ImageBuf, InpaintError> {
        let (w, h, ch) = (image.w, image.h, image.channels);
        let mut planes: Vec<f32> = image.data.iter().map(|&v| v as f32).collect();

        // seed masked pixels with the unmasked mean per channel
        let mut mean = vec![0.0f64; ch];
        let mut count = 0usize;
        for y in 0..h {
            for x in 0..w {
                if !mask.get(x, y) {
                    let px = image.pixel(x, y);
                    for c in 0..ch {
                        mean[c] += px[c] as f64;
                    }
                    count += 1;
                }
            }
        }
        if count == 0 {
            // fully masked crop: nothing to anchor on, fill mid-gray
            mean.iter_mut().for_each(|m| *m = 128.0);
            count = 1;
        }
        let mean: Vec<f32> = mean.iter().map(|m| (*m / count as f64) as f32).collect();

        let masked: Vec<(usize, usize)> = (0..h)
            .flat_map(|y| (0..w).map(move |x| (x, y)))
            .filter(|&(x, y)| mask.get(x, y))
            .collect();
        for &(x, y) in &masked {
            let base = (y * w + x) * ch;
            planes[base..base + ch].copy_from_slice(&mean);
        }

        let mut next = planes.clone();
        for _ in 0..self.passes {
            for &(x, y) in &masked {
                let x0 = x.saturating_sub(1);
                let x1 = (x + 1).min(w - 1);
                let y0 = y.saturating_sub(1);
                let y1 = (y + 1).min(h - 1);
                for c in 0..ch {
                    let sum = planes[(y * w + x0) * ch + c]
                        + planes[(y * w + x1) * ch + c]
                        + planes[(y0 * w + x) * ch + c]
                        + planes[(y1 * w + x) * ch + c];
                    next[(y * w + x) * ch + c] = sum * 0.25;
                }
            }
            std::mem::swap(&mut planes, &mut next);
        }

        let mut out = image.clone();
        for &(x, y) in &masked {
            let base = (y * w + x) * ch;
            for c in 0..ch {
                out.data[base + c] = planes[base + c].round().clamp(0.0, 255.0) as u8;
            }
        }
        Ok(out)
    }

    fn bind_device(&mut self, device: Device) -> Result<(), InpaintError> {
        match device {
            Device::Cpu => Ok(()),
            other => Err(InpaintError::DeviceUnavailable(format!(
                "{other:?} not supported by NeighborhoodFill"
            ))),
        }
    }

    fn context_radius(&self) -> usize {
        8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rect;

    #[test]
    fn unmasked_pixels_pass_through_unchanged() {
        let mut img = ImageBuf::new(16, 16, 3);
        for (i, v) in img.data.iter_mut().enumerate() {
            *v = (i % 251) as u8;
        }
        let mut mask = Mask::new(16, 16);
        mask.fill_rect(&Rect::new(4, 4, 6, 6));

        let out = NeighborhoodFill::default().infill(&img, &mask).unwrap();
        for y in 0..16 {
            for x in 0..16 {
                if !mask.get(x, y) {
                    assert_eq!(out.pixel(x, y), img.pixel(x, y));
                }
            }
        }
    }

    #[test]
    fn masked_pixels_move_toward_surroundings() {
        let mut img = ImageBuf::new(12, 12, 1);
        img.data.fill(200);
        let mut mask = Mask::new(12, 12);
        mask.fill_rect(&Rect::new(5, 5, 3, 3));
        // censored area starts black
        for y in 5..8 {
            for x in 5..8 {
                img.pixel_mut(x, y)[0] = 0;
            }
        }
        let out = NeighborhoodFill::default().infill(&img, &mask).unwrap();
        assert!(out.pixel(6, 6)[0] > 150, "fill should pull from the border");
    }
}
