//! Seam-period confirmation via autocorrelation.
//!
//! A pixelation grid leaves its gradient energy concentrated on equally
//! spaced seam lines. Projecting the gradient magnitude onto each axis and
//! autocorrelating the profile exposes that spacing as a strong peak at the
//! cell period; naturally flat regions (the main false-positive source)
//! produce profiles with no repeat structure.
use crate::image::ImageF32;
use crate::types::Rect;

/// Periodicity strength of the gradient signal inside `bbox`, in `[0, 1]`.
///
/// Returns the stronger of the per-axis scores so a region confirmed along
/// one axis is enough; real mosaics are periodic along both.
pub(crate) fn periodicity_score(
    mag: &ImageF32,
    bbox: &Rect,
    min_period: usize,
    max_period: usize,
) -> f32 {
    if bbox.w == 0 || bbox.h == 0 {
        return 0.0;
    }

    let col_profile = project_columns(mag, bbox);
    let row_profile = project_rows(mag, bbox);

    let col_score = autocorrelation_peak(&col_profile, min_period, max_period);
    let row_score = autocorrelation_peak(&row_profile, min_period, max_period);
    col_score.max(row_score)
}

/// Mean gradient magnitude per column of `bbox`.
fn project_columns(mag: &ImageF32, bbox: &Rect) -> Vec<f32> {
    let mut profile = vec![0.0f32; bbox.w];
    for y in bbox.y..bbox.bottom() {
        for (i, x) in (bbox.x..bbox.right()).enumerate() {
            profile[i] += mag.get(x, y);
        }
    }
    let inv = 1.0 / bbox.h as f32;
    for v in &mut profile {
        *v *= inv;
    }
    profile
}

/// Mean gradient magnitude per row of `bbox`.
fn project_rows(mag: &ImageF32, bbox: &Rect) -> Vec<f32> {
    let mut profile = vec![0.0f32; bbox.h];
    for (i, y) in (bbox.y..bbox.bottom()).enumerate() {
        let mut sum = 0.0f32;
        for x in bbox.x..bbox.right() {
            sum += mag.get(x, y);
        }
        profile[i] = sum / bbox.w as f32;
    }
    profile
}

/// Largest normalized autocorrelation over lags in `[min_period, max_period]`.
///
/// The profile is mean-centered first; the estimate at lag `k` is rescaled by
/// `n / (n - k)` to undo the shrinking-overlap bias, then clamped to `[0, 1]`.
fn autocorrelation_peak(profile: &[f32], min_period: usize, max_period: usize) -> f32 {
    let n = profile.len();
    if n < 2 * min_period.max(1) {
        return 0.0;
    }

    let mean = profile.iter().sum::<f32>() / n as f32;
    let centered: Vec<f32> = profile.iter().map(|v| v - mean).collect();
    let c0: f32 = centered.iter().map(|v| v * v).sum();
    if c0 <= f32::EPSILON {
        return 0.0;
    }

    let hi = max_period.min(n / 2);
    let mut best = 0.0f32;
    for lag in min_period.max(1)..=hi {
        let mut c = 0.0f32;
        for i in 0..n - lag {
            c += centered[i] * centered[i + lag];
        }
        let r = c / c0 * (n as f32 / (n - lag) as f32);
        best = best.max(r);
    }
    best.clamp(0.0, 1.0)
}
