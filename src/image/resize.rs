//! Resampling helpers for the downscale fallback.
//!
//! Shrinking uses a triangle (bilinear) filter, which prefilters enough for
//! the factors the planner emits; the return trip uses Catmull-Rom to keep
//! reconstructed edges from going soft twice.
use super::ImageBuf;
use image::imageops::{self, FilterType};
use image::{GrayImage, ImageBuffer, Rgb};

/// Shrink to `nw × nh`.
pub fn downscale(image: &ImageBuf, nw: usize, nh: usize) -> Result<ImageBuf, String> {
    resample(image, nw, nh, FilterType::Triangle)
}

/// Enlarge to `nw × nh` with quality-preserving interpolation.
pub fn upscale(image: &ImageBuf, nw: usize, nh: usize) -> Result<ImageBuf, String> {
    resample(image, nw, nh, FilterType::CatmullRom)
}

fn resample(
    image: &ImageBuf,
    nw: usize,
    nh: usize,
    filter: FilterType,
) -> Result<ImageBuf, String> {
    if nw == 0 || nh == 0 {
        return Err(format!("cannot resample to {nw}x{nh}"));
    }
    if nw == image.w && nh == image.h {
        return Ok(image.clone());
    }
    match image.channels {
        3 => {
            let buf: ImageBuffer<Rgb<u8>, Vec<u8>> =
                ImageBuffer::from_raw(image.w as u32, image.h as u32, image.data.clone())
                    .ok_or_else(|| "Failed to create resample source".to_string())?;
            let out = imageops::resize(&buf, nw as u32, nh as u32, filter);
            ImageBuf::from_raw(nw, nh, 3, out.into_raw())
        }
        1 => {
            let buf = GrayImage::from_raw(image.w as u32, image.h as u32, image.data.clone())
                .ok_or_else(|| "Failed to create resample source".to_string())?;
            let out = imageops::resize(&buf, nw as u32, nh as u32, filter);
            ImageBuf::from_raw(nw, nh, 1, out.into_raw())
        }
        n => Err(format!("unsupported channel count {n} for resampling")),
    }
}
