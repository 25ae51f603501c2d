//! I/O helpers for images, masks, and JSON reports.
//!
//! - `load_rgb8`: read a PNG/JPEG/etc. into an owned interleaved RGB buffer.
//! - `load_mask`: read a mask image as 8-bit gray, thresholded at 128.
//! - `save_rgb8` / `save_mask`: write buffers back to disk.
//! - `write_json_file`: pretty-print a serializable value to disk.
use super::{ImageBuf, Mask};
use image::{GrayImage, ImageBuffer, Rgb};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Load an image from disk as interleaved 8-bit RGB.
pub fn load_rgb8(path: impl AsRef<Path>) -> Result<ImageBuf, String> {
    let path = path.as_ref();
    let img = image::open(path)
        .map_err(|e| format!("Failed to open {}: {e}", path.display()))?
        .into_rgb8();
    let (w, h) = (img.width() as usize, img.height() as usize);
    ImageBuf::from_raw(w, h, 3, img.into_raw())
}

/// Load a mask image as 8-bit gray, thresholded to {0, 255}.
pub fn load_mask(path: impl AsRef<Path>) -> Result<Mask, String> {
    let path = path.as_ref();
    let img = image::open(path)
        .map_err(|e| format!("Failed to open {}: {e}", path.display()))?
        .into_luma8();
    let (w, h) = (img.width() as usize, img.height() as usize);
    Mask::from_raw(w, h, img.into_raw())
}

/// Save an interleaved buffer to disk. Only 1- and 3-channel buffers are
/// supported.
pub fn save_rgb8(image: &ImageBuf, path: impl AsRef<Path>) -> Result<(), String> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;
    match image.channels {
        3 => {
            let buf: ImageBuffer<Rgb<u8>, Vec<u8>> =
                ImageBuffer::from_raw(image.w as u32, image.h as u32, image.data.clone())
                    .ok_or_else(|| "Failed to create image buffer".to_string())?;
            buf.save(path)
                .map_err(|e| format!("Failed to save {}: {e}", path.display()))
        }
        1 => {
            let buf = GrayImage::from_raw(image.w as u32, image.h as u32, image.data.clone())
                .ok_or_else(|| "Failed to create image buffer".to_string())?;
            buf.save(path)
                .map_err(|e| format!("Failed to save {}: {e}", path.display()))
        }
        n => Err(format!("unsupported channel count {n} for {}", path.display())),
    }
}

/// Save a mask to a grayscale PNG.
pub fn save_mask(mask: &Mask, path: impl AsRef<Path>) -> Result<(), String> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;
    let buf = GrayImage::from_raw(mask.w as u32, mask.h as u32, mask.data.clone())
        .ok_or_else(|| "Failed to create mask buffer".to_string())?;
    buf.save(path)
        .map_err(|e| format!("Failed to save {}: {e}", path.display()))
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize JSON for {}: {e}", path.display()))?;
    fs::write(path, json).map_err(|e| format!("Failed to write JSON {}: {e}", path.display()))
}

fn ensure_parent_dir(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
        }
    }
    Ok(())
}
