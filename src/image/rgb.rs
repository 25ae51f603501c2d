//! Owned interleaved 8-bit image buffer.
//!
//! This is the pipeline's input and output type. Channel count is carried
//! explicitly (1 for grayscale, 3 for RGB); bit depth is fixed at 8 — inputs
//! are normalized to 8-bit on load, matching the rest of the pipeline's
//! memory model.
use crate::image::ImageF32;
use crate::types::Rect;

/// Luma weights for RGB → gray conversion (ITU-R BT.601).
const LUMA_R: f32 = 0.299;
const LUMA_G: f32 = 0.587;
const LUMA_B: f32 = 0.114;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageBuf {
    pub w: usize,
    pub h: usize,
    pub channels: usize,
    /// Interleaved samples in row-major order, `w * h * channels` bytes.
    pub data: Vec<u8>,
}

impl ImageBuf {
    /// Construct a zero-initialized buffer.
    pub fn new(w: usize, h: usize, channels: usize) -> Self {
        Self {
            w,
            h,
            channels,
            data: vec![0; w * h * channels],
        }
    }

    /// Wrap raw interleaved bytes, checking the length.
    pub fn from_raw(w: usize, h: usize, channels: usize, data: Vec<u8>) -> Result<Self, String> {
        let expected = w * h * channels;
        if data.len() != expected {
            return Err(format!(
                "buffer length {} does not match {w}x{h}x{channels} = {expected}",
                data.len()
            ));
        }
        Ok(Self {
            w,
            h,
            channels,
            data,
        })
    }

    /// Samples per row.
    #[inline]
    pub fn row_stride(&self) -> usize {
        self.w * self.channels
    }

    #[inline]
    pub fn row(&self, y: usize) -> &[u8] {
        let start = y * self.row_stride();
        &self.data[start..start + self.row_stride()]
    }

    /// The channel samples of the pixel at (x, y).
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> &[u8] {
        let start = y * self.row_stride() + x * self.channels;
        &self.data[start..start + self.channels]
    }

    #[inline]
    pub fn pixel_mut(&mut self, x: usize, y: usize) -> &mut [u8] {
        let stride = self.row_stride();
        let start = y * stride + x * self.channels;
        &mut self.data[start..start + self.channels]
    }

    /// Copy out the pixels under `rect` into a new buffer.
    ///
    /// `rect` must lie inside the image bounds.
    pub fn crop(&self, rect: &Rect) -> ImageBuf {
        debug_assert!(rect.right() <= self.w && rect.bottom() <= self.h);
        let mut out = ImageBuf::new(rect.w, rect.h, self.channels);
        let row_bytes = rect.w * self.channels;
        for dy in 0..rect.h {
            let src_start = (rect.y + dy) * self.row_stride() + rect.x * self.channels;
            let dst_start = dy * row_bytes;
            out.data[dst_start..dst_start + row_bytes]
                .copy_from_slice(&self.data[src_start..src_start + row_bytes]);
        }
        out
    }

    /// Convert to a single-channel luma plane in `[0, 1]`.
    pub fn to_luma(&self) -> ImageF32 {
        let mut out = ImageF32::new(self.w, self.h);
        for y in 0..self.h {
            for x in 0..self.w {
                let px = self.pixel(x, y);
                let v = match self.channels {
                    1 => px[0] as f32,
                    _ => LUMA_R * px[0] as f32 + LUMA_G * px[1] as f32 + LUMA_B * px[2] as f32,
                };
                out.set(x, y, v / 255.0);
            }
        }
        out
    }
}
