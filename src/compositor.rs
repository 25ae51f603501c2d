//! Stitches tile outputs into the final image.
//!
//! Every tile contributes its outer rectangle with a separable weight:
//! 1 across the plateau, falling off linearly over the overlap band toward
//! any edge that has a neighbor (edges on the image border keep weight 1).
//! Contributions are accumulated in f32 and normalized by the weight sum,
//! so the effective weights sum to exactly 1 at every pixel and vary by at
//! most one ramp step between adjacent pixels — no visible seams.
//!
//! Pass-through tiles (no censorship under their outer rect) contribute
//! source pixels under the same weights, which makes an all-pass-through
//! composite reproduce the source byte for byte.
use crate::image::ImageBuf;
use crate::tiles::Tile;

/// A tile plus its reconstruction; `None` means "copy from the source".
pub struct TileOutput {
    pub tile: Tile,
    pub pixels: Option<ImageBuf>,
}

/// Blend `outputs` over the source image.
///
/// Pixels not covered by any output (possible only in a partial run) fall
/// back to the source.
pub fn compose(src: &ImageBuf, outputs: &[TileOutput]) -> ImageBuf {
    let (w, h, ch) = (src.w, src.h, src.channels);
    let mut accum = vec![0.0f32; w * h * ch];
    let mut wsum = vec![0.0f32; w * h];

    for out in outputs {
        let tile = &out.tile;
        let rect = tile.outer;
        let band = tile.overlap;
        let wx = axis_weights(rect.x, rect.w, rect.right() < w, band);
        let wy = axis_weights(rect.y, rect.h, rect.bottom() < h, band);

        for dy in 0..rect.h {
            let gy = rect.y + dy;
            let row_weight = wy[dy];
            for dx in 0..rect.w {
                let gx = rect.x + dx;
                let weight = wx[dx] * row_weight;
                let px = match &out.pixels {
                    Some(filled) => filled.pixel(dx, dy),
                    None => src.pixel(gx, gy),
                };
                let base = (gy * w + gx) * ch;
                for c in 0..ch {
                    accum[base + c] += px[c] as f32 * weight;
                }
                wsum[gy * w + gx] += weight;
            }
        }
    }

    let mut result = ImageBuf::new(w, h, ch);
    for y in 0..h {
        for x in 0..w {
            let base = (y * w + x) * ch;
            let weight = wsum[y * w + x];
            if weight > 0.0 {
                for c in 0..ch {
                    result.data[base + c] =
                        (accum[base + c] / weight).round().clamp(0.0, 255.0) as u8;
                }
            } else {
                result.data[base..base + ch].copy_from_slice(src.pixel(x, y));
            }
        }
    }
    result
}

/// Per-offset weights along one axis of a tile's outer rect.
///
/// Ramps apply only toward edges that have a neighbor (`origin > 0` on the
/// low side, `has_high_neighbor` on the high side); weights on a band of
/// width `band` step by `1 / (band + 1)` so they never reach zero inside
/// the rect.
fn axis_weights(origin: usize, len: usize, has_high_neighbor: bool, band: usize) -> Vec<f32> {
    let mut weights = vec![1.0f32; len];
    if band == 0 || len == 0 {
        return weights;
    }
    let step = 1.0 / (band + 1) as f32;
    if origin > 0 {
        for (i, w) in weights.iter_mut().take(band.min(len)).enumerate() {
            *w = w.min((i + 1) as f32 * step);
        }
    }
    if has_high_neighbor {
        for i in 0..band.min(len) {
            let idx = len - 1 - i;
            weights[idx] = weights[idx].min((i + 1) as f32 * step);
        }
    }
    weights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Mask;
    use crate::tiles::schedule;

    fn patterned(w: usize, h: usize, ch: usize) -> ImageBuf {
        let mut img = ImageBuf::new(w, h, ch);
        for (i, v) in img.data.iter_mut().enumerate() {
            *v = ((i * 31 + 7) % 256) as u8;
        }
        img
    }

    #[test]
    fn all_pass_through_reproduces_the_source_exactly() {
        let src = patterned(97, 61, 3);
        let mask = Mask::new(97, 61);
        let tiles = schedule(97, 61, 3, 2, 9, &mask);
        let outputs: Vec<TileOutput> = tiles
            .into_iter()
            .map(|tile| TileOutput { tile, pixels: None })
            .collect();
        let out = compose(&src, &outputs);
        assert_eq!(out.data, src.data);
    }

    #[test]
    fn filled_tiles_reproduce_their_own_pixels_exactly() {
        // identical content supplied through the "filled" path must also
        // round-trip: blending equal values is the identity
        let src = patterned(64, 64, 3);
        let mask = Mask::new(64, 64);
        let tiles = schedule(64, 64, 2, 2, 8, &mask);
        let outputs: Vec<TileOutput> = tiles
            .into_iter()
            .map(|tile| TileOutput {
                pixels: Some(src.crop(&tile.outer)),
                tile,
            })
            .collect();
        let out = compose(&src, &outputs);
        assert_eq!(out.data, src.data);
    }

    #[test]
    fn overlap_blend_is_monotone_between_two_flat_tiles() {
        let src = ImageBuf::new(64, 32, 1);
        let mask = Mask::new(64, 32);
        let tiles = schedule(64, 32, 2, 1, 8, &mask);

        let outputs: Vec<TileOutput> = tiles
            .into_iter()
            .enumerate()
            .map(|(i, tile)| {
                let mut filled = ImageBuf::new(tile.outer.w, tile.outer.h, 1);
                filled.data.fill(if i == 0 { 0 } else { 200 });
                TileOutput {
                    tile,
                    pixels: Some(filled),
                }
            })
            .collect();
        let out = compose(&src, &outputs);

        // values ramp from 0 to 200 across the shared band, monotonically,
        // with no step larger than one ramp increment
        let y = 16;
        let mut prev = out.pixel(0, y)[0];
        for x in 1..64 {
            let v = out.pixel(x, y)[0];
            assert!(v >= prev, "blend not monotone at x={x}");
            assert!(
                (v as i32 - prev as i32) <= 200 / 8,
                "blend jump too large at x={x}"
            );
            prev = v;
        }
        assert_eq!(out.pixel(0, y)[0], 0);
        assert_eq!(out.pixel(63, y)[0], 200);
    }

    #[test]
    fn uncovered_pixels_fall_back_to_the_source() {
        let src = patterned(32, 32, 3);
        let mask = Mask::new(32, 32);
        let tiles = schedule(32, 32, 2, 2, 4, &mask);
        // drop one tile, as a cancelled partial run would
        let outputs: Vec<TileOutput> = tiles
            .into_iter()
            .take(3)
            .map(|tile| TileOutput { tile, pixels: None })
            .collect();
        let out = compose(&src, &outputs);
        assert_eq!(out.data, src.data);
    }
}
