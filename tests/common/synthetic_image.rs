use unmosaic::image::{ImageBuf, Mask};
use unmosaic::types::Rect;

/// Deterministic per-pixel hash in [0, 1), used as texture noise.
fn hash01(x: usize, y: usize, seed: u32) -> f32 {
    let mut v = (x as u32)
        .wrapping_mul(0x9E37_79B9)
        .wrapping_add((y as u32).wrapping_mul(0x85EB_CA6B))
        .wrapping_add(seed.wrapping_mul(0xC2B2_AE35));
    v ^= v >> 15;
    v = v.wrapping_mul(0x2C1B_3C6D);
    v ^= v >> 12;
    v = v.wrapping_mul(0x2975_73A5);
    v ^= v >> 16;
    (v & 0xFFFF) as f32 / 65536.0
}

/// Textured RGB image: smooth shading plus dense noise, so no natural block
/// looks mosaic-flat.
pub fn textured_image(width: usize, height: usize, seed: u32) -> ImageBuf {
    assert!(width > 0 && height > 0, "image dimensions must be positive");
    let mut img = ImageBuf::new(width, height, 3);
    for y in 0..height {
        for x in 0..width {
            let shade = 0.4
                + 0.15 * ((x as f32 * 0.05).sin() * 0.5 + 0.5)
                + 0.1 * ((y as f32 * 0.08).cos() * 0.5 + 0.5);
            let px = img.pixel_mut(x, y);
            for (c, v) in px.iter_mut().enumerate() {
                let noise = hash01(x, y, seed.wrapping_add(c as u32)) - 0.5;
                *v = ((shade + 0.7 * noise) * 255.0).clamp(0.0, 255.0) as u8;
            }
        }
    }
    img
}

/// Pixelate `rect` in place with `cell` × `cell` uniform blocks, the way
/// mosaic censorship is produced: each cell becomes its own mean color.
pub fn apply_mosaic(img: &mut ImageBuf, rect: Rect, cell: usize) {
    assert!(cell > 0, "cell size must be positive");
    let mut cy = rect.y;
    while cy < rect.bottom().min(img.h) {
        let ch_end = (cy + cell).min(rect.bottom()).min(img.h);
        let mut cx = rect.x;
        while cx < rect.right().min(img.w) {
            let cw_end = (cx + cell).min(rect.right()).min(img.w);

            let mut mean = [0.0f32; 4];
            let count = ((ch_end - cy) * (cw_end - cx)) as f32;
            for y in cy..ch_end {
                for x in cx..cw_end {
                    for (c, m) in mean.iter_mut().take(img.channels).enumerate() {
                        *m += img.pixel(x, y)[c] as f32;
                    }
                }
            }
            for y in cy..ch_end {
                for x in cx..cw_end {
                    let px = img.pixel_mut(x, y);
                    for (c, v) in px.iter_mut().enumerate() {
                        *v = (mean[c] / count).round() as u8;
                    }
                }
            }
            cx = cw_end;
        }
        cy = ch_end;
    }
}

/// A mask with a single filled rectangle.
pub fn rect_mask(width: usize, height: usize, rect: Rect) -> Mask {
    let mut mask = Mask::new(width, height);
    mask.fill_rect(&rect);
    mask
}
