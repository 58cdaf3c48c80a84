//! Glyph bitmap effects applied before a glyph is packed into the atlas
//!
//! Both operate in place on a single-channel bitmap with `stride` bytes per
//! row. Callers pad the bitmap so the effects have room to spread.

/// Fixed-point precision of the blur coefficient
const APREC: i32 = 16;
/// Fixed-point precision of the accumulator
const ZPREC: i32 = 7;

/// Approximate gaussian blur of radius `blur` pixels.
///
/// Two passes of a recursive exponential filter, each run forward and
/// backward along rows then columns. Border pixels are forced to zero.
pub fn blur(pixels: &mut [u8], width: usize, height: usize, stride: usize, blur: u32) {
    if blur < 1 || width < 2 || height < 2 {
        return;
    }
    // Sigma of a box blur of the same radius
    let sigma = blur as f32 * 0.57735;
    let alpha = ((1 << APREC) as f32 * (1.0 - (-2.3 / (sigma + 1.0)).exp())) as i32;

    for _ in 0..2 {
        blur_vertical(pixels, width, height, stride, alpha);
        blur_horizontal(pixels, width, height, stride, alpha);
    }
}

fn blur_horizontal(pixels: &mut [u8], width: usize, height: usize, stride: usize, alpha: i32) {
    for y in 0..height {
        let row = &mut pixels[y * stride..y * stride + width];
        let mut z = 0i32;
        for x in 1..width {
            z += (alpha * (((row[x] as i32) << ZPREC) - z)) >> APREC;
            row[x] = (z >> ZPREC) as u8;
        }
        row[width - 1] = 0;
        z = 0;
        for x in (0..width - 1).rev() {
            z += (alpha * (((row[x] as i32) << ZPREC) - z)) >> APREC;
            row[x] = (z >> ZPREC) as u8;
        }
        row[0] = 0;
    }
}

fn blur_vertical(pixels: &mut [u8], width: usize, height: usize, stride: usize, alpha: i32) {
    for x in 0..width {
        let mut z = 0i32;
        for y in 1..height {
            let i = y * stride + x;
            z += (alpha * (((pixels[i] as i32) << ZPREC) - z)) >> APREC;
            pixels[i] = (z >> ZPREC) as u8;
        }
        pixels[(height - 1) * stride + x] = 0;
        z = 0;
        for y in (0..height - 1).rev() {
            let i = y * stride + x;
            z += (alpha * (((pixels[i] as i32) << ZPREC) - z)) >> APREC;
            pixels[i] = (z >> ZPREC) as u8;
        }
        pixels[x] = 0;
    }
}

/// Grow coverage outward by `radius` pixels (square max filter).
///
/// `scratch` is reused between calls to avoid allocating per glyph.
pub fn dilate(
    pixels: &mut [u8],
    width: usize,
    height: usize,
    stride: usize,
    radius: u32,
    scratch: &mut Vec<u8>,
) {
    if radius == 0 || width == 0 || height == 0 {
        return;
    }
    let r = radius as usize;
    scratch.clear();
    scratch.resize(width * height, 0);

    // Horizontal pass into scratch
    for y in 0..height {
        let row = &pixels[y * stride..y * stride + width];
        for x in 0..width {
            let lo = x.saturating_sub(r);
            let hi = (x + r).min(width - 1);
            scratch[y * width + x] = row[lo..=hi].iter().copied().max().unwrap_or(0);
        }
    }

    // Vertical pass back into pixels
    for x in 0..width {
        for y in 0..height {
            let lo = y.saturating_sub(r);
            let hi = (y + r).min(height - 1);
            pixels[y * stride + x] = (lo..=hi).map(|yy| scratch[yy * width + x]).max().unwrap_or(0);
        }
    }
}
