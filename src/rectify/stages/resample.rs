use crate::error::RectifyError;
use crate::types::{FullResField, RawImage};
use image::{Rgb, RgbImage};

/// Warp the 8-bit source through a backward-mapping field.
///
/// Every output pixel reads its (u,v) from the field and samples the source
/// at `((u+1)/2 * (W-1), (v+1)/2 * (H-1))`, so -1 and +1 land exactly on the
/// first and last pixel centres. Taps of the bilinear kernel that fall
/// outside the source contribute zero.
pub fn apply(raw: &RawImage, field: &FullResField) -> Result<RgbImage, RectifyError> {
    let (width, height) = (raw.width() as usize, raw.height() as usize);
    if field.width() != width || field.height() != height {
        return Err(RectifyError::shape_mismatch(
            "field upsampler",
            &[2, height, width],
            &[2, field.height(), field.width()],
        ));
    }

    let src = raw.rgb();
    let coords = field.view();
    let x_scale = (width - 1) as f32 / 2.0;
    let y_scale = (height - 1) as f32 / 2.0;

    Ok(RgbImage::from_fn(width as u32, height as u32, |x, y| {
        let u = coords[[0, y as usize, x as usize]];
        let v = coords[[1, y as usize, x as usize]];
        sample_bilinear(src, (u + 1.0) * x_scale, (v + 1.0) * y_scale)
    }))
}

/// Bilinear sample with zero padding, rounded back to 8-bit.
///
/// Rounds to nearest instead of truncating, so a coordinate that lands a
/// float epsilon off a pixel centre still returns that pixel unchanged.
/// Blended values can therefore sit one level above a truncating warp.
pub fn sample_bilinear(src: &RgbImage, sx: f32, sy: f32) -> Rgb<u8> {
    if !sx.is_finite() || !sy.is_finite() {
        return Rgb([0, 0, 0]);
    }

    let x0 = sx.floor();
    let y0 = sy.floor();
    let fx = sx - x0;
    let fy = sy - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let taps = [
        (x0, y0, (1.0 - fx) * (1.0 - fy)),
        (x0 + 1, y0, fx * (1.0 - fy)),
        (x0, y0 + 1, (1.0 - fx) * fy),
        (x0 + 1, y0 + 1, fx * fy),
    ];

    let (w, h) = (src.width() as i64, src.height() as i64);
    let mut acc = [0.0f32; 3];
    for (tx, ty, weight) in taps {
        if weight == 0.0 || tx < 0 || ty < 0 || tx >= w || ty >= h {
            continue;
        }
        let p = src.get_pixel(tx as u32, ty as u32).0;
        for c in 0..3 {
            acc[c] += weight * p[c] as f32;
        }
    }

    Rgb(acc.map(|v| v.round().clamp(0.0, 255.0) as u8))
}
