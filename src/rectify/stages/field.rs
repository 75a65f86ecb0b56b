//! Turns the predictor's tile-resolution coordinates into a full resolution
//! sampling field.

use crate::types::{FullResField, NormalizedField, RawField};
use ndarray::{Array2, Array3, ArrayView2, Axis};

/// Coordinate range of the backward-map predictor's output
pub const FIELD_COORDINATE_SCALE: f32 = 286.8;

/// Keeps normalized coordinates off the exact [-1,1] boundary
pub const BOUNDARY_MARGIN: f32 = 0.99;

/// Map raw tile coordinates into the [-0.99, 0.99] sampling convention
pub fn normalize(raw: &RawField) -> NormalizedField {
    let data = raw
        .view()
        .index_axis_move(Axis(0), 0)
        .mapv(|v| (2.0 * (v / FIELD_COORDINATE_SCALE) - 1.0) * BOUNDARY_MARGIN);
    NormalizedField::from_channels(data)
}

/// Upsample each channel to `width` x `height` and smooth it with a 3x3 mean
pub fn upsample(field: &NormalizedField, width: usize, height: usize) -> FullResField {
    let view = field.view();
    let mut out = Array3::zeros((2, height, width));
    for (c, channel) in view.axis_iter(Axis(0)).enumerate() {
        let resized = resize_bilinear(channel, width, height);
        out.index_axis_mut(Axis(0), c).assign(&box_blur3(resized.view()));
    }
    NormalizedField::from_channels(out)
}

/// Bilinear resize with half-pixel centres, clamping samples to the edge
pub fn resize_bilinear(src: ArrayView2<'_, f32>, width: usize, height: usize) -> Array2<f32> {
    let (src_h, src_w) = src.dim();
    if src_h == 0 || src_w == 0 {
        return Array2::zeros((height, width));
    }

    let xs: Vec<(usize, usize, f32)> = (0..width).map(|x| taps(x, src_w, width)).collect();
    let ys: Vec<(usize, usize, f32)> = (0..height).map(|y| taps(y, src_h, height)).collect();

    Array2::from_shape_fn((height, width), |(y, x)| {
        let (y0, y1, fy) = ys[y];
        let (x0, x1, fx) = xs[x];
        let top = src[[y0, x0]] * (1.0 - fx) + src[[y0, x1]] * fx;
        let bottom = src[[y1, x0]] * (1.0 - fx) + src[[y1, x1]] * fx;
        top * (1.0 - fy) + bottom * fy
    })
}

/// Source taps and weight of the second tap for output index `i`
fn taps(i: usize, src_len: usize, dst_len: usize) -> (usize, usize, f32) {
    let scale = src_len as f32 / dst_len as f32;
    let pos = ((i as f32 + 0.5) * scale - 0.5).max(0.0);
    let i0 = (pos.floor() as usize).min(src_len - 1);
    let i1 = (i0 + 1).min(src_len - 1);
    let frac = if i1 == i0 { 0.0 } else { pos - i0 as f32 };
    (i0, i1, frac)
}

/// 3x3 mean filter with reflect-101 borders
pub fn box_blur3(src: ArrayView2<'_, f32>) -> Array2<f32> {
    let (h, w) = src.dim();
    Array2::from_shape_fn((h, w), |(y, x)| {
        let mut sum = 0.0;
        for dy in -1..=1isize {
            let yy = reflect101(y as isize + dy, h);
            for dx in -1..=1isize {
                sum += src[[yy, reflect101(x as isize + dx, w)]];
            }
        }
        sum / 9.0
    })
}

/// Mirror an index into `0..len` without repeating the edge sample
fn reflect101(i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let last = len as isize - 1;
    let mut i = i;
    while i < 0 || i > last {
        i = if i < 0 { -i } else { 2 * last - i };
    }
    i as usize
}
