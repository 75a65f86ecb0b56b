//! Data handed from one rectification stage to the next.
//!
//! Every spatial entity carries its resolution: tiles and fields wrap shaped
//! `ndarray` arrays whose shape is checked on construction, images wrap
//! `image` buffers.

use crate::error::RectifyError;
use crate::predictor::{FIELD_SHAPE, MASK_SHAPE, TILE_SHAPE};
use image::{Rgb32FImage, RgbImage};
use ndarray::{Array3, Array4, ArrayView3, ArrayView4};

/// Decoded source photograph, kept both as 8-bit and as [0,1] float.
///
/// The float copy feeds the predictors, the 8-bit copy is what the final
/// warp samples from.
#[derive(Debug, Clone)]
pub struct RawImage {
    rgb: RgbImage,
    unit: Rgb32FImage,
}

impl RawImage {
    pub fn new(rgb: RgbImage) -> Self {
        let unit = Rgb32FImage::from_fn(rgb.width(), rgb.height(), |x, y| {
            let p = rgb.get_pixel(x, y).0;
            image::Rgb([
                p[0] as f32 / 255.0,
                p[1] as f32 / 255.0,
                p[2] as f32 / 255.0,
            ])
        });
        Self { rgb, unit }
    }

    pub fn width(&self) -> u32 {
        self.rgb.width()
    }

    pub fn height(&self) -> u32 {
        self.rgb.height()
    }

    pub fn rgb(&self) -> &RgbImage {
        &self.rgb
    }

    pub fn unit(&self) -> &Rgb32FImage {
        &self.unit
    }
}

fn check_shape(
    stage: &'static str,
    expected: &[usize],
    actual: &[usize],
) -> Result<(), RectifyError> {
    if expected != actual {
        return Err(RectifyError::shape_mismatch(stage, expected, actual));
    }
    Ok(())
}

/// Resized source in 1x3x288x288 channel-first layout, values in [0,1]
#[derive(Debug, Clone)]
pub struct NormalizedTile(Array4<f32>);

impl NormalizedTile {
    pub fn new(data: Array4<f32>) -> Result<Self, RectifyError> {
        check_shape("normalizer", &TILE_SHAPE, data.shape())?;
        Ok(Self(data))
    }

    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.0.view()
    }
}

/// Binary foreground mask, 1x1x288x288 with values in {0,1}
#[derive(Debug, Clone)]
pub struct SegmentationMask(Array4<f32>);

impl SegmentationMask {
    pub(crate) fn from_binary(data: Array4<f32>) -> Self {
        debug_assert_eq!(data.shape(), &MASK_SHAPE);
        Self(data)
    }

    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.0.view()
    }

    /// Fraction of tile pixels kept as foreground.
    pub fn coverage(&self) -> f32 {
        self.0.sum() / self.0.len() as f32
    }
}

/// Normalized tile with the background zeroed out
#[derive(Debug, Clone)]
pub struct MaskedTile(Array4<f32>);

impl MaskedTile {
    pub(crate) fn from_masked(data: Array4<f32>) -> Self {
        debug_assert_eq!(data.shape(), &TILE_SHAPE);
        Self(data)
    }

    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.0.view()
    }
}

/// Backward-map predictor output, 1x2x288x288 in tile coordinates
#[derive(Debug, Clone)]
pub struct RawField(Array4<f32>);

impl RawField {
    pub fn new(data: Array4<f32>) -> Result<Self, RectifyError> {
        check_shape("backward-map predictor", &FIELD_SHAPE, data.shape())?;
        Ok(Self(data))
    }

    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.0.view()
    }
}

/// Two-channel coordinate field in the [-1,1] sampling convention.
///
/// Channel 0 holds horizontal, channel 1 vertical coordinates. Used both at
/// tile resolution and, once upsampled, at the source resolution.
#[derive(Debug, Clone)]
pub struct NormalizedField(Array3<f32>);

impl NormalizedField {
    pub fn new(data: Array3<f32>) -> Result<Self, RectifyError> {
        if data.shape()[0] != 2 {
            return Err(RectifyError::shape_mismatch(
                "field",
                &[2, data.shape()[1], data.shape()[2]],
                data.shape(),
            ));
        }
        Ok(Self(data))
    }

    pub(crate) fn from_channels(data: Array3<f32>) -> Self {
        debug_assert_eq!(data.shape()[0], 2);
        Self(data)
    }

    /// Field that samples every output pixel from the same source pixel.
    pub fn identity(width: usize, height: usize) -> Self {
        let coord = |i: usize, n: usize| {
            if n > 1 {
                2.0 * i as f32 / (n - 1) as f32 - 1.0
            } else {
                0.0
            }
        };
        Self(Array3::from_shape_fn((2, height, width), |(c, y, x)| {
            if c == 0 {
                coord(x, width)
            } else {
                coord(y, height)
            }
        }))
    }

    pub fn width(&self) -> usize {
        self.0.shape()[2]
    }

    pub fn height(&self) -> usize {
        self.0.shape()[1]
    }

    pub fn view(&self) -> ArrayView3<'_, f32> {
        self.0.view()
    }
}

/// Normalized field resampled to the source image's H x W
pub type FullResField = NormalizedField;
