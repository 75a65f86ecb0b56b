//! Illumination-normalized Otsu binarization.
//!
//! A heavy Gaussian blur estimates the page background, dividing by it
//! flattens uneven lighting, and a single Otsu threshold over the flattened
//! image separates ink from paper.

use image::{GrayImage, ImageBuffer, Luma, RgbImage};
use imageproc::filter::separable_filter_equal;

/// Sigma of the background-estimating blur, in pixels
pub const BACKGROUND_SIGMA: f32 = 50.0;

/// Gaussian support in sigmas on each side of the centre tap
const KERNEL_EXTENT: f32 = 3.0;

/// Background estimate kept at full float precision
pub type BackgroundImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Weights applied to channels 0, 1 and 2.
///
/// Channel 0 is weighted as blue even though the dewarped buffer is in RGB
/// order.
const GRAY_WEIGHTS: [f32; 3] = [0.114, 0.587, 0.299];

/// Run the full binarization on a dewarped color image
pub fn apply(image: &RgbImage) -> GrayImage {
    let gray = to_gray(image);
    let background = estimate_background(&gray);
    let flat = flatten_illumination(&gray, &background);
    let level = otsu_threshold(&flat);
    tracing::debug!("Otsu threshold on flattened image: {}", level);
    threshold(&flat, level)
}

/// Convert to single channel gray using the channel-0-as-blue convention
pub fn to_gray(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let p = image.get_pixel(x, y).0;
        let value = GRAY_WEIGHTS[0] * p[0] as f32
            + GRAY_WEIGHTS[1] * p[1] as f32
            + GRAY_WEIGHTS[2] * p[2] as f32;
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}

/// Slowly varying background illumination.
///
/// Blurs a float copy of `gray` so neither pass quantizes to 8-bit. The
/// kernel reaches 3 sigma on each side; borders repeat the edge pixel.
pub fn estimate_background(gray: &GrayImage) -> BackgroundImage {
    let unit: BackgroundImage =
        ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
            Luma([gray.get_pixel(x, y).0[0] as f32])
        });
    separable_filter_equal(&unit, &gaussian_kernel(BACKGROUND_SIGMA))
}

/// Normalized 1-D Gaussian with radius `round(3 * sigma)`
fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (KERNEL_EXTENT * sigma).round().max(1.0) as i32;
    let denom = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (-radius..=radius)
        .map(|i| (-((i * i) as f32) / denom).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    kernel.iter_mut().for_each(|k| *k /= sum);
    kernel
}

/// `gray / background * 255`, rounded once and clipped to 8-bit.
///
/// A zero background (fully black region) is clamped to 1 before dividing.
pub fn flatten_illumination(gray: &GrayImage, background: &BackgroundImage) -> GrayImage {
    let mut clamped = 0usize;
    let flat = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let g = gray.get_pixel(x, y).0[0] as f32;
        let mut bg = background.get_pixel(x, y).0[0];
        if bg < 1.0 {
            clamped += 1;
            bg = 1.0;
        }
        Luma([(g / bg * 255.0).round().clamp(0.0, 255.0) as u8])
    });

    if clamped > 0 {
        tracing::debug!(
            "Clamped {} zero background pixels while flattening illumination",
            clamped
        );
    }

    flat
}

/// Otsu's threshold: the level maximizing between-class variance.
///
/// Pixels at or below the returned level form the dark class. An image with a
/// single gray level yields 0.
pub fn otsu_threshold(gray: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total = gray.width() as u64 * gray.height() as u64;
    if total == 0 {
        return 0;
    }

    let sum_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(level, &count)| level as f64 * count as f64)
        .sum();

    let mut sum_dark = 0.0f64;
    let mut weight_dark = 0u64;
    let mut best_variance = 0.0f64;
    let mut best_level = 0u8;

    for (level, &count) in histogram.iter().enumerate() {
        weight_dark += count;
        if weight_dark == 0 {
            continue;
        }
        let weight_light = total - weight_dark;
        if weight_light == 0 {
            break;
        }

        sum_dark += level as f64 * count as f64;
        let mean_dark = sum_dark / weight_dark as f64;
        let mean_light = (sum_total - sum_dark) / weight_light as f64;

        let variance =
            weight_dark as f64 * weight_light as f64 * (mean_dark - mean_light).powi(2);
        if variance > best_variance {
            best_variance = variance;
            best_level = level as u8;
        }
    }

    best_level
}

/// Map pixels above `level` to 255 and the rest to 0
pub fn threshold(gray: &GrayImage, level: u8) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y).0[0] > level {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}
