use crate::error::RectifyError;
use crate::predictor::TILE_SIZE;
use crate::types::{NormalizedTile, RawImage};
use image::{imageops::FilterType, DynamicImage};
use ndarray::Array4;
use std::path::Path;

/// Decode an image file into a [`RawImage`]
pub fn load(path: &Path) -> Result<RawImage, RectifyError> {
    let image = image::open(path).map_err(|e| {
        RectifyError::ImageLoad(format!("{}: {}", path.display(), e))
    })?;
    from_dynamic(image)
}

/// Wrap an already decoded image, rejecting sources without 3 color channels
pub fn from_dynamic(image: DynamicImage) -> Result<RawImage, RectifyError> {
    let channels = image.color().channel_count();
    // Gray+alpha has two channels but no color information either
    if channels < 3 {
        return Err(RectifyError::ImageLoad(format!(
            "expected at least 3 color channels, got {}",
            channels
        )));
    }
    if image.width() == 0 || image.height() == 0 {
        return Err(RectifyError::ImageLoad("image has no pixels".to_string()));
    }
    Ok(RawImage::new(image.into_rgb8()))
}

/// Resize the [0,1] copy of the source to the predictor tile and reorder it
/// into channel-first layout with a leading batch axis
pub fn apply(raw: &RawImage) -> Result<NormalizedTile, RectifyError> {
    let tile_side = TILE_SIZE as u32;
    let resized = image::imageops::resize(raw.unit(), tile_side, tile_side, FilterType::Triangle);

    let data = Array4::from_shape_fn((1, 3, TILE_SIZE, TILE_SIZE), |(_, c, y, x)| {
        resized.get_pixel(x as u32, y as u32).0[c].clamp(0.0, 1.0)
    });

    NormalizedTile::new(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage, RgbaImage};

    #[test]
    fn test_normalize_produces_channel_first_tile() {
        let img = RgbImage::from_pixel(40, 30, Rgb([255, 0, 51]));
        let raw = from_dynamic(DynamicImage::ImageRgb8(img)).unwrap();

        let tile = apply(&raw).unwrap();
        let view = tile.view();

        assert_eq!(view.shape(), &[1, 3, 288, 288]);
        assert!((view[[0, 0, 100, 100]] - 1.0).abs() < 1e-5);
        assert!(view[[0, 1, 100, 100]].abs() < 1e-5);
        assert!((view[[0, 2, 100, 100]] - 0.2).abs() < 1e-5);
    }

    #[test]
    fn test_normalize_values_stay_in_unit_range() {
        let img = RgbImage::from_fn(17, 23, |x, y| {
            Rgb([(x * 15) as u8, (y * 11) as u8, ((x + y) * 7) as u8])
        });
        let raw = from_dynamic(DynamicImage::ImageRgb8(img)).unwrap();
        let tile = apply(&raw).unwrap();

        assert!(tile.view().iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_grayscale_source_is_rejected() {
        let img = GrayImage::from_pixel(8, 8, Luma([200]));
        let err = from_dynamic(DynamicImage::ImageLuma8(img)).unwrap_err();
        assert!(matches!(err, RectifyError::ImageLoad(_)));
    }

    #[test]
    fn test_rgba_source_drops_alpha() {
        let img = RgbaImage::from_pixel(4, 4, image::Rgba([10, 20, 30, 0]));
        let raw = from_dynamic(DynamicImage::ImageRgba8(img)).unwrap();
        assert_eq!(raw.rgb().get_pixel(0, 0).0, [10, 20, 30]);
    }

    #[test]
    fn test_missing_file_is_image_load_error() {
        let err = load(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, RectifyError::ImageLoad(_)));
    }
}
