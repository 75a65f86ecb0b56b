use crate::error::RectifyError;
use crate::predictor::MASK_SHAPE;
use crate::types::{MaskedTile, NormalizedTile, SegmentationMask};
use ndarray::{Array4, Axis};

/// Probability above which a tile pixel counts as page foreground
pub const MASK_THRESHOLD: f32 = 0.5;

/// Threshold raw mask-predictor output into a binary mask
pub fn binarize_prediction(prediction: Array4<f32>) -> Result<SegmentationMask, RectifyError> {
    if prediction.shape() != &MASK_SHAPE[..] {
        return Err(RectifyError::shape_mismatch(
            "mask predictor",
            &MASK_SHAPE,
            prediction.shape(),
        ));
    }
    let binary = prediction.mapv_into(|p| if p > MASK_THRESHOLD { 1.0 } else { 0.0 });
    Ok(SegmentationMask::from_binary(binary))
}

/// Zero out every tile pixel outside the mask, on all three channels
pub fn apply(tile: &NormalizedTile, mask: &SegmentationMask) -> MaskedTile {
    let plane = mask.view().index_axis_move(Axis(1), 0);
    let mut masked = tile.view().to_owned();
    for mut channel in masked.axis_iter_mut(Axis(1)) {
        channel *= &plane;
    }
    MaskedTile::from_masked(masked)
}
