//! rten predictor backend
//!
//! Runs exported `.rten` graphs of the mask and backward-map networks on the
//! CPU. The pretrained weights are part of each model file.

use crate::error::RectifyError;
use crate::predictor::{
    BackwardMapPredictor, Device, MaskPredictor, FIELD_SHAPE, MASK_SHAPE, TILE_SHAPE,
};
use ndarray::{Array4, ArrayView4};
use rten::Model;
use rten_tensor::prelude::*;
use rten_tensor::NdTensor;
use std::path::Path;

/// A single-input, single-output rten graph
pub struct RtenPredictor {
    model: Model,
    label: &'static str,
    output_shape: [usize; 4],
}

impl RtenPredictor {
    /// Load a model file, failing on any device other than the CPU
    pub fn load(
        path: &Path,
        device: Device,
        label: &'static str,
        output_shape: [usize; 4],
    ) -> Result<Self, RectifyError> {
        if device != Device::Cpu {
            return Err(RectifyError::Initialization(format!(
                "rten backend runs on cpu only, {} was requested for the {}",
                device, label
            )));
        }

        let model = Model::load_file(path).map_err(|e| {
            RectifyError::ParameterLoad(format!("{} ({}): {}", label, path.display(), e))
        })?;
        tracing::info!("Loaded {} from {:?}", label, path);

        Ok(Self {
            model,
            label,
            output_shape,
        })
    }

    fn run(&self, tile: ArrayView4<'_, f32>) -> Result<Array4<f32>, RectifyError> {
        if tile.shape() != &TILE_SHAPE[..] {
            return Err(RectifyError::shape_mismatch(self.label, &TILE_SHAPE, tile.shape()));
        }

        let input = NdTensor::from_data(TILE_SHAPE, tile.iter().copied().collect::<Vec<f32>>());
        let output: NdTensor<f32, 4> = self
            .model
            .run_one(input.view().into(), None)
            .map_err(|e| RectifyError::Prediction(format!("{}: {}", self.label, e)))?
            .try_into()
            .map_err(|e| RectifyError::Prediction(format!("{} output: {:?}", self.label, e)))?;

        let shape = output.shape();
        if shape != self.output_shape {
            return Err(RectifyError::shape_mismatch(
                self.label,
                &self.output_shape,
                &shape,
            ));
        }

        Array4::from_shape_vec(shape, output.to_vec())
            .map_err(|e| RectifyError::Prediction(format!("{} output: {}", self.label, e)))
    }
}

/// Foreground mask network
pub struct RtenMaskPredictor(RtenPredictor);

impl RtenMaskPredictor {
    pub fn load(path: &Path, device: Device) -> Result<Self, RectifyError> {
        RtenPredictor::load(path, device, "mask predictor", MASK_SHAPE).map(Self)
    }
}

impl MaskPredictor for RtenMaskPredictor {
    fn name(&self) -> &'static str {
        "rten"
    }

    fn predict(&self, tile: ArrayView4<'_, f32>) -> Result<Array4<f32>, RectifyError> {
        self.0.run(tile)
    }
}

/// Backward-map network; the exported graph unrolls its refinement iterations
pub struct RtenBackwardMapPredictor(RtenPredictor);

impl RtenBackwardMapPredictor {
    pub fn load(path: &Path, device: Device) -> Result<Self, RectifyError> {
        RtenPredictor::load(path, device, "backward-map predictor", FIELD_SHAPE).map(Self)
    }
}

impl BackwardMapPredictor for RtenBackwardMapPredictor {
    fn name(&self) -> &'static str {
        "rten"
    }

    fn predict(&self, tile: ArrayView4<'_, f32>) -> Result<Array4<f32>, RectifyError> {
        self.0.run(tile)
    }
}
