use crate::error::RectifyError;
use crate::predictor::{BackwardMapPredictor, MaskPredictor};
use crate::types::{RawField, RawImage};
use image::{DynamicImage, GrayImage};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use super::stages;

/// Timing information for a single rectification stage
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// Result of rectification including timing stats
#[derive(Debug, Clone, Serialize)]
pub struct RectifyOutput {
    /// Binarized page (not serialized)
    #[serde(skip)]
    pub image: GrayImage,
    /// Share of the tile the mask predictor kept as page
    pub mask_coverage: f32,
    /// Total rectification time in milliseconds
    pub total_time_ms: u64,
    /// Individual stage timings
    pub steps: Vec<StepTiming>,
}

/// Dewarps and binarizes document photographs.
///
/// Holds the two predictors read-only, so a single instance can be shared
/// across threads behind an `Arc` and used for any number of images.
pub struct Rectifier {
    mask: Arc<dyn MaskPredictor>,
    backward_map: Arc<dyn BackwardMapPredictor>,
}

impl Rectifier {
    pub fn new(mask: Arc<dyn MaskPredictor>, backward_map: Arc<dyn BackwardMapPredictor>) -> Self {
        Self { mask, backward_map }
    }

    /// Identifiers of the mask and backward-map predictors
    pub fn predictor_names(&self) -> (&'static str, &'static str) {
        (self.mask.name(), self.backward_map.name())
    }

    /// Rectify the image stored at `path`
    pub fn rectify(&self, path: &Path) -> Result<GrayImage, RectifyError> {
        Ok(self.rectify_path(path)?.image)
    }

    /// Rectify the image stored at `path`, keeping stage timings
    pub fn rectify_path(&self, path: &Path) -> Result<RectifyOutput, RectifyError> {
        let start = Instant::now();
        let raw = stages::normalize::load(path)?;
        let load_ms = start.elapsed().as_millis() as u64;

        let mut output = self.run(&raw)?;
        output.steps.insert(
            0,
            StepTiming {
                name: "load".to_string(),
                time_ms: load_ms,
            },
        );
        output.total_time_ms = start.elapsed().as_millis() as u64;
        Ok(output)
    }

    /// Rectify an already decoded image
    pub fn rectify_image(&self, image: DynamicImage) -> Result<GrayImage, RectifyError> {
        let raw = stages::normalize::from_dynamic(image)?;
        Ok(self.run(&raw)?.image)
    }

    /// Run every stage on a decoded source image
    pub fn run(&self, raw: &RawImage) -> Result<RectifyOutput, RectifyError> {
        let start = Instant::now();
        let mut timings = Vec::new();
        let (width, height) = (raw.width() as usize, raw.height() as usize);

        let tile = self.run_step("normalize", &mut timings, || stages::normalize::apply(raw))?;

        let mask = self.run_step("mask", &mut timings, || {
            let prediction = self.mask.predict(tile.view())?;
            stages::mask::binarize_prediction(prediction)
        })?;
        let masked = stages::mask::apply(&tile, &mask);

        let raw_field = self.run_step("backward_map", &mut timings, || {
            RawField::new(self.backward_map.predict(masked.view())?)
        })?;

        let field = self.run_step("field", &mut timings, || {
            let normalized = stages::field::normalize(&raw_field);
            Ok(stages::field::upsample(&normalized, width, height))
        })?;

        let dewarped = self.run_step("resample", &mut timings, || {
            stages::resample::apply(raw, &field)
        })?;

        let binary = self.run_step("binarize", &mut timings, || {
            Ok(stages::binarize::apply(&dewarped))
        })?;

        Ok(RectifyOutput {
            image: binary,
            mask_coverage: mask.coverage(),
            total_time_ms: start.elapsed().as_millis() as u64,
            steps: timings,
        })
    }

    fn run_step<T, F>(
        &self,
        name: &str,
        timings: &mut Vec<StepTiming>,
        step_fn: F,
    ) -> Result<T, RectifyError>
    where
        F: FnOnce() -> Result<T, RectifyError>,
    {
        let step_start = Instant::now();
        let result = step_fn()?;
        let time_ms = step_start.elapsed().as_millis() as u64;
        tracing::debug!("Stage {} finished in {}ms", name, time_ms);
        timings.push(StepTiming {
            name: name.to_string(),
            time_ms,
        });
        Ok(result)
    }
}
