//! Dewarps and binarizes photographed document pages ahead of OCR.
//!
//! A [`Rectifier`] composes two learned predictors (a page mask and a
//! backward map) with deterministic image stages: tile normalization, mask
//! application, field rescaling, backward-mapping resampling and
//! illumination-flattened Otsu binarization.

pub mod backends;
pub mod error;
pub mod ocr;
pub mod params;
pub mod predictor;
pub mod rectify;
pub mod types;

pub use error::RectifyError;
pub use params::{merge_parameters, MergePolicy, MergeReport, ParameterMap};
pub use predictor::{BackwardMapPredictor, Device, MaskPredictor, PredictorConfig};
pub use rectify::{Rectifier, RectifyOutput, StepTiming};
