//! Page rectification: dewarp a photographed page and binarize it for OCR.
//!
//! The predictors run on a fixed 288x288 tile; every other stage works at the
//! photograph's own resolution.

pub mod pipeline;
pub mod stages;

pub use pipeline::{Rectifier, RectifyOutput, StepTiming};
