//! OCR boundary
//!
//! Engines receive the binarized page; the recognized text is opaque to the
//! rest of the crate.

#[cfg(feature = "engine-ocrs")]
pub mod ocrs;

use crate::error::RectifyError;
use image::GrayImage;

/// OCR processing result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OcrResult {
    pub text: String,
}

/// Trait that all OCR engines must implement
pub trait OcrEngine: Send + Sync {
    /// Returns the engine identifier (e.g., "ocrs")
    fn name(&self) -> &'static str;

    /// Recognize the text on a binarized page
    fn recognize(&self, image: &GrayImage) -> Result<OcrResult, RectifyError>;
}

/// Join per-page texts the way the results file stores them
pub fn join_texts<I, S>(texts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    texts
        .into_iter()
        .map(|text| text.as_ref().trim().to_string())
        .collect::<Vec<_>>()
        .join("\n\n")
}
