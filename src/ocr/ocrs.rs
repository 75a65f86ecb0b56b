//! OCRS engine implementation
//!
//! Pure Rust OCR engine using the ocrs library. Downloads its detection and
//! recognition models on first use.

use super::{OcrEngine, OcrResult};
use crate::error::RectifyError;
use image::buffer::ConvertBuffer;
use image::{GrayImage, RgbImage};
use ocrs::{DecodeMethod, ImageSource, OcrEngine as OcrsOcrEngine, OcrEngineParams};
use rten::Model;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Default model URLs from the ocrs project
const DETECTION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-detection.rten";
const RECOGNITION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-recognition.rten";

const CACHE_DIR_NAME: &str = "docrectify";

/// OCR engine wrapping the ocrs library
pub struct OcrsEngine {
    engine: OcrsOcrEngine,
}

impl OcrsEngine {
    /// Create the engine, downloading models if needed
    pub fn new() -> Result<Self, RectifyError> {
        tracing::info!("Initializing ocrs OCR engine...");

        let cache_dir = model_cache_dir();
        let detection_model_path =
            ensure_model_downloaded(&cache_dir, DETECTION_MODEL_URL, "text-detection.rten")?;
        let recognition_model_path =
            ensure_model_downloaded(&cache_dir, RECOGNITION_MODEL_URL, "text-recognition.rten")?;

        let detection_model = Model::load_file(&detection_model_path).map_err(|e| {
            RectifyError::Initialization(format!("Failed to load detection model: {}", e))
        })?;
        let recognition_model = Model::load_file(&recognition_model_path).map_err(|e| {
            RectifyError::Initialization(format!("Failed to load recognition model: {}", e))
        })?;

        let engine = OcrsOcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            decode_method: DecodeMethod::Greedy,
            ..Default::default()
        })
        .map_err(|e| {
            RectifyError::Initialization(format!("Failed to create OCR engine: {}", e))
        })?;

        tracing::info!("ocrs engine initialized successfully");

        Ok(Self { engine })
    }
}

impl OcrEngine for OcrsEngine {
    fn name(&self) -> &'static str {
        "ocrs"
    }

    fn recognize(&self, image: &GrayImage) -> Result<OcrResult, RectifyError> {
        // ImageSource::from_bytes expects interleaved HWC data
        let rgb: RgbImage = image.convert();
        let dimensions = rgb.dimensions();

        let img_source = ImageSource::from_bytes(rgb.as_raw(), dimensions)
            .map_err(|e| RectifyError::Ocr(format!("Failed to create image source: {}", e)))?;

        let ocr_input = self
            .engine
            .prepare_input(img_source)
            .map_err(|e| RectifyError::Ocr(format!("Failed to prepare input: {}", e)))?;

        let word_rects = self
            .engine
            .detect_words(&ocr_input)
            .map_err(|e| RectifyError::Ocr(format!("Failed to detect words: {}", e)))?;

        let line_rects = self.engine.find_text_lines(&ocr_input, &word_rects);

        let line_texts = self
            .engine
            .recognize_text(&ocr_input, &line_rects)
            .map_err(|e| RectifyError::Ocr(format!("Failed to recognize text: {}", e)))?;

        let text = line_texts
            .iter()
            .filter_map(|line| line.as_ref())
            .map(|line| {
                line.words()
                    .map(|word| word.to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n");

        tracing::debug!("ocrs recognized {} lines", line_rects.len());

        Ok(OcrResult { text })
    }
}

/// Per-user directory holding downloaded models
fn model_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(CACHE_DIR_NAME)
}

/// Ensure model is downloaded into `cache_dir` and return its path
fn ensure_model_downloaded(
    cache_dir: &Path,
    url: &str,
    filename: &str,
) -> Result<PathBuf, RectifyError> {
    std::fs::create_dir_all(cache_dir).map_err(|e| {
        RectifyError::Initialization(format!("Failed to create cache directory: {}", e))
    })?;

    let model_path = cache_dir.join(filename);

    if !model_path.exists() {
        tracing::info!("Downloading {} (this may take a moment)...", filename);
        download_file(url, &model_path)?;
        tracing::info!("Downloaded {} to {:?}", filename, model_path);
    } else {
        tracing::info!("Using cached model from {:?}", model_path);
    }

    Ok(model_path)
}

/// Download a file from URL to path using ureq
fn download_file(url: &str, path: &Path) -> Result<(), RectifyError> {
    let response = ureq::get(url).call().map_err(|e| {
        RectifyError::Initialization(format!("Failed to download model: {}", e))
    })?;

    let buffer = response.into_body().read_to_vec().map_err(|e| {
        RectifyError::Initialization(format!("Failed to read response body: {}", e))
    })?;

    // Renamed into place once complete
    let partial = path.with_extension("part");
    let mut file = File::create(&partial).map_err(|e| {
        RectifyError::Initialization(format!("Failed to create model file: {}", e))
    })?;
    file.write_all(&buffer).map_err(|e| {
        RectifyError::Initialization(format!("Failed to write model file: {}", e))
    })?;
    std::fs::rename(&partial, path)?;

    Ok(())
}
