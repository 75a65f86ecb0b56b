use thiserror::Error;

#[derive(Error, Debug)]
pub enum RectifyError {
    #[error("Failed to load image: {0}")]
    ImageLoad(String),

    #[error("Unexpected {stage} output shape: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        stage: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Failed to load parameters: {0}")]
    ParameterLoad(String),

    #[error("Failed to initialize predictor: {0}")]
    Initialization(String),

    #[error("Prediction failed: {0}")]
    Prediction(String),

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RectifyError {
    pub fn shape_mismatch(stage: &'static str, expected: &[usize], actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            stage,
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}

pub type Result<T, E = RectifyError> = std::result::Result<T, E>;
