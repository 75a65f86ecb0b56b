//! Predictor backend implementations
//!
//! Backends are conditionally compiled based on feature flags.

#[cfg(feature = "backend-rten")]
pub mod rten;

use crate::error::RectifyError;
use crate::predictor::{BackwardMapPredictor, MaskPredictor, PredictorConfig};
use std::sync::Arc;

/// Both predictors, ready to be shared
pub struct Predictors {
    pub mask: Arc<dyn MaskPredictor>,
    pub backward_map: Arc<dyn BackwardMapPredictor>,
}

/// Load both predictors from the configured model files
#[cfg(feature = "backend-rten")]
pub fn load_predictors(config: &PredictorConfig) -> Result<Predictors, RectifyError> {
    tracing::info!("Initializing rten predictors on {}...", config.device);
    let mask = rten::RtenMaskPredictor::load(&config.mask_model, config.device)?;
    let backward_map =
        rten::RtenBackwardMapPredictor::load(&config.backward_map_model, config.device)?;

    Ok(Predictors {
        mask: Arc::new(mask),
        backward_map: Arc::new(backward_map),
    })
}

#[cfg(not(feature = "backend-rten"))]
pub fn load_predictors(_config: &PredictorConfig) -> Result<Predictors, RectifyError> {
    Err(RectifyError::Initialization(
        "No predictor backend available. Build with --features backend-rten".to_string(),
    ))
}
