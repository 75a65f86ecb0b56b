use crate::error::RectifyError;
use ndarray::{Array4, ArrayView4};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Side length of the square tile both predictors operate on.
pub const TILE_SIZE: usize = 288;

/// Refinement iterations the backward-map predictor runs per call.
pub const REFINEMENT_ITERATIONS: usize = 12;

/// Shape of the tile fed to either predictor.
pub const TILE_SHAPE: [usize; 4] = [1, 3, TILE_SIZE, TILE_SIZE];
/// Shape the mask predictor must return.
pub const MASK_SHAPE: [usize; 4] = [1, 1, TILE_SIZE, TILE_SIZE];
/// Shape the backward-map predictor must return.
pub const FIELD_SHAPE: [usize; 4] = [1, 2, TILE_SIZE, TILE_SIZE];

/// Foreground predictor: per-pixel probability that a tile pixel belongs to the page
pub trait MaskPredictor: Send + Sync {
    /// Returns the predictor identifier (e.g., "rten")
    fn name(&self) -> &'static str;

    /// Run on a 1x3x288x288 tile in [0,1], returning 1x1x288x288 probabilities
    fn predict(&self, tile: ArrayView4<'_, f32>) -> Result<Array4<f32>, RectifyError>;
}

/// Backward-mapping predictor: source coordinates for every tile pixel
pub trait BackwardMapPredictor: Send + Sync {
    /// Returns the predictor identifier (e.g., "rten")
    fn name(&self) -> &'static str;

    /// Run on a masked 1x3x288x288 tile, returning a 1x2x288x288 field whose
    /// channels hold horizontal and vertical coordinates in [0, 286.8]
    fn predict(&self, tile: ArrayView4<'_, f32>) -> Result<Array4<f32>, RectifyError>;
}

/// Execution target for the predictors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    #[default]
    Cpu,
    Cuda(u32),
}

impl FromStr for Device {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "cpu" => Ok(Self::Cpu),
            "cuda" => Ok(Self::Cuda(0)),
            other => other
                .strip_prefix("cuda:")
                .and_then(|ordinal| ordinal.parse().ok())
                .map(Self::Cuda)
                .ok_or_else(|| format!("unknown device '{}' (expected cpu, cuda or cuda:N)", s)),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda(ordinal) => write!(f, "cuda:{}", ordinal),
        }
    }
}

/// Where the predictor weights live and what they execute on
#[derive(Debug, Clone)]
pub struct PredictorConfig {
    pub mask_model: PathBuf,
    pub backward_map_model: PathBuf,
    pub device: Device,
}
