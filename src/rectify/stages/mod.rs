//! Individual rectification stages

pub mod binarize;
pub mod field;
pub mod mask;
pub mod normalize;
pub mod resample;
