//! The model: its parameters and the data prepared for it.
use crate::data::SiteData;
use std::path::PathBuf;

pub mod parameters;
pub use parameters::*;

/// A site-selection model loaded from a model directory
#[derive(Debug)]
pub struct Model {
    /// Path to model folder
    pub model_path: PathBuf,
    /// Parameters from the model TOML file
    pub parameters: ModelParameters,
    /// Validated site data
    pub data: SiteData,
}
