pub mod classify;
pub mod config;
pub mod image;
pub mod models;
pub mod utils;
pub mod web;

pub use crate::classify::{Classification, ClassificationPipeline, ClassifyOptions};
pub use crate::config::Config;
pub use crate::image::{postprocess, ClassificationResult, ImagePreprocessor, ResizeFilter};
pub use crate::models::{InferenceEngine, LabelSet, ModelContext};
pub use crate::utils::error::ClassifyError;

pub type Result<T> = std::result::Result<T, ClassifyError>;
