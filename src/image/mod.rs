pub mod loader;
pub mod postprocessing;
pub mod preprocessing;

pub use loader::ImageLoader;
pub use postprocessing::{postprocess, top_k, ClassificationResult, ResultFormatter};
pub use preprocessing::{ImagePreprocessor, ResizeFilter};
