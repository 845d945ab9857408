pub mod pipeline;
pub mod types;

pub use pipeline::ClassificationPipeline;
pub use types::{Classification, ClassifyOptions, ClassifyStats};
