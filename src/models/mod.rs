pub mod context;
pub mod engine;
pub mod labels;
pub mod onnx;
pub mod tensor;

pub use context::{ModelContext, ModelStats};
pub use engine::InferenceEngine;
pub use labels::LabelSet;
pub use onnx::OnnxEngine;
pub use tensor::{ElementType, InputTensor, OutputTensor, QuantizedTensor, TensorSpec};
