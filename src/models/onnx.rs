use crate::config::OnnxConfig;
use crate::models::engine::InferenceEngine;
use crate::models::tensor::{ElementType, InputTensor, OutputTensor, TensorSpec};
use crate::utils::error::ClassifyError;
use crate::Result;
use ndarray::{ArrayD, IxDyn};
use ort::{
    inputs,
    session::{builder::GraphOptimizationLevel, Session},
    tensor::TensorElementType,
    value::{Tensor, ValueType},
};
use parking_lot::Mutex;
use std::fs;
use std::path::Path;

/// 基于 ONNX Runtime 的量化分类模型引擎
pub struct OnnxEngine {
    session: Mutex<Session>,
    input_spec: TensorSpec,
    output_spec: TensorSpec,
}

impl OnnxEngine {
    /// 将模型文件完整读入内存并创建会话
    pub fn from_file(path: &Path, config: &OnnxConfig) -> Result<Self> {
        if !path.exists() {
            return Err(ClassifyError::AssetLoad(format!(
                "Model not found: {}",
                path.display()
            )));
        }

        tracing::info!("Loading classification model from: {}", path.display());

        let model_bytes = fs::read(path).map_err(|e| {
            ClassifyError::AssetLoad(format!("Failed to read model {}: {}", path.display(), e))
        })?;

        Self::from_memory(&model_bytes, config)
    }

    pub fn from_memory(model_bytes: &[u8], config: &OnnxConfig) -> Result<Self> {
        tracing::debug!("Building ORT session from {} model bytes", model_bytes.len());

        let session = Session::builder()
            .and_then(|builder| {
                builder.with_optimization_level(optimization_level(config.optimization_level))
            })
            .and_then(|builder| builder.with_intra_threads(config.intra_threads))
            .and_then(|builder| builder.commit_from_memory(model_bytes))
            .map_err(|e| ClassifyError::AssetLoad(format!("Failed to build ORT session: {}", e)))?;

        let input = session.inputs.first().ok_or_else(|| {
            ClassifyError::AssetLoad("Classification model has no inputs".to_string())
        })?;
        let output = session.outputs.first().ok_or_else(|| {
            ClassifyError::AssetLoad("Classification model has no outputs".to_string())
        })?;

        let input_spec = tensor_spec(&input.name, &input.input_type)?;
        let output_spec = tensor_spec(&output.name, &output.output_type)?;

        for (i, input) in session.inputs.iter().enumerate() {
            tracing::debug!("Model input[{}]: '{}'", i, input.name);
        }
        for (i, output) in session.outputs.iter().enumerate() {
            tracing::debug!("Model output[{}]: '{}'", i, output.name);
        }

        ensure_uint8(&input_spec)?;
        ensure_uint8(&output_spec)?;

        tracing::info!(
            "Model expects input '{}' with shape {:?} and data type {}",
            input_spec.name,
            input_spec.shape,
            input_spec.dtype
        );
        tracing::info!(
            "Model output '{}' has shape {:?} ({} classes)",
            output_spec.name,
            output_spec.shape,
            output_spec.element_count()
        );

        Ok(Self {
            session: Mutex::new(session),
            input_spec,
            output_spec,
        })
    }
}

impl InferenceEngine for OnnxEngine {
    fn input_spec(&self) -> &TensorSpec {
        &self.input_spec
    }

    fn output_spec(&self) -> &TensorSpec {
        &self.output_spec
    }

    fn infer(&self, input: &InputTensor) -> Result<OutputTensor> {
        check_input_len(&self.input_spec, input)?;

        let array = ArrayD::from_shape_vec(IxDyn(&self.input_spec.shape), input.as_slice().to_vec())
            .map_err(|e| ClassifyError::Inference(format!("Invalid input shape: {}", e)))?;
        let input_tensor = Tensor::from_array(array)?;

        let (shape, data) = {
            let mut session = self.session.lock();
            let outputs = session.run(inputs![self.input_spec.name.as_str() => input_tensor])?;

            match outputs.get(&self.output_spec.name) {
                Some(output) => {
                    let view = output.try_extract_array::<u8>()?;
                    (view.shape().to_vec(), view.iter().copied().collect::<Vec<u8>>())
                }
                None => {
                    let available: Vec<String> = outputs.keys().map(|s| s.to_string()).collect();
                    return Err(ClassifyError::Inference(format!(
                        "Output '{}' not found. Available outputs: {:?}",
                        self.output_spec.name, available
                    )));
                }
            }
        };

        OutputTensor::from_shape_vec(shape, data)
    }

    fn name(&self) -> &str {
        "onnxruntime"
    }
}

fn optimization_level(level: u8) -> GraphOptimizationLevel {
    match level {
        0 => GraphOptimizationLevel::Disable,
        1 => GraphOptimizationLevel::Level1,
        2 => GraphOptimizationLevel::Level2,
        _ => GraphOptimizationLevel::Level3,
    }
}

fn tensor_spec(name: &str, value_type: &ValueType) -> Result<TensorSpec> {
    match value_type {
        ValueType::Tensor { ty, shape, .. } => tensor_spec_from_parts(name, *ty, shape),
        other => Err(ClassifyError::AssetLoad(format!(
            "Model value '{}' is not a tensor: {:?}",
            name, other
        ))),
    }
}

fn tensor_spec_from_parts(name: &str, ty: TensorElementType, dims: &[i64]) -> Result<TensorSpec> {
    TensorSpec::from_dims(name, dims, element_type(ty))
}

/// 输入长度必须与模型输入形状的元素数一致
fn check_input_len(spec: &TensorSpec, input: &InputTensor) -> Result<()> {
    let expected = spec.element_count();
    if input.len() != expected {
        return Err(ClassifyError::SizeMismatch {
            actual: input.len(),
            expected,
        });
    }
    Ok(())
}

fn element_type(ty: TensorElementType) -> ElementType {
    match ty {
        TensorElementType::Uint8 => ElementType::Uint8,
        TensorElementType::Float32 => ElementType::Float32,
        other => ElementType::Other(format!("{:?}", other).to_lowercase()),
    }
}

fn ensure_uint8(spec: &TensorSpec) -> Result<()> {
    if spec.dtype != ElementType::Uint8 {
        return Err(ClassifyError::AssetLoad(format!(
            "Tensor '{}' is {}, only quantized uint8 models are supported",
            spec.name, spec.dtype
        )));
    }
    Ok(())
}
