use crate::image::ImagePreprocessor;
use crate::models::{InferenceEngine, LabelSet, OnnxEngine};
use crate::utils::error::ClassifyError;
use crate::{Config, Result};
use serde::Serialize;
use std::sync::Arc;

/// 所有分类共享的只读状态：模型、标签和预处理参数
pub struct ModelContext {
    engine: Arc<dyn InferenceEngine>,
    labels: Arc<LabelSet>,
    preprocessor: ImagePreprocessor,
    display_precision: usize,
}

impl ModelContext {
    /// 按 `config` 加载模型和标签
    pub fn load(config: &Config) -> Result<Self> {
        tracing::info!("Initializing model context...");

        let engine = OnnxEngine::from_file(&config.model_path(), &config.onnx_config)?;
        let labels = LabelSet::load(&config.labels_path())?;

        let preprocess = &config.preprocess_config;
        let preprocessor = ImagePreprocessor::new(preprocess.width, preprocess.height, preprocess.filter)?;

        let context = Self::new(Arc::new(engine), labels, preprocessor)?
            .with_display_precision(config.display_precision);

        tracing::info!("Model context initialized successfully");
        Ok(context)
    }

    pub fn new(
        engine: Arc<dyn InferenceEngine>,
        labels: LabelSet,
        preprocessor: ImagePreprocessor,
    ) -> Result<Self> {
        if labels.is_empty() {
            return Err(ClassifyError::AssetLoad("Labels file is empty".to_string()));
        }

        let declared_outputs = engine.output_spec().element_count();
        if declared_outputs != labels.len() {
            tracing::warn!(
                "Model declares {} outputs but {} labels were loaded; classifications will be rejected",
                declared_outputs,
                labels.len()
            );
        }

        if let Some(expected) = engine.input_spec().byte_len() {
            if expected != preprocessor.tensor_len() {
                tracing::warn!(
                    "Preprocessor produces {} bytes but model expects {} bytes",
                    preprocessor.tensor_len(),
                    expected
                );
            }
        }

        Ok(Self {
            engine,
            labels: Arc::new(labels),
            preprocessor,
            display_precision: crate::config::DEFAULT_DISPLAY_PRECISION,
        })
    }

    pub fn with_display_precision(mut self, precision: usize) -> Self {
        self.display_precision = precision;
        self
    }

    pub fn engine(&self) -> &dyn InferenceEngine {
        self.engine.as_ref()
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn preprocessor(&self) -> &ImagePreprocessor {
        &self.preprocessor
    }

    pub fn display_precision(&self) -> usize {
        self.display_precision
    }

    /// 引擎声明的输入字节数，每个输入张量都必须一致
    pub fn expected_input_bytes(&self) -> Result<usize> {
        let spec = self.engine.input_spec();
        spec.byte_len().ok_or_else(|| {
            ClassifyError::Internal(format!("Input '{}' has unsized dtype {}", spec.name, spec.dtype))
        })
    }

    pub fn stats(&self) -> ModelStats {
        let input = self.engine.input_spec();
        let output = self.engine.output_spec();
        ModelStats {
            engine: self.engine.name().to_string(),
            input_name: input.name.clone(),
            input_shape: input.shape.clone(),
            input_dtype: input.dtype.to_string(),
            output_name: output.name.clone(),
            output_shape: output.shape.clone(),
            label_count: self.labels.len(),
            target_width: self.preprocessor.target_width(),
            target_height: self.preprocessor.target_height(),
            resize_filter: self.preprocessor.filter().to_string(),
        }
    }
}

/// 模型元信息
#[derive(Debug, Clone, Serialize)]
pub struct ModelStats {
    pub engine: String,
    pub input_name: String,
    pub input_shape: Vec<usize>,
    pub input_dtype: String,
    pub output_name: String,
    pub output_shape: Vec<usize>,
    pub label_count: usize,
    pub target_width: u32,
    pub target_height: u32,
    pub resize_filter: String,
}
