use crate::{
    classify::{Classification, ClassifyOptions, ClassifyStats},
    image::{postprocess, top_k, ImageLoader, ResultFormatter},
    models::ModelContext,
    utils::error::ClassifyError,
    Result,
};
use image::DynamicImage;
use std::path::Path;
use std::time::Instant;

/// 分类流水线
pub struct ClassificationPipeline;

impl ClassificationPipeline {
    pub fn classify_path(
        context: &ModelContext,
        path: &Path,
        options: &ClassifyOptions,
    ) -> Result<Classification> {
        let image = ImageLoader::from_path(path)?;
        Self::classify(context, &image, options)
    }

    pub fn classify_bytes(
        context: &ModelContext,
        bytes: &[u8],
        options: &ClassifyOptions,
    ) -> Result<Classification> {
        let image = ImageLoader::from_bytes(bytes)?;
        Self::classify(context, &image, options)
    }

    pub fn classify_base64(
        context: &ModelContext,
        base64_data: &str,
        options: &ClassifyOptions,
    ) -> Result<Classification> {
        let image = ImageLoader::from_base64(base64_data)?;
        Self::classify(context, &image, options)
    }

    /// 对一张已解码图像执行预处理、尺寸校验、推理和结果解析
    pub fn classify(
        context: &ModelContext,
        image: &DynamicImage,
        options: &ClassifyOptions,
    ) -> Result<Classification> {
        let start_time = Instant::now();

        options.validate().map_err(ClassifyError::InvalidInput)?;
        let precision = options.precision.unwrap_or_else(|| context.display_precision());

        // 尺寸校验在预处理内完成，早于推理
        let expected_bytes = context.expected_input_bytes()?;
        let input = context.preprocessor().preprocess(image, expected_bytes)?;
        let preprocess_time = start_time.elapsed();

        let inference_start = Instant::now();
        let output = context.engine().infer(&input)?;
        let inference_time = inference_start.elapsed();

        let postprocess_start = Instant::now();
        let labels = context.labels();
        let top = postprocess(&output, labels)?;
        let k = options.top_k().min(labels.len());
        let predictions = if k > 1 {
            top_k(&output, labels, k)?
        } else {
            vec![top.clone()]
        };
        let display = ResultFormatter::format_display(&top, precision);
        let postprocess_time = postprocess_start.elapsed();

        let total_time = start_time.elapsed();

        let display_ref = &display;
        tracing::info!(
            "Classification completed: result=\"{}\", total_time={:.3}s",
            display_ref,
            total_time.as_secs_f32()
        );

        Ok(Classification {
            top,
            predictions,
            display,
            processing_time: total_time.as_secs_f32(),
            stats: Some(ClassifyStats {
                preprocess_time_ms: preprocess_time.as_millis() as u64,
                inference_time_ms: inference_time.as_millis() as u64,
                postprocess_time_ms: postprocess_time.as_millis() as u64,
                input_bytes: input.len(),
                output_len: output.len(),
            }),
        })
    }
}
