use crate::{
    classify::{Classification, ClassificationPipeline, ClassifyOptions},
    models::ModelContext,
    utils::error::ClassifyError,
    web::{
        extractors::{RequestId, ValidatedJson},
        AppState,
    },
    Result,
};
use axum::{
    extract::{Multipart, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// JSON 请求体（base64 模式）
#[derive(Debug, Deserialize)]
pub struct ClassifyJsonRequest {
    /// Base64 编码的图像，可为 data URL
    pub image: String,

    #[serde(default)]
    pub top_k: Option<usize>,

    #[serde(default)]
    pub precision: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub timestamp: String,
    pub request_id: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T, request_id: String) -> Self {
        Self {
            success: true,
            data: Some(data),
            timestamp: chrono::Utc::now().to_rfc3339(),
            request_id,
        }
    }
}

/// 在阻塞线程池中执行同步流水线
async fn run_blocking<F>(context: Arc<ModelContext>, job: F) -> Result<Classification>
where
    F: FnOnce(&ModelContext) -> Result<Classification> + Send + 'static,
{
    tokio::task::spawn_blocking(move || job(&context))
        .await
        .map_err(|e| ClassifyError::Internal(format!("Classification task failed: {}", e)))?
}

/// JSON base64 上传处理器
pub async fn classify_json_handler(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    ValidatedJson(request): ValidatedJson<ClassifyJsonRequest>,
) -> Result<Json<ApiResponse<Classification>>> {
    let start_time = Instant::now();

    tracing::info!(
        "Processing JSON classify request: request_id={}, top_k={:?}",
        request_id,
        request.top_k
    );

    let options = ClassifyOptions {
        top_k: request.top_k,
        precision: request.precision,
    };

    let result = run_blocking(state.context.clone(), move |ctx| {
        ClassificationPipeline::classify_base64(ctx, &request.image, &options)
    })
    .await?;

    tracing::info!(
        "JSON classify completed: request_id={}, result=\"{}\", time={:.3}s",
        request_id,
        result.display,
        start_time.elapsed().as_secs_f32()
    );

    Ok(Json(ApiResponse::success(result, request_id)))
}

/// Multipart 文件上传处理器
pub async fn classify_upload_handler(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<Classification>>> {
    let start_time = Instant::now();

    tracing::info!("Processing multipart classify request: request_id={}", request_id);

    let mut image_data: Option<axum::body::Bytes> = None;
    let mut options = ClassifyOptions::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ClassifyError::InvalidInput(format!("Failed to read multipart field: {}", e))
    })? {
        let field_name = field.name().unwrap_or("unknown").to_string();

        match field_name.as_str() {
            "file" => {
                if let Some(content_type) = field.content_type() {
                    if !content_type.starts_with("image/") && content_type != "application/octet-stream" {
                        return Err(ClassifyError::UnsupportedFormat(content_type.to_string()));
                    }
                }

                let data = field.bytes().await.map_err(|e| {
                    ClassifyError::InvalidInput(format!("Failed to read file data: {}", e))
                })?;

                if data.is_empty() {
                    return Err(ClassifyError::InvalidInput("Empty file".to_string()));
                }

                tracing::debug!("Received file: {} bytes", data.len());
                image_data = Some(data);
            }
            "top_k" => options.top_k = Some(parse_field(field, "top_k").await?),
            "precision" => options.precision = Some(parse_field(field, "precision").await?),
            _ => {
                tracing::debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    let image_data = image_data
        .ok_or_else(|| ClassifyError::InvalidInput("No file provided".to_string()))?;
    options.validate().map_err(ClassifyError::InvalidInput)?;

    let result = run_blocking(state.context.clone(), move |ctx| {
        ClassificationPipeline::classify_bytes(ctx, &image_data, &options)
    })
    .await?;

    tracing::info!(
        "Multipart classify completed: request_id={}, result=\"{}\", time={:.3}s",
        request_id,
        result.display,
        start_time.elapsed().as_secs_f32()
    );

    Ok(Json(ApiResponse::success(result, request_id)))
}

async fn parse_field(field: axum::extract::multipart::Field<'_>, name: &str) -> Result<usize> {
    let value = field
        .text()
        .await
        .map_err(|e| ClassifyError::InvalidInput(format!("Failed to read {}: {}", name, e)))?;
    value
        .trim()
        .parse()
        .map_err(|_| ClassifyError::InvalidInput(format!("Invalid {}: {}", name, value)))
}
