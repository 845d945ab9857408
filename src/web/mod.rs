pub mod extractors;
pub mod handlers;
pub mod middleware;

use crate::{models::ModelContext, utils::error::ClassifyError, Config, Result};
use axum::{
    extract::{DefaultBodyLimit, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer};

/// 处理器共享的状态
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub context: Arc<ModelContext>,
}

/// 加载模型上下文并启动服务
///
/// 资源加载失败会在绑定端口前返回
pub async fn serve(config: Config) -> Result<()> {
    let context = {
        let config = config.clone();
        tokio::task::spawn_blocking(move || ModelContext::load(&config))
            .await
            .map_err(|e| ClassifyError::Internal(format!("Model loading task failed: {}", e)))??
    };

    let addr: SocketAddr = config.bind_addr.parse().map_err(|e| {
        ClassifyError::Config(format!("Invalid bind address {}: {}", config.bind_addr, e))
    })?;

    let app = create_app(AppState {
        config,
        context: Arc::new(context),
    });

    tracing::info!("Server starting on http://{}", addr);
    tracing::info!("API endpoints:");
    tracing::info!("  POST /classify        - JSON base64 upload");
    tracing::info!("  POST /classify/upload - Multipart file upload");
    tracing::info!("  GET  /health          - Health check");
    tracing::info!("  GET  /api/info        - Model information");

    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        ClassifyError::Internal(format!("Failed to bind to address {}: {}", addr, e))
    })?;

    axum::serve(listener, app)
        .await
        .map_err(|e| ClassifyError::Internal(format!("Server failed: {}", e)))?;

    Ok(())
}

pub fn create_app(state: AppState) -> Router {
    let server_config = &state.config.server_config;
    let max_body_size = server_config.max_body_size();
    let max_concurrent_requests = server_config.max_concurrent_requests;
    let request_timeout = Duration::from_secs(server_config.request_timeout);

    Router::new()
        .route("/classify", post(handlers::classify_json_handler))
        .route("/classify/upload", post(handlers::classify_upload_handler))
        .route("/health", get(health_handler))
        .route("/api/info", get(info_handler))
        // 请求体只由 RequestBodyLimitLayer 限制
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(GlobalConcurrencyLimitLayer::new(max_concurrent_requests))
        .layer(CorsLayer::permissive())
        .layer(axum::middleware::from_fn(middleware::request_logging))
        .with_state(state)
}

async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "labels": state.context.labels().len(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn info_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "service": "ONNX Classifier Service",
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "model": state.context.stats(),
        "display_precision": state.context.display_precision(),
    }))
}
