mod artwork;
mod cancel;
mod config;
mod http;
mod metrics;
mod models;
mod pipeline;
mod printify;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use cancel::CancelToken;
use config::Settings;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use models::{ApiError, PublishRequest, PublishResponse};
use pipeline::{Pipeline, PipelineError, PipelineErrorKind};
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        error!(target = "printdrop.api", "server crashed: {err:#}");
    }
}

async fn run() -> eyre::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let settings = Arc::new(Settings::load()?);
    if settings.api_token.is_empty() {
        info!(
            target = "printdrop.api",
            "PRINTIFY_API_TOKEN is not set; publish requests will be rejected"
        );
    }
    let prometheus_handle = PrometheusBuilder::new().install_recorder()?;
    let cancel = CancelToken::new();
    let state = AppState {
        pipeline: Pipeline::from_settings(settings.clone()),
        cancel: cancel.clone(),
        prometheus_handle,
    };

    let addr: SocketAddr = ([0, 0, 0, 0], settings.port).into();
    info!(target = "printdrop.api", "listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state).into_make_service())
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await?;
    Ok(())
}

#[derive(Clone)]
struct AppState {
    pipeline: Pipeline,
    cancel: CancelToken,
    prometheus_handle: PrometheusHandle,
}

fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_headers(Any)
        .allow_methods(Any)
        .allow_origin(Any);
    let body_limit = state.pipeline.settings.max_body_bytes;

    Router::new()
        .route("/publish", post(publish).fallback(method_not_allowed))
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(body_limit))
}

/// Trips the shared cancel token so in-flight attempts stop at their next
/// provider call.
async fn shutdown_signal(cancel: CancelToken) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(target = "printdrop.api", "unable to listen for shutdown: {err}");
        return;
    }
    info!(target = "printdrop.api", "shutdown requested");
    cancel.cancel();
}

/// Health check.
///
/// - Method: `GET`
/// - Path: `/health`
async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "printdrop-api",
    }))
}

async fn metrics_endpoint(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Ok(secret) = std::env::var("METRICS_KEY") {
        let presented = headers
            .get("X-Metrics-Key")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if presented != secret {
            return (StatusCode::UNAUTHORIZED, "unauthorized").into_response();
        }
    }
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.prometheus_handle.render(),
    )
        .into_response()
}

/// Turn an image into a live product.
///
/// - Method: `POST`
/// - Path: `/publish`
/// - Body: `{"imageUrl": "...", "title"?: "...", "description"?: "..."}`
/// - Response: `PublishResponse` (product id + per-stage transcript)
async fn publish(
    State(state): State<AppState>,
    payload: Result<Json<PublishRequest>, JsonRejection>,
) -> Result<Json<PublishResponse>, AppError> {
    crate::metrics::inc_requests("/publish");
    let Json(request) = payload.map_err(AppError::BadRequest)?;
    info!(
        target = "printdrop.api",
        data_url = request
            .image_url
            .as_deref()
            .is_some_and(|url| url.starts_with("data:")),
        "publish invoked"
    );
    let response = state.pipeline.run(request, &state.cancel).await?;
    Ok(Json(response))
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

#[derive(Debug)]
enum AppError {
    Pipeline(PipelineError),
    BadRequest(JsonRejection),
    MethodNotAllowed,
}

impl From<PipelineError> for AppError {
    fn from(value: PipelineError) -> Self {
        Self::Pipeline(value)
    }
}

fn status_for(kind: PipelineErrorKind) -> StatusCode {
    match kind {
        PipelineErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        PipelineErrorKind::Configuration | PipelineErrorKind::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        PipelineErrorKind::Upstream => StatusCode::BAD_GATEWAY,
        PipelineErrorKind::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, payload) = match self {
            AppError::Pipeline(err) => (
                status_for(err.kind()),
                ApiError {
                    error: err.stage().to_string(),
                    detail: Some(err.detail()),
                },
            ),
            AppError::BadRequest(rejection) => (
                StatusCode::BAD_REQUEST,
                ApiError {
                    error: "invalid_request".into(),
                    detail: Some(rejection.body_text()),
                },
            ),
            AppError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                ApiError {
                    error: "method_not_allowed".into(),
                    detail: Some("use POST".into()),
                },
            ),
        };
        (status, Json(payload)).into_response()
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let _ = fmt().with_env_filter(filter).try_init();
}
