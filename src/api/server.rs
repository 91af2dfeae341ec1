//! HTTP server implementation for the API

use anyhow::Result;
use axum::{
    extract::{multipart::Multipart, rejection::JsonRejection, DefaultBodyLimit, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use super::handlers;
use super::models::{BurnSubtitlesBody, TranscribeBody};
use crate::config::Config;
use crate::error::PipelineError;
use crate::pipeline::{Pipeline, PipelineOutcome, PipelineResponse};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub config: Arc<Config>,
}

/// Build the router with all routes and middleware
pub fn router(state: AppState) -> Router {
    let upload_limit = state.config.server.upload_limit_bytes;
    let enable_cors = state.config.server.enable_cors;

    let app = Router::new()
        .route("/", get(service_info_handler))
        .route("/health", get(health_handler))
        .route("/upload-video", post(upload_video_handler))
        .route("/transcribe", post(transcribe_handler))
        .route("/process-video", post(process_video_handler))
        .route("/burn-subtitles", post(burn_subtitles_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(upload_limit)),
        );

    if enable_cors {
        // Configure CORS to allow browser access
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
        app.layer(cors)
    } else {
        app
    }
}

/// Configure and start the HTTP server
pub async fn start_http_server(pipeline: Arc<Pipeline>, config: Arc<Config>) -> Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let app = router(AppState { pipeline, config });

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🌐 API server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

/// HTTP status for a failed request
pub fn status_for(error: &PipelineError) -> StatusCode {
    match error {
        PipelineError::Validation(_) => StatusCode::BAD_REQUEST,
        PipelineError::RequestTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Every pipeline route answers with the structured result envelope
fn respond(result: crate::Result<PipelineOutcome>) -> Response {
    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(e) => status_for(e),
    };
    (status, Json(PipelineResponse::from_result(&result))).into_response()
}

fn rejected(rejection: JsonRejection) -> Response {
    respond(Err(PipelineError::Validation(format!(
        "Invalid JSON body: {}",
        rejection.body_text()
    ))))
}

/// Service info handler
async fn service_info_handler() -> impl IntoResponse {
    Json(handlers::service_info())
}

/// Health check handler
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(handlers::health_check(&state).await))
}

/// Upload-only handler
async fn upload_video_handler(State(state): State<AppState>, multipart: Multipart) -> Response {
    respond(handlers::upload_video(&state, multipart).await)
}

/// Full pipeline handler
async fn process_video_handler(State(state): State<AppState>, multipart: Multipart) -> Response {
    respond(handlers::process_video(&state, multipart).await)
}

/// Transcribe-only handler
async fn transcribe_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<TranscribeBody>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(body)) => respond(handlers::transcribe(&state, body).await),
        Err(rejection) => rejected(rejection),
    }
}

/// Burn-in handler
async fn burn_subtitles_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<BurnSubtitlesBody>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(body)) => respond(handlers::burn_subtitles(&state, body).await),
        Err(rejection) => rejected(rejection),
    }
}
