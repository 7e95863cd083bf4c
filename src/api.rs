//! REST API for the insight orchestrator
//!
//! Thin HTTP wrapper over [`InsightService::handle`]; the composite result is
//! returned as-is.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::models::{now_timestamp, AnalysisContext, CompositeResult, ExecutionMode, SpecialistDescriptor};
use crate::service::InsightService;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub context: Option<AnalysisContext>,
    #[serde(default)]
    pub mode: Option<ExecutionMode>,
}

#[derive(Debug, Serialize)]
pub struct SpecialistsResponse {
    pub agents: Vec<SpecialistDescriptor>,
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<InsightService>,
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": now_timestamp()
    }))
}

/// =============================
/// Analysis Endpoint
/// =============================

async fn analyze(
    State(state): State<ApiState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> (StatusCode, Json<CompositeResult>) {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            warn!(status = rejection.status().as_u16(), "Rejected analysis request body");
            return (
                rejection.status(),
                Json(CompositeResult::failure(format!(
                    "Invalid request body: {}",
                    rejection.body_text()
                ))),
            );
        }
    };

    info!(mode = ?req.mode, "Received analysis request");

    let empty_query = req.query.trim().is_empty();
    let result = state
        .service
        .handle_with_mode(&req.query, req.context.unwrap_or_default(), req.mode)
        .await;

    let status = match &result {
        CompositeResult::Completed(_) => StatusCode::OK,
        CompositeResult::Failed(_) if empty_query => StatusCode::UNPROCESSABLE_ENTITY,
        CompositeResult::Failed(_) => StatusCode::BAD_GATEWAY,
    };

    (status, Json(result))
}

async fn list_specialists(State(state): State<ApiState>) -> Json<SpecialistsResponse> {
    Json(SpecialistsResponse {
        agents: state.service.registry().descriptors(),
    })
}

/// =============================
/// Router
/// =============================

pub fn create_router(service: Arc<InsightService>) -> Router {
    let state = ApiState { service };

    Router::new()
        .route("/health", get(health))
        .route("/api/analyze", post(analyze))
        .route("/api/specialists", get(list_specialists))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    service: Arc<InsightService>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(service);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
