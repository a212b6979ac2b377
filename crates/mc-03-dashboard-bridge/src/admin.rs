//! Inspection API.
//!
//! | Route | Answer |
//! |-------|--------|
//! | `GET /health` | bus path status and counters |
//! | `GET /topology` | current graph, simulations and algorithm |
//! | `GET /topology/dangling` | edges whose endpoints are gone |
//! | `GET /messages?offset&limit` | a page of the message log |
//! | `GET /messages/:index` | one logged event |
//! | `GET /quarantine` | rejected bus messages |
//! | `GET /sessions` | connected dashboards |
//! | `GET /metrics` | Prometheus text |
//!
//! Every answer comes from the core, so it reflects all inputs queued before
//! the request.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use mascoord_telemetry::encode_metrics;
use serde::Deserialize;
use serde_json::json;

use crate::domain::{AdminConfig, BridgeError};
use crate::pipeline::BridgeHandle;

/// Page size when `limit` is not given.
pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Clone)]
struct AdminState {
    core: BridgeHandle,
    max_page_size: usize,
}

pub fn build_admin_router(core: BridgeHandle, config: &AdminConfig) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/topology", get(topology))
        .route("/topology/dangling", get(dangling_edges))
        .route("/messages", get(messages))
        .route("/messages/:index", get(message))
        .route("/quarantine", get(quarantine))
        .route("/sessions", get(sessions))
        .route("/metrics", get(metrics))
        .with_state(AdminState {
            core,
            max_page_size: config.max_page_size.max(1),
        })
}

/// Core unreachable; maps to 503.
struct AdminError(BridgeError);

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

impl From<BridgeError> for AdminError {
    fn from(e: BridgeError) -> Self {
        Self(e)
    }
}

type AdminResult<T> = Result<T, AdminError>;

async fn health_check(State(state): State<AdminState>) -> AdminResult<impl IntoResponse> {
    let status = state.core.status().await?;
    Ok(Json(json!({
        "status": if status.is_healthy() { "healthy" } else { "degraded" },
        "service": "dashboard-bridge",
        "version": env!("CARGO_PKG_VERSION"),
        "bridge": status,
    })))
}

async fn topology(State(state): State<AdminState>) -> AdminResult<impl IntoResponse> {
    Ok(Json(state.core.topology().await?))
}

async fn dangling_edges(State(state): State<AdminState>) -> AdminResult<impl IntoResponse> {
    Ok(Json(state.core.dangling_edges().await?))
}

#[derive(Debug, Default, Deserialize)]
struct PageParams {
    offset: Option<u64>,
    limit: Option<usize>,
}

async fn messages(
    State(state): State<AdminState>,
    Query(params): Query<PageParams>,
) -> AdminResult<impl IntoResponse> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .min(state.max_page_size);
    let page = state
        .core
        .messages(params.offset.unwrap_or(0), limit)
        .await?;
    Ok(Json(page))
}

async fn message(
    State(state): State<AdminState>,
    Path(index): Path<u64>,
) -> AdminResult<Response> {
    Ok(match state.core.message(index).await? {
        Some(event) => Json(event).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("no retained event with index {}", index) })),
        )
            .into_response(),
    })
}

async fn quarantine(State(state): State<AdminState>) -> AdminResult<impl IntoResponse> {
    Ok(Json(state.core.quarantine().await?))
}

async fn sessions(State(state): State<AdminState>) -> AdminResult<impl IntoResponse> {
    Ok(Json(state.core.sessions().await?))
}

async fn metrics() -> Response {
    match encode_metrics() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}
