//! System endpoints: health check and delivery-mode catalog.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Supported delivery mode info.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeliveryModeInfo {
    mode: &'static str,
    description: &'static str,
    captions: bool,
    audio: bool,
}

/// `GET /config/delivery-modes` — List supported delivery modes.
#[utoipa::path(
    get,
    path = "/config/delivery-modes",
    tag = "System",
    summary = "List supported delivery modes",
    description = "Returns metadata for every per-language delivery mode an event output can use.",
    responses(
        (status = 200, description = "Delivery mode catalog", body = Vec<DeliveryModeInfo>),
    )
)]
pub async fn delivery_modes_handler() -> impl IntoResponse {
    let modes = vec![
        DeliveryModeInfo {
            mode: "captions_only",
            description: "Translated text captions without synthesized speech",
            captions: true,
            audio: false,
        },
        DeliveryModeInfo {
            mode: "audio_only",
            description: "Synthesized speech without caption text",
            captions: false,
            audio: true,
        },
        DeliveryModeInfo {
            mode: "both",
            description: "Captions and synthesized speech together",
            captions: true,
            audio: true,
        },
    ];
    (StatusCode::OK, Json(modes))
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config/delivery-modes", get(delivery_modes_handler))
}
