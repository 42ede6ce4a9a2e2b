//! REST endpoint handlers organized by resource.

pub mod attendee;
pub mod event;
pub mod system;

use axum::Router;
use axum::http::HeaderMap;

use crate::app_state::AppState;
use crate::error::GatewayError;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(event::routes())
        .merge(attendee::routes())
}

/// Extracts the caller's organization from the `x-org-id` header.
///
/// # Errors
///
/// Returns [`GatewayError::Authorization`] when the header is missing or
/// not valid UTF-8.
pub(crate) fn caller_org(headers: &HeaderMap) -> Result<String, GatewayError> {
    headers
        .get("x-org-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
        .ok_or_else(|| GatewayError::Authorization("missing x-org-id header".to_string()))
}
