//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for the gateway. Each variant
//! maps to a specific HTTP status code and structured JSON error response.
//!
//! Propagation policy: errors local to one language or one utterance never
//! escalate past the worker that hit them; errors in room or event-state
//! transitions abort that transition and leave the event state unchanged.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::domain::EventId;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1001,
///     "message": "invalid event language setup: ...",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges below).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category            | HTTP Status                  |
/// |-----------|---------------------|------------------------------|
/// | 1000–1999 | Validation / config | 400 Bad Request              |
/// | 2000–2999 | State / Not Found   | 404 Not Found / 409 Conflict |
/// | 2100–2199 | Authorization       | 403 Forbidden                |
/// | 3000–3999 | Server / upstream   | 500 / 502                    |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Invalid or incomplete event language setup, e.g. a language output
    /// with neither captions nor audio enabled. Caught at write time and
    /// re-validated at resolve time.
    #[error("invalid event language setup: {0}")]
    Configuration(String),

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Event with the given ID was not found.
    #[error("event not found: {0}")]
    EventNotFound(EventId),

    /// Unknown room, join code, or other resource. Messages are kept
    /// deliberately generic for public join codes so that probing does not
    /// reveal which codes exist.
    #[error("{0}")]
    NotFound(String),

    /// Requested event status transition is not allowed.
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition {
        /// Current event status.
        from: String,
        /// Requested event status.
        to: String,
    },

    /// Caller lacks organization membership or event ownership.
    #[error("not authorized: {0}")]
    Authorization(String),

    /// Transport room creation or token issuance failed. The lifecycle
    /// transition that triggered provisioning is aborted; the event status
    /// is not advanced.
    #[error("room provisioning failed: {0}")]
    Provisioning(String),

    /// A specific language's worker failed to start after bounded retries.
    /// Isolated to that language; other languages proceed.
    #[error("worker for {lang} failed to start: {reason}")]
    WorkerStart {
        /// Target language whose worker could not be started.
        lang: String,
        /// Final failure reason after retries were exhausted.
        reason: String,
    },

    /// A recognition, translation, or synthesis call failed for a single
    /// utterance. Recovered locally by the worker; never fatal.
    #[error("upstream provider error: {0}")]
    UpstreamProvider(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Configuration(_) => 1001,
            Self::InvalidRequest(_) => 1002,
            Self::EventNotFound(_) => 2001,
            Self::NotFound(_) => 2002,
            Self::InvalidTransition { .. } => 2003,
            Self::Authorization(_) => 2100,
            Self::Provisioning(_) => 3001,
            Self::WorkerStart { .. } => 3002,
            Self::UpstreamProvider(_) => 3003,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Configuration(_) | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::EventNotFound(_) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidTransition { .. } => StatusCode::CONFLICT,
            Self::Authorization(_) => StatusCode::FORBIDDEN,
            Self::Provisioning(_) | Self::UpstreamProvider(_) => StatusCode::BAD_GATEWAY,
            Self::WorkerStart { .. } | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn configuration_maps_to_bad_request() {
        let err = GatewayError::Configuration("no captions or audio".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), 1001);
    }

    #[test]
    fn not_found_message_is_generic() {
        let err = GatewayError::NotFound("invalid or expired join code".to_string());
        assert_eq!(err.to_string(), "invalid or expired join code");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn transition_conflict_maps_to_409() {
        let err = GatewayError::InvalidTransition {
            from: "ended".to_string(),
            to: "live".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "invalid transition: ended -> live");
    }

    #[test]
    fn worker_start_is_scoped_to_language() {
        let err = GatewayError::WorkerStart {
            lang: "fr-FR".to_string(),
            reason: "credential error".to_string(),
        };
        assert!(err.to_string().contains("fr-FR"));
        assert_eq!(err.error_code(), 3002);
    }
}
