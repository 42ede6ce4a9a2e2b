//! Attendee-facing handlers: join-code token exchange.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::AttendeeTokenRequest;
use crate::app_state::AppState;
use crate::error::{ErrorResponse, GatewayError};
use crate::service::AttendeeTokenGrant;

/// `POST /attendee/token` — Exchange a join code for a room token.
///
/// Unauthenticated: the join code is the only credential an anonymous
/// attendee holds.
///
/// # Errors
///
/// Returns [`GatewayError::NotFound`] for unknown or no-longer-valid join
/// codes and [`GatewayError`] variants for unsupported language requests.
#[utoipa::path(
    post,
    path = "/api/v1/attendee/token",
    tag = "Attendees",
    summary = "Exchange a join code for a room token",
    description = "Validates the join code and the requested language against the event configuration and returns a subscribe-only room token. Codes of ended or canceled events are indistinguishable from unknown codes.",
    request_body = AttendeeTokenRequest,
    responses(
        (status = 200, description = "Token issued", body = AttendeeTokenGrant),
        (status = 400, description = "Language not configured or capability not offered", body = ErrorResponse),
        (status = 404, description = "Invalid or expired join code", body = ErrorResponse),
    )
)]
pub async fn attendee_token(
    State(state): State<AppState>,
    Json(req): Json<AttendeeTokenRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let grant = state
        .event_service
        .request_attendee_token(&req.join_code, &req.language, req.wants_audio, req.wants_captions)
        .await?;
    Ok(Json(grant))
}

/// Attendee routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/attendee/token", post(attendee_token))
}
