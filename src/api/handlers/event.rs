//! Event lifecycle handlers: create, list, get, and status transitions.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use super::caller_org;
use crate::api::dto::{CreateEventRequest, EventListResponse, EventResponse, PublisherTokenRequest};
use crate::app_state::AppState;
use crate::domain::{EventConfig, EventId, LanguageOutput};
use crate::error::{ErrorResponse, GatewayError};
use crate::service::{NewEvent, PublisherTokenGrant, TransitionOutcome};

/// `POST /events` — Create a new translation event.
///
/// # Errors
///
/// Returns [`GatewayError`] on an empty name, empty source language, or
/// invalid output configuration.
#[utoipa::path(
    post,
    path = "/api/v1/events",
    tag = "Events",
    summary = "Create a translation event",
    description = "Registers a new event in Scheduled status with a derived room name and a fresh join code. No transport room is provisioned until the event starts.",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = EventResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Missing organization header", body = ErrorResponse),
    )
)]
pub async fn create_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let org_id = caller_org(&headers)?;
    let outputs: Vec<LanguageOutput> = req.outputs.into_iter().map(Into::into).collect();

    let record = state
        .event_service
        .create_event(NewEvent {
            name: req.name,
            org_id,
            source_language: req.source_language,
            outputs,
            record_transcript: req.record_transcript,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(EventResponse::from(&record))))
}

/// `GET /events` — List the caller organization's events.
///
/// # Errors
///
/// Returns [`GatewayError::Authorization`] when the organization header
/// is missing.
#[utoipa::path(
    get,
    path = "/api/v1/events",
    tag = "Events",
    summary = "List events",
    description = "Returns summaries of all events owned by the caller's organization.",
    responses(
        (status = 200, description = "Event list", body = EventListResponse),
        (status = 401, description = "Missing organization header", body = ErrorResponse),
    )
)]
pub async fn list_events(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, GatewayError> {
    let org_id = caller_org(&headers)?;
    let data = state.event_service.list_events(&org_id).await;
    let total = data.len();
    Ok(Json(EventListResponse { data, total }))
}

/// `GET /events/:id` — Get event details.
///
/// # Errors
///
/// Returns [`GatewayError::EventNotFound`] for unknown events and
/// [`GatewayError::Authorization`] for events of other organizations.
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}",
    tag = "Events",
    summary = "Get event details",
    description = "Returns full details for a single event of the caller's organization.",
    params(
        ("id" = uuid::Uuid, Path, description = "Event UUID"),
    ),
    responses(
        (status = 200, description = "Event details", body = EventResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn get_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    let org_id = caller_org(&headers)?;
    let record = state
        .event_service
        .get_event(EventId::from_uuid(id), &org_id)
        .await?;
    Ok(Json(EventResponse::from(&record)))
}

/// `POST /events/:id/start` — Start or resume an event.
///
/// # Errors
///
/// Returns [`GatewayError`] on unknown events, forbidden transitions, or
/// room provisioning failures.
#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/start",
    tag = "Events",
    summary = "Start or resume an event",
    description = "Provisions the transport room, flips the event to Live, and launches one translation worker per target language. Languages whose worker fails to start are reported in the response without failing the transition.",
    params(
        ("id" = uuid::Uuid, Path, description = "Event UUID"),
    ),
    responses(
        (status = 200, description = "Event is live", body = TransitionOutcome),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 409, description = "Transition not allowed", body = ErrorResponse),
        (status = 502, description = "Room provisioning failed", body = ErrorResponse),
    )
)]
pub async fn start_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    let org_id = caller_org(&headers)?;
    let outcome = state
        .event_service
        .start_event(EventId::from_uuid(id), &org_id)
        .await?;
    Ok(Json(outcome))
}

/// `POST /events/:id/pause` — Pause a live event.
///
/// # Errors
///
/// Returns [`GatewayError`] on unknown events or forbidden transitions.
#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/pause",
    tag = "Events",
    summary = "Pause a live event",
    description = "Stops the translation workers and flips the event to Paused. The room stays open so attendees keep their connections across the pause.",
    params(
        ("id" = uuid::Uuid, Path, description = "Event UUID"),
    ),
    responses(
        (status = 200, description = "Event paused", body = TransitionOutcome),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 409, description = "Transition not allowed", body = ErrorResponse),
    )
)]
pub async fn pause_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    let org_id = caller_org(&headers)?;
    let outcome = state
        .event_service
        .pause_event(EventId::from_uuid(id), &org_id)
        .await?;
    Ok(Json(outcome))
}

/// `POST /events/:id/end` — End an event.
///
/// # Errors
///
/// Returns [`GatewayError`] on unknown events or forbidden transitions.
#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/end",
    tag = "Events",
    summary = "End an event",
    description = "Stops all workers, closes the transport room, and flips the event to Ended. Terminal; the event cannot be restarted.",
    params(
        ("id" = uuid::Uuid, Path, description = "Event UUID"),
    ),
    responses(
        (status = 200, description = "Event ended", body = TransitionOutcome),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 409, description = "Transition not allowed", body = ErrorResponse),
    )
)]
pub async fn end_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    let org_id = caller_org(&headers)?;
    let outcome = state
        .event_service
        .end_event(EventId::from_uuid(id), &org_id)
        .await?;
    Ok(Json(outcome))
}

/// `POST /events/:id/cancel` — Cancel an event.
///
/// # Errors
///
/// Returns [`GatewayError`] on unknown events or forbidden transitions.
#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/cancel",
    tag = "Events",
    summary = "Cancel an event",
    description = "Cancels an event from any non-terminal status, stopping workers and closing the room if it was running.",
    params(
        ("id" = uuid::Uuid, Path, description = "Event UUID"),
    ),
    responses(
        (status = 200, description = "Event canceled", body = TransitionOutcome),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 409, description = "Transition not allowed", body = ErrorResponse),
    )
)]
pub async fn cancel_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    let org_id = caller_org(&headers)?;
    let outcome = state
        .event_service
        .cancel_event(EventId::from_uuid(id), &org_id)
        .await?;
    Ok(Json(outcome))
}

/// `POST /events/:id/publisher-token` — Issue a publish-capable room token.
///
/// # Errors
///
/// Returns [`GatewayError`] on unknown events, other organizations, or an
/// empty identity.
#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/publisher-token",
    tag = "Events",
    summary = "Issue a publisher token",
    description = "Issues a room token with publish grants for a presenter or an external worker joining the event's room.",
    params(
        ("id" = uuid::Uuid, Path, description = "Event UUID"),
    ),
    request_body = PublisherTokenRequest,
    responses(
        (status = 200, description = "Token issued", body = PublisherTokenGrant),
        (status = 400, description = "Invalid identity", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn publisher_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<PublisherTokenRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let org_id = caller_org(&headers)?;
    let grant = state
        .event_service
        .issue_publisher_token(EventId::from_uuid(id), &org_id, &req.identity)
        .await?;
    Ok(Json(grant))
}

/// `GET /events/by-room/:room_name` — Worker-facing configuration lookup.
///
/// Unauthenticated: workers hold only their room name and token, not an
/// organization credential.
///
/// # Errors
///
/// Returns [`GatewayError::NotFound`] when no event owns that room.
#[utoipa::path(
    get,
    path = "/api/v1/events/by-room/{room_name}",
    tag = "Events",
    summary = "Look up event configuration by room",
    description = "Returns the current configuration of the event owning the given room. Used by translation workers to refresh their output settings.",
    params(
        ("room_name" = String, Path, description = "Room identifier"),
    ),
    responses(
        (status = 200, description = "Event configuration", body = EventConfig),
        (status = 404, description = "No event for that room", body = ErrorResponse),
    )
)]
pub async fn config_by_room(
    State(state): State<AppState>,
    Path(room_name): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let config = state.event_service.config_for_room(&room_name).await?;
    Ok(Json(config))
}

/// Event lifecycle routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events", post(create_event).get(list_events))
        .route("/events/by-room/{room_name}", get(config_by_room))
        .route("/events/{id}", get(get_event))
        .route("/events/{id}/start", post(start_event))
        .route("/events/{id}/pause", post(pause_event))
        .route("/events/{id}/end", post(end_event))
        .route("/events/{id}/cancel", post(cancel_event))
        .route("/events/{id}/publisher-token", post(publisher_token))
}
