//! REST API layer: route handlers, DTOs, and router composition.
//!
//! All endpoints are mounted under `/api/v1`, with system routes
//! (`/health`, `/config/delivery-modes`) at the root level.

pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI document for all REST endpoints.
#[derive(Debug, OpenApi)]
#[openapi(
    paths(
        handlers::event::create_event,
        handlers::event::list_events,
        handlers::event::get_event,
        handlers::event::start_event,
        handlers::event::pause_event,
        handlers::event::end_event,
        handlers::event::cancel_event,
        handlers::event::publisher_token,
        handlers::event::config_by_room,
        handlers::attendee::attendee_token,
        handlers::system::health_handler,
        handlers::system::delivery_modes_handler,
    ),
    tags(
        (name = "Events", description = "Event lifecycle management"),
        (name = "Attendees", description = "Attendee token exchange"),
        (name = "System", description = "Health and configuration catalogs"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_covers_the_surface() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/events"));
        assert!(doc.paths.paths.contains_key("/api/v1/attendee/token"));
        assert!(doc.paths.paths.contains_key("/health"));
        assert!(!format!("{ApiDoc:?}").is_empty());
    }
}
