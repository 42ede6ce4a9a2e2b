//! Shared application state injected into all Axum handlers.

use std::fmt;
use std::sync::Arc;

use crate::domain::EventBus;
use crate::room::{RoomTransport, TokenIssuer};
use crate::service::EventService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Event service for all business logic.
    pub event_service: Arc<EventService>,
    /// Event bus for lifecycle notifications.
    pub event_bus: EventBus,
    /// Room transport attendee sessions connect through.
    pub transport: Arc<dyn RoomTransport>,
    /// Issuer used to verify room tokens presented by attendees.
    pub token_issuer: TokenIssuer,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("event_service", &self.event_service)
            .field("event_bus", &self.event_bus)
            .field("token_issuer", &self.token_issuer)
            .finish_non_exhaustive()
    }
}
