//! Attendee and publisher token request DTOs.

use serde::Deserialize;
use utoipa::ToSchema;

/// Request body for `POST /attendee/token`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AttendeeTokenRequest {
    /// Public join code of the event.
    pub join_code: String,
    /// Target language the attendee wants to receive.
    pub language: String,
    /// Whether the attendee wants synthesized audio. Defaults to true.
    #[serde(default = "default_true")]
    pub wants_audio: bool,
    /// Whether the attendee wants captions. Defaults to true.
    #[serde(default = "default_true")]
    pub wants_captions: bool,
}

/// Request body for `POST /events/{id}/publisher-token`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PublisherTokenRequest {
    /// Participant identity to bind into the token.
    pub identity: String,
}

fn default_true() -> bool {
    true
}
