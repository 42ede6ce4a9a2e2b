//! Event-related DTOs for create, get, and list operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{DeliveryMode, EventId, EventRecord, EventStatus, EventSummary, LanguageOutput};

/// One requested target language in `POST /events`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OutputSpec {
    /// BCP-47 style language code, e.g. `es-ES`.
    pub lang: String,
    /// Delivery mode selection.
    pub mode: DeliveryMode,
    /// Optional synthesis voice identifier.
    #[serde(default)]
    pub voice: Option<String>,
}

impl From<OutputSpec> for LanguageOutput {
    fn from(output: OutputSpec) -> Self {
        Self::from_mode(output.lang, output.mode, output.voice)
    }
}

/// Request body for `POST /events`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEventRequest {
    /// Display name.
    pub name: String,
    /// Language spoken by presenters.
    pub source_language: String,
    /// Target-language outputs; at least one, each with at least one
    /// delivery channel.
    pub outputs: Vec<OutputSpec>,
    /// Whether transcripts should be recorded. Defaults to false.
    #[serde(default)]
    pub record_transcript: bool,
}

/// Full event detail returned by `POST /events` and `GET /events/{id}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct EventResponse {
    /// Event identifier.
    pub event_id: EventId,
    /// Display name.
    pub name: String,
    /// Current lifecycle status.
    pub status: EventStatus,
    /// Room identifier the event will run in.
    pub room_name: String,
    /// Public join code for attendees.
    pub join_code: Option<String>,
    /// Source language code.
    pub source_language: String,
    /// Whether transcripts are recorded.
    pub record_transcript: bool,
    /// Configured target-language outputs.
    pub outputs: Vec<LanguageOutput>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<&EventRecord> for EventResponse {
    fn from(record: &EventRecord) -> Self {
        Self {
            event_id: record.event_id,
            name: record.name.clone(),
            status: record.status,
            room_name: record.room_name.clone(),
            join_code: record.join_code.clone(),
            source_language: record.source_language.clone(),
            record_transcript: record.record_transcript,
            outputs: record.outputs.clone(),
            created_at: record.created_at,
        }
    }
}

/// List response for `GET /events`.
#[derive(Debug, Serialize, ToSchema)]
pub struct EventListResponse {
    /// Event summaries for the caller's organization.
    pub data: Vec<EventSummary>,
    /// Total number of events returned.
    pub total: usize,
}
