//! Event record, status state machine, and room name derivation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::EventId;
use super::outputs::{LanguageOutput, ResolvedOutput};

/// Lifecycle status of a translation event.
///
/// Transitions are admin-triggered only: `scheduled→live` (provisions room
/// and workers), `live⇄paused`, `live|paused|scheduled→ended`, any
/// non-terminal→`canceled`. `ended` and `canceled` are terminal. Room and
/// worker provisioning happens exactly at `→live` transitions, never at
/// event creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Created, nothing provisioned yet.
    Scheduled,
    /// Room exists and workers are dispatched.
    Live,
    /// Workers stopped, room kept up, may resume.
    Paused,
    /// Terminal: torn down after running.
    Ended,
    /// Terminal: abandoned before or during running.
    Canceled,
}

impl EventStatus {
    /// Whether no further transitions are allowed out of this status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Ended | Self::Canceled)
    }

    /// Whether the transition `self → next` is allowed.
    ///
    /// Same-status "transitions" return `false` here; the service layer
    /// treats them as idempotent no-ops before consulting this table.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Scheduled | Self::Paused, Self::Live)
            | (Self::Live, Self::Paused)
            | (Self::Scheduled | Self::Live | Self::Paused, Self::Ended) => true,
            (from, Self::Canceled) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Lowercase status name as used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Live => "live",
            Self::Paused => "paused",
            Self::Ended => "ended",
            Self::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One translation event: a scheduled/live session with a fixed source
/// language and a set of target-language outputs.
#[derive(Debug, Clone)]
pub struct EventRecord {
    /// Unique event identifier (immutable after creation).
    pub event_id: EventId,

    /// Display name.
    pub name: String,

    /// Owning organization identifier.
    pub org_id: String,

    /// Globally unique transport room identifier. Derived deterministically
    /// from organization, event name, and creation timestamp; assigned once
    /// at creation and never changed or reused. Exists before the transport
    /// room is physically created.
    pub room_name: String,

    /// Current lifecycle status.
    pub status: EventStatus,

    /// Optional public join code for anonymous attendees.
    pub join_code: Option<String>,

    /// Source language code of the speaker.
    pub source_language: String,

    /// Whether transcripts should be recorded.
    pub record_transcript: bool,

    /// Configured target-language outputs. Immutable during a live session;
    /// changing outputs requires the event to be restarted.
    pub outputs: Vec<LanguageOutput>,

    /// Creation timestamp (immutable).
    pub created_at: DateTime<Utc>,

    /// Timestamp of the last status change.
    pub last_modified_at: DateTime<Utc>,
}

impl EventRecord {
    /// Creates a new scheduled event, deriving the room name.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        org_id: impl Into<String>,
        source_language: impl Into<String>,
        outputs: Vec<LanguageOutput>,
        record_transcript: bool,
    ) -> Self {
        let name = name.into();
        let org_id = org_id.into();
        let now = Utc::now();
        let room_name = derive_room_name(&org_id, &name, now);
        Self {
            event_id: EventId::new(),
            name,
            org_id,
            room_name,
            status: EventStatus::Scheduled,
            join_code: None,
            source_language: source_language.into(),
            record_transcript,
            outputs,
            created_at: now,
            last_modified_at: now,
        }
    }

    /// Finds the configured output for a language code.
    #[must_use]
    pub fn output_for(&self, lang: &str) -> Option<&LanguageOutput> {
        self.outputs.iter().find(|o| o.lang == lang)
    }
}

/// Derives the globally unique room identifier for an event.
///
/// Format: `ev-{org prefix}-{slugified name}-{unix seconds}` — human
/// traceable via the org and name, collision resistant via the timestamp.
#[must_use]
pub fn derive_room_name(org_id: &str, name: &str, created_at: DateTime<Utc>) -> String {
    let org_part: String = org_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(8)
        .collect::<String>()
        .to_lowercase();
    format!(
        "ev-{}-{}-{}",
        org_part,
        slugify(name),
        created_at.timestamp()
    )
}

/// Lowercases and replaces non-alphanumeric runs with single hyphens.
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_hyphen = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_hyphen = false;
        } else if !last_hyphen {
            slug.push('-');
            last_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("event");
    }
    slug
}

/// Lightweight event summary for list endpoints.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct EventSummary {
    /// Event identifier.
    pub event_id: EventId,
    /// Display name.
    pub name: String,
    /// Current status.
    pub status: EventStatus,
    /// Room identifier.
    pub room_name: String,
    /// Source language code.
    pub source_language: String,
    /// Configured target language codes.
    pub languages: Vec<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<&EventRecord> for EventSummary {
    fn from(record: &EventRecord) -> Self {
        Self {
            event_id: record.event_id,
            name: record.name.clone(),
            status: record.status,
            room_name: record.room_name.clone(),
            source_language: record.source_language.clone(),
            languages: record.outputs.iter().map(|o| o.lang.clone()).collect(),
            created_at: record.created_at,
        }
    }
}

/// Live configuration view of an event, keyed by room identifier.
///
/// This is the authoritative lookup workers use instead of trusting the
/// room metadata snapshot: it always reflects current registry state.
/// Serialized camelCase to match the worker-facing API.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventConfig {
    /// Event identifier.
    pub event_id: EventId,
    /// Display name.
    pub event_name: String,
    /// Owning organization.
    pub org_id: String,
    /// Room identifier.
    pub room_name: String,
    /// Current lifecycle status.
    pub status: EventStatus,
    /// Source language code.
    pub source_language: String,
    /// Resolved per-language capabilities.
    pub outputs: Vec<ResolvedOutput>,
}
