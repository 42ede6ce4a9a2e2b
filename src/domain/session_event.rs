//! Domain events reflecting event lifecycle and worker state changes.
//!
//! Every lifecycle mutation emits a [`SessionEvent`] through the
//! [`super::EventBus`]. Events are observed by the WebSocket layer and by
//! tests asserting lifecycle ordering.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::EventId;

/// Domain event emitted after lifecycle and worker state changes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A new event was created (status `scheduled`, nothing provisioned).
    EventCreated {
        /// Event identifier.
        event_id: EventId,
        /// Derived room identifier.
        room_name: String,
        /// Creation timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The event went live: room provisioned, workers dispatched.
    EventStarted {
        /// Event identifier.
        event_id: EventId,
        /// Room identifier.
        room_name: String,
        /// Target languages whose workers were requested.
        languages: Vec<String>,
        /// Whether this was a resume from `paused`.
        resumed: bool,
        /// Transition timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The event was paused: workers stopped, room kept up.
    EventPaused {
        /// Event identifier.
        event_id: EventId,
        /// Transition timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The event ended: workers stopped, room closed. Terminal.
    EventEnded {
        /// Event identifier.
        event_id: EventId,
        /// Transition timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The event was canceled. Terminal.
    EventCanceled {
        /// Event identifier.
        event_id: EventId,
        /// Transition timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A per-language translation worker started.
    WorkerStarted {
        /// Event identifier.
        event_id: EventId,
        /// Target language of the worker.
        lang: String,
        /// Start timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A per-language translation worker was stopped (pause or end).
    WorkerStopped {
        /// Event identifier.
        event_id: EventId,
        /// Target language of the worker.
        lang: String,
        /// Stop timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A per-language worker failed to start after bounded retries.
    /// Other languages are unaffected.
    WorkerStartFailed {
        /// Event identifier.
        event_id: EventId,
        /// Target language that failed.
        lang: String,
        /// Final failure reason.
        reason: String,
        /// Failure timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl SessionEvent {
    /// Returns the event this domain event belongs to.
    #[must_use]
    pub const fn event_id(&self) -> EventId {
        match self {
            Self::EventCreated { event_id, .. }
            | Self::EventStarted { event_id, .. }
            | Self::EventPaused { event_id, .. }
            | Self::EventEnded { event_id, .. }
            | Self::EventCanceled { event_id, .. }
            | Self::WorkerStarted { event_id, .. }
            | Self::WorkerStopped { event_id, .. }
            | Self::WorkerStartFailed { event_id, .. } => *event_id,
        }
    }

    /// Snake-case discriminator string, matching the serialized tag.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::EventCreated { .. } => "event_created",
            Self::EventStarted { .. } => "event_started",
            Self::EventPaused { .. } => "event_paused",
            Self::EventEnded { .. } => "event_ended",
            Self::EventCanceled { .. } => "event_canceled",
            Self::WorkerStarted { .. } => "worker_started",
            Self::WorkerStopped { .. } => "worker_stopped",
            Self::WorkerStartFailed { .. } => "worker_start_failed",
        }
    }
}
