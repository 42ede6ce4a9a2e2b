//! Event lifecycle orchestration.
//!
//! The service owns every status transition. Room provisioning and worker
//! dispatch happen exactly at transitions into `live`; teardown at
//! `ended`/`canceled`. Transitions targeting the current status are
//! idempotent no-ops, so a retried admin request cannot double-provision
//! or error spuriously.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{
    EventBus, EventConfig, EventId, EventRecord, EventRegistry, EventStatus, EventSummary,
    LanguageOutput, SessionEvent, resolve,
};
use crate::error::GatewayError;
use crate::protocol::RoomMetadata;
use crate::room::{RoomGrants, RoomTransport, TokenIssuer};
use crate::worker::{ConfigLookup, FailedLanguage, WorkerCoordinator};

/// Parameters for creating an event.
#[derive(Debug, Clone)]
pub struct NewEvent {
    /// Display name.
    pub name: String,
    /// Owning organization.
    pub org_id: String,
    /// Language spoken by presenters.
    pub source_language: String,
    /// Target-language outputs; must be valid per
    /// [`resolve`](crate::domain::resolve).
    pub outputs: Vec<LanguageOutput>,
    /// Whether transcripts should be recorded.
    pub record_transcript: bool,
}

/// Result of a lifecycle transition.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitionOutcome {
    /// Event identifier.
    pub event_id: EventId,
    /// Status after the transition.
    pub status: EventStatus,
    /// Room identifier.
    pub room_name: String,
    /// Languages with a running worker after the transition.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub started: Vec<String>,
    /// Languages whose worker could not be started. Their failure does
    /// not block the transition; the event is live for the others.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<FailedLanguage>,
}

/// Attendee credential issued for a valid join code.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeTokenGrant {
    /// Signed subscribe-only room token.
    pub token: String,
    /// Room to connect to.
    pub room_name: String,
    /// Participant identity bound into the token.
    pub identity: String,
    /// Language the attendee selected.
    pub language: String,
    /// Token expiry.
    pub expires_at: DateTime<Utc>,
}

/// Full-publish credential for admin mic input or tooling.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublisherTokenGrant {
    /// Signed room token with publish grants.
    pub token: String,
    /// Room to connect to.
    pub room_name: String,
    /// Participant identity bound into the token.
    pub identity: String,
    /// Token expiry.
    pub expires_at: DateTime<Utc>,
}

/// Live configuration lookup backed by the event registry.
///
/// Reflects current registry state on every call, unlike the metadata
/// snapshot attached to the room at provisioning time.
#[derive(Debug)]
pub struct RegistryLookup {
    registry: Arc<EventRegistry>,
}

impl RegistryLookup {
    /// Wraps the shared registry.
    #[must_use]
    pub fn new(registry: Arc<EventRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl ConfigLookup for RegistryLookup {
    async fn config_for_room(
        &self,
        room_name: &str,
    ) -> Result<Option<EventConfig>, GatewayError> {
        match self.registry.find_by_room_name(room_name).await {
            Some(entry) => {
                let record = entry.read().await;
                Ok(Some(event_config_of(&record)?))
            }
            None => Ok(None),
        }
    }
}

fn event_config_of(record: &EventRecord) -> Result<EventConfig, GatewayError> {
    Ok(EventConfig {
        event_id: record.event_id,
        event_name: record.name.clone(),
        org_id: record.org_id.clone(),
        room_name: record.room_name.clone(),
        status: record.status,
        source_language: record.source_language.clone(),
        outputs: resolve(&record.outputs)?,
    })
}

fn generate_join_code() -> String {
    rand::thread_rng()
        .sample_iter(rand::distributions::Alphanumeric)
        .map(char::from)
        .map(|c| c.to_ascii_uppercase())
        .take(8)
        .collect()
}

/// Coordinates events, rooms, workers, and attendee access.
pub struct EventService {
    registry: Arc<EventRegistry>,
    transport: Arc<dyn RoomTransport>,
    coordinator: Arc<WorkerCoordinator>,
    token_issuer: TokenIssuer,
    bus: EventBus,
    attendee_token_ttl_secs: u64,
}

impl std::fmt::Debug for EventService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventService")
            .field("attendee_token_ttl_secs", &self.attendee_token_ttl_secs)
            .finish_non_exhaustive()
    }
}

impl EventService {
    /// Wires the service to its collaborators.
    #[must_use]
    pub fn new(
        registry: Arc<EventRegistry>,
        transport: Arc<dyn RoomTransport>,
        coordinator: Arc<WorkerCoordinator>,
        token_issuer: TokenIssuer,
        bus: EventBus,
        attendee_token_ttl_secs: u64,
    ) -> Self {
        Self {
            registry,
            transport,
            coordinator,
            token_issuer,
            bus,
            attendee_token_ttl_secs,
        }
    }

    /// Creates a `scheduled` event with a derived room name and a fresh
    /// join code. Nothing is provisioned until the event starts.
    ///
    /// # Errors
    /// Returns [`GatewayError::Configuration`] for an invalid output list.
    pub async fn create_event(&self, new_event: NewEvent) -> Result<EventRecord, GatewayError> {
        if new_event.name.trim().is_empty() {
            return Err(GatewayError::InvalidRequest(
                "event name must not be empty".to_string(),
            ));
        }
        if new_event.source_language.trim().is_empty() {
            return Err(GatewayError::InvalidRequest(
                "source language must not be empty".to_string(),
            ));
        }
        resolve(&new_event.outputs)?;
        let mut record = EventRecord::new(
            new_event.name,
            new_event.org_id,
            new_event.source_language,
            new_event.outputs,
            new_event.record_transcript,
        );
        record.join_code = Some(generate_join_code());
        let snapshot = record.clone();
        self.registry.insert(record).await?;
        self.bus.publish(SessionEvent::EventCreated {
            event_id: snapshot.event_id,
            room_name: snapshot.room_name.clone(),
            timestamp: Utc::now(),
        });
        tracing::info!(event_id = %snapshot.event_id, room = %snapshot.room_name, "event created");
        Ok(snapshot)
    }

    /// Returns one event, checking organization ownership.
    ///
    /// # Errors
    /// [`GatewayError::EventNotFound`] or [`GatewayError::Authorization`].
    pub async fn get_event(
        &self,
        event_id: EventId,
        org_id: &str,
    ) -> Result<EventRecord, GatewayError> {
        let entry = self.registry.get(event_id).await?;
        let record = entry.read().await;
        ensure_org(&record, org_id)?;
        Ok(record.clone())
    }

    /// Lists the organization's events, newest last.
    pub async fn list_events(&self, org_id: &str) -> Vec<EventSummary> {
        self.registry.list(Some(org_id)).await
    }

    /// Current configuration of the event owning `room_name`.
    ///
    /// # Errors
    /// [`GatewayError::NotFound`] when no event owns that room.
    pub async fn config_for_room(&self, room_name: &str) -> Result<EventConfig, GatewayError> {
        let entry = self
            .registry
            .find_by_room_name(room_name)
            .await
            .ok_or_else(|| GatewayError::NotFound(format!("no event for room {room_name}")))?;
        let record = entry.read().await;
        event_config_of(&record)
    }

    /// Transitions an event to `live`: provisions the room, then starts
    /// one worker per target language.
    ///
    /// Calling this on an already-live event is a no-op that reports the
    /// currently running languages; on a `paused` event it resumes,
    /// reusing the still-open room. Room provisioning failure aborts the
    /// transition with the status unchanged. Individual worker failures
    /// do not: they are reported in the outcome while the rest of the
    /// event goes live.
    ///
    /// # Errors
    /// [`GatewayError::InvalidTransition`] out of terminal statuses,
    /// [`GatewayError::Provisioning`] when the room cannot be created.
    pub async fn start_event(
        &self,
        event_id: EventId,
        org_id: &str,
    ) -> Result<TransitionOutcome, GatewayError> {
        let entry = self.registry.get(event_id).await?;
        let (snapshot, outputs, resumed) = {
            let mut record = entry.write().await;
            ensure_org(&record, org_id)?;
            if record.status == EventStatus::Live {
                let started = self.coordinator.running_languages(event_id).await;
                return Ok(TransitionOutcome {
                    event_id,
                    status: EventStatus::Live,
                    room_name: record.room_name.clone(),
                    started,
                    failed: Vec::new(),
                });
            }
            check_transition(&record, EventStatus::Live)?;
            let outputs = resolve(&record.outputs)?;
            let resumed = record.status == EventStatus::Paused;
            let metadata = RoomMetadata {
                event_id,
                org_id: record.org_id.clone(),
                source_language: record.source_language.clone(),
                outputs: outputs.clone(),
            };
            // Provision before flipping the status so a failed room
            // creation leaves the event where it was.
            self.transport
                .create_room(&record.room_name, &metadata)
                .await?;
            record.status = EventStatus::Live;
            record.last_modified_at = Utc::now();
            (record.clone(), outputs, resumed)
        };

        let failed = self.coordinator.start_workers(&snapshot, &outputs).await;
        // A racing pause/end may have moved the event on while workers
        // were connecting; their stop already ran, so sweep stragglers.
        if entry.read().await.status != EventStatus::Live {
            self.coordinator.stop_workers(event_id).await;
        }
        let started = self.coordinator.running_languages(event_id).await;
        self.bus.publish(SessionEvent::EventStarted {
            event_id,
            room_name: snapshot.room_name.clone(),
            languages: started.clone(),
            resumed,
            timestamp: Utc::now(),
        });
        tracing::info!(
            event_id = %event_id,
            room = %snapshot.room_name,
            started = started.len(),
            failed = failed.len(),
            resumed,
            "event live"
        );
        Ok(TransitionOutcome {
            event_id,
            status: EventStatus::Live,
            room_name: snapshot.room_name,
            started,
            failed,
        })
    }

    /// Pauses a live event: drains and stops the workers but keeps the
    /// room up so attendees stay connected. Idempotent when already
    /// paused.
    ///
    /// # Errors
    /// [`GatewayError::InvalidTransition`] from any status other than
    /// `live` or `paused`.
    pub async fn pause_event(
        &self,
        event_id: EventId,
        org_id: &str,
    ) -> Result<TransitionOutcome, GatewayError> {
        let entry = self.registry.get(event_id).await?;
        let room_name = {
            let mut record = entry.write().await;
            ensure_org(&record, org_id)?;
            if record.status == EventStatus::Paused {
                return Ok(outcome_of(&record));
            }
            check_transition(&record, EventStatus::Paused)?;
            record.status = EventStatus::Paused;
            record.last_modified_at = Utc::now();
            record.room_name.clone()
        };
        self.coordinator.stop_workers(event_id).await;
        self.bus.publish(SessionEvent::EventPaused {
            event_id,
            timestamp: Utc::now(),
        });
        tracing::info!(event_id = %event_id, room = %room_name, "event paused");
        Ok(TransitionOutcome {
            event_id,
            status: EventStatus::Paused,
            room_name,
            started: Vec::new(),
            failed: Vec::new(),
        })
    }

    /// Ends an event: stops the workers and tears the room down.
    /// Idempotent when already ended; allowed from `scheduled` (nothing
    /// to tear down), `live`, and `paused`.
    ///
    /// # Errors
    /// [`GatewayError::InvalidTransition`] from `canceled`.
    pub async fn end_event(
        &self,
        event_id: EventId,
        org_id: &str,
    ) -> Result<TransitionOutcome, GatewayError> {
        self.terminate(event_id, org_id, EventStatus::Ended).await
    }

    /// Cancels an event from any non-terminal status, tearing down
    /// whatever was provisioned. Idempotent when already canceled.
    ///
    /// # Errors
    /// [`GatewayError::InvalidTransition`] from `ended`.
    pub async fn cancel_event(
        &self,
        event_id: EventId,
        org_id: &str,
    ) -> Result<TransitionOutcome, GatewayError> {
        self.terminate(event_id, org_id, EventStatus::Canceled).await
    }

    async fn terminate(
        &self,
        event_id: EventId,
        org_id: &str,
        target: EventStatus,
    ) -> Result<TransitionOutcome, GatewayError> {
        let entry = self.registry.get(event_id).await?;
        let room_name = {
            let mut record = entry.write().await;
            ensure_org(&record, org_id)?;
            if record.status == target {
                return Ok(outcome_of(&record));
            }
            check_transition(&record, target)?;
            record.status = target;
            record.last_modified_at = Utc::now();
            record.room_name.clone()
        };
        // Teardown is idempotent, so it runs even when nothing was ever
        // provisioned (ending a scheduled event).
        self.coordinator.stop_workers(event_id).await;
        self.transport.close_room(&room_name).await?;
        let timestamp = Utc::now();
        self.bus.publish(match target {
            EventStatus::Canceled => SessionEvent::EventCanceled { event_id, timestamp },
            _ => SessionEvent::EventEnded { event_id, timestamp },
        });
        tracing::info!(event_id = %event_id, room = %room_name, status = %target, "event torn down");
        Ok(TransitionOutcome {
            event_id,
            status: target,
            room_name,
            started: Vec::new(),
            failed: Vec::new(),
        })
    }

    /// Issues a subscribe-only room token for a public join code.
    ///
    /// Validates that the requested language is configured for the event
    /// and that the requested capabilities are enabled for it. The
    /// not-found message stays generic so probing cannot distinguish
    /// unknown codes from codes of torn-down events.
    ///
    /// # Errors
    /// [`GatewayError::NotFound`] for unknown codes or terminal events,
    /// [`GatewayError::InvalidRequest`] for an unconfigured language,
    /// [`GatewayError::Configuration`] for a capability the language's
    /// mode does not enable.
    pub async fn request_attendee_token(
        &self,
        join_code: &str,
        language: &str,
        wants_audio: bool,
        wants_captions: bool,
    ) -> Result<AttendeeTokenGrant, GatewayError> {
        let invalid_code = || GatewayError::NotFound("invalid or expired join code".to_string());
        let entry = self
            .registry
            .find_by_join_code(join_code)
            .await
            .ok_or_else(invalid_code)?;
        let record = entry.read().await;
        if record.status.is_terminal() {
            return Err(invalid_code());
        }
        let output = record.output_for(language).ok_or_else(|| {
            GatewayError::InvalidRequest(format!(
                "language {language} is not configured for this event"
            ))
        })?;
        if wants_audio && !output.audio {
            return Err(GatewayError::Configuration(format!(
                "audio is not enabled for language {language}"
            )));
        }
        if wants_captions && !output.captions {
            return Err(GatewayError::Configuration(format!(
                "captions are not enabled for language {language}"
            )));
        }

        let identity = format!("viewer-{}", uuid::Uuid::new_v4().simple());
        let grants = RoomGrants::attendee(&record.room_name, &identity);
        let token = self
            .token_issuer
            .issue(grants, self.attendee_token_ttl_secs)?;
        let ttl = i64::try_from(self.attendee_token_ttl_secs).unwrap_or(i64::MAX);
        let expires_at = Utc::now() + chrono::Duration::seconds(ttl);
        tracing::debug!(event_id = %record.event_id, language, "attendee token issued");
        Ok(AttendeeTokenGrant {
            token,
            room_name: record.room_name.clone(),
            identity,
            language: language.to_string(),
            expires_at,
        })
    }

    /// Issues a full-publish room token for admin mic input or tooling.
    ///
    /// # Errors
    /// [`GatewayError::EventNotFound`] or [`GatewayError::Authorization`].
    pub async fn issue_publisher_token(
        &self,
        event_id: EventId,
        org_id: &str,
        identity: &str,
    ) -> Result<PublisherTokenGrant, GatewayError> {
        let entry = self.registry.get(event_id).await?;
        let record = entry.read().await;
        ensure_org(&record, org_id)?;
        if identity.trim().is_empty() {
            return Err(GatewayError::InvalidRequest(
                "identity must not be empty".to_string(),
            ));
        }
        let grants = RoomGrants::worker(&record.room_name, identity);
        let token = self
            .token_issuer
            .issue(grants, self.attendee_token_ttl_secs)?;
        let ttl = i64::try_from(self.attendee_token_ttl_secs).unwrap_or(i64::MAX);
        let expires_at = Utc::now() + chrono::Duration::seconds(ttl);
        tracing::debug!(event_id = %event_id, identity, "publisher token issued");
        Ok(PublisherTokenGrant {
            token,
            room_name: record.room_name.clone(),
            identity: identity.to_string(),
            expires_at,
        })
    }

    /// The shared event bus, for observers.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }
}

fn ensure_org(record: &EventRecord, org_id: &str) -> Result<(), GatewayError> {
    if record.org_id != org_id {
        return Err(GatewayError::Authorization(
            "event does not belong to this organization".to_string(),
        ));
    }
    Ok(())
}

fn check_transition(record: &EventRecord, target: EventStatus) -> Result<(), GatewayError> {
    if !record.status.can_transition_to(target) {
        return Err(GatewayError::InvalidTransition {
            from: record.status.to_string(),
            to: target.to_string(),
        });
    }
    Ok(())
}

fn outcome_of(record: &EventRecord) -> TransitionOutcome {
    TransitionOutcome {
        event_id: record.event_id,
        status: record.status,
        room_name: record.room_name.clone(),
        started: Vec::new(),
        failed: Vec::new(),
    }
}
