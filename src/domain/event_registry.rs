//! Concurrent event storage with per-event fine-grained locking.
//!
//! [`EventRegistry`] stores all known events in a `HashMap` where each
//! entry is individually protected by a [`tokio::sync::RwLock`]. This
//! allows concurrent reads on the same event and concurrent writes on
//! different events, while a single event's lifecycle transitions are
//! serialized through its per-entry write lock.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::EventId;
use super::event_record::{EventRecord, EventSummary};
use crate::error::GatewayError;

/// Central store for all events the gateway knows about.
///
/// Uses a `RwLock<HashMap<...>>` for the outer map and per-entry
/// `Arc<RwLock<EventRecord>>` for fine-grained per-event locking.
/// Secondary lookups (by room name, by join code) scan the map; the
/// event population is small and admin-driven.
#[derive(Debug, Default)]
pub struct EventRegistry {
    events: RwLock<HashMap<EventId, Arc<RwLock<EventRecord>>>>,
}

impl EventRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new event record into the registry.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] if an event with the same
    /// ID already exists (should never happen with UUID v4).
    pub async fn insert(&self, record: EventRecord) -> Result<EventId, GatewayError> {
        let event_id = record.event_id;
        let mut map = self.events.write().await;
        if map.contains_key(&event_id) {
            return Err(GatewayError::InvalidRequest(format!(
                "event {event_id} already exists"
            )));
        }
        map.insert(event_id, Arc::new(RwLock::new(record)));
        Ok(event_id)
    }

    /// Returns a shared reference to the event record behind its per-event
    /// lock.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::EventNotFound`] if no event with the given
    /// ID exists.
    pub async fn get(&self, event_id: EventId) -> Result<Arc<RwLock<EventRecord>>, GatewayError> {
        let map = self.events.read().await;
        map.get(&event_id)
            .cloned()
            .ok_or(GatewayError::EventNotFound(event_id))
    }

    /// Removes an event from the registry, returning its shared entry.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::EventNotFound`] if no event with the given
    /// ID exists.
    pub async fn remove(&self, event_id: EventId) -> Result<Arc<RwLock<EventRecord>>, GatewayError> {
        let mut map = self.events.write().await;
        map.remove(&event_id)
            .ok_or(GatewayError::EventNotFound(event_id))
    }

    /// Finds the event owning the given room identifier.
    pub async fn find_by_room_name(&self, room_name: &str) -> Option<Arc<RwLock<EventRecord>>> {
        let map = self.events.read().await;
        for entry in map.values() {
            if entry.read().await.room_name == room_name {
                return Some(Arc::clone(entry));
            }
        }
        None
    }

    /// Finds the event with the given public join code.
    pub async fn find_by_join_code(&self, join_code: &str) -> Option<Arc<RwLock<EventRecord>>> {
        let map = self.events.read().await;
        for entry in map.values() {
            if entry.read().await.join_code.as_deref() == Some(join_code) {
                return Some(Arc::clone(entry));
            }
        }
        None
    }

    /// Returns summaries of all events, optionally filtered by owning org.
    pub async fn list(&self, org_filter: Option<&str>) -> Vec<EventSummary> {
        let map = self.events.read().await;
        let mut summaries = Vec::with_capacity(map.len());
        for entry in map.values() {
            let record = entry.read().await;
            if let Some(org) = org_filter
                && record.org_id != org
            {
                continue;
            }
            summaries.push(EventSummary::from(&*record));
        }
        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        summaries
    }

    /// Returns the number of events in the registry.
    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    /// Returns `true` if the registry contains no events.
    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::outputs::{DeliveryMode, LanguageOutput};

    fn make_record(org: &str) -> EventRecord {
        EventRecord::new(
            "Quarterly Review",
            org,
            "en-US",
            vec![LanguageOutput::from_mode("es-ES", DeliveryMode::Both, None)],
            false,
        )
    }

    #[tokio::test]
    async fn insert_and_get() {
        let registry = EventRegistry::new();
        let record = make_record("org-a");
        let id = record.event_id;

        let result = registry.insert(record).await;
        assert!(result.is_ok());

        let fetched = registry.get(id).await;
        assert!(fetched.is_ok());
    }

    #[tokio::test]
    async fn get_nonexistent_returns_error() {
        let registry = EventRegistry::new();
        let result = registry.get(EventId::new()).await;
        assert!(matches!(result, Err(GatewayError::EventNotFound(_))));
    }

    #[tokio::test]
    async fn find_by_room_name_matches() {
        let registry = EventRegistry::new();
        let record = make_record("org-a");
        let room = record.room_name.clone();
        let _ = registry.insert(record).await;

        assert!(registry.find_by_room_name(&room).await.is_some());
        assert!(registry.find_by_room_name("ev-nope-0").await.is_none());
    }

    #[tokio::test]
    async fn find_by_join_code_matches() {
        let registry = EventRegistry::new();
        let mut record = make_record("org-a");
        record.join_code = Some("ABCD1234".to_string());
        let _ = registry.insert(record).await;

        assert!(registry.find_by_join_code("ABCD1234").await.is_some());
        assert!(registry.find_by_join_code("ZZZZ9999").await.is_none());
    }

    #[tokio::test]
    async fn list_filters_by_org() {
        let registry = EventRegistry::new();
        let _ = registry.insert(make_record("org-a")).await;
        let _ = registry.insert(make_record("org-b")).await;

        assert_eq!(registry.list(None).await.len(), 2);
        assert_eq!(registry.list(Some("org-a")).await.len(), 1);
        assert!(registry.list(Some("org-c")).await.is_empty());
    }

    #[tokio::test]
    async fn remove_then_get_fails() {
        let registry = EventRegistry::new();
        let record = make_record("org-a");
        let id = record.event_id;
        let _ = registry.insert(record).await;

        assert!(registry.remove(id).await.is_ok());
        assert!(registry.get(id).await.is_err());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn len_tracks_inserts() {
        let registry = EventRegistry::new();
        assert_eq!(registry.len().await, 0);
        let _ = registry.insert(make_record("org-a")).await;
        assert_eq!(registry.len().await, 1);
    }
}
