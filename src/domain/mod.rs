//! Domain layer: event identity, records, registry, outputs, event bus.
//!
//! This module contains the server-side domain model: event identity, the
//! event record with its status state machine, per-language output
//! configuration and the output resolver, the concurrent event registry,
//! and the broadcast bus for lifecycle events.

pub mod event_bus;
pub mod event_id;
pub mod event_record;
pub mod event_registry;
pub mod outputs;
pub mod session_event;

pub use event_bus::EventBus;
pub use event_id::EventId;
pub use event_record::{EventConfig, EventRecord, EventStatus, EventSummary};
pub use event_registry::EventRegistry;
pub use outputs::{DeliveryMode, LanguageOutput, ResolvedOutput, resolve};
pub use session_event::SessionEvent;
