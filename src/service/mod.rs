//! Service layer orchestrating the event lifecycle.

mod event_service;

pub use event_service::{
    AttendeeTokenGrant, EventService, NewEvent, PublisherTokenGrant, RegistryLookup,
    TransitionOutcome,
};
