//! # babel-gateway
//!
//! Session coordination gateway for real-time multi-language translation
//! events.
//!
//! An organizer creates an event with a source language and a set of
//! target-language outputs, then starts it. The gateway provisions a
//! transport room, launches one translation worker per target language,
//! and hands out scoped room tokens: publish-capable tokens for
//! presenters and workers, subscribe-only tokens for attendees holding
//! the event's join code. Workers consume the presenter's transcripts,
//! publish translated captions as data messages, and stream synthesized
//! speech on per-language audio tracks.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/) ── AttendeeSession (attendee/)
//!     │
//!     ├── EventService (service/)
//!     ├── WorkerCoordinator ── TranslationWorker (worker/)
//!     ├── EventBus (domain/)
//!     │
//!     ├── EventRegistry (domain/)
//!     ├── RoomTransport ── LocalRoomRouter (room/)
//!     └── TranslationProvider / SpeechSynthesizer (providers/)
//! ```

pub mod api;
pub mod app_state;
pub mod attendee;
pub mod config;
pub mod domain;
pub mod error;
pub mod protocol;
pub mod providers;
pub mod room;
pub mod service;
pub mod worker;
pub mod ws;
