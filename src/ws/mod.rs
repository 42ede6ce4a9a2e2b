//! WebSocket layer: attendee connections and message routing.
//!
//! The WebSocket endpoint at `/ws` gives an attendee a live view of one
//! event: translation captions and audio-segment notices for their
//! selected language, plus commands to retune the session in place.

pub mod connection;
pub mod handler;
pub mod messages;
