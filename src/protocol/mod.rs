//! Shared room protocol: data-channel messages, naming conventions, and
//! the metadata snapshot written at provisioning time.

mod message;
mod metadata;
mod naming;

pub use message::{
    AudioSegmentStatus, CAPTION_TYPE, ORIGINAL_TEXT_TYPE, ProtocolError, RoomMessage,
    TRANSLATION_AUDIO_PREFIX, TRANSLATION_TEXT_PREFIX, WireMessage, now_ms,
};
pub use metadata::RoomMetadata;
pub use naming::{
    AUDIO_TRACK_PREFIX, WORKER_IDENTITY_PREFIX, audio_track_name, is_worker_identity,
    language_for_track, worker_identity,
};
