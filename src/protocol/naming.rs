//! Naming conventions for worker identities and audio tracks.
//!
//! These names are contracts shared with attendee clients: a client that
//! wants synthesized audio for `es-ES` subscribes to the track named
//! `translation-audio-es-ES` published by the participant
//! `translator-es-ES`.

/// Prefix of translator participant identities.
pub const WORKER_IDENTITY_PREFIX: &str = "translator-";
/// Prefix of published synthesized-audio track names.
pub const AUDIO_TRACK_PREFIX: &str = "translation-audio-";

/// Room participant identity for the worker serving `lang`.
#[must_use]
pub fn worker_identity(lang: &str) -> String {
    format!("{WORKER_IDENTITY_PREFIX}{lang}")
}

/// Published track name carrying synthesized audio for `lang`.
#[must_use]
pub fn audio_track_name(lang: &str) -> String {
    format!("{AUDIO_TRACK_PREFIX}{lang}")
}

/// Target language served by a translation-audio track, if the name
/// follows the convention.
#[must_use]
pub fn language_for_track(track_name: &str) -> Option<&str> {
    track_name
        .strip_prefix(AUDIO_TRACK_PREFIX)
        .filter(|lang| !lang.is_empty())
}

/// Whether a participant identity belongs to a translation worker.
#[must_use]
pub fn is_worker_identity(identity: &str) -> bool {
    identity
        .strip_prefix(WORKER_IDENTITY_PREFIX)
        .is_some_and(|lang| !lang.is_empty())
}
