//! Attendee session client.
//!
//! Attendees join subscribe-only and receive the same multiplexed stream
//! as everyone else; selecting a language, muting audio, or hiding
//! captions are all local decisions. The session filters data messages
//! and track subscriptions to the selected language's naming convention
//! and gates rendering on the user's toggles.

use std::sync::Arc;

use crate::error::GatewayError;
use crate::protocol::{AudioSegmentStatus, RoomMessage, audio_track_name};
use crate::room::{
    AudioFrame, AudioTrackReader, RoomTransport, SubscriberConnection, SubscriberEvent,
    TrackEvent,
};

/// Attendee-side rendering preferences.
#[derive(Debug, Clone)]
pub struct AttendeePreferences {
    /// Selected target language.
    pub language: String,
    /// Play synthesized audio.
    pub audio_enabled: bool,
    /// Show translated captions.
    pub captions_enabled: bool,
}

/// Local audio playback state.
///
/// Some runtimes refuse to start audio output without a user gesture.
/// That condition is surfaced instead of silently dropping frames, and
/// playback is retried once the gesture arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Audio frames are being delivered to the output device.
    Playing,
    /// The runtime blocked autoplay; waiting for a user gesture.
    NeedsUserGesture,
}

/// A renderable update produced from the room stream.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttendeeUpdate {
    /// Translated caption text for the selected language.
    Caption {
        /// Caption text.
        text: String,
        /// Final (vs interim) flag.
        is_final: bool,
        /// Utterance counter, for correlating with audio markers.
        seq: u64,
    },
    /// Audio segment lifecycle for the selected language.
    AudioSegment {
        /// Segment status.
        status: AudioSegmentStatus,
        /// Utterance counter shared with the caption.
        seq: u64,
    },
}

/// Stream event delivered to the attendee-facing connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttendeeEvent {
    /// A renderable update for the selected language.
    Update(AttendeeUpdate),
    /// A track was published in the room.
    TrackPublished {
        /// Published track name.
        track_name: String,
        /// Whether it serves the selected language.
        matches_selection: bool,
    },
    /// A track was withdrawn from the room.
    TrackUnpublished {
        /// Withdrawn track name.
        track_name: String,
        /// Whether it served the selected language.
        matches_selection: bool,
    },
    /// The room closed; the session is over.
    Closed,
}

/// One attendee's connection to a live event.
pub struct AttendeeSession {
    connection: SubscriberConnection,
    language: String,
    audio_enabled: bool,
    captions_enabled: bool,
    autoplay_allowed: bool,
    track: Option<AudioTrackReader>,
}

impl std::fmt::Debug for AttendeeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttendeeSession")
            .field("language", &self.language)
            .field("audio_enabled", &self.audio_enabled)
            .field("captions_enabled", &self.captions_enabled)
            .finish_non_exhaustive()
    }
}

impl AttendeeSession {
    /// Connects to `room_name` with an attendee token and subscribes to
    /// the selected language's audio track if one is already published.
    ///
    /// `autoplay_allowed` reports whether the runtime permits audio
    /// output without a user gesture.
    ///
    /// # Errors
    /// Propagates transport authorization and connection failures.
    pub async fn connect(
        transport: &Arc<dyn RoomTransport>,
        room_name: &str,
        token: &str,
        prefs: AttendeePreferences,
        autoplay_allowed: bool,
    ) -> Result<Self, GatewayError> {
        let connection = transport.connect_subscriber(room_name, token).await?;
        let mut session = Self {
            connection,
            language: prefs.language,
            audio_enabled: prefs.audio_enabled,
            captions_enabled: prefs.captions_enabled,
            autoplay_allowed,
            track: None,
        };
        session.attach_track().await;
        Ok(session)
    }

    /// The currently selected language.
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Whether translated audio is currently enabled.
    #[must_use]
    pub fn audio_enabled(&self) -> bool {
        self.audio_enabled
    }

    /// Whether captions are currently enabled.
    #[must_use]
    pub fn captions_enabled(&self) -> bool {
        self.captions_enabled
    }

    /// Current playback state for the audio toggle.
    #[must_use]
    pub fn playback_state(&self) -> PlaybackState {
        if self.audio_enabled && !self.autoplay_allowed {
            PlaybackState::NeedsUserGesture
        } else {
            PlaybackState::Playing
        }
    }

    /// Reports the user gesture that unblocks autoplay and retries the
    /// track attach.
    pub async fn user_gesture(&mut self) {
        self.autoplay_allowed = true;
        self.attach_track().await;
    }

    /// Whether a track published under `track_name` serves the selected
    /// language.
    #[must_use]
    pub fn wants_track(&self, track_name: &str) -> bool {
        track_name == audio_track_name(&self.language)
    }

    /// Whether a data message belongs to the selected language. Messages
    /// for other languages are dropped before rendering, so cross-language
    /// leakage is impossible regardless of toggles.
    #[must_use]
    pub fn accepts(&self, msg: &RoomMessage) -> bool {
        msg.lang() == self.language
    }

    /// Renders a message into an update, honoring the language filter and
    /// the captions/audio toggles.
    #[must_use]
    pub fn render(&self, msg: &RoomMessage) -> Option<AttendeeUpdate> {
        if !self.accepts(msg) {
            return None;
        }
        match msg {
            RoomMessage::TranslationText { text, is_final, seq, .. } if self.captions_enabled => {
                Some(AttendeeUpdate::Caption {
                    text: text.clone(),
                    is_final: *is_final,
                    seq: *seq,
                })
            }
            RoomMessage::TranslationAudio { status, seq, .. } if self.audio_enabled => {
                Some(AttendeeUpdate::AudioSegment {
                    status: *status,
                    seq: *seq,
                })
            }
            // Source-language selections get the presenter's own text.
            RoomMessage::OriginalText { text, is_final, seq, .. } if self.captions_enabled => {
                Some(AttendeeUpdate::Caption {
                    text: text.clone(),
                    is_final: *is_final,
                    seq: *seq,
                })
            }
            // Venue captions carry no utterance counter.
            RoomMessage::Caption { text, is_final, .. } if self.captions_enabled => {
                Some(AttendeeUpdate::Caption {
                    text: text.clone(),
                    is_final: *is_final,
                    seq: 0,
                })
            }
            _ => None,
        }
    }

    /// Receives the next session event: a renderable update, a track
    /// lifecycle notice, or a close. Filtered messages are skipped.
    pub async fn next_event(&mut self) -> AttendeeEvent {
        loop {
            match self.connection.recv_any().await {
                SubscriberEvent::Data(msg) => {
                    if let Some(update) = self.render(&msg) {
                        return AttendeeEvent::Update(update);
                    }
                }
                SubscriberEvent::Track(TrackEvent::Published { track_name, .. }) => {
                    return AttendeeEvent::TrackPublished {
                        matches_selection: self.wants_track(&track_name),
                        track_name,
                    };
                }
                SubscriberEvent::Track(TrackEvent::Unpublished { track_name, .. }) => {
                    if self.wants_track(&track_name) {
                        self.track = None;
                    }
                    return AttendeeEvent::TrackUnpublished {
                        matches_selection: self.wants_track(&track_name),
                        track_name,
                    };
                }
                SubscriberEvent::Closed => return AttendeeEvent::Closed,
            }
        }
    }

    /// Receives the next audio frame of the selected language, or `None`
    /// when audio is disabled, blocked, or not attached.
    pub async fn next_audio_frame(&mut self) -> Option<AudioFrame> {
        if !self.audio_enabled || !self.autoplay_allowed {
            return None;
        }
        if self.track.is_none() {
            self.attach_track().await;
        }
        match &mut self.track {
            Some(track) => track.recv().await,
            None => None,
        }
    }

    /// Switches the selected language in place: the old track handler is
    /// detached and the new language's track attached on the same room
    /// connection, without reconnecting.
    pub async fn switch_language(&mut self, language: impl Into<String>) {
        self.language = language.into();
        self.track = None;
        self.attach_track().await;
    }

    /// Toggles audio playback.
    pub fn set_audio_enabled(&mut self, enabled: bool) {
        self.audio_enabled = enabled;
        if !enabled {
            self.track = None;
        }
    }

    /// Toggles caption display.
    pub fn set_captions_enabled(&mut self, enabled: bool) {
        self.captions_enabled = enabled;
    }

    /// Whether an audio track for the selected language is attached.
    #[must_use]
    pub fn track_attached(&self) -> bool {
        self.track.is_some()
    }

    async fn attach_track(&mut self) {
        if !self.audio_enabled || !self.autoplay_allowed {
            return;
        }
        let name = audio_track_name(&self.language);
        self.track = self.connection.subscribe_track(&name).await;
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::EventId;
    use crate::protocol::RoomMetadata;
    use crate::room::{LocalRoomRouter, RoomGrants, TokenIssuer};

    const SECRET: &[u8] = b"test-secret-0123456789abcdef";

    async fn setup(room: &str) -> (Arc<dyn RoomTransport>, Arc<LocalRoomRouter>, String) {
        let router = Arc::new(LocalRoomRouter::new(TokenIssuer::new(SECRET), 64));
        let metadata = RoomMetadata {
            event_id: EventId::new(),
            org_id: "org-1".to_string(),
            source_language: "en-US".to_string(),
            outputs: Vec::new(),
        };
        let Ok(()) = router.create_room(room, &metadata).await else {
            panic!("room provisioning failed");
        };
        let issuer = TokenIssuer::new(SECRET);
        let Ok(token) = issuer.issue(RoomGrants::attendee(room, "viewer-1"), 60) else {
            panic!("token issue failed");
        };
        (Arc::clone(&router) as Arc<dyn RoomTransport>, router, token)
    }

    fn prefs(language: &str) -> AttendeePreferences {
        AttendeePreferences {
            language: language.to_string(),
            audio_enabled: true,
            captions_enabled: true,
        }
    }

    fn translation(lang: &str, text: &str, seq: u64) -> RoomMessage {
        RoomMessage::TranslationText {
            src_lang: "en-US".to_string(),
            lang: lang.to_string(),
            text: text.to_string(),
            is_final: true,
            seq,
            ts: 0,
        }
    }

    #[tokio::test]
    async fn other_languages_are_filtered_out() {
        let (transport, _router, token) = setup("r1").await;
        let Ok(session) =
            AttendeeSession::connect(&transport, "r1", &token, prefs("es-ES"), true).await
        else {
            panic!("connect failed");
        };

        assert!(session.render(&translation("fr-FR", "bonjour", 0)).is_none());
        assert_eq!(
            session.render(&translation("es-ES", "hola", 0)),
            Some(AttendeeUpdate::Caption {
                text: "hola".to_string(),
                is_final: true,
                seq: 0,
            })
        );
        assert!(session.wants_track("translation-audio-es-ES"));
        assert!(!session.wants_track("translation-audio-fr-FR"));
    }

    #[tokio::test]
    async fn source_language_selection_gets_original_text() {
        let (transport, _router, token) = setup("r1").await;
        let Ok(session) =
            AttendeeSession::connect(&transport, "r1", &token, prefs("en-US"), true).await
        else {
            panic!("connect failed");
        };

        let original = RoomMessage::OriginalText {
            lang: "en-US".to_string(),
            text: "good morning".to_string(),
            is_final: true,
            seq: 3,
            ts: 0,
        };
        assert_eq!(
            session.render(&original),
            Some(AttendeeUpdate::Caption {
                text: "good morning".to_string(),
                is_final: true,
                seq: 3,
            })
        );
        // Translated text for other languages still filtered.
        assert!(session.render(&translation("es-ES", "hola", 3)).is_none());
    }

    #[tokio::test]
    async fn toggles_gate_rendering_locally() {
        let (transport, _router, token) = setup("r1").await;
        let Ok(mut session) =
            AttendeeSession::connect(&transport, "r1", &token, prefs("es-ES"), true).await
        else {
            panic!("connect failed");
        };

        session.set_captions_enabled(false);
        assert!(session.render(&translation("es-ES", "hola", 0)).is_none());

        let marker = RoomMessage::TranslationAudio {
            lang: "es-ES".to_string(),
            status: AudioSegmentStatus::Start,
            seq: 0,
            ts: 0,
        };
        assert!(session.render(&marker).is_some());
        session.set_audio_enabled(false);
        assert!(session.render(&marker).is_none());
    }

    #[tokio::test]
    async fn switch_language_reattaches_without_reconnect() {
        let (transport, router, token) = setup("r1").await;
        let issuer = TokenIssuer::new(SECRET);
        let Ok(worker_token) = issuer.issue(RoomGrants::worker("r1", "translator-es-ES"), 60)
        else {
            panic!("token issue failed");
        };
        let Ok(publisher) = router.connect_publisher("r1", &worker_token).await else {
            panic!("publisher connect failed");
        };
        let Ok(_es) = publisher.publish_audio_track("translation-audio-es-ES").await else {
            panic!("track publish failed");
        };
        let Ok(_fr) = publisher.publish_audio_track("translation-audio-fr-FR").await else {
            panic!("track publish failed");
        };

        let Ok(mut session) =
            AttendeeSession::connect(&transport, "r1", &token, prefs("es-ES"), true).await
        else {
            panic!("connect failed");
        };
        assert!(session.track_attached());

        session.switch_language("fr-FR").await;
        assert_eq!(session.language(), "fr-FR");
        assert!(session.track_attached());
        assert!(session.render(&translation("es-ES", "hola", 0)).is_none());
        assert!(session.render(&translation("fr-FR", "bonjour", 0)).is_some());
    }

    #[tokio::test]
    async fn track_lifecycle_notices_follow_selection() {
        let (transport, router, token) = setup("r1").await;
        let issuer = TokenIssuer::new(SECRET);
        let Ok(worker_token) = issuer.issue(RoomGrants::worker("r1", "translator-es-ES"), 60)
        else {
            panic!("token issue failed");
        };
        let Ok(publisher) = router.connect_publisher("r1", &worker_token).await else {
            panic!("publisher connect failed");
        };

        let Ok(mut session) =
            AttendeeSession::connect(&transport, "r1", &token, prefs("es-ES"), true).await
        else {
            panic!("connect failed");
        };

        let Ok(writer) = publisher.publish_audio_track("translation-audio-es-ES").await else {
            panic!("track publish failed");
        };
        assert_eq!(
            session.next_event().await,
            AttendeeEvent::TrackPublished {
                track_name: "translation-audio-es-ES".to_string(),
                matches_selection: true,
            }
        );

        drop(writer);
        let Ok(()) = publisher.unpublish_track("translation-audio-es-ES").await else {
            panic!("unpublish failed");
        };
        assert_eq!(
            session.next_event().await,
            AttendeeEvent::TrackUnpublished {
                track_name: "translation-audio-es-ES".to_string(),
                matches_selection: true,
            }
        );
        assert!(!session.track_attached());
    }

    #[tokio::test]
    async fn blocked_autoplay_surfaces_and_recovers_on_gesture() {
        let (transport, router, token) = setup("r1").await;
        let issuer = TokenIssuer::new(SECRET);
        let Ok(worker_token) = issuer.issue(RoomGrants::worker("r1", "translator-es-ES"), 60)
        else {
            panic!("token issue failed");
        };
        let Ok(publisher) = router.connect_publisher("r1", &worker_token).await else {
            panic!("publisher connect failed");
        };
        let Ok(writer) = publisher.publish_audio_track("translation-audio-es-ES").await else {
            panic!("track publish failed");
        };

        let Ok(mut session) =
            AttendeeSession::connect(&transport, "r1", &token, prefs("es-ES"), false).await
        else {
            panic!("connect failed");
        };
        assert_eq!(session.playback_state(), PlaybackState::NeedsUserGesture);
        assert!(!session.track_attached());

        session.user_gesture().await;
        assert_eq!(session.playback_state(), PlaybackState::Playing);
        assert!(session.track_attached());

        writer.write(AudioFrame::silence());
        assert_eq!(session.next_audio_frame().await, Some(AudioFrame::silence()));
    }
}
