//! Translation workers and their coordinator.

mod coordinator;
mod session;

pub use coordinator::{FailedLanguage, WorkerCoordinator, WorkerSettings};
pub use session::{ConfigLookup, TranslationWorker, WorkerContext, WorkerState};

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::domain::{
        EventBus, EventConfig, EventId, EventRecord, LanguageOutput, ResolvedOutput, resolve,
    };
    use crate::error::GatewayError;
    use crate::protocol::{AudioSegmentStatus, RoomMessage, RoomMetadata};
    use crate::providers::{
        ScriptedRecognizer, ScriptedSynthesizer, ScriptedTranslator, SpeechSynthesizer,
        TranslationProvider,
    };
    use crate::room::{
        AudioFrame, LocalRoomRouter, PublisherConnection, RoomGrants, RoomTransport,
        SubscriberConnection, TokenIssuer, TrackEvent,
    };

    use super::*;

    const SECRET: &[u8] = b"test-secret-0123456789abcdef";

    struct SnapshotLookup;

    #[async_trait]
    impl ConfigLookup for SnapshotLookup {
        async fn config_for_room(
            &self,
            _room_name: &str,
        ) -> Result<Option<EventConfig>, GatewayError> {
            Ok(None)
        }
    }

    struct FailingTranslator;

    #[async_trait]
    impl TranslationProvider for FailingTranslator {
        async fn translate(
            &self,
            text: &str,
            src_lang: &str,
            target_lang: &str,
        ) -> Result<String, GatewayError> {
            if text.contains("boom") {
                return Err(GatewayError::UpstreamProvider(
                    "translation backend unavailable".to_string(),
                ));
            }
            ScriptedTranslator.translate(text, src_lang, target_lang).await
        }
    }

    fn test_settings() -> WorkerSettings {
        WorkerSettings {
            start_attempts: 3,
            start_backoff: Duration::from_millis(5),
            drain_timeout: Duration::from_secs(2),
            source_audio_wait: Duration::from_millis(100),
            token_ttl_secs: 60,
        }
    }

    fn record_with(outputs: &[(&str, bool, bool)]) -> (EventRecord, Vec<ResolvedOutput>) {
        let outputs: Vec<LanguageOutput> = outputs
            .iter()
            .map(|(lang, captions, audio)| LanguageOutput {
                lang: (*lang).to_string(),
                captions: *captions,
                audio: *audio,
                voice: None,
            })
            .collect();
        let Ok(resolved) = resolve(&outputs) else {
            panic!("invalid outputs in fixture");
        };
        let record = EventRecord::new("Town Hall", "org-1", "en-US", outputs, false);
        (record, resolved)
    }

    fn coordinator(
        transport: Arc<dyn RoomTransport>,
        translator: Arc<dyn TranslationProvider>,
    ) -> WorkerCoordinator {
        let synthesizer: Arc<dyn SpeechSynthesizer> = Arc::new(ScriptedSynthesizer);
        WorkerCoordinator::new(
            transport,
            TokenIssuer::new(SECRET),
            Arc::new(ScriptedRecognizer),
            translator,
            synthesizer,
            Arc::new(SnapshotLookup),
            EventBus::new(64),
            test_settings(),
        )
    }

    async fn provision(router: &LocalRoomRouter, record: &EventRecord, outputs: &[ResolvedOutput]) {
        let metadata = RoomMetadata {
            event_id: record.event_id,
            org_id: record.org_id.clone(),
            source_language: record.source_language.clone(),
            outputs: outputs.to_vec(),
        };
        let Ok(()) = router.create_room(&record.room_name, &metadata).await else {
            panic!("room provisioning failed");
        };
    }

    async fn connect_presenter(
        router: &LocalRoomRouter,
        room_name: &str,
    ) -> PublisherConnection {
        let issuer = TokenIssuer::new(SECRET);
        let Ok(token) = issuer.issue(RoomGrants::worker(room_name, "presenter"), 60) else {
            panic!("token issue failed");
        };
        let Ok(conn) = router.connect_publisher(room_name, &token).await else {
            panic!("presenter connect failed");
        };
        conn
    }

    async fn connect_viewer(
        router: &LocalRoomRouter,
        room_name: &str,
    ) -> SubscriberConnection {
        let issuer = TokenIssuer::new(SECRET);
        let Ok(token) = issuer.issue(RoomGrants::attendee(room_name, "viewer-1"), 60) else {
            panic!("token issue failed");
        };
        let Ok(conn) = router.connect_subscriber(room_name, &token).await else {
            panic!("viewer connect failed");
        };
        conn
    }

    fn original(text: &str, is_final: bool, seq: u64) -> RoomMessage {
        RoomMessage::OriginalText {
            lang: "en-US".to_string(),
            text: text.to_string(),
            is_final,
            seq,
            ts: 0,
        }
    }

    async fn collect_until(
        viewer: &mut SubscriberConnection,
        mut done: impl FnMut(&[RoomMessage]) -> bool,
    ) -> Vec<RoomMessage> {
        let mut messages = Vec::new();
        let _ = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if done(&messages) {
                    return;
                }
                let Some(msg) = viewer.recv_data().await else {
                    return;
                };
                messages.push(msg);
            }
        })
        .await;
        messages
    }

    fn translations_for<'a>(messages: &'a [RoomMessage], lang: &str) -> Vec<&'a RoomMessage> {
        messages
            .iter()
            .filter(|m| {
                matches!(m, RoomMessage::TranslationText { lang: l, .. } if l == lang)
            })
            .collect()
    }

    fn markers_for<'a>(messages: &'a [RoomMessage], lang: &str) -> Vec<&'a RoomMessage> {
        messages
            .iter()
            .filter(|m| {
                matches!(m, RoomMessage::TranslationAudio { lang: l, .. } if l == lang)
            })
            .collect()
    }

    fn originals(messages: &[RoomMessage]) -> Vec<&RoomMessage> {
        messages
            .iter()
            .filter(|m| matches!(m, RoomMessage::OriginalText { .. }))
            .collect()
    }

    async fn wait_streaming(coord: &WorkerCoordinator, event_id: EventId, lang: &str) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while coord.worker_state(event_id, lang).await != Some(WorkerState::Streaming) {
            if tokio::time::Instant::now() > deadline {
                panic!("worker for {lang} never reached streaming");
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn final_utterance_fans_out_per_language() {
        let router = Arc::new(LocalRoomRouter::new(TokenIssuer::new(SECRET), 256));
        let (record, outputs) = record_with(&[("es-ES", true, true), ("fr-FR", true, false)]);
        provision(&router, &record, &outputs).await;
        let coord = coordinator(
            Arc::clone(&router) as Arc<dyn RoomTransport>,
            Arc::new(ScriptedTranslator),
        );

        let mut viewer = connect_viewer(&router, &record.room_name).await;
        let presenter = connect_presenter(&router, &record.room_name).await;
        let Ok(_mic) = presenter.publish_audio_track("microphone").await else {
            panic!("source audio publish failed");
        };

        assert!(coord.start_workers(&record, &outputs).await.is_empty());
        assert_eq!(
            coord.running_languages(record.event_id).await,
            vec!["es-ES".to_string(), "fr-FR".to_string()]
        );

        let Ok(()) = presenter.publish_data(original("hello", true, 0)) else {
            panic!("publish failed");
        };

        let messages = collect_until(&mut viewer, |msgs| {
            !translations_for(msgs, "fr-FR").is_empty() && markers_for(msgs, "es-ES").len() >= 2
        })
        .await;

        let es_text = translations_for(&messages, "es-ES");
        assert_eq!(es_text.len(), 1);
        let Some(RoomMessage::TranslationText { text, src_lang, seq, .. }) = es_text.first()
        else {
            panic!("missing spanish translation");
        };
        assert_eq!(text, "[es-ES] hello");
        assert_eq!(src_lang, "en-US");

        // Audio markers share the text message's seq, start before end.
        let es_markers = markers_for(&messages, "es-ES");
        assert_eq!(es_markers.len(), 2);
        let Some(RoomMessage::TranslationAudio { status: first, seq: first_seq, .. }) =
            es_markers.first()
        else {
            panic!("missing start marker");
        };
        let Some(RoomMessage::TranslationAudio { status: second, seq: second_seq, .. }) =
            es_markers.get(1)
        else {
            panic!("missing end marker");
        };
        assert_eq!(*first, AudioSegmentStatus::Start);
        assert_eq!(*second, AudioSegmentStatus::End);
        assert_eq!(first_seq, seq);
        assert_eq!(second_seq, seq);

        // Captions-only language produces text but no audio markers.
        assert_eq!(translations_for(&messages, "fr-FR").len(), 1);
        assert!(markers_for(&messages, "fr-FR").is_empty());

        coord.stop_workers(record.event_id).await;
        assert!(coord.running_languages(record.event_id).await.is_empty());
    }

    #[tokio::test]
    async fn interim_transcripts_are_ignored() {
        let router = Arc::new(LocalRoomRouter::new(TokenIssuer::new(SECRET), 256));
        let (record, outputs) = record_with(&[("es-ES", true, false)]);
        provision(&router, &record, &outputs).await;
        let coord = coordinator(
            Arc::clone(&router) as Arc<dyn RoomTransport>,
            Arc::new(ScriptedTranslator),
        );

        let mut viewer = connect_viewer(&router, &record.room_name).await;
        let presenter = connect_presenter(&router, &record.room_name).await;
        let Ok(_mic) = presenter.publish_audio_track("microphone").await else {
            panic!("source audio publish failed");
        };
        assert!(coord.start_workers(&record, &outputs).await.is_empty());

        for interim in ["hel", "hell"] {
            let Ok(()) = presenter.publish_data(original(interim, false, 0)) else {
                panic!("publish failed");
            };
        }
        let Ok(()) = presenter.publish_data(original("hello world", true, 0)) else {
            panic!("publish failed");
        };

        let messages = collect_until(&mut viewer, |msgs| {
            !translations_for(msgs, "es-ES").is_empty()
        })
        .await;
        let texts = translations_for(&messages, "es-ES");
        assert_eq!(texts.len(), 1);
        let Some(RoomMessage::TranslationText { text, seq, .. }) = texts.first() else {
            panic!("missing translation");
        };
        assert_eq!(text, "[es-ES] hello world");
        assert_eq!(*seq, 0);

        coord.stop_workers(record.event_id).await;
    }

    #[tokio::test]
    async fn provider_failure_skips_only_the_failed_utterance() {
        let router = Arc::new(LocalRoomRouter::new(TokenIssuer::new(SECRET), 256));
        let (record, outputs) = record_with(&[("es-ES", true, true)]);
        provision(&router, &record, &outputs).await;
        let coord = coordinator(
            Arc::clone(&router) as Arc<dyn RoomTransport>,
            Arc::new(FailingTranslator),
        );

        let mut viewer = connect_viewer(&router, &record.room_name).await;
        let presenter = connect_presenter(&router, &record.room_name).await;
        let Ok(_mic) = presenter.publish_audio_track("microphone").await else {
            panic!("source audio publish failed");
        };
        assert!(coord.start_workers(&record, &outputs).await.is_empty());

        let Ok(()) = presenter.publish_data(original("boom", true, 0)) else {
            panic!("publish failed");
        };
        let Ok(()) = presenter.publish_data(original("hello", true, 1)) else {
            panic!("publish failed");
        };

        let messages = collect_until(&mut viewer, |msgs| {
            !translations_for(msgs, "es-ES").is_empty()
        })
        .await;

        // The failed utterance produced only an error marker under seq 0.
        let markers = markers_for(&messages, "es-ES");
        let Some(RoomMessage::TranslationAudio { status, seq, .. }) = markers.first() else {
            panic!("missing error marker");
        };
        assert_eq!(*status, AudioSegmentStatus::Error);
        assert_eq!(*seq, 0);

        // The worker survived and served the next utterance under seq 1.
        let texts = translations_for(&messages, "es-ES");
        let Some(RoomMessage::TranslationText { text, seq, .. }) = texts.first() else {
            panic!("missing translation");
        };
        assert_eq!(text, "[es-ES] hello");
        assert_eq!(*seq, 1);

        coord.stop_workers(record.event_id).await;
    }

    #[tokio::test]
    async fn source_language_gets_no_worker() {
        let router = Arc::new(LocalRoomRouter::new(TokenIssuer::new(SECRET), 256));
        let (record, outputs) = record_with(&[("en-US", true, false), ("es-ES", true, false)]);
        provision(&router, &record, &outputs).await;
        let coord = coordinator(
            Arc::clone(&router) as Arc<dyn RoomTransport>,
            Arc::new(ScriptedTranslator),
        );

        assert!(coord.start_workers(&record, &outputs).await.is_empty());
        assert_eq!(
            coord.running_languages(record.event_id).await,
            vec!["es-ES".to_string()]
        );
        coord.stop_workers(record.event_id).await;
    }

    /// Transport that refuses publisher connections for one identity.
    struct FaultyTransport {
        inner: Arc<LocalRoomRouter>,
        issuer: TokenIssuer,
        refuse_identity: String,
    }

    #[async_trait]
    impl RoomTransport for FaultyTransport {
        async fn create_room(
            &self,
            room_name: &str,
            metadata: &RoomMetadata,
        ) -> Result<(), GatewayError> {
            self.inner.create_room(room_name, metadata).await
        }

        async fn close_room(&self, room_name: &str) -> Result<(), GatewayError> {
            self.inner.close_room(room_name).await
        }

        async fn connect_publisher(
            &self,
            room_name: &str,
            token: &str,
        ) -> Result<PublisherConnection, GatewayError> {
            let grants = self.issuer.verify(token)?;
            if grants.identity == self.refuse_identity {
                return Err(GatewayError::Provisioning(
                    "media backend rejected the connection".to_string(),
                ));
            }
            self.inner.connect_publisher(room_name, token).await
        }

        async fn connect_subscriber(
            &self,
            room_name: &str,
            token: &str,
        ) -> Result<SubscriberConnection, GatewayError> {
            self.inner.connect_subscriber(room_name, token).await
        }

        async fn room_exists(&self, room_name: &str) -> bool {
            self.inner.room_exists(room_name).await
        }

        async fn metadata(&self, room_name: &str) -> Option<RoomMetadata> {
            self.inner.metadata(room_name).await
        }
    }

    #[tokio::test]
    async fn one_failed_language_does_not_block_the_others() {
        let router = Arc::new(LocalRoomRouter::new(TokenIssuer::new(SECRET), 256));
        let (record, outputs) = record_with(&[("es-ES", true, false), ("fr-FR", true, false)]);
        provision(&router, &record, &outputs).await;
        let transport = Arc::new(FaultyTransport {
            inner: Arc::clone(&router),
            issuer: TokenIssuer::new(SECRET),
            refuse_identity: "translator-fr-FR".to_string(),
        });
        let coord = coordinator(transport, Arc::new(ScriptedTranslator));

        let failed = coord.start_workers(&record, &outputs).await;
        assert_eq!(failed.len(), 1);
        let Some(failure) = failed.first() else {
            panic!("expected one failure");
        };
        assert_eq!(failure.lang, "fr-FR");
        assert_eq!(
            coord.running_languages(record.event_id).await,
            vec!["es-ES".to_string()]
        );
        coord.stop_workers(record.event_id).await;
    }

    #[tokio::test]
    async fn start_workers_is_idempotent_for_running_languages() {
        let router = Arc::new(LocalRoomRouter::new(TokenIssuer::new(SECRET), 256));
        let (record, outputs) = record_with(&[("es-ES", true, false)]);
        provision(&router, &record, &outputs).await;
        let coord = coordinator(
            Arc::clone(&router) as Arc<dyn RoomTransport>,
            Arc::new(ScriptedTranslator),
        );

        assert!(coord.start_workers(&record, &outputs).await.is_empty());
        assert!(coord.start_workers(&record, &outputs).await.is_empty());
        assert_eq!(
            coord.running_languages(record.event_id).await,
            vec!["es-ES".to_string()]
        );
        coord.stop_workers(record.event_id).await;
    }

    #[tokio::test]
    async fn source_audio_is_transcribed_and_translated() {
        let router = Arc::new(LocalRoomRouter::new(TokenIssuer::new(SECRET), 256));
        let (record, outputs) = record_with(&[("es-ES", true, true), ("fr-FR", true, false)]);
        provision(&router, &record, &outputs).await;
        let coord = coordinator(
            Arc::clone(&router) as Arc<dyn RoomTransport>,
            Arc::new(ScriptedTranslator),
        );

        let mut viewer = connect_viewer(&router, &record.room_name).await;
        let presenter = connect_presenter(&router, &record.room_name).await;
        let Ok(mic) = presenter.publish_audio_track("microphone").await else {
            panic!("source audio publish failed");
        };

        assert!(coord.start_workers(&record, &outputs).await.is_empty());
        wait_streaming(&coord, record.event_id, "es-ES").await;
        wait_streaming(&coord, record.event_id, "fr-FR").await;

        // One second of microphone audio fills exactly one recognition chunk.
        for _ in 0..100 {
            mic.write(AudioFrame::silence());
        }

        let messages = collect_until(&mut viewer, |msgs| {
            !translations_for(msgs, "fr-FR").is_empty() && markers_for(msgs, "es-ES").len() >= 2
        })
        .await;

        // A single worker transcribes, so the utterance appears exactly once.
        let transcripts = originals(&messages);
        assert_eq!(transcripts.len(), 1);
        let Some(RoomMessage::OriginalText { lang, text, is_final, seq, .. }) =
            transcripts.first()
        else {
            panic!("missing transcript");
        };
        assert_eq!(lang, "en-US");
        assert_eq!(text, "heard 100 frames");
        assert!(*is_final);
        assert_eq!(*seq, 0);

        // The source-language caption accompanies the transcript.
        assert!(messages.iter().any(|m| matches!(
            m,
            RoomMessage::Caption { lang, text, is_final: true }
                if lang == "en-US" && text == "heard 100 frames"
        )));

        // Every target language translated the recognized utterance.
        let es_text = translations_for(&messages, "es-ES");
        let Some(RoomMessage::TranslationText { text, seq, .. }) = es_text.first() else {
            panic!("missing spanish translation");
        };
        assert_eq!(text, "[es-ES] heard 100 frames");
        assert_eq!(*seq, 0);
        assert_eq!(translations_for(&messages, "fr-FR").len(), 1);

        coord.stop_workers(record.event_id).await;
    }

    #[tokio::test]
    async fn draining_unpublishes_the_audio_track() {
        let router = Arc::new(LocalRoomRouter::new(TokenIssuer::new(SECRET), 256));
        let (record, outputs) = record_with(&[("es-ES", true, true)]);
        provision(&router, &record, &outputs).await;
        let coord = coordinator(
            Arc::clone(&router) as Arc<dyn RoomTransport>,
            Arc::new(ScriptedTranslator),
        );

        let mut viewer = connect_viewer(&router, &record.room_name).await;
        let presenter = connect_presenter(&router, &record.room_name).await;
        let Ok(_mic) = presenter.publish_audio_track("microphone").await else {
            panic!("source audio publish failed");
        };
        assert!(coord.start_workers(&record, &outputs).await.is_empty());
        wait_streaming(&coord, record.event_id, "es-ES").await;

        coord.stop_workers(record.event_id).await;

        let Ok(()) = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let Some(event) = viewer.recv_track_event().await else {
                    panic!("track event stream closed before unpublish");
                };
                if let TrackEvent::Unpublished { track_name, .. } = event {
                    assert_eq!(track_name, "translation-audio-es-ES");
                    return;
                }
            }
        })
        .await
        else {
            panic!("worker never unpublished its track");
        };
    }

    #[tokio::test]
    async fn captions_only_failure_emits_no_audio_markers() {
        let router = Arc::new(LocalRoomRouter::new(TokenIssuer::new(SECRET), 256));
        let (record, outputs) = record_with(&[("es-ES", true, false)]);
        provision(&router, &record, &outputs).await;
        let coord = coordinator(
            Arc::clone(&router) as Arc<dyn RoomTransport>,
            Arc::new(FailingTranslator),
        );

        let mut viewer = connect_viewer(&router, &record.room_name).await;
        let presenter = connect_presenter(&router, &record.room_name).await;
        let Ok(_mic) = presenter.publish_audio_track("microphone").await else {
            panic!("source audio publish failed");
        };
        assert!(coord.start_workers(&record, &outputs).await.is_empty());

        let Ok(()) = presenter.publish_data(original("boom", true, 0)) else {
            panic!("publish failed");
        };
        let Ok(()) = presenter.publish_data(original("hello", true, 1)) else {
            panic!("publish failed");
        };

        let messages = collect_until(&mut viewer, |msgs| {
            !translations_for(msgs, "es-ES").is_empty()
        })
        .await;

        // No audio output means no markers, not even for the failure.
        assert!(markers_for(&messages, "es-ES").is_empty());
        let Some(RoomMessage::TranslationText { text, .. }) =
            translations_for(&messages, "es-ES").first()
        else {
            panic!("missing translation");
        };
        assert_eq!(text, "[es-ES] hello");

        coord.stop_workers(record.event_id).await;
    }
}
