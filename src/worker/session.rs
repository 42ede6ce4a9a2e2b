//! Per-language translation worker.
//!
//! One worker joins the room as `translator-{lang}`, consumes final
//! original-language transcripts from the data channel, and produces the
//! language's outputs: translated text messages, and synthesized audio on
//! the `translation-audio-{lang}` track bracketed by start/end markers.
//! One worker per event additionally transcribes the presenter's source
//! audio and publishes the recognized text on the data channel, where
//! every language's worker (itself included) picks it up. A provider
//! failure skips the current utterance and the worker keeps serving the
//! next one.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::domain::{EventConfig, EventId, ResolvedOutput};
use crate::error::GatewayError;
use crate::protocol::{AudioSegmentStatus, RoomMessage, audio_track_name, now_ms};
use crate::providers::{SpeechRecognizer, SpeechSynthesizer, TranslationProvider};
use crate::room::{AudioFrame, AudioTrackReader, AudioTrackWriter, PublisherConnection};

/// Source-audio frames fed to the recognizer per call (1 s at 100
/// frames/s).
const TRANSCRIBE_CHUNK_FRAMES: usize = 100;

/// Lifecycle state of a translation worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Connected, not yet watching for source audio.
    Initializing,
    /// Waiting for a presenter to publish source audio.
    AwaitingSourceAudio,
    /// Serving utterances.
    Streaming,
    /// Stop requested, finishing the in-flight utterance.
    Draining,
    /// Terminated.
    Stopped,
}

/// Live event-configuration lookup used by workers.
///
/// Workers consult this per utterance so output edits made after
/// provisioning take effect without a restart, falling back to the
/// provisioning-time snapshot when the lookup is unavailable.
#[async_trait]
pub trait ConfigLookup: Send + Sync {
    /// Resolves the current configuration of the event owning
    /// `room_name`, or `None` if no such event is known.
    async fn config_for_room(&self, room_name: &str)
    -> Result<Option<EventConfig>, GatewayError>;
}

/// Everything a worker needs besides its room connection.
pub struct WorkerContext {
    /// Event the worker belongs to.
    pub event_id: EventId,
    /// Room the worker serves.
    pub room_name: String,
    /// Language spoken by presenters.
    pub source_language: String,
    /// Output configuration snapshot for this worker's language.
    pub output: ResolvedOutput,
    /// Whether this worker transcribes the source audio for the room.
    /// Exactly one worker per event holds this role.
    pub transcriber: bool,
    /// Speech recognition backend.
    pub recognizer: Arc<dyn SpeechRecognizer>,
    /// Translation backend.
    pub translator: Arc<dyn TranslationProvider>,
    /// Speech synthesis backend.
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    /// Live configuration lookup.
    pub lookup: Arc<dyn ConfigLookup>,
    /// How long to wait for source audio before proceeding text-only.
    pub source_audio_wait: std::time::Duration,
}

impl std::fmt::Debug for WorkerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerContext")
            .field("event_id", &self.event_id)
            .field("room_name", &self.room_name)
            .field("lang", &self.output.lang)
            .finish_non_exhaustive()
    }
}

/// A running translation worker for one target language.
pub struct TranslationWorker {
    ctx: WorkerContext,
    connection: PublisherConnection,
    track: Option<AudioTrackWriter>,
    next_seq: u64,
    original_seq: u64,
}

impl std::fmt::Debug for TranslationWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationWorker")
            .field("ctx", &self.ctx)
            .field("next_seq", &self.next_seq)
            .finish_non_exhaustive()
    }
}

impl TranslationWorker {
    /// Wraps an established publisher connection.
    #[must_use]
    pub fn new(ctx: WorkerContext, connection: PublisherConnection) -> Self {
        Self {
            ctx,
            connection,
            track: None,
            next_seq: 0,
            original_seq: 0,
        }
    }

    /// Runs the worker until stopped or the room closes.
    ///
    /// State is reported through `state_tx`; `stop_rx` requests a drain.
    /// Draining finishes the in-flight utterance and exits without
    /// consuming further transcripts.
    pub async fn run(mut self, mut stop_rx: watch::Receiver<bool>, state_tx: watch::Sender<WorkerState>) {
        let lang = self.ctx.output.lang.clone();
        let mut source = self.ctx.transcriber.then(|| self.connection.source_audio());
        let mut pending: Vec<AudioFrame> = Vec::new();

        let _ = state_tx.send(WorkerState::AwaitingSourceAudio);
        if !self.connection.wait_for_source_audio(self.ctx.source_audio_wait).await {
            tracing::warn!(
                event_id = %self.ctx.event_id,
                lang = %lang,
                "no source audio within wait window, continuing text-only"
            );
        }
        if self.ctx.output.audio
            && let Err(e) = self.ensure_track().await
        {
            tracing::warn!(event_id = %self.ctx.event_id, lang = %lang, error = %e, "audio track publish failed");
        }
        let _ = state_tx.send(WorkerState::Streaming);

        let mut closed = self.connection.closed_watch();
        loop {
            tokio::select! {
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        break;
                    }
                }
                changed = closed.changed() => {
                    if changed.is_err() || *closed.borrow() {
                        tracing::debug!(event_id = %self.ctx.event_id, lang = %lang, "room closed, worker exiting");
                        let _ = state_tx.send(WorkerState::Stopped);
                        return;
                    }
                }
                frame = Self::next_source_frame(&mut source) => {
                    match frame {
                        Some(frame) => {
                            pending.push(frame);
                            if pending.len() >= TRANSCRIBE_CHUNK_FRAMES {
                                let chunk = std::mem::take(&mut pending);
                                self.transcribe_chunk(&chunk).await;
                            }
                        }
                        None => source = None,
                    }
                }
                msg = self.connection.recv_data() => {
                    let Some(msg) = msg else { break };
                    if let RoomMessage::OriginalText { lang: src, text, is_final: true, seq: _, ts: _ } = msg
                        && src == self.ctx.source_language
                    {
                        self.handle_utterance(&text).await;
                    }
                }
            }
        }

        let _ = state_tx.send(WorkerState::Draining);
        if self.track.take().is_some() {
            let name = audio_track_name(&lang);
            if let Err(e) = self.connection.unpublish_track(&name).await {
                tracing::debug!(event_id = %self.ctx.event_id, lang = %lang, error = %e, "track unpublish failed");
            }
        }
        let _ = state_tx.send(WorkerState::Stopped);
    }

    /// Next frame of source audio, or pending forever when this worker
    /// is not the transcriber.
    async fn next_source_frame(source: &mut Option<AudioTrackReader>) -> Option<AudioFrame> {
        match source {
            Some(reader) => reader.recv().await,
            None => std::future::pending().await,
        }
    }

    /// Recognizes one chunk of source audio and publishes the transcript
    /// as a venue caption plus the sequenced original-language message
    /// the translation pipelines consume.
    async fn transcribe_chunk(&mut self, frames: &[AudioFrame]) {
        let transcripts = match self
            .ctx
            .recognizer
            .transcribe(frames, &self.ctx.source_language)
            .await
        {
            Ok(transcripts) => transcripts,
            Err(e) => {
                tracing::warn!(event_id = %self.ctx.event_id, error = %e, "recognition failed, dropping chunk");
                return;
            }
        };
        for transcript in transcripts {
            let seq = self.original_seq;
            if transcript.is_final {
                self.original_seq += 1;
            }
            let caption = RoomMessage::Caption {
                lang: self.ctx.source_language.clone(),
                text: transcript.text.clone(),
                is_final: transcript.is_final,
            };
            let original = RoomMessage::OriginalText {
                lang: self.ctx.source_language.clone(),
                text: transcript.text,
                is_final: transcript.is_final,
                seq,
                ts: now_ms(),
            };
            for msg in [caption, original] {
                if let Err(e) = self.connection.publish_data(msg) {
                    tracing::warn!(event_id = %self.ctx.event_id, seq, error = %e, "transcript publish failed");
                }
            }
        }
    }

    async fn ensure_track(&mut self) -> Result<(), GatewayError> {
        if self.track.is_none() {
            let name = audio_track_name(&self.ctx.output.lang);
            self.track = Some(self.connection.publish_audio_track(&name).await?);
        }
        Ok(())
    }

    /// Effective output for this worker's language, consulted per
    /// utterance. `None` means the language was removed from the event.
    async fn effective_output(&self) -> Option<ResolvedOutput> {
        match self.ctx.lookup.config_for_room(&self.ctx.room_name).await {
            Ok(Some(config)) => config
                .outputs
                .into_iter()
                .find(|o| o.lang == self.ctx.output.lang),
            Ok(None) => Some(self.ctx.output.clone()),
            Err(e) => {
                tracing::debug!(
                    room = %self.ctx.room_name,
                    error = %e,
                    "config lookup failed, using provisioned snapshot"
                );
                Some(self.ctx.output.clone())
            }
        }
    }

    async fn handle_utterance(&mut self, text: &str) {
        let Some(output) = self.effective_output().await else {
            return;
        };
        let seq = self.next_seq;
        self.next_seq += 1;
        let lang = output.lang.clone();

        let translated = match self
            .ctx
            .translator
            .translate(text, &self.ctx.source_language, &lang)
            .await
        {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(event_id = %self.ctx.event_id, lang = %lang, seq, error = %e, "translation failed, skipping utterance");
                // Audio lifecycle markers exist only for audio-enabled
                // languages, including the failure case.
                if output.audio {
                    self.publish_marker(&lang, AudioSegmentStatus::Error, seq);
                }
                return;
            }
        };

        if output.captions {
            let msg = RoomMessage::TranslationText {
                src_lang: self.ctx.source_language.clone(),
                lang: lang.clone(),
                text: translated.clone(),
                is_final: true,
                seq,
                ts: now_ms(),
            };
            if let Err(e) = self.connection.publish_data(msg) {
                tracing::warn!(event_id = %self.ctx.event_id, lang = %lang, seq, error = %e, "caption publish failed");
            }
        }

        if output.audio {
            if let Err(e) = self.ensure_track().await {
                tracing::warn!(event_id = %self.ctx.event_id, lang = %lang, seq, error = %e, "audio track publish failed");
                self.publish_marker(&lang, AudioSegmentStatus::Error, seq);
                return;
            }
            self.publish_marker(&lang, AudioSegmentStatus::Start, seq);
            match self
                .ctx
                .synthesizer
                .synthesize(&translated, &lang, output.voice.as_deref())
                .await
            {
                Ok(frames) => {
                    if let Some(track) = &self.track {
                        for frame in frames {
                            track.write(frame);
                        }
                    }
                    self.publish_marker(&lang, AudioSegmentStatus::End, seq);
                }
                Err(e) => {
                    tracing::warn!(event_id = %self.ctx.event_id, lang = %lang, seq, error = %e, "synthesis failed, skipping segment");
                    self.publish_marker(&lang, AudioSegmentStatus::Error, seq);
                }
            }
        }
    }

    fn publish_marker(&self, lang: &str, status: AudioSegmentStatus, seq: u64) {
        let msg = RoomMessage::TranslationAudio {
            lang: lang.to_string(),
            status,
            seq,
            ts: now_ms(),
        };
        if let Err(e) = self.connection.publish_data(msg) {
            tracing::warn!(lang = %lang, seq, error = %e, "marker publish failed");
        }
    }
}
