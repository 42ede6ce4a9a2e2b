//! Worker fleet management.
//!
//! The coordinator starts one worker per target language when an event
//! goes live, retries failed starts with exponential backoff, and drains
//! workers on pause, end, and cancel. A language whose worker cannot be
//! started is reported as failed without affecting the other languages.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use crate::domain::{EventBus, EventId, EventRecord, ResolvedOutput, SessionEvent};
use crate::error::GatewayError;
use crate::protocol::worker_identity;
use crate::providers::{SpeechRecognizer, SpeechSynthesizer, TranslationProvider};
use crate::room::{RoomGrants, RoomTransport, TokenIssuer};
use crate::worker::session::{
    ConfigLookup, TranslationWorker, WorkerContext, WorkerState,
};

/// Tuning knobs for worker startup and teardown.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Connection attempts before a language is reported failed.
    pub start_attempts: u32,
    /// Base delay of the exponential start backoff.
    pub start_backoff: std::time::Duration,
    /// How long a draining worker may run before it is aborted.
    pub drain_timeout: std::time::Duration,
    /// How long a worker waits for source audio before going text-only.
    pub source_audio_wait: std::time::Duration,
    /// Validity of issued worker tokens, in seconds.
    pub token_ttl_secs: u64,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            start_attempts: 3,
            start_backoff: std::time::Duration::from_millis(50),
            drain_timeout: std::time::Duration::from_secs(5),
            source_audio_wait: std::time::Duration::from_secs(30),
            token_ttl_secs: 24 * 60 * 60,
        }
    }
}

/// A language the coordinator could not bring up.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, utoipa::ToSchema)]
pub struct FailedLanguage {
    /// Target language code.
    pub lang: String,
    /// Human-readable failure reason.
    pub reason: String,
}

struct WorkerHandle {
    stop_tx: watch::Sender<bool>,
    state_rx: watch::Receiver<WorkerState>,
    transcriber: bool,
    join: JoinHandle<()>,
}

/// Starts and stops translation workers.
pub struct WorkerCoordinator {
    transport: Arc<dyn RoomTransport>,
    token_issuer: TokenIssuer,
    recognizer: Arc<dyn SpeechRecognizer>,
    translator: Arc<dyn TranslationProvider>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    lookup: Arc<dyn ConfigLookup>,
    bus: EventBus,
    settings: WorkerSettings,
    workers: Mutex<HashMap<(EventId, String), WorkerHandle>>,
}

impl std::fmt::Debug for WorkerCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerCoordinator")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl WorkerCoordinator {
    /// Creates a coordinator over the given transport and providers.
    #[must_use]
    pub fn new(
        transport: Arc<dyn RoomTransport>,
        token_issuer: TokenIssuer,
        recognizer: Arc<dyn SpeechRecognizer>,
        translator: Arc<dyn TranslationProvider>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        lookup: Arc<dyn ConfigLookup>,
        bus: EventBus,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            transport,
            token_issuer,
            recognizer,
            translator,
            synthesizer,
            lookup,
            bus,
            settings,
            workers: Mutex::new(HashMap::new()),
        }
    }

    /// Starts one worker per resolved target language of `record`.
    ///
    /// Languages equal to the source language are skipped, as are
    /// languages whose worker is already running, which makes the call
    /// safe for resume. The first worker brought up for the event also
    /// takes the transcriber role: it alone feeds the source audio
    /// through recognition and publishes the transcripts every language
    /// translates from. Returns the languages that could not be started;
    /// an empty vector means every language came up.
    pub async fn start_workers(
        &self,
        record: &EventRecord,
        outputs: &[ResolvedOutput],
    ) -> Vec<FailedLanguage> {
        let mut failed = Vec::new();
        for output in outputs {
            if output.lang == record.source_language {
                tracing::debug!(
                    event_id = %record.event_id,
                    lang = %output.lang,
                    "skipping worker for source language"
                );
                continue;
            }
            if let Err(e) = self.start_worker(record, output).await {
                failed.push(FailedLanguage {
                    lang: output.lang.clone(),
                    reason: e.to_string(),
                });
            }
        }
        failed
    }

    /// Starts the worker for one language, retrying with exponential
    /// backoff.
    ///
    /// Already-running workers are left untouched.
    ///
    /// # Errors
    /// Returns [`GatewayError::WorkerStart`] when every attempt fails.
    pub async fn start_worker(
        &self,
        record: &EventRecord,
        output: &ResolvedOutput,
    ) -> Result<(), GatewayError> {
        let key = (record.event_id, output.lang.clone());
        {
            let workers = self.workers.lock().await;
            if let Some(handle) = workers.get(&key)
                && !handle.join.is_finished()
            {
                tracing::debug!(event_id = %record.event_id, lang = %output.lang, "worker already running");
                return Ok(());
            }
        }

        let identity = worker_identity(&output.lang);
        let grants = RoomGrants::worker(&record.room_name, &identity);
        let mut last_error = None;
        for attempt in 0..self.settings.start_attempts {
            if attempt > 0 {
                let delay = self.settings.start_backoff * 2_u32.saturating_pow(attempt - 1);
                tokio::time::sleep(delay).await;
            }
            let token = match self
                .token_issuer
                .issue(grants.clone(), self.settings.token_ttl_secs)
            {
                Ok(token) => token,
                Err(e) => {
                    last_error = Some(e.to_string());
                    continue;
                }
            };
            match self
                .transport
                .connect_publisher(&record.room_name, &token)
                .await
            {
                Ok(connection) => {
                    self.spawn(record, output, connection).await;
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(
                        event_id = %record.event_id,
                        lang = %output.lang,
                        attempt = attempt + 1,
                        error = %e,
                        "worker connect attempt failed"
                    );
                    last_error = Some(e.to_string());
                }
            }
        }

        let reason = last_error.unwrap_or_else(|| "unknown error".to_string());
        self.bus.publish(SessionEvent::WorkerStartFailed {
            event_id: record.event_id,
            lang: output.lang.clone(),
            reason: reason.clone(),
            timestamp: chrono::Utc::now(),
        });
        Err(GatewayError::WorkerStart {
            lang: output.lang.clone(),
            reason,
        })
    }

    async fn spawn(
        &self,
        record: &EventRecord,
        output: &ResolvedOutput,
        connection: crate::room::PublisherConnection,
    ) {
        let (stop_tx, stop_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(WorkerState::Initializing);
        let mut workers = self.workers.lock().await;
        let transcriber = !workers
            .iter()
            .any(|((id, _), h)| *id == record.event_id && h.transcriber && !h.join.is_finished());
        let ctx = WorkerContext {
            event_id: record.event_id,
            room_name: record.room_name.clone(),
            source_language: record.source_language.clone(),
            output: output.clone(),
            transcriber,
            recognizer: Arc::clone(&self.recognizer),
            translator: Arc::clone(&self.translator),
            synthesizer: Arc::clone(&self.synthesizer),
            lookup: Arc::clone(&self.lookup),
            source_audio_wait: self.settings.source_audio_wait,
        };
        let worker = TranslationWorker::new(ctx, connection);
        let join = tokio::spawn(worker.run(stop_rx, state_tx));
        workers.insert(
            (record.event_id, output.lang.clone()),
            WorkerHandle {
                stop_tx,
                state_rx,
                transcriber,
                join,
            },
        );
        self.bus.publish(SessionEvent::WorkerStarted {
            event_id: record.event_id,
            lang: output.lang.clone(),
            timestamp: chrono::Utc::now(),
        });
        tracing::info!(event_id = %record.event_id, lang = %output.lang, "worker started");
    }

    /// Drains and stops every worker of `event_id`.
    ///
    /// Each worker gets the drain timeout to finish its in-flight
    /// utterance; stragglers are aborted.
    pub async fn stop_workers(&self, event_id: EventId) {
        let handles: Vec<(String, WorkerHandle)> = {
            let mut workers = self.workers.lock().await;
            let keys: Vec<_> = workers
                .keys()
                .filter(|(id, _)| *id == event_id)
                .cloned()
                .collect();
            keys.into_iter()
                .filter_map(|key| workers.remove(&key).map(|h| (key.1, h)))
                .collect()
        };
        for (lang, handle) in handles {
            let _ = handle.stop_tx.send(true);
            let abort = handle.join.abort_handle();
            if tokio::time::timeout(self.settings.drain_timeout, handle.join)
                .await
                .is_err()
            {
                tracing::warn!(event_id = %event_id, lang = %lang, "worker drain timed out, aborting");
                abort.abort();
            }
            self.bus.publish(SessionEvent::WorkerStopped {
                event_id,
                lang: lang.clone(),
                timestamp: chrono::Utc::now(),
            });
            tracing::info!(event_id = %event_id, lang = %lang, "worker stopped");
        }
    }

    /// Languages with a live worker for `event_id`, sorted.
    pub async fn running_languages(&self, event_id: EventId) -> Vec<String> {
        let workers = self.workers.lock().await;
        let mut langs: Vec<String> = workers
            .iter()
            .filter(|((id, _), handle)| *id == event_id && !handle.join.is_finished())
            .map(|((_, lang), _)| lang.clone())
            .collect();
        langs.sort();
        langs
    }

    /// Current state of one worker, if it exists.
    pub async fn worker_state(&self, event_id: EventId, lang: &str) -> Option<WorkerState> {
        let workers = self.workers.lock().await;
        workers
            .get(&(event_id, lang.to_string()))
            .map(|handle| *handle.state_rx.borrow())
    }
}
