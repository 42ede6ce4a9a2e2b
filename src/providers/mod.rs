//! Upstream provider seams for translation and speech synthesis.
//!
//! Workers depend only on these traits; concrete backends are injected
//! at startup. Provider failures surface as
//! [`GatewayError::UpstreamProvider`](crate::error::GatewayError) and are
//! contained to the utterance that triggered them.

mod scripted;

use async_trait::async_trait;

pub use scripted::{ScriptedRecognizer, ScriptedSynthesizer, ScriptedTranslator};

use crate::error::GatewayError;
use crate::room::AudioFrame;

/// One recognized segment of source speech.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    /// Recognized text.
    pub text: String,
    /// Whether the recognizer considers the segment complete.
    pub is_final: bool,
}

/// Recognizes speech in the presenter's source audio.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Transcribes a chunk of source-audio frames in `lang`.
    ///
    /// An empty result means the chunk contained no recognizable speech.
    async fn transcribe(
        &self,
        frames: &[AudioFrame],
        lang: &str,
    ) -> Result<Vec<Transcript>, GatewayError>;
}

/// Translates finalized utterances between languages.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Translates `text` from `src_lang` into `target_lang`.
    async fn translate(
        &self,
        text: &str,
        src_lang: &str,
        target_lang: &str,
    ) -> Result<String, GatewayError>;
}

/// Synthesizes speech for translated utterances.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Renders `text` as PCM frames in `lang`, optionally with a
    /// provider-specific voice.
    async fn synthesize(
        &self,
        text: &str,
        lang: &str,
        voice: Option<&str>,
    ) -> Result<Vec<AudioFrame>, GatewayError>;
}
