//! Deterministic providers for local runs and tests.

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::providers::{SpeechRecognizer, SpeechSynthesizer, Transcript, TranslationProvider};
use crate::room::{AudioFrame, SAMPLES_PER_FRAME};

/// Recognizer that describes each chunk deterministically instead of
/// decoding it: one final transcript naming the frame count.
#[derive(Debug, Default)]
pub struct ScriptedRecognizer;

#[async_trait]
impl SpeechRecognizer for ScriptedRecognizer {
    async fn transcribe(
        &self,
        frames: &[AudioFrame],
        _lang: &str,
    ) -> Result<Vec<Transcript>, GatewayError> {
        if frames.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![Transcript {
            text: format!("heard {} frames", frames.len()),
            is_final: true,
        }])
    }
}

/// Translator that tags the input with the target language instead of
/// calling an upstream service. Output is deterministic, which keeps
/// routing tests exact.
#[derive(Debug, Default)]
pub struct ScriptedTranslator;

#[async_trait]
impl TranslationProvider for ScriptedTranslator {
    async fn translate(
        &self,
        text: &str,
        _src_lang: &str,
        target_lang: &str,
    ) -> Result<String, GatewayError> {
        Ok(format!("[{target_lang}] {text}"))
    }
}

/// Synthesizer that renders a fixed-amplitude tone, one frame per eight
/// characters of input (minimum one frame).
#[derive(Debug, Default)]
pub struct ScriptedSynthesizer;

#[async_trait]
impl SpeechSynthesizer for ScriptedSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        _lang: &str,
        _voice: Option<&str>,
    ) -> Result<Vec<AudioFrame>, GatewayError> {
        let frames = (text.len() / 8).max(1);
        Ok((0..frames)
            .map(|_| AudioFrame {
                samples: vec![1000; SAMPLES_PER_FRAME],
            })
            .collect())
    }
}
