//! Data-channel message types and their wire encoding.
//!
//! The wire format uses dynamic type strings (`translation-text-{lang}`,
//! `translation-audio-{lang}`) with camelCase fields. Those strings are
//! parsed into the tagged [`RoomMessage`] enum immediately at the boundary
//! so no raw string matching leaks into business logic.

use serde::{Deserialize, Serialize};

/// Wire prefix for per-language translated text messages.
pub const TRANSLATION_TEXT_PREFIX: &str = "translation-text-";
/// Wire prefix for per-language synthesized-audio lifecycle markers.
pub const TRANSLATION_AUDIO_PREFIX: &str = "translation-audio-";
/// Wire type for legacy/compat original-language captions.
pub const CAPTION_TYPE: &str = "caption";
/// Wire type for original-language transcripts.
pub const ORIGINAL_TEXT_TYPE: &str = "original-language-text";

/// Lifecycle status of one synthesized-audio segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioSegmentStatus {
    /// Synthesized audio for this `seq` is about to play.
    Start,
    /// Synthesized audio for this `seq` finished.
    End,
    /// Translation or synthesis failed for this `seq`; the stream continues
    /// with the next utterance.
    Error,
}

/// Error produced when a wire message cannot be parsed.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Unrecognized `type` string.
    #[error("unknown message type: {0}")]
    UnknownType(String),
    /// A field required by the message type is absent.
    #[error("message type {msg_type} missing field {field}")]
    MissingField {
        /// The wire type string.
        msg_type: String,
        /// The absent field.
        field: &'static str,
    },
    /// The language embedded in the type string disagrees with the `lang`
    /// field. The type string is authoritative; mismatches are rejected.
    #[error("type string language {embedded} disagrees with lang field {field}")]
    LanguageMismatch {
        /// Language from the type string.
        embedded: String,
        /// Language from the `lang` field.
        field: String,
    },
}

/// A message on the room's reliable data channel.
///
/// Identity is `(type, seq)`: `seq` is a monotonically increasing
/// per-source counter so receivers can detect out-of-order or duplicate
/// delivery; text and audio markers of the same utterance share one `seq`.
/// `ts` is the producer's wall-clock epoch milliseconds, used for latency
/// measurement only, never for ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "WireMessage", try_from = "WireMessage")]
pub enum RoomMessage {
    /// Legacy/compat original-language caption.
    Caption {
        /// Source language code.
        lang: String,
        /// Transcript text.
        text: String,
        /// Whether this is a final (vs interim) transcript.
        is_final: bool,
    },
    /// Original-language transcript.
    OriginalText {
        /// Source language code.
        lang: String,
        /// Transcript text.
        text: String,
        /// Whether this is a final transcript.
        is_final: bool,
        /// Per-source utterance counter.
        seq: u64,
        /// Producer wall clock, epoch milliseconds.
        ts: u64,
    },
    /// Translated text for one target language.
    TranslationText {
        /// Source language code.
        src_lang: String,
        /// Target language code (also embedded in the wire type string).
        lang: String,
        /// Translated text.
        text: String,
        /// Whether this is a final translation.
        is_final: bool,
        /// Utterance counter shared with the audio markers.
        seq: u64,
        /// Producer wall clock, epoch milliseconds.
        ts: u64,
    },
    /// Lifecycle marker for the synthesized-audio segment of `seq`.
    TranslationAudio {
        /// Target language code (embedded in the wire type string).
        lang: String,
        /// Segment status.
        status: AudioSegmentStatus,
        /// Utterance counter shared with the text message.
        seq: u64,
        /// Producer wall clock, epoch milliseconds.
        ts: u64,
    },
}

impl RoomMessage {
    /// The language tag embedded in this message.
    #[must_use]
    pub fn lang(&self) -> &str {
        match self {
            Self::Caption { lang, .. }
            | Self::OriginalText { lang, .. }
            | Self::TranslationText { lang, .. }
            | Self::TranslationAudio { lang, .. } => lang,
        }
    }

    /// The utterance counter, if this message kind carries one.
    #[must_use]
    pub const fn seq(&self) -> Option<u64> {
        match self {
            Self::Caption { .. } => None,
            Self::OriginalText { seq, .. }
            | Self::TranslationText { seq, .. }
            | Self::TranslationAudio { seq, .. } => Some(*seq),
        }
    }

    /// The dynamic wire `type` string for this message.
    #[must_use]
    pub fn wire_type(&self) -> String {
        match self {
            Self::Caption { .. } => CAPTION_TYPE.to_string(),
            Self::OriginalText { .. } => ORIGINAL_TEXT_TYPE.to_string(),
            Self::TranslationText { lang, .. } => format!("{TRANSLATION_TEXT_PREFIX}{lang}"),
            Self::TranslationAudio { lang, .. } => format!("{TRANSLATION_AUDIO_PREFIX}{lang}"),
        }
    }
}

/// Flat wire representation bridging the JSON shape and [`RoomMessage`].
///
/// All optional fields are omitted when absent, matching the original
/// producers' output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    /// Message type discriminator, possibly embedding a language code.
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Language tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    /// Source language (translation messages only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_lang: Option<String>,
    /// Text payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Final (vs interim) flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_final: Option<bool>,
    /// Audio segment status (audio markers only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AudioSegmentStatus>,
    /// Utterance counter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
    /// Producer wall clock, epoch milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ts: Option<u64>,
}

impl From<RoomMessage> for WireMessage {
    fn from(msg: RoomMessage) -> Self {
        let msg_type = msg.wire_type();
        match msg {
            RoomMessage::Caption { lang, text, is_final } => Self {
                msg_type,
                lang: Some(lang),
                src_lang: None,
                text: Some(text),
                is_final: Some(is_final),
                status: None,
                seq: None,
                ts: None,
            },
            RoomMessage::OriginalText { lang, text, is_final, seq, ts } => Self {
                msg_type,
                lang: Some(lang),
                src_lang: None,
                text: Some(text),
                is_final: Some(is_final),
                status: None,
                seq: Some(seq),
                ts: Some(ts),
            },
            RoomMessage::TranslationText { src_lang, lang, text, is_final, seq, ts } => Self {
                msg_type,
                lang: Some(lang),
                src_lang: Some(src_lang),
                text: Some(text),
                is_final: Some(is_final),
                status: None,
                seq: Some(seq),
                ts: Some(ts),
            },
            RoomMessage::TranslationAudio { lang: _, status, seq, ts } => Self {
                msg_type,
                lang: None,
                src_lang: None,
                text: None,
                is_final: None,
                status: Some(status),
                seq: Some(seq),
                ts: Some(ts),
            },
        }
    }
}

impl TryFrom<WireMessage> for RoomMessage {
    type Error = ProtocolError;

    fn try_from(wire: WireMessage) -> Result<Self, Self::Error> {
        let require_text = |field: Option<String>, name: &'static str| {
            field.ok_or_else(|| ProtocolError::MissingField {
                msg_type: wire.msg_type.clone(),
                field: name,
            })
        };

        if wire.msg_type == CAPTION_TYPE {
            return Ok(Self::Caption {
                lang: require_text(wire.lang.clone(), "lang")?,
                text: require_text(wire.text.clone(), "text")?,
                is_final: wire.is_final.unwrap_or(true),
            });
        }
        if wire.msg_type == ORIGINAL_TEXT_TYPE {
            return Ok(Self::OriginalText {
                lang: require_text(wire.lang.clone(), "lang")?,
                text: require_text(wire.text.clone(), "text")?,
                is_final: wire.is_final.unwrap_or(true),
                seq: wire.seq.unwrap_or(0),
                ts: wire.ts.unwrap_or(0),
            });
        }
        if let Some(embedded) = wire.msg_type.strip_prefix(TRANSLATION_TEXT_PREFIX) {
            let embedded = embedded.to_string();
            if let Some(field) = &wire.lang
                && field != &embedded
            {
                return Err(ProtocolError::LanguageMismatch {
                    embedded,
                    field: field.clone(),
                });
            }
            return Ok(Self::TranslationText {
                src_lang: require_text(wire.src_lang.clone(), "srcLang")?,
                lang: embedded,
                text: require_text(wire.text.clone(), "text")?,
                is_final: wire.is_final.unwrap_or(true),
                seq: wire.seq.unwrap_or(0),
                ts: wire.ts.unwrap_or(0),
            });
        }
        if let Some(embedded) = wire.msg_type.strip_prefix(TRANSLATION_AUDIO_PREFIX) {
            let embedded = embedded.to_string();
            if let Some(field) = &wire.lang
                && field != &embedded
            {
                return Err(ProtocolError::LanguageMismatch {
                    embedded,
                    field: field.clone(),
                });
            }
            let status = wire.status.ok_or(ProtocolError::MissingField {
                msg_type: wire.msg_type.clone(),
                field: "status",
            })?;
            return Ok(Self::TranslationAudio {
                lang: embedded,
                status,
                seq: wire.seq.unwrap_or(0),
                ts: wire.ts.unwrap_or(0),
            });
        }
        Err(ProtocolError::UnknownType(wire.msg_type))
    }
}

/// Current wall clock as epoch milliseconds, for the `ts` field.
#[must_use]
pub fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().try_into().unwrap_or(0)
}
