//! Per-language output configuration and the output resolver.
//!
//! Each target language configured for an event carries an independent
//! captions flag and audio flag (the admin UI toggles them separately),
//! with the invariant that at least one is enabled. [`resolve`] turns the
//! configured outputs into the list of per-language capabilities that must
//! be provisioned, re-validating the invariant before provisioning.

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Delivery mode for one target language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Translated text only.
    CaptionsOnly,
    /// Synthesized speech only.
    AudioOnly,
    /// Both captions and synthesized speech.
    Both,
}

impl DeliveryMode {
    /// Whether this mode delivers captions.
    #[must_use]
    pub const fn captions(self) -> bool {
        matches!(self, Self::CaptionsOnly | Self::Both)
    }

    /// Whether this mode delivers synthesized audio.
    #[must_use]
    pub const fn audio(self) -> bool {
        matches!(self, Self::AudioOnly | Self::Both)
    }
}

/// One configured target language of an event.
///
/// Stored as an independent flag pair rather than a tri-state so that the
/// two UI toggles map directly onto it; the at-least-one-true invariant is
/// enforced at write time (event creation) and again in [`resolve`].
/// Immutable while the event is live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LanguageOutput {
    /// BCP-47 style language code, e.g. `es-ES`.
    pub lang: String,
    /// Whether translated captions are delivered for this language.
    pub captions: bool,
    /// Whether synthesized audio is delivered for this language.
    pub audio: bool,
    /// Optional synthesis voice identifier.
    pub voice: Option<String>,
}

impl LanguageOutput {
    /// Builds an output from a delivery mode selection.
    #[must_use]
    pub fn from_mode(lang: impl Into<String>, mode: DeliveryMode, voice: Option<String>) -> Self {
        Self {
            lang: lang.into(),
            captions: mode.captions(),
            audio: mode.audio(),
            voice,
        }
    }

    /// Returns the delivery mode this flag pair corresponds to, or `None`
    /// for the invalid both-disabled combination.
    #[must_use]
    pub const fn mode(&self) -> Option<DeliveryMode> {
        match (self.captions, self.audio) {
            (true, true) => Some(DeliveryMode::Both),
            (true, false) => Some(DeliveryMode::CaptionsOnly),
            (false, true) => Some(DeliveryMode::AudioOnly),
            (false, false) => None,
        }
    }
}

/// Validated per-language capability set that must be provisioned.
///
/// Also the `outputs` element shape of the room metadata snapshot and the
/// live config-lookup response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ResolvedOutput {
    /// Target language code.
    pub lang: String,
    /// Captions enabled.
    pub captions: bool,
    /// Audio enabled.
    pub audio: bool,
    /// Synthesis voice identifier, if configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
}

/// Derives the per-language output capabilities for an event's configured
/// languages.
///
/// Pure function over the configured outputs. Rejects an empty list,
/// duplicate language codes, and any output with neither captions nor
/// audio enabled.
///
/// # Errors
///
/// Returns [`GatewayError::Configuration`] on any of the above.
pub fn resolve(outputs: &[LanguageOutput]) -> Result<Vec<ResolvedOutput>, GatewayError> {
    if outputs.is_empty() {
        return Err(GatewayError::Configuration(
            "event has no target languages configured".to_string(),
        ));
    }

    let mut seen = std::collections::HashSet::new();
    let mut resolved = Vec::with_capacity(outputs.len());
    for output in outputs {
        if output.lang.trim().is_empty() {
            return Err(GatewayError::Configuration(
                "language code must not be empty".to_string(),
            ));
        }
        if !seen.insert(output.lang.as_str()) {
            return Err(GatewayError::Configuration(format!(
                "duplicate language output: {}",
                output.lang
            )));
        }
        if !output.captions && !output.audio {
            return Err(GatewayError::Configuration(format!(
                "language {} enables neither captions nor audio",
                output.lang
            )));
        }
        resolved.push(ResolvedOutput {
            lang: output.lang.clone(),
            captions: output.captions,
            audio: output.audio,
            voice: output.voice.clone(),
        });
    }
    Ok(resolved)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn mode_flag_derivation() {
        assert!(DeliveryMode::CaptionsOnly.captions());
        assert!(!DeliveryMode::CaptionsOnly.audio());
        assert!(!DeliveryMode::AudioOnly.captions());
        assert!(DeliveryMode::AudioOnly.audio());
        assert!(DeliveryMode::Both.captions());
        assert!(DeliveryMode::Both.audio());
    }

    #[test]
    fn resolve_round_trip() {
        let outputs = vec![
            LanguageOutput::from_mode("es-ES", DeliveryMode::Both, None),
            LanguageOutput::from_mode("fr-FR", DeliveryMode::CaptionsOnly, None),
        ];
        let resolved = resolve(&outputs);
        let Ok(resolved) = resolved else {
            panic!("expected valid outputs");
        };
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved.first().map(|o| o.lang.as_str()), Some("es-ES"));
        assert_eq!(resolved.first().map(|o| (o.captions, o.audio)), Some((true, true)));
        assert_eq!(resolved.get(1).map(|o| o.lang.as_str()), Some("fr-FR"));
        assert_eq!(resolved.get(1).map(|o| (o.captions, o.audio)), Some((true, false)));
    }

    #[test]
    fn resolve_rejects_neither_enabled() {
        let outputs = vec![LanguageOutput {
            lang: "de-DE".to_string(),
            captions: false,
            audio: false,
            voice: None,
        }];
        assert!(matches!(
            resolve(&outputs),
            Err(GatewayError::Configuration(_))
        ));
    }

    #[test]
    fn resolve_rejects_empty_list() {
        assert!(matches!(resolve(&[]), Err(GatewayError::Configuration(_))));
    }

    #[test]
    fn resolve_rejects_duplicate_language() {
        let outputs = vec![
            LanguageOutput::from_mode("es-ES", DeliveryMode::Both, None),
            LanguageOutput::from_mode("es-ES", DeliveryMode::CaptionsOnly, None),
        ];
        assert!(matches!(
            resolve(&outputs),
            Err(GatewayError::Configuration(_))
        ));
    }

    #[test]
    fn invalid_flag_pair_has_no_mode() {
        let output = LanguageOutput {
            lang: "de-DE".to_string(),
            captions: false,
            audio: false,
            voice: None,
        };
        assert_eq!(output.mode(), None);
        let both = LanguageOutput::from_mode("de-DE", DeliveryMode::Both, None);
        assert_eq!(both.mode(), Some(DeliveryMode::Both));
    }

    #[test]
    fn voice_is_carried_through() {
        let outputs = vec![LanguageOutput::from_mode(
            "ja-JP",
            DeliveryMode::AudioOnly,
            Some("ja-JP-Neural2-B".to_string()),
        )];
        let resolved = resolve(&outputs);
        let Ok(resolved) = resolved else {
            panic!("expected valid outputs");
        };
        assert_eq!(
            resolved.first().and_then(|o| o.voice.as_deref()),
            Some("ja-JP-Neural2-B")
        );
    }
}
