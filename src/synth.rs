//! Speech-provider contract.
//!
//! A [`SpeechSynthesizer`] turns one section of text into one
//! [`AudioResource`].  The crate never decodes audio; resources are opaque
//! handles that a [`MediaElement`](crate::player::MediaElement) knows how to
//! load.

use std::{fmt, str::FromStr, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SynthesisError;

// ─────────────────────────────────────────────────────────────────────────────
// Audio resources
// ─────────────────────────────────────────────────────────────────────────────

/// Container format requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    Opus,
    Aac,
    Flac,
    Wav,
}

impl AudioFormat {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Opus => "opus",
            AudioFormat::Aac => "aac",
            AudioFormat::Flac => "flac",
            AudioFormat::Wav => "wav",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Opus => "audio/ogg",
            AudioFormat::Aac => "audio/aac",
            AudioFormat::Flac => "audio/flac",
            AudioFormat::Wav => "audio/wav",
        }
    }
}

/// Opaque handle to one generated clip.
///
/// Cloning is cheap: the payload is shared.
#[derive(Clone, PartialEq, Eq)]
pub struct AudioResource {
    /// Where a media element can find the clip (URL, blob id, file path...).
    pub location: String,
    pub format: AudioFormat,
    /// Encoded bytes when the provider returned them inline.
    pub data: Option<Arc<[u8]>>,
}

impl AudioResource {
    /// A resource that lives elsewhere.
    pub fn at(location: impl Into<String>, format: AudioFormat) -> Self {
        Self { location: location.into(), format, data: None }
    }

    /// A resource held in memory.
    pub fn inline(location: impl Into<String>, format: AudioFormat, bytes: Vec<u8>) -> Self {
        Self { location: location.into(), format, data: Some(bytes.into()) }
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }
}

impl fmt::Debug for AudioResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioResource")
            .field("location", &self.location)
            .field("format", &self.format)
            .field("bytes", &self.data.as_ref().map(|d| d.len()))
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Voice parameters
// ─────────────────────────────────────────────────────────────────────────────

/// Voices offered by the speech endpoint.
pub const VOICES: &[(&str, &str)] = &[
    ("alloy", "Alloy"),
    ("echo", "Echo"),
    ("fable", "Fable"),
    ("onyx", "Onyx"),
    ("nova", "Nova"),
    ("shimmer", "Shimmer"),
    ("ash", "Ash"),
    ("coral", "Coral"),
    ("ballad", "Ballad"),
    ("sage", "Sage"),
];

/// Instruction used when the user leaves the style box blank.
pub const DEFAULT_INSTRUCTIONS: &str = "Read in a natural, engaging tone";

/// `true` if `id` is one of [`VOICES`].
pub fn is_known_voice(id: &str) -> bool {
    VOICES.iter().any(|(v, _)| *v == id)
}

/// Speed/quality trade-off, mapped to a provider model id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    /// Steerable model; honours style instructions.
    #[default]
    Standard,
    Fast,
    Hd,
}

impl QualityTier {
    pub fn model_id(self) -> &'static str {
        match self {
            QualityTier::Standard => "gpt-4o-mini-tts",
            QualityTier::Fast => "tts-1",
            QualityTier::Hd => "tts-1-hd",
        }
    }

    pub fn supports_instructions(self) -> bool {
        matches!(self, QualityTier::Standard)
    }
}

impl FromStr for QualityTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" | "gpt-4o-mini-tts" => Ok(QualityTier::Standard),
            "fast" | "tts-1" => Ok(QualityTier::Fast),
            "hd" | "tts-1-hd" => Ok(QualityTier::Hd),
            other => Err(format!("unknown quality tier '{}' (expected standard, fast or hd)", other)),
        }
    }
}

/// Everything about a request except the text itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceParams {
    pub voice: String,
    pub instructions: String,
    pub quality: QualityTier,
    pub format: AudioFormat,
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self {
            voice: "alloy".to_string(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            quality: QualityTier::default(),
            format: AudioFormat::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request body
// ─────────────────────────────────────────────────────────────────────────────

/// JSON body of one speech request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeechRequest<'a> {
    pub model: &'static str,
    pub input: &'a str,
    pub voice: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<&'a str>,
    pub response_format: AudioFormat,
}

impl<'a> SpeechRequest<'a> {
    pub fn new(input: &'a str, params: &'a VoiceParams) -> Self {
        let instructions = params.instructions.trim();
        let instructions = (params.quality.supports_instructions() && !instructions.is_empty())
            .then_some(instructions);
        Self {
            model: params.quality.model_id(),
            input,
            voice: &params.voice,
            instructions,
            response_format: params.format,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Provider trait
// ─────────────────────────────────────────────────────────────────────────────

/// One text section in, one audio resource out.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Cheap pre-flight check run before a batch starts (credentials
    /// present, etc.).  The default accepts.
    fn ready(&self) -> Result<(), SynthesisError> {
        Ok(())
    }

    /// Generate audio for `text`.  `index` is the section's position in its
    /// batch; implementations may use it to name the resource.
    async fn synthesize(
        &self,
        text: &str,
        index: usize,
        params: &VoiceParams,
    ) -> Result<AudioResource, SynthesisError>;
}

#[async_trait]
impl<S: SpeechSynthesizer + ?Sized> SpeechSynthesizer for Arc<S> {
    fn ready(&self) -> Result<(), SynthesisError> {
        (**self).ready()
    }

    async fn synthesize(
        &self,
        text: &str,
        index: usize,
        params: &VoiceParams,
    ) -> Result<AudioResource, SynthesisError> {
        (**self).synthesize(text, index, params).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_standard_tier() {
        let params = VoiceParams::default();
        let body = serde_json::to_value(SpeechRequest::new("Hello.", &params)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "model": "gpt-4o-mini-tts",
                "input": "Hello.",
                "voice": "alloy",
                "instructions": DEFAULT_INSTRUCTIONS,
                "response_format": "mp3",
            })
        );
    }

    #[test]
    fn test_request_body_drops_instructions_when_unsupported() {
        let params = VoiceParams {
            voice: "nova".into(),
            quality: QualityTier::Hd,
            format: AudioFormat::Opus,
            ..VoiceParams::default()
        };
        let body = serde_json::to_value(SpeechRequest::new("Hi", &params)).unwrap();
        assert_eq!(body["model"], "tts-1-hd");
        assert_eq!(body["response_format"], "opus");
        assert!(body.get("instructions").is_none());
    }

    #[test]
    fn test_blank_instructions_omitted() {
        let params = VoiceParams { instructions: "   ".into(), ..VoiceParams::default() };
        assert_eq!(SpeechRequest::new("Hi", &params).instructions, None);
    }

    #[test]
    fn test_quality_tier_parse() {
        assert_eq!("HD".parse::<QualityTier>(), Ok(QualityTier::Hd));
        assert_eq!("tts-1".parse::<QualityTier>(), Ok(QualityTier::Fast));
        assert!("ultra".parse::<QualityTier>().is_err());
    }

    #[test]
    fn test_known_voices() {
        assert!(is_known_voice("sage"));
        assert!(!is_known_voice("Sage"));
        assert_eq!(VOICES.len(), 10);
    }

    #[test]
    fn test_resource_debug_hides_payload() {
        let r = AudioResource::inline("mem://0", AudioFormat::Mp3, vec![1, 2, 3]);
        assert_eq!(r.bytes(), Some(&[1u8, 2, 3][..]));
        assert!(format!("{:?}", r).contains("bytes: Some(3)"));
    }
}
