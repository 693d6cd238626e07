//! Runtime configuration: a JSON file with every field optional.
//!
//! ```json
//! { "max_chars": 4096, "voice": "nova", "quality": "hd", "format": "mp3" }
//! ```
//!
//! Credentials are not part of this file; see
//! [`crate::credentials::CredentialProvider`].

use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    sectionize::MAX_CHARS,
    synth::{is_known_voice, AudioFormat, QualityTier, VoiceParams, DEFAULT_INSTRUCTIONS},
};

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/audio/speech";

/// Seconds jumped by the skip back / skip forward controls.
pub const DEFAULT_SKIP_SECONDS: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Per-section character limit.
    pub max_chars: usize,
    pub voice: String,
    pub instructions: String,
    pub quality: QualityTier,
    pub format: AudioFormat,
    pub skip_seconds: f64,
    /// Initial playback volume in `[0, 1]`.
    pub volume: f64,
    pub endpoint: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_chars: MAX_CHARS,
            voice: "alloy".to_string(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            quality: QualityTier::default(),
            format: AudioFormat::default(),
            skip_seconds: DEFAULT_SKIP_SECONDS,
            volume: 1.0,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

impl Config {
    /// Parse a config file.  Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .with_context(|| format!("Cannot read config: {}", path.display()))?;
        let config: Config = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    /// A file that exists and is invalid is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Apply environment overrides:
    /// - `STORYVOICE_VOICE` → `voice`
    /// - `STORYVOICE_MAX_CHARS` → `max_chars`
    /// - `STORYVOICE_QUALITY` → `quality`
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(voice) = var("STORYVOICE_VOICE").filter(|v| !v.is_empty()) {
            self.voice = voice;
        }
        if let Some(raw) = var("STORYVOICE_MAX_CHARS").filter(|v| !v.is_empty()) {
            self.max_chars = raw
                .parse::<usize>()
                .with_context(|| format!("STORYVOICE_MAX_CHARS is not a number: {:?}", raw))?;
        }
        if let Some(raw) = var("STORYVOICE_QUALITY").filter(|v| !v.is_empty()) {
            self.quality = raw.parse::<QualityTier>().map_err(anyhow::Error::msg)?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_chars == 0 {
            bail!("max_chars must be positive");
        }
        if !(0.0..=1.0).contains(&self.volume) {
            bail!("volume must be within [0, 1], got {}", self.volume);
        }
        if !self.skip_seconds.is_finite() || self.skip_seconds <= 0.0 {
            bail!("skip_seconds must be a positive number, got {}", self.skip_seconds);
        }
        if !is_known_voice(&self.voice) {
            tracing::warn!(voice = %self.voice, "voice is not in the known list; sending as-is");
        }
        Ok(())
    }

    /// Request parameters derived from this config.
    pub fn voice_params(&self) -> VoiceParams {
        VoiceParams {
            voice: self.voice.clone(),
            instructions: self.instructions.clone(),
            quality: self.quality,
            format: self.format,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let c = Config::default();
        assert_eq!(c.max_chars, 4096);
        assert_eq!(c.voice, "alloy");
        assert_eq!(c.skip_seconds, 10.0);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"voice": "nova", "quality": "hd", "max_chars": 500}}"#).unwrap();
        let c = Config::load(file.path()).unwrap();
        assert_eq!(c.voice, "nova");
        assert_eq!(c.quality, QualityTier::Hd);
        assert_eq!(c.max_chars, 500);
        assert_eq!(c.format, AudioFormat::Mp3);
        assert_eq!(c.voice_params().quality.model_id(), "tts-1-hd");
    }

    #[test]
    fn test_missing_file_uses_defaults_but_bad_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert_eq!(Config::load_or_default(&missing).unwrap(), Config::default());

        let bad = dir.path().join("bad.json");
        fs::write(&bad, "{ not json").unwrap();
        assert!(Config::load_or_default(&bad).is_err());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let c = Config { max_chars: 0, ..Config::default() };
        assert!(c.validate().is_err());
        let c = Config { volume: 1.5, ..Config::default() };
        assert!(c.validate().is_err());
        let c = Config { skip_seconds: f64::NAN, ..Config::default() };
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let env = |key: &str| match key {
            "STORYVOICE_VOICE" => Some("sage".to_string()),
            "STORYVOICE_MAX_CHARS" => Some("1200".to_string()),
            "STORYVOICE_QUALITY" => Some("fast".to_string()),
            _ => None,
        };
        let c = Config::default().with_overrides(env).unwrap();
        assert_eq!(c.voice, "sage");
        assert_eq!(c.max_chars, 1200);
        assert_eq!(c.quality, QualityTier::Fast);

        let bad = |key: &str| (key == "STORYVOICE_MAX_CHARS").then(|| "lots".to_string());
        assert!(Config::default().with_overrides(bad).is_err());
    }
}
