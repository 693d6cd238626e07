//! OpenAI speech endpoint as a [`SpeechSynthesizer`].
//!
//! One POST per section, no retry.  The audio comes back inline and is kept
//! in memory as an [`AudioResource`] named `section-<n>.<ext>`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::{
    config::{Config, DEFAULT_ENDPOINT},
    credentials::CredentialProvider,
    error::SynthesisError,
    synth::{AudioResource, SpeechRequest, SpeechSynthesizer, VoiceParams},
};

/// Message used when the provider's error body says nothing useful.
pub const FALLBACK_ERROR: &str = "Failed to convert text to speech";

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

/// Pull `error.message` out of a failed response body.
pub fn parse_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|d| d.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_ERROR.to_string())
}

pub struct OpenAiSynthesizer {
    client: reqwest::Client,
    endpoint: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl OpenAiSynthesizer {
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT, credentials)
    }

    pub fn with_endpoint(endpoint: impl Into<String>, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self { client: reqwest::Client::new(), endpoint: endpoint.into(), credentials }
    }

    pub fn from_config(config: &Config, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self::with_endpoint(config.endpoint.clone(), credentials)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn api_key(&self) -> Result<String, SynthesisError> {
        self.credentials.api_key().ok_or(SynthesisError::MissingCredentials)
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSynthesizer {
    fn ready(&self) -> Result<(), SynthesisError> {
        self.api_key().map(|_| ())
    }

    async fn synthesize(
        &self,
        text: &str,
        index: usize,
        params: &VoiceParams,
    ) -> Result<AudioResource, SynthesisError> {
        let key = self.api_key()?;
        let body = SpeechRequest::new(text, params);
        tracing::debug!(index, model = body.model, voice = body.voice, "speech request");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SynthesisError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = parse_error_message(&raw);
            tracing::warn!(index, status = status.as_u16(), %message, "speech request rejected");
            return Err(SynthesisError::Http { status: status.as_u16(), message });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SynthesisError::Transport(e.to_string()))?;
        if bytes.is_empty() {
            return Err(SynthesisError::Provider("Provider returned no audio".to_string()));
        }

        let ext = params.format.extension();
        Ok(AudioResource::inline(format!("section-{}.{}", index + 1, ext), params.format, bytes.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StaticCredentials;

    #[test]
    fn test_error_message_from_body() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        assert_eq!(parse_error_message(body), "Incorrect API key provided");
    }

    #[test]
    fn test_error_message_fallbacks() {
        assert_eq!(parse_error_message(""), FALLBACK_ERROR);
        assert_eq!(parse_error_message("<html>502</html>"), FALLBACK_ERROR);
        assert_eq!(parse_error_message(r#"{"error":{}}"#), FALLBACK_ERROR);
        assert_eq!(parse_error_message(r#"{"error":{"message":" "}}"#), FALLBACK_ERROR);
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_any_request() {
        // Unroutable endpoint: reaching the network would surface as Transport.
        let synth = OpenAiSynthesizer::with_endpoint(
            "http://127.0.0.1:9/v1/audio/speech",
            Arc::new(StaticCredentials::default()),
        );
        assert_eq!(synth.ready(), Err(SynthesisError::MissingCredentials));
        let err = synth.synthesize("Hello.", 0, &VoiceParams::default()).await.unwrap_err();
        assert_eq!(err, SynthesisError::MissingCredentials);
    }

    #[test]
    fn test_ready_with_key() {
        let synth = OpenAiSynthesizer::new(Arc::new(StaticCredentials::new("sk-test")));
        assert!(synth.ready().is_ok());
        assert_eq!(synth.endpoint(), DEFAULT_ENDPOINT);
    }
}
