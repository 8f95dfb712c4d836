//! Speech-to-text (STT) over HTTP

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;

use super::microphone::Utterance;
use crate::{Error, Result};

/// Upper bound on one transcription round trip
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Response from OpenAI Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Response from Deepgram transcription API
#[derive(serde::Deserialize)]
struct DeepgramResponse {
    results: DeepgramResults,
}

#[derive(serde::Deserialize)]
struct DeepgramResults {
    channels: Vec<DeepgramChannel>,
}

#[derive(serde::Deserialize)]
struct DeepgramChannel {
    alternatives: Vec<DeepgramAlternative>,
}

#[derive(serde::Deserialize)]
struct DeepgramAlternative {
    transcript: String,
}

/// Why a transcription produced no text
#[derive(Debug, thiserror::Error)]
pub enum RecognitionError {
    /// The service heard nothing intelligible
    #[error("no speech recognized")]
    NoSpeech,

    /// Transport or service failure
    #[error("recognition service error: {0}")]
    Service(String),
}

impl From<Error> for RecognitionError {
    fn from(err: Error) -> Self {
        Self::Service(err.to_string())
    }
}

impl From<reqwest::Error> for RecognitionError {
    fn from(err: reqwest::Error) -> Self {
        Self::Service(err.to_string())
    }
}

/// Turns an utterance into text
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe `utterance` spoken in `language` (ISO 639-1)
    ///
    /// # Errors
    ///
    /// Returns `RecognitionError::NoSpeech` for an empty transcript
    async fn transcribe(
        &self,
        utterance: &Utterance,
        language: &str,
    ) -> std::result::Result<String, RecognitionError>;
}

/// STT provider backend
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SttProvider {
    #[default]
    Whisper,
    Deepgram,
}

impl SttProvider {
    /// Model used when none is configured
    #[must_use]
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::Whisper => "whisper-1",
            Self::Deepgram => "nova-2",
        }
    }
}

impl FromStr for SttProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "whisper" | "openai" => Ok(Self::Whisper),
            "deepgram" => Ok(Self::Deepgram),
            other => Err(Error::Config(format!("unknown STT provider: {other}"))),
        }
    }
}

/// Transcribes speech to text
pub struct SpeechToText {
    client: reqwest::Client,
    api_key: String,
    model: String,
    provider: SttProvider,
}

impl SpeechToText {
    /// Create an STT client for the given provider
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing or the HTTP client cannot be built
    pub fn new(provider: SttProvider, api_key: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(format!("{provider:?} API key required")));
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            api_key,
            model,
            provider,
        })
    }

    #[must_use]
    pub const fn provider(&self) -> SttProvider {
        self.provider
    }

    /// Transcribe using OpenAI Whisper
    async fn transcribe_whisper(
        &self,
        audio: Vec<u8>,
        language: &str,
    ) -> std::result::Result<String, RecognitionError> {
        tracing::debug!(audio_bytes = audio.len(), language, "starting Whisper transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio)
                    .file_name("audio.wav")
                    .mime_str("audio/wav")?,
            )
            .text("model", self.model.clone())
            .text("language", language.to_string());

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/transcriptions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Whisper request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "Whisper API error");
            return Err(RecognitionError::Service(format!(
                "Whisper API error {status}: {body}"
            )));
        }

        let result: WhisperResponse = response.json().await?;
        Ok(result.text)
    }

    /// Transcribe using Deepgram
    async fn transcribe_deepgram(
        &self,
        audio: Vec<u8>,
        language: &str,
    ) -> std::result::Result<String, RecognitionError> {
        tracing::debug!(audio_bytes = audio.len(), language, "starting Deepgram transcription");

        let url = format!(
            "https://api.deepgram.com/v1/listen?model={}&language={language}",
            self.model
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", "audio/wav")
            .body(audio)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Deepgram request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "Deepgram API error");
            return Err(RecognitionError::Service(format!(
                "Deepgram API error {status}: {body}"
            )));
        }

        let result: DeepgramResponse = response.json().await?;
        Ok(result
            .results
            .channels
            .into_iter()
            .next()
            .and_then(|c| c.alternatives.into_iter().next())
            .map(|a| a.transcript)
            .unwrap_or_default())
    }
}

#[async_trait]
impl Transcriber for SpeechToText {
    async fn transcribe(
        &self,
        utterance: &Utterance,
        language: &str,
    ) -> std::result::Result<String, RecognitionError> {
        let audio = utterance.to_wav()?;

        let text = match self.provider {
            SttProvider::Whisper => self.transcribe_whisper(audio, language).await?,
            SttProvider::Deepgram => self.transcribe_deepgram(audio, language).await?,
        };

        let text = text.trim();
        if text.is_empty() {
            return Err(RecognitionError::NoSpeech);
        }

        tracing::info!(transcript = %text, "transcription complete");
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_parses_case_insensitively() {
        assert_eq!("Deepgram".parse::<SttProvider>().unwrap(), SttProvider::Deepgram);
        assert_eq!("openai".parse::<SttProvider>().unwrap(), SttProvider::Whisper);
        assert!("vosk".parse::<SttProvider>().is_err());
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let err = SpeechToText::new(SttProvider::Whisper, String::new(), "whisper-1".to_string());
        assert!(matches!(err, Err(Error::Config(_))));
    }

    #[test]
    fn deepgram_response_parses() {
        let json = r#"{"results":{"channels":[{"alternatives":[{"transcript":"pula"}]}]}}"#;
        let parsed: DeepgramResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.results.channels[0].alternatives[0].transcript, "pula");
    }
}
