//! Speech-to-text (STT) backends

use std::path::Path;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::{Error, Result};

/// Successful recognizer outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recognition {
    /// Recognized, non-empty text
    Text(String),
    /// The audio was understood to contain no speech
    NoSpeech,
}

impl Recognition {
    /// Classify raw backend text; blank text means no speech
    #[must_use]
    pub fn from_transcript(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Self::NoSpeech
        } else {
            Self::Text(trimmed.to_string())
        }
    }
}

/// Remote or local transcription capability
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Recognize speech in a WAV file
    ///
    /// # Errors
    ///
    /// Returns error on backend or network failure, never for silence
    async fn recognize(&self, wav_path: &Path, locale: &str) -> Result<Recognition>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Response from `OpenAI` Whisper transcription API
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

/// STT provider backend
#[derive(Clone, Copy, Debug)]
enum SttProvider {
    Whisper,
    Deepgram,
}

impl SttProvider {
    const fn label(self) -> &'static str {
        match self {
            Self::Whisper => "Whisper",
            Self::Deepgram => "Deepgram",
        }
    }
}

/// HTTP speech-to-text client
pub struct SpeechToText {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    provider: SttProvider,
}

impl SpeechToText {
    /// Create an STT client for `OpenAI` Whisper
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_whisper(api_key: SecretString, model: String) -> Result<Self> {
        Self::with_provider(SttProvider::Whisper, api_key, model)
    }

    /// Create an STT client for Deepgram
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_deepgram(api_key: SecretString, model: String) -> Result<Self> {
        Self::with_provider(SttProvider::Deepgram, api_key, model)
    }

    fn with_provider(provider: SttProvider, api_key: SecretString, model: String) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config(format!(
                "{} API key required for transcription",
                provider.label()
            )));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            provider,
        })
    }

    /// Whisper request: multipart upload with a base language code
    fn whisper_request(&self, audio: Vec<u8>, locale: &str) -> Result<reqwest::RequestBuilder> {
        let file = reqwest::multipart::Part::bytes(audio)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| Error::Stt(e.to_string()))?;

        let form = reqwest::multipart::Form::new()
            .part("file", file)
            .text("model", self.model.clone())
            .text("language", whisper_language(locale).to_string());

        Ok(self
            .client
            .post("https://api.openai.com/v1/audio/transcriptions")
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form))
    }

    /// Deepgram request: raw WAV body, full locale as a query parameter
    fn deepgram_request(&self, audio: Vec<u8>, locale: &str) -> reqwest::RequestBuilder {
        let url = format!(
            "https://api.deepgram.com/v1/listen?model={}&language={}&punctuate=true",
            urlencoding::encode(&self.model),
            urlencoding::encode(locale)
        );

        self.client
            .post(url)
            .header(
                "Authorization",
                format!("Token {}", self.api_key.expose_secret()),
            )
            .header("Content-Type", "audio/wav")
            .body(audio)
    }

    /// Send a request and return the raw transcript text
    async fn fetch_transcript(&self, request: reqwest::RequestBuilder) -> Result<String> {
        let label = self.provider.label();

        let response = request.send().await.map_err(|e| {
            tracing::error!(provider = label, error = %e, "transcription request failed");
            Error::Stt(format!("{label} request failed: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(provider = label, status = %status, body = %body, "transcription API error");
            return Err(Error::Stt(format!("{label} API error {status}: {body}")));
        }

        let parsed = match self.provider {
            SttProvider::Whisper => response.json::<WhisperResponse>().await.map(|r| r.text),
            SttProvider::Deepgram => response
                .json::<DeepgramResponse>()
                .await
                .map(deepgram_transcript),
        };
        parsed.map_err(|e| Error::Stt(format!("failed to parse {label} response: {e}")))
    }
}

#[async_trait]
impl SpeechRecognizer for SpeechToText {
    async fn recognize(&self, wav_path: &Path, locale: &str) -> Result<Recognition> {
        let audio = tokio::fs::read(wav_path).await?;
        tracing::debug!(
            provider = self.name(),
            audio_bytes = audio.len(),
            locale,
            "starting transcription"
        );

        let request = match self.provider {
            SttProvider::Whisper => self.whisper_request(audio, locale)?,
            SttProvider::Deepgram => self.deepgram_request(audio, locale),
        };
        let transcript = self.fetch_transcript(request).await?;

        let recognition = Recognition::from_transcript(&transcript);
        tracing::info!(
            provider = self.name(),
            no_speech = recognition == Recognition::NoSpeech,
            "transcription complete"
        );
        Ok(recognition)
    }

    fn name(&self) -> &'static str {
        match self.provider {
            SttProvider::Whisper => "whisper",
            SttProvider::Deepgram => "deepgram",
        }
    }
}

/// Whisper expects ISO-639-1 codes, so "zh-CN" becomes "zh"
fn whisper_language(locale: &str) -> &str {
    locale.split(['-', '_']).next().unwrap_or(locale)
}

fn deepgram_transcript(response: DeepgramResponse) -> String {
    response
        .results
        .channels
        .into_iter()
        .next()
        .and_then(|c| c.alternatives.into_iter().next())
        .map(|a| a.transcript)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_transcript_is_no_speech() {
        assert_eq!(Recognition::from_transcript("  \n"), Recognition::NoSpeech);
        assert_eq!(
            Recognition::from_transcript(" 牛顿第二定律 "),
            Recognition::Text("牛顿第二定律".to_string())
        );
    }

    #[test]
    fn test_whisper_language() {
        assert_eq!(whisper_language("zh-CN"), "zh");
        assert_eq!(whisper_language("en_US"), "en");
        assert_eq!(whisper_language("fr"), "fr");
    }

    #[test]
    fn test_deepgram_transcript_parsing() {
        let body = r#"{"results":{"channels":[{"alternatives":[{"transcript":"hello"}]}]}}"#;
        let parsed: DeepgramResponse = serde_json::from_str(body).unwrap();
        assert_eq!(deepgram_transcript(parsed), "hello");

        let empty: DeepgramResponse =
            serde_json::from_str(r#"{"results":{"channels":[]}}"#).unwrap();
        assert_eq!(deepgram_transcript(empty), "");
    }

    #[test]
    fn test_missing_key_rejected() {
        let result = SpeechToText::new_whisper(SecretString::from(String::new()), "whisper-1".into());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_deepgram_request_carries_locale() {
        let stt = SpeechToText::new_deepgram(SecretString::from("k".to_string()), "nova-2".into())
            .unwrap();
        let request = stt.deepgram_request(vec![0; 4], "zh-CN").build().unwrap();
        let query = request.url().query().unwrap_or_default().to_string();
        assert!(query.contains("model=nova-2"));
        assert!(query.contains("language=zh-CN"));
        assert_eq!(request.headers()["Content-Type"], "audio/wav");
    }
}
