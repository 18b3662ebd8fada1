//! Text-to-speech (TTS) backends

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::{Error, Result};

/// Remote synthesis capability
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize text with a voice at a speed multiplier
    ///
    /// Returns compressed audio (MP3).
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    async fn synthesize(&self, text: &str, voice: &str, speed: f32) -> Result<Vec<u8>>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// TTS provider backend
#[derive(Clone, Copy, Debug)]
enum TtsProvider {
    OpenAI,
    ElevenLabs,
}

impl TtsProvider {
    const fn label(self) -> &'static str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::ElevenLabs => "ElevenLabs",
        }
    }
}

/// HTTP text-to-speech client
pub struct TextToSpeech {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    provider: TtsProvider,
}

impl TextToSpeech {
    /// Create a TTS client for `OpenAI` (`/v1/audio/speech`)
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_openai(api_key: SecretString, model: String) -> Result<Self> {
        Self::with_provider(TtsProvider::OpenAI, api_key, model)
    }

    /// Create a TTS client for `ElevenLabs`
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_elevenlabs(api_key: SecretString, model: String) -> Result<Self> {
        Self::with_provider(TtsProvider::ElevenLabs, api_key, model)
    }

    fn with_provider(provider: TtsProvider, api_key: SecretString, model: String) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config(format!(
                "{} API key required for TTS",
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

    /// `OpenAI` request: speed range 0.25 to 4.0, MP3 output
    fn openai_request(&self, text: &str, voice: &str, speed: f32) -> reqwest::RequestBuilder {
        self.client
            .post("https://api.openai.com/v1/audio/speech")
            .bearer_auth(self.api_key.expose_secret())
            .json(&serde_json::json!({
                "model": self.model,
                "input": text,
                "voice": voice,
                "speed": speed.clamp(0.25, 4.0),
                "response_format": "mp3",
            }))
    }

    /// `ElevenLabs` request: voice in the path, speed range 0.7 to 1.2
    fn elevenlabs_request(&self, text: &str, voice: &str, speed: f32) -> reqwest::RequestBuilder {
        let url = format!(
            "https://api.elevenlabs.io/v1/text-to-speech/{}",
            urlencoding::encode(voice)
        );
        self.client
            .post(url)
            .header("xi-api-key", self.api_key.expose_secret())
            .json(&serde_json::json!({
                "text": text,
                "model_id": self.model,
                "voice_settings": { "speed": speed.clamp(0.7, 1.2) },
            }))
    }
}

#[async_trait]
impl SpeechSynthesizer for TextToSpeech {
    async fn synthesize(&self, text: &str, voice: &str, speed: f32) -> Result<Vec<u8>> {
        tracing::debug!(provider = self.name(), voice, speed, "synthesizing speech");
        let request = match self.provider {
            TtsProvider::OpenAI => self.openai_request(text, voice, speed),
            TtsProvider::ElevenLabs => self.elevenlabs_request(text, voice, speed),
        };

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!(
                "{} TTS error {status}: {body}",
                self.provider.label()
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }

    fn name(&self) -> &'static str {
        match self.provider {
            TtsProvider::OpenAI => "openai",
            TtsProvider::ElevenLabs => "elevenlabs",
        }
    }
}
