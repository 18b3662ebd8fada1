//! Configuration management for the homework tutor

pub mod file;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::conversation::DEFAULT_SYSTEM_PROMPT;
use crate::dispatcher::{CompletionSettings, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use crate::llm::{ChatClient, CompletionProvider, DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::tone::{Tone, ToneMap};
use crate::voice::speaker::DEFAULT_SPEED;
use crate::voice::{SpeechRecognizer, SpeechSynthesizer, SpeechToText, TextToSpeech};
use crate::{Error, Result};

use self::file::TutorConfigFile;

/// Homework tutor configuration
#[derive(Debug)]
pub struct Config {
    /// Chat completion configuration
    pub llm: LlmConfig,

    /// Voice processing configuration
    pub voice: VoiceConfig,

    /// Tone → voice/instruction mapping
    pub tones: ToneMap,

    /// API keys for speech services
    pub api_keys: ApiKeys,
}

/// Chat completion configuration
#[derive(Debug)]
pub struct LlmConfig {
    /// OpenAI-compatible base URL
    pub base_url: String,

    /// Model identifier
    pub model: String,

    /// API key for the completion endpoint
    pub api_key: Option<SecretString>,

    /// Maximum reply length in tokens
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// System prompt seeding every conversation
    pub system_prompt: String,
}

/// STT backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SttBackend {
    Whisper,
    Deepgram,
}

/// TTS backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtsBackend {
    OpenAI,
    ElevenLabs,
}

/// Voice processing configuration
#[derive(Debug)]
pub struct VoiceConfig {
    /// STT backend
    pub stt_provider: SttBackend,

    /// STT model (e.g. "whisper-1", "nova-2")
    pub stt_model: String,

    /// Recognition locale
    pub language: String,

    /// TTS backend
    pub tts_provider: TtsBackend,

    /// TTS model (e.g. "tts-1")
    pub tts_model: String,

    /// TTS speed multiplier
    pub speed: f32,

    /// Silence window for streaming capture
    pub silence_window: Duration,

    /// Directory for transient audio files (system temp dir if unset)
    pub temp_dir: Option<PathBuf>,
}

/// API keys for speech services
#[derive(Debug, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (Whisper and TTS)
    pub openai: Option<SecretString>,

    /// `ElevenLabs` API key (optional TTS)
    pub elevenlabs: Option<SecretString>,

    /// `Deepgram` API key (optional STT)
    pub deepgram: Option<SecretString>,
}

impl Config {
    /// Load configuration (env > toml > default)
    ///
    /// # Errors
    ///
    /// Returns error if a configured value is invalid
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();
        Self::from_sources(fc, |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if a backend or tone name is unknown
    #[allow(clippy::too_many_lines)]
    pub fn from_sources<F>(fc: TutorConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = |value: Option<String>| value.filter(|v| !v.is_empty()).map(SecretString::from);

        // LLM config (env > toml > default)
        let llm = LlmConfig {
            base_url: env("TUTOR_LLM_BASE_URL")
                .or(fc.llm.base_url)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: env("TUTOR_LLM_MODEL")
                .or(fc.llm.model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key: secret(
                env("TUTOR_LLM_API_KEY")
                    .or_else(|| env("DEEPSEEK_API_KEY"))
                    .or(fc.llm.api_key),
            ),
            max_tokens: env("TUTOR_LLM_MAX_TOKENS")
                .and_then(|s| s.parse().ok())
                .or(fc.llm.max_tokens)
                .unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: env("TUTOR_LLM_TEMPERATURE")
                .and_then(|s| s.parse().ok())
                .or(fc.llm.temperature)
                .unwrap_or(DEFAULT_TEMPERATURE),
            system_prompt: fc
                .llm
                .system_prompt
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        };

        let api_keys = ApiKeys {
            openai: secret(env("OPENAI_API_KEY").or(fc.api_keys.openai)),
            elevenlabs: secret(env("ELEVENLABS_API_KEY").or(fc.api_keys.elevenlabs)),
            deepgram: secret(env("DEEPGRAM_API_KEY").or(fc.api_keys.deepgram)),
        };

        let stt_provider = match env("TUTOR_STT_PROVIDER")
            .or(fc.voice.stt_provider)
            .as_deref()
            .map(str::to_lowercase)
            .as_deref()
        {
            None | Some("whisper") => SttBackend::Whisper,
            Some("deepgram") => SttBackend::Deepgram,
            Some(other) => {
                return Err(Error::Config(format!("unknown STT provider: {other}")));
            }
        };

        let tts_provider = match env("TUTOR_TTS_PROVIDER")
            .or(fc.voice.tts_provider)
            .as_deref()
            .map(str::to_lowercase)
            .as_deref()
        {
            None | Some("openai") => TtsBackend::OpenAI,
            Some("elevenlabs") => TtsBackend::ElevenLabs,
            Some(other) => {
                return Err(Error::Config(format!("unknown TTS provider: {other}")));
            }
        };

        let default_stt_model = match stt_provider {
            SttBackend::Whisper => "whisper-1",
            SttBackend::Deepgram => "nova-2",
        };
        let default_tts_model = match tts_provider {
            TtsBackend::OpenAI => "tts-1",
            TtsBackend::ElevenLabs => "eleven_multilingual_v2",
        };

        let silence_secs = fc.voice.silence_secs.unwrap_or(2.0);
        if !silence_secs.is_finite() || silence_secs <= 0.0 {
            return Err(Error::Config(format!(
                "silence_secs must be positive, got {silence_secs}"
            )));
        }

        let voice = VoiceConfig {
            stt_provider,
            stt_model: env("TUTOR_STT_MODEL")
                .or(fc.voice.stt_model)
                .unwrap_or_else(|| default_stt_model.to_string()),
            language: env("TUTOR_LANGUAGE")
                .or(fc.voice.language)
                .unwrap_or_else(|| "zh-CN".to_string()),
            tts_provider,
            tts_model: env("TUTOR_TTS_MODEL")
                .or(fc.voice.tts_model)
                .unwrap_or_else(|| default_tts_model.to_string()),
            speed: fc.voice.speed.unwrap_or(DEFAULT_SPEED),
            silence_window: Duration::from_secs_f64(silence_secs),
            temp_dir: env("TUTOR_TEMP_DIR")
                .or(fc.voice.temp_dir)
                .map(PathBuf::from),
        };

        let default_tone = match env("TUTOR_TONE").or(fc.voice.tone) {
            Some(label) => label.parse::<Tone>().map_err(|_| {
                Error::Config(format!("unknown default tone: {label}"))
            })?,
            None => Tone::default(),
        };
        let tones = ToneMap::with_overrides(default_tone, &fc.tones);

        Ok(Self {
            llm,
            voice,
            tones,
            api_keys,
        })
    }

    /// Completion settings for the dispatcher
    #[must_use]
    pub const fn completion_settings(&self) -> CompletionSettings {
        CompletionSettings {
            max_tokens: self.llm.max_tokens,
            temperature: self.llm.temperature,
        }
    }

    /// Build the chat completion client
    ///
    /// # Errors
    ///
    /// Returns error if no API key is configured
    pub fn completion_provider(&self) -> Result<Arc<dyn CompletionProvider>> {
        let key = self.llm.api_key.as_ref().ok_or_else(|| {
            Error::Config(
                "no completion API key (set TUTOR_LLM_API_KEY or DEEPSEEK_API_KEY)".to_string(),
            )
        })?;
        Ok(Arc::new(ChatClient::new(
            &self.llm.base_url,
            reveal(key),
            self.llm.model.clone(),
        )?))
    }

    /// Build the configured speech recognizer
    ///
    /// # Errors
    ///
    /// Returns error if the backend's API key is missing
    pub fn recognizer(&self) -> Result<Arc<dyn SpeechRecognizer>> {
        let model = self.voice.stt_model.clone();
        let stt = match self.voice.stt_provider {
            SttBackend::Whisper => SpeechToText::new_whisper(
                require_key(self.api_keys.openai.as_ref(), "OPENAI_API_KEY")?,
                model,
            )?,
            SttBackend::Deepgram => SpeechToText::new_deepgram(
                require_key(self.api_keys.deepgram.as_ref(), "DEEPGRAM_API_KEY")?,
                model,
            )?,
        };
        Ok(Arc::new(stt))
    }

    /// Build the configured speech synthesizer
    ///
    /// # Errors
    ///
    /// Returns error if the backend's API key is missing
    pub fn synthesizer(&self) -> Result<Arc<dyn SpeechSynthesizer>> {
        let model = self.voice.tts_model.clone();
        let tts = match self.voice.tts_provider {
            TtsBackend::OpenAI => TextToSpeech::new_openai(
                require_key(self.api_keys.openai.as_ref(), "OPENAI_API_KEY")?,
                model,
            )?,
            TtsBackend::ElevenLabs => TextToSpeech::new_elevenlabs(
                require_key(self.api_keys.elevenlabs.as_ref(), "ELEVENLABS_API_KEY")?,
                model,
            )?,
        };
        Ok(Arc::new(tts))
    }
}

fn reveal(key: &SecretString) -> SecretString {
    SecretString::from(key.expose_secret().to_string())
}

fn require_key(key: Option<&SecretString>, var: &str) -> Result<SecretString> {
    key.map(reveal)
        .ok_or_else(|| Error::Config(format!("{var} is not set")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_sources(TutorConfigFile::default(), env_from(&[])).unwrap();

        assert_eq!(config.llm.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.llm.model, DEFAULT_MODEL);
        assert_eq!(config.llm.max_tokens, 2000);
        assert!((config.llm.temperature - 0.7).abs() < f32::EPSILON);
        assert!(config.llm.api_key.is_none());
        assert_eq!(config.voice.language, "zh-CN");
        assert_eq!(config.voice.stt_provider, SttBackend::Whisper);
        assert_eq!(config.voice.stt_model, "whisper-1");
        assert!((config.voice.speed - 1.5).abs() < f32::EPSILON);
        assert_eq!(config.voice.silence_window, Duration::from_secs(2));
        assert_eq!(config.tones.default_tone(), Tone::Gentle);
    }

    #[test]
    fn test_env_overrides_file() {
        let fc: TutorConfigFile = toml::from_str(
            r#"
            [llm]
            model = "from-file"
            api_key = "file-key"

            [voice]
            stt_provider = "deepgram"
            tone = "humorous"
            "#,
        )
        .unwrap();

        let config = Config::from_sources(
            fc,
            env_from(&[("TUTOR_LLM_MODEL", "from-env"), ("DEEPSEEK_API_KEY", "env-key")]),
        )
        .unwrap();

        assert_eq!(config.llm.model, "from-env");
        assert_eq!(
            config.llm.api_key.as_ref().map(ExposeSecret::expose_secret),
            Some("env-key")
        );
        assert_eq!(config.voice.stt_provider, SttBackend::Deepgram);
        assert_eq!(config.voice.stt_model, "nova-2");
        assert_eq!(config.tones.default_tone(), Tone::Humorous);
    }

    #[test]
    fn test_unknown_values_rejected() {
        let fc: TutorConfigFile = toml::from_str("[voice]\ntts_provider = \"espeak\"").unwrap();
        assert!(matches!(
            Config::from_sources(fc, env_from(&[])),
            Err(Error::Config(_))
        ));

        let bad_tone = Config::from_sources(
            TutorConfigFile::default(),
            env_from(&[("TUTOR_TONE", "grumpy")]),
        );
        assert!(matches!(bad_tone, Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_keys_reported() {
        let config = Config::from_sources(TutorConfigFile::default(), env_from(&[])).unwrap();
        assert!(config.completion_provider().is_err());
        assert!(config.recognizer().is_err());
        assert!(config.synthesizer().is_err());
    }

    #[test]
    fn test_clients_built_with_keys() {
        let config = Config::from_sources(
            TutorConfigFile::default(),
            env_from(&[("TUTOR_LLM_API_KEY", "sk-llm"), ("OPENAI_API_KEY", "sk-oa")]),
        )
        .unwrap();
        assert_eq!(config.completion_provider().unwrap().name(), "openai-compatible");
        assert_eq!(config.recognizer().unwrap().name(), "whisper");
        assert_eq!(config.synthesizer().unwrap().name(), "openai");
    }
}
