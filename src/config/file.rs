//! TOML configuration file loading
//!
//! Supports `~/.config/homework-tutor/config.toml` as a persistent config
//! source. All fields are optional; the file is a partial overlay on top of
//! defaults.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::tone::ToneOverride;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct TutorConfigFile {
    /// Chat completion configuration
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// Voice/audio configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Per-tone voice and instruction overrides, keyed by tone name
    #[serde(default)]
    pub tones: HashMap<String, ToneOverride>,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// Chat completion configuration
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    /// OpenAI-compatible base URL (e.g. `https://api.deepseek.com/v1`)
    pub base_url: Option<String>,

    /// Model identifier (e.g. "deepseek-chat")
    pub model: Option<String>,

    /// API key for the completion endpoint
    pub api_key: Option<String>,

    /// Maximum reply length in tokens
    pub max_tokens: Option<u32>,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// System prompt seeding every conversation
    pub system_prompt: Option<String>,
}

/// Voice processing configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// STT backend ("whisper" or "deepgram")
    pub stt_provider: Option<String>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,

    /// Recognition locale (e.g. "zh-CN")
    pub language: Option<String>,

    /// TTS backend ("openai" or "elevenlabs")
    pub tts_provider: Option<String>,

    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,

    /// TTS speed multiplier
    pub speed: Option<f32>,

    /// Default tone name
    pub tone: Option<String>,

    /// Silence window for streaming capture, in seconds
    pub silence_secs: Option<f64>,

    /// Directory for transient audio files
    pub temp_dir: Option<String>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
    pub elevenlabs: Option<String>,
    pub deepgram: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `TutorConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> TutorConfigFile {
    let Some(path) = config_file_path() else {
        return TutorConfigFile::default();
    };

    if !path.exists() {
        return TutorConfigFile::default();
    }

    match load_from(&path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "loaded config file");
            config
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to load config file, using defaults"
            );
            TutorConfigFile::default()
        }
    }
}

/// Read and parse a config file
///
/// # Errors
///
/// Returns error if the file cannot be read or is not valid TOML
pub fn load_from(path: &Path) -> crate::Result<TutorConfigFile> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Return the config file path: `~/.config/homework-tutor/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("homework-tutor").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_file() {
        let fc: TutorConfigFile = toml::from_str(
            r#"
            [llm]
            model = "deepseek-reasoner"
            temperature = 0.3

            [voice]
            language = "en-US"
            tone = "strict"

            [tones.humorous]
            voice = "echo"
            "#,
        )
        .unwrap();

        assert_eq!(fc.llm.model.as_deref(), Some("deepseek-reasoner"));
        assert_eq!(fc.llm.temperature, Some(0.3));
        assert!(fc.llm.base_url.is_none());
        assert_eq!(fc.voice.language.as_deref(), Some("en-US"));
        assert_eq!(fc.tones["humorous"].voice.as_deref(), Some("echo"));
        assert!(fc.api_keys.openai.is_none());
    }

    #[test]
    fn test_empty_file_is_default() {
        let fc: TutorConfigFile = toml::from_str("").unwrap();
        assert!(fc.tones.is_empty());
        assert!(fc.voice.speed.is_none());
    }

    #[test]
    fn test_load_from_reports_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[llm\nmodel=").unwrap();
        assert!(matches!(load_from(&path), Err(crate::Error::Toml(_))));
    }
}
