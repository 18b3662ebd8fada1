//! Transcription adapter
//!
//! Normalizes [`AudioInput`] to a canonical waveform, hands it to a
//! [`SpeechRecognizer`], and reports one of three outcomes. In-memory input
//! is staged in a temporary WAV that is removed on every return path.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::NamedTempFile;

use super::audio::{AudioBuffer, AudioInput, Resolved, SAMPLE_RATE};
use super::stt::{Recognition, SpeechRecognizer};
use super::text::{normalize, preview};
use crate::Result;

/// Display text for the no-speech outcome
pub const NO_SPEECH_TEXT: &str = "No speech recognized";

/// Result of one transcription
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transcription {
    /// Recognized, normalized text
    Text(String),
    /// Recognizer understood no speech; not an error
    NoSpeech,
    /// Backend, network, or audio failure
    Failed(String),
}

impl Transcription {
    /// Split into `(text, ok)`
    ///
    /// `ok` is false only for failures; no-speech yields `("", true)`.
    #[must_use]
    pub fn into_parts(self) -> (String, bool) {
        match self {
            Self::Text(text) => (text, true),
            Self::NoSpeech => (String::new(), true),
            Self::Failed(_) => (String::new(), false),
        }
    }

    /// True if no failure occurred
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

/// Transcribes audio input through a recognizer
#[derive(Clone)]
pub struct Transcriber {
    recognizer: Arc<dyn SpeechRecognizer>,
    locale: String,
    default_rate: u32,
    temp_dir: Option<PathBuf>,
}

impl Transcriber {
    /// Create a transcriber for a fixed locale
    #[must_use]
    pub fn new(recognizer: Arc<dyn SpeechRecognizer>, locale: impl Into<String>) -> Self {
        Self {
            recognizer,
            locale: locale.into(),
            default_rate: SAMPLE_RATE,
            temp_dir: None,
        }
    }

    /// Stage temporary WAV files in `dir` instead of the system temp dir
    #[must_use]
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Sample rate assumed for raw input without one
    #[must_use]
    pub const fn with_default_rate(mut self, rate: u32) -> Self {
        self.default_rate = rate;
        self
    }

    /// Recognition locale
    #[must_use]
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Transcribe any accepted input shape
    pub async fn transcribe(&self, input: AudioInput) -> Transcription {
        tracing::debug!(input = input.kind(), "transcribing audio input");

        let outcome = match input.resolve(self.default_rate) {
            Resolved::File(path) => self.transcribe_file(&path).await,
            Resolved::Buffer(buffer) => self.transcribe_buffer(&buffer).await,
        };

        match outcome {
            Ok(Recognition::Text(text)) => {
                let text = normalize(&text);
                if text.is_empty() {
                    Transcription::NoSpeech
                } else {
                    tracing::info!(text = %preview(&text), "speech recognized");
                    Transcription::Text(text)
                }
            }
            Ok(Recognition::NoSpeech) => {
                tracing::debug!("no speech recognized");
                Transcription::NoSpeech
            }
            Err(e) => {
                tracing::error!(recognizer = self.recognizer.name(), error = %e, "transcription failed");
                Transcription::Failed(e.to_string())
            }
        }
    }

    /// Transcribe a canonical buffer, staging it in a scoped temp file
    ///
    /// # Errors
    ///
    /// Returns error if staging or recognition fails
    pub async fn transcribe_buffer(&self, buffer: &AudioBuffer) -> Result<Recognition> {
        if buffer.is_silent() {
            tracing::debug!(energy = buffer.energy(), "input below speech threshold");
            return Ok(Recognition::NoSpeech);
        }

        // Removed when dropped, on every return path
        let staged = self.stage(buffer)?;
        self.recognizer.recognize(staged.path(), &self.locale).await
    }

    async fn transcribe_file(&self, path: &Path) -> Result<Recognition> {
        match AudioBuffer::read_wav(path) {
            Ok(buffer) if buffer.is_silent() => {
                tracing::debug!(path = %path.display(), "file below speech threshold");
                return Ok(Recognition::NoSpeech);
            }
            Ok(_) => {}
            Err(e) => {
                // Not a WAV we can inspect; the backend may still decode it
                tracing::debug!(path = %path.display(), error = %e, "skipping energy gate");
            }
        }
        self.recognizer.recognize(path, &self.locale).await
    }

    fn stage(&self, buffer: &AudioBuffer) -> Result<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("tutor-audio-").suffix(".wav");
        let mut file = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        buffer.write_wav(std::io::BufWriter::new(file.as_file_mut()))?;
        tracing::trace!(path = %file.path().display(), "staged audio");
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_parts() {
        assert_eq!(
            Transcription::Text("hi".to_string()).into_parts(),
            ("hi".to_string(), true)
        );
        assert_eq!(Transcription::NoSpeech.into_parts(), (String::new(), true));
        assert_eq!(
            Transcription::Failed("boom".to_string()).into_parts(),
            (String::new(), false)
        );
    }
}
