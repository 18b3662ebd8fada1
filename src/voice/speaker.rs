//! Speech synthesis and playback adapter
//!
//! Turns assistant text into speech for a tone. Every failure is reported as
//! `false` / `None` at this boundary and logged; nothing is raised.

use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::NamedTempFile;

use super::playback::{Playback, PlaybackOutcome};
use super::text::{normalize, preview};
use super::tts::SpeechSynthesizer;
use crate::tone::ToneMap;
use crate::{Error, Result};

/// Default speaking-rate multiplier (+50%)
pub const DEFAULT_SPEED: f32 = 1.5;

/// Synthesizes and plays speech
#[derive(Clone)]
pub struct Speaker {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    playback: Playback,
    tones: Arc<ToneMap>,
    speed: f32,
    temp_dir: Option<PathBuf>,
}

impl Speaker {
    /// Create a speaker
    #[must_use]
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        playback: Playback,
        tones: Arc<ToneMap>,
    ) -> Self {
        Self {
            synthesizer,
            playback,
            tones,
            speed: DEFAULT_SPEED,
            temp_dir: None,
        }
    }

    /// Override the speaking-rate multiplier
    #[must_use]
    pub const fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Write transient audio files in `dir` instead of the system temp dir
    #[must_use]
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Speak text in a tone, blocking until playback ends
    ///
    /// Returns false if synthesis produced nothing or playback failed.
    /// A stream superseded by a newer request still counts as success.
    pub async fn speak(&self, text: &str, tone: &str) -> bool {
        let Some(audio) = self.render(text, tone).await else {
            return false;
        };

        match self.playback.play(&audio).await {
            Ok(PlaybackOutcome::Finished | PlaybackOutcome::Superseded) => true,
            Err(e) => {
                tracing::error!(error = %e, "playback failed");
                false
            }
        }
    }

    /// Synthesize text in a tone without playing it
    ///
    /// Returns `None` on empty text, backend failure, or empty output.
    pub async fn render(&self, text: &str, tone: &str) -> Option<Vec<u8>> {
        let text = normalize(text);
        if text.is_empty() {
            tracing::warn!("nothing to synthesize");
            return None;
        }

        let voice = self.tones.voice_for(tone);
        tracing::info!(voice, text = %preview(&text), "generating audio");

        match self.synthesize_to_file(&text, voice).await {
            Ok(audio) => Some(audio),
            Err(e) => {
                tracing::error!(synthesizer = self.synthesizer.name(), error = %e, "audio generation failed");
                None
            }
        }
    }

    /// Synthesize into a scoped transient file and read it back
    async fn synthesize_to_file(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        // Removed when dropped, on every return path
        let mut file = self.transient_file()?;

        let audio = self.synthesizer.synthesize(text, voice, self.speed).await?;
        file.write_all(&audio)?;
        file.flush()?;

        let size = file.as_file().metadata()?.len();
        if size == 0 {
            return Err(Error::Tts("empty audio output".to_string()));
        }
        tracing::debug!(path = %file.path().display(), bytes = size, "audio file generated");

        let mut bytes = Vec::new();
        file.seek(SeekFrom::Start(0))?;
        file.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    fn transient_file(&self) -> Result<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("tutor-speech-").suffix(".mp3");
        let file = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        Ok(file)
    }

    /// Shared playback handle
    #[must_use]
    pub const fn playback(&self) -> &Playback {
        &self.playback
    }
}
