//! Streaming microphone transcription
//!
//! Polls an utterance source, transcribes each utterance, and flushes the
//! accumulated text once nothing new has been recognized for the silence
//! window.

use std::time::Duration;

use tokio::time::Instant;

use super::audio::AudioBuffer;
use super::capture::AudioCapture;
use super::segmenter::SpeechSegmenter;
use super::stt::Recognition;
use super::text::normalize;
use super::transcriber::{Transcriber, Transcription};
use crate::Result;

/// Default silence window before flushing accumulated text
pub const SILENCE_WINDOW: Duration = Duration::from_secs(2);

/// Default interval between source polls
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Non-blocking source of complete utterances
pub trait UtteranceSource {
    /// Return an utterance finished since the last poll, if any
    ///
    /// # Errors
    ///
    /// Returns error if the underlying device fails
    fn poll_utterance(&mut self) -> Result<Option<AudioBuffer>>;
}

/// Microphone capture segmented into utterances
pub struct MicrophoneSource {
    capture: AudioCapture,
    segmenter: SpeechSegmenter,
}

impl MicrophoneSource {
    /// Open and start the default microphone
    ///
    /// # Errors
    ///
    /// Returns error if the device cannot be opened or started
    pub fn open() -> Result<Self> {
        let mut capture = AudioCapture::new()?;
        capture.start()?;
        let segmenter = SpeechSegmenter::new(capture.sample_rate());
        Ok(Self { capture, segmenter })
    }
}

impl UtteranceSource for MicrophoneSource {
    fn poll_utterance(&mut self) -> Result<Option<AudioBuffer>> {
        let samples = self.capture.take_buffer();
        if samples.is_empty() {
            return Ok(None);
        }
        Ok(self.segmenter.process(&samples))
    }
}

/// Accumulates recognized fragments across a silence window
pub struct Listener {
    transcriber: Transcriber,
    silence_window: Duration,
    poll_interval: Duration,
}

impl Listener {
    /// Create a listener with the default silence window and poll interval
    #[must_use]
    pub const fn new(transcriber: Transcriber) -> Self {
        Self {
            transcriber,
            silence_window: SILENCE_WINDOW,
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Override the silence window
    #[must_use]
    pub const fn with_silence_window(mut self, window: Duration) -> Self {
        self.silence_window = window;
        self
    }

    /// Override the poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Listen until speech followed by the silence window, or a failure
    ///
    /// Never returns [`Transcription::NoSpeech`]: it keeps listening until
    /// something is said.
    pub async fn listen<S: UtteranceSource + ?Sized>(&self, source: &mut S) -> Transcription {
        let mut buffered = String::new();
        let mut last_voice = Instant::now();

        tracing::debug!(
            silence_ms = self.silence_window.as_millis(),
            "listening for speech"
        );

        loop {
            let utterance = match source.poll_utterance() {
                Ok(u) => u,
                Err(e) => {
                    tracing::error!(error = %e, "audio source failed");
                    return Transcription::Failed(e.to_string());
                }
            };

            if let Some(utterance) = utterance {
                match self.transcriber.transcribe_buffer(&utterance).await {
                    Ok(Recognition::Text(fragment)) => {
                        tracing::debug!(fragment = %fragment, "fragment recognized");
                        if !buffered.is_empty() {
                            buffered.push(' ');
                        }
                        buffered.push_str(&fragment);
                        last_voice = Instant::now();
                    }
                    Ok(Recognition::NoSpeech) => {}
                    Err(e) => {
                        tracing::error!(error = %e, "streaming recognition failed");
                        return Transcription::Failed(e.to_string());
                    }
                }
            }

            if !buffered.is_empty() && last_voice.elapsed() >= self.silence_window {
                let text = normalize(&buffered);
                tracing::info!(chars = text.chars().count(), "silence detected, flushing");
                return Transcription::Text(text);
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
