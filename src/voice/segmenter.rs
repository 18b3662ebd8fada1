//! Utterance segmentation
//!
//! Splits a live sample stream into utterances using local energy
//! detection: speech starts when a chunk crosses the energy threshold and
//! ends after a short run of silence.

use super::audio::{AudioBuffer, ENERGY_THRESHOLD, SAMPLE_RATE, calculate_energy};

/// Minimum duration of speech to keep an utterance (in samples at 16kHz)
const MIN_SPEECH_SAMPLES: usize = 4800; // 0.3 seconds

/// Silence duration to consider end of utterance (in samples)
const SILENCE_SAMPLES: usize = 8000; // 0.5 seconds

/// State of the segmenter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmenterState {
    /// Waiting for speech
    Idle,
    /// Accumulating an utterance
    Speaking,
}

/// Detects utterance boundaries in a sample stream
pub struct SpeechSegmenter {
    state: SegmenterState,
    speech_buffer: Vec<f32>,
    silence_counter: usize,
    sample_rate: u32,
}

impl Default for SpeechSegmenter {
    fn default() -> Self {
        Self::new(SAMPLE_RATE)
    }
}

impl SpeechSegmenter {
    /// Create a segmenter for a sample rate
    #[must_use]
    pub const fn new(sample_rate: u32) -> Self {
        Self {
            state: SegmenterState::Idle,
            speech_buffer: Vec::new(),
            silence_counter: 0,
            sample_rate,
        }
    }

    /// Feed samples; returns a finished utterance when one ends
    pub fn process(&mut self, samples: &[f32]) -> Option<AudioBuffer> {
        let energy = calculate_energy(samples);
        let is_speech = energy > ENERGY_THRESHOLD;

        match self.state {
            SegmenterState::Idle => {
                if is_speech {
                    self.state = SegmenterState::Speaking;
                    self.speech_buffer.clear();
                    self.speech_buffer.extend_from_slice(samples);
                    self.silence_counter = 0;
                    tracing::trace!(energy, "speech detected");
                }
                None
            }
            SegmenterState::Speaking => {
                self.speech_buffer.extend_from_slice(samples);

                if is_speech {
                    self.silence_counter = 0;
                    return None;
                }

                self.silence_counter += samples.len();
                if self.silence_counter < self.scaled(SILENCE_SAMPLES) {
                    return None;
                }

                let utterance = std::mem::take(&mut self.speech_buffer);
                self.reset();

                let speech_len = utterance.len().saturating_sub(self.scaled(SILENCE_SAMPLES));
                if speech_len < self.scaled(MIN_SPEECH_SAMPLES) {
                    tracing::trace!(samples = utterance.len(), "utterance too short, dropped");
                    return None;
                }

                tracing::debug!(samples = utterance.len(), "utterance complete");
                Some(AudioBuffer::from_f32(&utterance, self.sample_rate))
            }
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> SegmenterState {
        self.state
    }

    /// Samples accumulated for the current utterance
    #[must_use]
    pub fn speech_buffer(&self) -> &[f32] {
        &self.speech_buffer
    }

    /// Drop any partial utterance
    pub fn reset(&mut self) {
        self.state = SegmenterState::Idle;
        self.speech_buffer.clear();
        self.silence_counter = 0;
    }

    /// Convert a 16kHz sample count to this segmenter's rate
    fn scaled(&self, samples_at_16k: usize) -> usize {
        samples_at_16k * self.sample_rate as usize / SAMPLE_RATE as usize
    }
}
