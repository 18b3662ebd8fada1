//! Shared test utilities
//!
//! In-process fakes for the remote capabilities and the audio output device.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use homework_tutor::conversation::Message;
use homework_tutor::voice::{
    AudioBuffer, AudioSink, PlaybackHandle, Recognition, SAMPLE_RATE, SpeechRecognizer,
    SpeechSynthesizer,
};
use homework_tutor::{CompletionProvider, Error, Result};

/// Generate a loud 440Hz tone as PCM16
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn tone_samples(duration_secs: f32) -> Vec<i16> {
    let n = (SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..n)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            ((2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5 * 32767.0) as i16
        })
        .collect()
}

/// A loud buffer that passes the speech energy gate
#[must_use]
pub fn speech_buffer() -> AudioBuffer {
    AudioBuffer::new(tone_samples(0.5), SAMPLE_RATE)
}

/// Write a WAV file and return its path
pub fn write_wav(dir: &Path, name: &str, buffer: &AudioBuffer) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, buffer.to_wav_bytes().expect("encode wav")).expect("write wav");
    path
}

/// Number of entries in a directory
#[must_use]
pub fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).expect("read dir").count()
}

/// Completion provider with scripted replies
///
/// Once the script runs out it echoes the last user message.
#[derive(Default)]
pub struct FakeProvider {
    replies: Mutex<VecDeque<Result<String>>>,
    calls: AtomicUsize,
}

impl FakeProvider {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[must_use]
    pub fn scripted(replies: Vec<Result<String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionProvider for FakeProvider {
    async fn complete(
        &self,
        messages: &[Message],
        _max_tokens: u32,
        _temperature: f32,
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reply) = self.replies.lock().unwrap().pop_front() {
            return reply;
        }
        let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        Ok(format!("You asked: {last}"))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Recognizer with scripted outcomes
///
/// Records every path it was given and whether the file existed at the time.
#[derive(Default)]
pub struct FakeRecognizer {
    outcomes: Mutex<VecDeque<Result<Recognition>>>,
    seen: Mutex<Vec<(PathBuf, bool)>>,
}

impl FakeRecognizer {
    #[must_use]
    pub fn scripted(outcomes: Vec<Result<Recognition>>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            seen: Mutex::new(Vec::new()),
        })
    }

    #[must_use]
    pub fn text(text: &str) -> Arc<Self> {
        Self::scripted(vec![Ok(Recognition::Text(text.to_string()))])
    }

    #[must_use]
    pub fn failing(message: &str) -> Arc<Self> {
        Self::scripted(vec![Err(Error::Stt(message.to_string()))])
    }

    pub fn seen(&self) -> Vec<(PathBuf, bool)> {
        self.seen.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl SpeechRecognizer for FakeRecognizer {
    async fn recognize(&self, wav_path: &Path, _locale: &str) -> Result<Recognition> {
        self.seen
            .lock()
            .unwrap()
            .push((wav_path.to_path_buf(), wav_path.exists()));
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(Recognition::NoSpeech))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Synthesizer returning fixed bytes and recording voices
pub struct FakeSynthesizer {
    audio: Option<Vec<u8>>,
    voices: Mutex<Vec<String>>,
}

impl FakeSynthesizer {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Self::returning(b"ID3fake-mp3".to_vec())
    }

    #[must_use]
    pub fn returning(audio: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            audio: Some(audio),
            voices: Mutex::new(Vec::new()),
        })
    }

    #[must_use]
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            audio: None,
            voices: Mutex::new(Vec::new()),
        })
    }

    pub fn voices(&self) -> Vec<String> {
        self.voices.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, _text: &str, voice: &str, _speed: f32) -> Result<Vec<u8>> {
        self.voices.lock().unwrap().push(voice.to_string());
        self.audio
            .clone()
            .ok_or_else(|| Error::Tts("service unavailable".to_string()))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Output device that plays for a fixed duration and tracks overlap
pub struct FakeSink {
    duration: Duration,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
    started: AtomicUsize,
}

impl FakeSink {
    #[must_use]
    pub fn new(duration: Duration) -> Arc<Self> {
        Arc::new(Self {
            duration,
            active: Arc::new(AtomicUsize::new(0)),
            max_active: Arc::new(AtomicUsize::new(0)),
            started: AtomicUsize::new(0),
        })
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

impl AudioSink for FakeSink {
    fn start(&self, _audio: &[u8]) -> Result<Box<dyn PlaybackHandle>> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        Ok(Box::new(FakeHandle {
            until: Instant::now() + self.duration,
            stopped: false,
            active: Arc::clone(&self.active),
        }))
    }
}

struct FakeHandle {
    until: Instant,
    stopped: bool,
    active: Arc<AtomicUsize>,
}

impl PlaybackHandle for FakeHandle {
    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn is_busy(&self) -> bool {
        !self.stopped && Instant::now() < self.until
    }
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
