//! Voice processing module
//!
//! Handles speech input (capture, segmentation, transcription) and speech
//! output (synthesis, playback).

pub mod audio;
mod capture;
pub mod listener;
pub mod playback;
pub mod segmenter;
pub mod speaker;
pub mod stt;
pub mod text;
pub mod transcriber;
pub mod tts;

pub use audio::{AudioBuffer, AudioInput, SAMPLE_RATE};
pub use capture::AudioCapture;
pub use listener::{Listener, MicrophoneSource, UtteranceSource};
pub use playback::{AudioSink, CpalSink, Playback, PlaybackHandle, PlaybackOutcome};
pub use speaker::Speaker;
pub use stt::{Recognition, SpeechRecognizer, SpeechToText};
pub use transcriber::{NO_SPEECH_TEXT, Transcriber, Transcription};
pub use tts::{SpeechSynthesizer, TextToSpeech};
