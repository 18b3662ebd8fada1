//! Homework Tutor - Voice-enabled homework tutoring assistant
//!
//! This library provides the core of the tutor:
//! - Conversation history with a fixed system prompt
//! - Turn dispatch to an OpenAI-compatible chat completion API
//! - Speech capture and transcription (Whisper, Deepgram)
//! - Speech synthesis and exclusive playback (`OpenAI`, `ElevenLabs`)
//! - Tone profiles and practice recommendations
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Interfaces                        │
//! │        CLI chat  │  ask  │  listen  │  practice      │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Voice Session                        │
//! │  Transcriber  │  Turn Dispatcher  │  Speaker         │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │               Remote Services                        │
//! │     Chat completions  │  STT  │  TTS                 │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod conversation;
pub mod dispatcher;
pub mod error;
pub mod llm;
pub mod practice;
pub mod session;
pub mod tone;
pub mod voice;

pub use config::Config;
pub use conversation::{Conversation, Message, Role};
pub use dispatcher::{CompletionSettings, Reply, TurnDispatcher};
pub use error::{Error, Result};
pub use llm::{ChatClient, CompletionProvider};
pub use practice::Practice;
pub use session::{VoiceSession, VoiceTurn};
pub use tone::{Tone, ToneMap};
