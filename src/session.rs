//! Voice conversation turns
//!
//! Sequences transcribe → dispatch → speak for one spoken turn. The
//! conversation is passed in explicitly; the session holds no history.

use crate::conversation::Conversation;
use crate::dispatcher::{Reply, TurnDispatcher};
use crate::tone::Tone;
use crate::voice::{AudioInput, NO_SPEECH_TEXT, Speaker, Transcriber, Transcription};

/// Outcome of one voice turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceTurn {
    /// Speech was recognized and answered
    Answered {
        /// Recognized user text
        transcript: String,
        /// Assistant reply (or error text)
        reply: Reply,
        /// Whether the reply was spoken successfully
        spoken: bool,
    },
    /// Nothing was said
    NoSpeech,
    /// Transcription failed
    Failed(String),
}

impl VoiceTurn {
    /// User-facing text for this turn
    #[must_use]
    pub fn display_text(&self) -> String {
        match self {
            Self::Answered { reply, .. } => reply.text(),
            Self::NoSpeech => NO_SPEECH_TEXT.to_string(),
            Self::Failed(e) => format!("Speech recognition error: {e}"),
        }
    }
}

/// Runs spoken turns against a conversation
#[derive(Clone)]
pub struct VoiceSession {
    transcriber: Transcriber,
    dispatcher: TurnDispatcher,
    speaker: Option<Speaker>,
    tone: Tone,
}

impl VoiceSession {
    /// Create a session; pass `None` as speaker for text-only replies
    #[must_use]
    pub const fn new(
        transcriber: Transcriber,
        dispatcher: TurnDispatcher,
        speaker: Option<Speaker>,
        tone: Tone,
    ) -> Self {
        Self {
            transcriber,
            dispatcher,
            speaker,
            tone,
        }
    }

    /// Run one turn from audio input
    pub async fn voice_turn(&self, conversation: &mut Conversation, input: AudioInput) -> VoiceTurn {
        let transcription = self.transcriber.transcribe(input).await;
        self.answer(conversation, transcription).await
    }

    /// Answer an already-produced transcription
    pub async fn answer(
        &self,
        conversation: &mut Conversation,
        transcription: Transcription,
    ) -> VoiceTurn {
        let transcript = match transcription {
            Transcription::Text(text) => text,
            Transcription::NoSpeech => return VoiceTurn::NoSpeech,
            Transcription::Failed(e) => return VoiceTurn::Failed(e),
        };

        let reply = self.dispatcher.submit(conversation, &transcript).await;

        let spoken = match (&self.speaker, &reply) {
            (Some(speaker), Reply::Answer(text)) => speaker.speak(text, self.tone.as_str()).await,
            _ => false,
        };

        VoiceTurn::Answered {
            transcript,
            reply,
            spoken,
        }
    }
}
