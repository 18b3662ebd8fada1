//! Turn dispatcher
//!
//! Runs one user → assistant turn against a [`Conversation`] owned by the
//! caller. Failures never escape: they come back as a [`Reply`] with display
//! text, and the conversation is left ready for a clean retry.

use std::sync::Arc;

use crate::conversation::{Conversation, Role};
use crate::llm::CompletionProvider;
use crate::tone::{Tone, ToneMap};
use crate::voice::text::{normalize, preview};

/// Marker prefixed to the display text of failed completions
pub const ERROR_MARKER: &str = "API error: ";

/// Display text when no input was given
pub const EMPTY_INPUT_PROMPT: &str = "Please enter a question.";

/// Default completion budget
pub const DEFAULT_MAX_TOKENS: u32 = 2000;

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Outcome of one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// The assistant answered
    Answer(String),
    /// Nothing to send; no remote call was made
    EmptyInput,
    /// The remote call failed
    Failed(String),
}

impl Reply {
    /// User-facing text for this reply
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Answer(text) => text.clone(),
            Self::EmptyInput => EMPTY_INPUT_PROMPT.to_string(),
            Self::Failed(err) => format!("{ERROR_MARKER}{err}"),
        }
    }

    /// True when the assistant produced an answer
    #[must_use]
    pub const fn is_answer(&self) -> bool {
        matches!(self, Self::Answer(_))
    }
}

/// Completion parameters
#[derive(Debug, Clone, Copy)]
pub struct CompletionSettings {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// Appends turns to a conversation and calls the completion provider
#[derive(Clone)]
pub struct TurnDispatcher {
    provider: Arc<dyn CompletionProvider>,
    tones: Arc<ToneMap>,
    settings: CompletionSettings,
}

impl TurnDispatcher {
    /// Create a dispatcher
    #[must_use]
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        tones: Arc<ToneMap>,
        settings: CompletionSettings,
    ) -> Self {
        Self {
            provider,
            tones,
            settings,
        }
    }

    /// Tone mapping used for prompts
    #[must_use]
    pub fn tones(&self) -> &ToneMap {
        &self.tones
    }

    /// Submit user text and return the reply
    ///
    /// The user message is not appended again if the latest user message
    /// already has the same content. The assistant message is appended only
    /// on success, and only if it differs from the last entry.
    pub async fn submit(&self, conversation: &mut Conversation, user_text: &str) -> Reply {
        let text = normalize(user_text);
        if text.is_empty() {
            tracing::debug!("empty input, skipping completion");
            return Reply::EmptyInput;
        }

        let duplicate = conversation
            .last_user()
            .is_some_and(|m| m.content == text);
        if duplicate {
            tracing::debug!(text = %preview(&text), "duplicate submission, not re-appending");
        } else {
            conversation.push_user(text);
        }

        match self
            .provider
            .complete(
                conversation.messages(),
                self.settings.max_tokens,
                self.settings.temperature,
            )
            .await
        {
            Ok(reply) => {
                let repeated = conversation
                    .last()
                    .is_some_and(|m| m.role == Role::Assistant && m.content == reply);
                if !repeated {
                    conversation.push_assistant(reply.clone());
                }
                tracing::info!(
                    provider = self.provider.name(),
                    reply = %preview(&reply),
                    "turn complete"
                );
                Reply::Answer(reply)
            }
            Err(e) => {
                tracing::error!(provider = self.provider.name(), error = %e, "completion failed");
                Reply::Failed(e.to_string())
            }
        }
    }

    /// Ask a question framed by a tone's persona instruction
    pub async fn ask(&self, conversation: &mut Conversation, question: &str, tone: Tone) -> Reply {
        if question.trim().is_empty() {
            return Reply::EmptyInput;
        }
        let prompt = self.tones.frame_question(tone, question);
        self.submit(conversation, &prompt).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::conversation::Message;
    use crate::{Error, Result};

    /// Provider returning scripted replies and recording calls
    struct Scripted {
        replies: Mutex<Vec<Result<String>>>,
        calls: Mutex<Vec<usize>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionProvider for Scripted {
        async fn complete(&self, messages: &[Message], _: u32, _: f32) -> Result<String> {
            self.calls.lock().unwrap().push(messages.len());
            self.replies.lock().unwrap().remove(0)
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    fn dispatcher(provider: Arc<Scripted>) -> TurnDispatcher {
        TurnDispatcher::new(
            provider,
            Arc::new(ToneMap::default()),
            CompletionSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_call() {
        let provider = Scripted::new(vec![]);
        let d = dispatcher(Arc::clone(&provider));
        let mut conv = Conversation::default();

        let reply = d.submit(&mut conv, "   ").await;

        assert_eq!(reply, Reply::EmptyInput);
        assert_eq!(reply.text(), EMPTY_INPUT_PROMPT);
        assert_eq!(provider.call_count(), 0);
        assert_eq!(conv.len(), 1);
    }

    #[tokio::test]
    async fn test_failure_leaves_no_assistant_message() {
        let provider = Scripted::new(vec![Err(Error::Llm("quota exceeded".to_string()))]);
        let d = dispatcher(provider);
        let mut conv = Conversation::default();

        let reply = d.submit(&mut conv, "hello").await;

        assert!(reply.text().starts_with(ERROR_MARKER));
        assert!(reply.text().contains("quota exceeded"));
        assert_eq!(conv.len(), 2);
        assert_eq!(conv.last().unwrap().role, Role::User);
    }

    #[tokio::test]
    async fn test_retry_after_failure_does_not_duplicate_user() {
        let provider = Scripted::new(vec![
            Err(Error::Llm("timeout".to_string())),
            Ok("answer".to_string()),
        ]);
        let d = dispatcher(Arc::clone(&provider));
        let mut conv = Conversation::default();

        d.submit(&mut conv, "question").await;
        let reply = d.submit(&mut conv, "question").await;

        assert_eq!(reply, Reply::Answer("answer".to_string()));
        let roles: Vec<Role> = conv.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
        // Second call still sent the full history
        assert_eq!(*provider.calls.lock().unwrap(), vec![2, 2]);
    }

    #[tokio::test]
    async fn test_identical_reply_not_appended_twice() {
        let provider = Scripted::new(vec![Ok("same".to_string()), Ok("same".to_string())]);
        let d = dispatcher(provider);
        let mut conv = Conversation::default();

        d.submit(&mut conv, "q").await;
        d.submit(&mut conv, "q").await;

        assert_eq!(conv.len(), 3);
    }

    #[tokio::test]
    async fn test_input_is_normalized() {
        let provider = Scripted::new(vec![Ok("ok".to_string())]);
        let d = dispatcher(provider);
        let mut conv = Conversation::default();

        d.submit(&mut conv, "  **solve**   x + 1 = 2!  ").await;

        assert_eq!(conv.messages()[1].content, "solve x + 1 = 2");
    }

    #[tokio::test]
    async fn test_ask_prepends_tone_instruction() {
        let provider = Scripted::new(vec![Ok("ok".to_string())]);
        let d = dispatcher(provider);
        let mut conv = Conversation::default();

        d.ask(&mut conv, "what is a prime", Tone::Strict).await;

        let user = conv.last_user().unwrap();
        assert!(user.content.contains("strict teacher"));
        assert!(user.content.ends_with("Question: what is a prime"));
    }
}
