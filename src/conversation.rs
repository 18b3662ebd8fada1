//! Conversation history for a tutoring session
//!
//! A conversation is an ordered, append-only list of role-tagged messages.
//! The first message is the system prompt; it survives every operation
//! except an explicit [`Conversation::clear`], which reinstates it.

use serde::{Deserialize, Serialize};

/// Default system prompt for the tutoring assistant
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a homework tutoring assistant. Give accurate, \
     concise academic answers. Reply in plain text and avoid emoji.";

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Wire name of the role
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a system message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered message history owned by one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    system_prompt: String,
    messages: Vec<Message>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }
}

impl Conversation {
    /// Start a conversation seeded with a system prompt
    #[must_use]
    pub fn new(system_prompt: impl Into<String>) -> Self {
        let system_prompt = system_prompt.into();
        Self {
            messages: vec![Message::system(system_prompt.clone())],
            system_prompt,
        }
    }

    /// All messages in order, system prompt first
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages including the system prompt
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when only the system prompt is present
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.iter().all(|m| m.role == Role::System)
    }

    /// The most recent message
    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The most recent user message
    #[must_use]
    pub fn last_user(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::User)
    }

    /// Append a user message
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    /// Append an assistant message
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    /// The last `n` non-system messages, oldest first
    #[must_use]
    pub fn recent(&self, n: usize) -> Vec<&Message> {
        let dialogue: Vec<&Message> = self
            .messages
            .iter()
            .filter(|m| m.role != Role::System)
            .collect();
        let skip = dialogue.len().saturating_sub(n);
        dialogue.into_iter().skip(skip).collect()
    }

    /// Reset to the single system message
    pub fn clear(&mut self) {
        self.messages.clear();
        self.messages.push(Message::system(self.system_prompt.clone()));
        tracing::debug!("conversation cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_conversation_has_system_prompt() {
        let conv = Conversation::new("be helpful");
        assert_eq!(conv.len(), 1);
        assert_eq!(conv.messages()[0], Message::system("be helpful"));
        assert!(conv.is_empty());
    }

    #[test]
    fn test_last_user_skips_assistant() {
        let mut conv = Conversation::default();
        conv.push_user("what is 2+2");
        conv.push_assistant("4");

        assert_eq!(conv.last().unwrap().role, Role::Assistant);
        assert_eq!(conv.last_user().unwrap().content, "what is 2+2");
    }

    #[test]
    fn test_clear_keeps_system_prompt() {
        let mut conv = Conversation::new("tutor");
        conv.push_user("hi");
        conv.push_assistant("hello");

        conv.clear();

        assert_eq!(conv.len(), 1);
        assert_eq!(conv.messages()[0].content, "tutor");
    }

    #[test]
    fn test_recent_excludes_system() {
        let mut conv = Conversation::default();
        for i in 0..6 {
            conv.push_user(format!("q{i}"));
            conv.push_assistant(format!("a{i}"));
        }

        let recent = conv.recent(3);
        let contents: Vec<&str> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["a4", "q5", "a5"]);

        let all = Conversation::new("sys");
        assert!(all.recent(10).is_empty());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::assistant("ok")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"ok"}"#);
    }
}
