//! Practice recommendations for recorded mistakes
//!
//! Asks the assistant for practice problems related to a mistake and splits
//! the reply into the problems and an answer section the caller can reveal
//! on demand.

use crate::conversation::Conversation;
use crate::dispatcher::{Reply, TurnDispatcher};
use crate::tone::Tone;
use crate::{Error, Result};

/// Heading the assistant is asked to put before the answers
pub const ANSWER_HEADING: &str = "Answers:";

/// Headings recognized when splitting a reply
const ANSWER_MARKERS: [&str; 2] = [ANSWER_HEADING, "以下是答案"];

/// Practice problems with their answers held back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Practice {
    /// Problems shown immediately
    pub problems: String,
    /// Answer section, starting at the heading; empty if none was found
    pub answers: String,
}

/// Build the practice prompt for a mistake
///
/// # Errors
///
/// Returns a validation error if subject or question is blank
pub fn practice_prompt(instruction: &str, subject: &str, question: &str) -> Result<String> {
    let subject = subject.trim();
    let question = question.trim();
    if subject.is_empty() {
        return Err(Error::Validation("subject is required".to_string()));
    }
    if question.is_empty() {
        return Err(Error::Validation("mistake question is required".to_string()));
    }

    Ok(format!(
        "{instruction}\nI made a mistake on a {subject} problem about \"{question}\". \
         Give me a few practice problems with answers. Put all answers at the end, \
         starting with the exact heading \"{ANSWER_HEADING}\". \
         Reply in plain text without emoji."
    ))
}

/// Split a reply at the first answer heading
#[must_use]
pub fn split_answers(reply: &str) -> Practice {
    let start = ANSWER_MARKERS
        .iter()
        .filter_map(|marker| reply.find(marker))
        .min();

    match start {
        Some(idx) => Practice {
            problems: reply[..idx].trim_end().to_string(),
            answers: reply[idx..].trim().to_string(),
        },
        None => Practice {
            problems: reply.to_string(),
            answers: String::new(),
        },
    }
}

impl TurnDispatcher {
    /// Request practice problems for a mistake in a tone
    ///
    /// # Errors
    ///
    /// Returns a validation error for blank input, or the completion failure
    /// message if the remote call failed
    pub async fn recommend_practice(
        &self,
        conversation: &mut Conversation,
        subject: &str,
        question: &str,
        tone: Tone,
    ) -> Result<Practice> {
        let prompt = practice_prompt(self.tones().instruction(tone), subject, question)?;
        tracing::info!(subject, tone = %tone, "requesting practice problems");

        match self.submit(conversation, &prompt).await {
            Reply::Answer(reply) => Ok(split_answers(&reply)),
            Reply::EmptyInput => Err(Error::Validation("empty practice prompt".to_string())),
            Reply::Failed(e) => Err(Error::Llm(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_at_heading() {
        let reply = "1. Solve x^2 = 4\n2. Solve x^2 = 9\n\nAnswers:\n1. ±2\n2. ±3\n";
        let practice = split_answers(reply);
        assert_eq!(practice.problems, "1. Solve x^2 = 4\n2. Solve x^2 = 9");
        assert_eq!(practice.answers, "Answers:\n1. ±2\n2. ±3");
    }

    #[test]
    fn test_split_chinese_heading() {
        let practice = split_answers("题目一\n以下是答案：A");
        assert_eq!(practice.problems, "题目一");
        assert_eq!(practice.answers, "以下是答案：A");
    }

    #[test]
    fn test_no_heading_keeps_everything() {
        let practice = split_answers("just problems");
        assert_eq!(practice.problems, "just problems");
        assert!(practice.answers.is_empty());
    }

    #[test]
    fn test_prompt_requires_fields() {
        assert!(matches!(
            practice_prompt("be kind", " ", "quadratics"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            practice_prompt("be kind", "math", ""),
            Err(Error::Validation(_))
        ));

        let prompt = practice_prompt("be kind", "math", "quadratic roots").unwrap();
        assert!(prompt.starts_with("be kind\n"));
        assert!(prompt.contains("math problem about \"quadratic roots\""));
        assert!(prompt.contains(ANSWER_HEADING));
    }
}
