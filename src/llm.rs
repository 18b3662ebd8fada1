//! Chat completion client
//!
//! Talks to any OpenAI-compatible `/chat/completions` endpoint. `DeepSeek`
//! is the default backend.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::conversation::Message;
use crate::{Error, Result};

/// Default OpenAI-compatible base URL
pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com/v1";

/// Default chat model
pub const DEFAULT_MODEL: &str = "deepseek-chat";

/// Remote chat-completion capability
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Produce one assistant reply for the ordered messages
    ///
    /// # Errors
    ///
    /// Returns error on transport, auth, quota, or malformed responses
    async fn complete(
        &self,
        messages: &[Message],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// OpenAI-compatible chat completion client
pub struct ChatClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
    model: String,
}

impl ChatClient {
    /// Create a client for an OpenAI-compatible endpoint
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty
    pub fn new(base_url: &str, api_key: SecretString, model: String) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config(
                "API key required for chat completions".to_string(),
            ));
        }

        Ok(Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        })
    }

    /// Endpoint URL for completions
    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl CompletionProvider for ChatClient {
    async fn complete(
        &self,
        messages: &[Message],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            max_tokens,
            temperature,
        };

        tracing::debug!(
            model = %self.model,
            messages = messages.len(),
            "requesting chat completion"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Llm(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "chat completion API error");
            return Err(Error::Llm(format!("API error {status}: {body}")));
        }

        let result: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Llm(format!("failed to parse response: {e}")))?;

        let reply = result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Llm("response contained no message".to_string()))?;

        tracing::debug!(chars = reply.chars().count(), "chat completion received");
        Ok(reply)
    }

    fn name(&self) -> &'static str {
        "openai-compatible"
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_key() {
        let result = ChatClient::new(
            DEFAULT_BASE_URL,
            SecretString::from(String::new()),
            DEFAULT_MODEL.to_string(),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = ChatClient::new(
            "https://example.com/v1/",
            SecretString::from("sk-test".to_string()),
            DEFAULT_MODEL.to_string(),
        )
        .unwrap();
        assert_eq!(client.endpoint(), "https://example.com/v1/chat/completions");
    }

    #[test]
    fn test_request_serialization() {
        let messages = vec![Message::system("sys"), Message::user("hi")];
        let request = ChatCompletionRequest {
            model: "deepseek-chat",
            messages: &messages,
            max_tokens: 2000,
            temperature: 0.5,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "deepseek-chat");
        assert_eq!(json["max_tokens"], 2000);
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "hi");
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"F = ma"}}]}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("F = ma"));
    }
}
