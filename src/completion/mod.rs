// Completion backend access
//
// - Transport: one HTTP round trip, no retry (reqwest-backed HttpTransport)
// - Client: request envelope, retry policy and first-choice extraction
//
// Analysis and translation only see the Completer trait, so tests can swap
// the backend for a mock without touching the network.

pub mod client;
pub mod transport;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use client::*;
pub use transport::*;

use crate::error::Result;

/// Anything that can answer a single-turn prompt with raw model text
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user<S: Into<String>>(content: S) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
}

impl CompletionRequest {
    /// Request carrying a single user-role message
    pub fn single<S: Into<String>>(model: &str, prompt: S) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![Message::user(prompt)],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    pub message: ChoiceMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl CompletionResponse {
    /// Content of the first choice, if the backend returned any.
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first().and_then(|c| c.message.content.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let request = CompletionRequest::single("test/model", "Hello");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "model": "test/model",
                "messages": [{"role": "user", "content": "Hello"}]
            })
        );
    }

    #[test]
    fn test_response_tolerates_missing_fields() {
        let body = r#"{"choices":[{"message":{"content":"Hi"}}]}"#;
        let response: CompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.first_content(), Some("Hi"));
        assert!(response.usage.is_none());
    }

    #[test]
    fn test_missing_or_null_content_has_no_first_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant"}}]}"#;
        let response: CompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.first_content(), None);

        let body = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        let response: CompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.first_content(), None);
    }
}
