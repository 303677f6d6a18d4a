use std::time::Duration;
use async_trait::async_trait;
use tracing::{debug, trace, warn};

use crate::config::CompletionConfig;
use crate::error::{Result, TermkeepError};
use super::{Completer, CompletionRequest, CompletionResponse, HttpTransport, Transport};

/// Bounded retry with linear backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Attempt N (1-indexed) is followed by a sleep of N * backoff_step
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_step: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &CompletionConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff_step: Duration::from_millis(config.backoff_ms),
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff_step * attempt
    }
}

/// Chat-completion client; retries timeouts and 5xx replies
pub struct CompletionClient {
    transport: Box<dyn Transport>,
    model: String,
    retry: RetryPolicy,
}

impl CompletionClient {
    pub fn new(transport: Box<dyn Transport>, model: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            transport,
            model: model.into(),
            retry,
        }
    }

    /// Client talking HTTP to the configured endpoint
    pub fn from_config(config: &CompletionConfig) -> Result<Self> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::new(
            Box::new(transport),
            config.model.clone(),
            RetryPolicy::from_config(config),
        ))
    }

    /// Send a request, retrying retryable failures up to the attempt cap
    pub async fn create_completion(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let body = serde_json::to_string(request)?;
        debug!("Sending completion request to model {}", request.model);
        trace!("Completion request body: {}", body);

        let max_attempts = self.retry.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            match self.send_once(&body).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() => {
                    warn!("Completion attempt {}/{} failed: {}", attempt, max_attempts, e);
                    last_error = Some(e);
                    if attempt < max_attempts {
                        tokio::time::sleep(self.retry.delay_for(attempt)).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        let source = last_error
            .unwrap_or_else(|| TermkeepError::Transport("no attempt was made".to_string()));
        Err(TermkeepError::RetriesExhausted {
            attempts: max_attempts,
            source: Box::new(source),
        })
    }

    async fn send_once(&self, body: &str) -> Result<CompletionResponse> {
        let reply = self.transport.send(body.to_string()).await?;

        debug!("Completion response status: {}", reply.status);
        debug!("Completion response body: {}", reply.body);

        if !reply.is_success() {
            return Err(TermkeepError::Api {
                status: reply.status,
                body: reply.body,
            });
        }

        let response: CompletionResponse = serde_json::from_str(&reply.body).map_err(|e| {
            TermkeepError::MalformedResponse(format!(
                "error unmarshaling response: {} (body: {})",
                e,
                fragment(&reply.body)
            ))
        })?;

        if let Some(usage) = &response.usage {
            debug!(
                "Token usage: prompt {}, completion {}, total {}",
                usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
            );
        }
        Ok(response)
    }
}

#[async_trait]
impl Completer for CompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = CompletionRequest::single(&self.model, prompt);
        let response = self.create_completion(&request).await?;

        if response.choices.is_empty() {
            return Err(TermkeepError::MalformedResponse("no choices in response".to_string()));
        }
        match response.first_content() {
            Some(content) if !content.trim().is_empty() => Ok(content.to_string()),
            _ => Err(TermkeepError::MalformedResponse(
                "first choice has no content".to_string(),
            )),
        }
    }
}

/// First few hundred characters of a body, for error messages
pub(crate) fn fragment(body: &str) -> String {
    const LIMIT: usize = 300;
    match body.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{MockTransport, TransportReply};

    const OK_BODY: &str = r#"{"id":"gen-1","choices":[{"index":0,"message":{"role":"assistant","content":"translated"},"finish_reason":"stop"}]}"#;

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            backoff_step: Duration::from_millis(1),
        }
    }

    fn client(transport: MockTransport) -> CompletionClient {
        CompletionClient::new(Box::new(transport), "test/model", fast_retry())
    }

    fn ok_reply() -> TransportReply {
        TransportReply { status: 200, body: OK_BODY.to_string() }
    }

    #[tokio::test]
    async fn test_succeeds_after_two_timeouts() {
        let mut transport = MockTransport::new();
        let mut calls = 0;
        transport.expect_send().times(3).returning(move |_| {
            calls += 1;
            if calls <= 2 {
                Err(TermkeepError::Timeout("deadline exceeded".to_string()))
            } else {
                Ok(ok_reply())
            }
        });

        let text = client(transport).complete("translate this").await.unwrap();
        assert_eq!(text, "translated");
    }

    #[tokio::test]
    async fn test_fails_after_three_timeouts() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(3)
            .returning(|_| Err(TermkeepError::Timeout("deadline exceeded".to_string())));

        let err = client(transport).complete("translate this").await.unwrap_err();
        match err {
            TermkeepError::RetriesExhausted { attempts, source } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*source, TermkeepError::Timeout(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let mut transport = MockTransport::new();
        transport.expect_send().times(3).returning(|_| {
            Ok(TransportReply { status: 503, body: "overloaded".to_string() })
        });

        let err = client(transport).complete("p").await.unwrap_err();
        assert!(matches!(
            err.root(),
            TermkeepError::Api { status: 503, body } if body == "overloaded"
        ));
        assert!(err.to_string().contains("after 3 attempts"));
    }

    #[tokio::test]
    async fn test_client_errors_fail_immediately() {
        let mut transport = MockTransport::new();
        transport.expect_send().times(1).returning(|_| {
            Ok(TransportReply { status: 401, body: r#"{"error":"bad key"}"#.to_string() })
        });

        let err = client(transport).complete("p").await.unwrap_err();
        match err {
            TermkeepError::Api { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("bad key"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_connection_errors_are_not_retried() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| Err(TermkeepError::Transport("connection refused".to_string())));

        let err = client(transport).complete("p").await.unwrap_err();
        assert!(matches!(err, TermkeepError::Transport(_)));
    }

    #[tokio::test]
    async fn test_empty_choices_is_malformed() {
        let mut transport = MockTransport::new();
        transport.expect_send().times(1).returning(|_| {
            Ok(TransportReply { status: 200, body: r#"{"choices":[]}"#.to_string() })
        });

        let err = client(transport).complete("p").await.unwrap_err();
        assert!(matches!(err, TermkeepError::MalformedResponse(msg) if msg.contains("no choices")));
    }

    #[tokio::test]
    async fn test_choice_without_content_is_malformed() {
        let mut transport = MockTransport::new();
        transport.expect_send().times(1).returning(|_| {
            Ok(TransportReply {
                status: 200,
                body: r#"{"choices":[{"message":{"role":"assistant"}}]}"#.to_string(),
            })
        });

        let err = client(transport).complete("p").await.unwrap_err();
        assert!(matches!(err, TermkeepError::MalformedResponse(msg) if msg.contains("no content")));
    }

    #[tokio::test]
    async fn test_blank_content_is_malformed() {
        let mut transport = MockTransport::new();
        transport.expect_send().times(1).returning(|_| {
            Ok(TransportReply {
                status: 200,
                body: r#"{"choices":[{"message":{"role":"assistant","content":"  \n "}}]}"#.to_string(),
            })
        });

        let err = client(transport).complete("p").await.unwrap_err();
        assert!(matches!(err, TermkeepError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_usage_is_optional_and_parsed() {
        let mut transport = MockTransport::new();
        transport.expect_send().times(1).returning(|_| {
            Ok(TransportReply {
                status: 200,
                body: r#"{"choices":[{"message":{"content":"ok"}}],"usage":{"prompt_tokens":12,"completion_tokens":3,"total_tokens":15}}"#.to_string(),
            })
        });

        let request = CompletionRequest::single("test/model", "p");
        let response = client(transport).create_completion(&request).await.unwrap();
        let usage = response.usage.as_ref().unwrap();
        assert_eq!(usage.total_tokens, 15);
        assert_eq!(response.first_content(), Some("ok"));
    }

    #[tokio::test]
    async fn test_unparseable_body_is_not_retried() {
        let mut transport = MockTransport::new();
        transport.expect_send().times(1).returning(|_| {
            Ok(TransportReply { status: 200, body: "<html>gateway</html>".to_string() })
        });

        let err = client(transport).complete("p").await.unwrap_err();
        assert!(matches!(err, TermkeepError::MalformedResponse(msg) if msg.contains("<html>")));
    }

    #[tokio::test]
    async fn test_request_carries_model_and_single_user_message() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|body: &String| {
                let value: serde_json::Value = serde_json::from_str(body).unwrap();
                value["model"] == "test/model"
                    && value["messages"].as_array().map(|m| m.len()) == Some(1)
                    && value["messages"][0]["role"] == "user"
                    && value["messages"][0]["content"] == "hello"
            })
            .times(1)
            .returning(|_| Ok(ok_reply()));

        client(transport).complete("hello").await.unwrap();
    }

    #[test]
    fn test_linear_backoff() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
    }

    #[test]
    fn test_fragment_truncates_long_bodies() {
        let body = "x".repeat(1000);
        let short = fragment(&body);
        assert_eq!(short.len(), 303);
        assert_eq!(fragment("short"), "short");
    }
}
