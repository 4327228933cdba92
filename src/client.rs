//! OpenAI-compatible chat completion client.
//!
//! Requests go to `{api_base}/chat/completions`. Connection failures,
//! timeouts, HTTP 429 and 5xx responses are retried with exponential backoff;
//! anything else fails the call at once.

use backon::{BlockingRetryable, ExponentialBuilder};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self { Self { role: "system".into(), content: content.into() } }

    pub fn user(content: impl Into<String>) -> Self { Self { role: "user".into(), content: content.into() } }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("rate limited (status {status})")]
    RateLimited { status: u16 },
    #[error("server error (status {status}): {message}")]
    Server { status: u16, message: String },
    #[error("request rejected (status {status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ClientError {
    /// Failures worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::Http(_) | ClientError::RateLimited { .. } | ClientError::Server { .. })
    }
}

/// A chat model endpoint.
pub trait ChatClient: Send + Sync {
    fn model(&self) -> &str;

    /// Assistant text for `messages`.
    fn complete(&self, messages: &[ChatMessage]) -> Result<String, ClientError>;
}

#[derive(Debug, Clone)]
pub struct ClientParams {
    pub api_base: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Attempts after the first one for transient failures.
    pub retries: usize,
    /// First backoff delay; doubles per retry.
    pub retry_delay: Duration,
    pub request_timeout: Duration,
}

impl Default for ClientParams {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8000/v1".to_string(),
            api_key: None,
            model: "default".to_string(),
            temperature: 0.0,
            max_tokens: 4096,
            retries: 3,
            retry_delay: Duration::from_secs(1),
            request_timeout: Duration::from_secs(600),
        }
    }
}

impl ClientParams {
    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.retry_delay)
            .with_max_delay(self.retry_delay.max(Duration::from_secs(30)))
            .with_factor(2.0)
            .with_jitter()
            .with_max_times(self.retries)
    }
}

/// Run `op`, retrying transient failures according to `backoff`.
pub fn retry_transient<T>(
    backoff: ExponentialBuilder,
    op: impl FnMut() -> Result<T, ClientError>,
) -> Result<T, ClientError> {
    op.retry(backoff)
        .sleep(std::thread::sleep)
        .when(ClientError::is_transient)
        .notify(|err: &ClientError, dur: Duration| warn!("chat request failed ({err}); retrying in {dur:?}"))
        .call()
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Map a non-success HTTP status to an error.
pub fn classify_status(status: u16, body: &str) -> ClientError {
    let message: String = body.chars().take(500).collect();
    match status {
        429 => ClientError::RateLimited { status },
        500..=599 => ClientError::Server { status, message },
        _ => ClientError::Rejected { status, message },
    }
}

/// Assistant text of the first choice.
pub fn parse_completion(body: &str) -> Result<String, ClientError> {
    let resp: CompletionResponse = serde_json::from_str(body).map_err(|e| ClientError::Malformed(e.to_string()))?;
    resp.choices
        .into_iter()
        .next()
        .map(|c| c.message.content.unwrap_or_default())
        .ok_or_else(|| ClientError::Malformed("no choices in response".to_string()))
}

pub struct OpenAiClient {
    params: ClientParams,
    url: String,
    http: reqwest::blocking::Client,
}

impl OpenAiClient {
    pub fn new(params: ClientParams) -> Result<Self, ClientError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(params.request_timeout)
            .build()
            .map_err(|e| ClientError::Http(e.to_string()))?;
        let url = format!("{}/chat/completions", params.api_base.trim_end_matches('/'));
        Ok(Self { params, url, http })
    }

    fn send_once(&self, messages: &[ChatMessage]) -> Result<String, ClientError> {
        let body = serde_json::json!({
            "model": self.params.model,
            "messages": messages,
            "temperature": self.params.temperature,
            "max_tokens": self.params.max_tokens,
        });
        let mut req = self.http.post(&self.url).json(&body);
        if let Some(key) = &self.params.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().map_err(|e| ClientError::Http(e.to_string()))?;
        let status = resp.status();
        let text = resp.text().map_err(|e| ClientError::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(classify_status(status.as_u16(), &text));
        }
        debug!("chat: {} bytes from {}", text.len(), self.url);
        parse_completion(&text)
    }
}

impl ChatClient for OpenAiClient {
    fn model(&self) -> &str { &self.params.model }

    fn complete(&self, messages: &[ChatMessage]) -> Result<String, ClientError> {
        retry_transient(self.params.backoff(), || self.send_once(messages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn instant_backoff(times: usize) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(Duration::ZERO)
            .with_max_delay(Duration::ZERO)
            .with_max_times(times)
    }

    #[test]
    fn retries_transient_until_success() {
        let calls = Cell::new(0);
        let out = retry_transient(instant_backoff(3), || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 { Err(ClientError::Server { status: 503, message: "busy".into() }) } else { Ok("ok") }
        });
        assert_eq!(out.unwrap(), "ok");
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn gives_up_after_budget() {
        let calls = Cell::new(0);
        let out: Result<(), _> = retry_transient(instant_backoff(2), || {
            calls.set(calls.get() + 1);
            Err(ClientError::RateLimited { status: 429 })
        });
        assert!(matches!(out, Err(ClientError::RateLimited { .. })));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn permanent_errors_are_not_retried() {
        let calls = Cell::new(0);
        let out: Result<(), _> = retry_transient(instant_backoff(5), || {
            calls.set(calls.get() + 1);
            Err(ClientError::Rejected { status: 401, message: "no".into() })
        });
        assert!(out.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn completion_parsing() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"hello"}}]}"#;
        assert_eq!(parse_completion(body).unwrap(), "hello");
        assert!(matches!(parse_completion(r#"{"choices":[]}"#), Err(ClientError::Malformed(_))));
        assert!(matches!(parse_completion("<html>"), Err(ClientError::Malformed(_))));
        let null_content = r#"{"choices":[{"message":{"content":null}}]}"#;
        assert_eq!(parse_completion(null_content).unwrap(), "");
    }

    #[test]
    fn status_classification() {
        assert!(classify_status(429, "").is_transient());
        assert!(classify_status(502, "bad gateway").is_transient());
        assert!(!classify_status(400, "bad request").is_transient());
    }
}
