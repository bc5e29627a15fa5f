//! HTTP exchange with the remote chat endpoint.
//!
//! Thin wrapper around one `POST` per message. Body parsing lives in
//! `parse_reply` so it can be tested without a server.

use std::time::Duration;

use reqwest::Url;
use reqwest::header::CONTENT_TYPE;

use crate::config::ChatConfig;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced while sending a chat message.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),

    /// The request never produced a response (connect, timeout, I/O).
    #[error("request failed: {0}")]
    Request(String),

    /// The endpoint answered with a non-success status.
    #[error("request rejected: {status} {reason}")]
    Status { status: u16, reason: String },

    /// The response body was not the expected JSON object.
    #[error("response parse failed: {0}")]
    Decode(String),
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(serde::Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

/// Decoded reply body. Both fields are optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub reply: Option<String>,
    /// Echo of the submitted text, when the service provides one.
    #[serde(default)]
    pub message_sent: Option<String>,
}

// =============================================================================
// TRANSPORT
// =============================================================================

/// Sends one message and returns the decoded reply.
#[async_trait::async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, message: &str) -> Result<ChatReply, ChatError>;
}

pub struct ChatClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl ChatClient {
    /// Build a client for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::ClientBuild`] if the HTTP client fails to build.
    pub fn new(config: &ChatConfig) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| ChatError::ClientBuild(e.to_string()))?;
        Ok(Self { http, endpoint: config.endpoint.clone() })
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl ChatTransport for ChatClient {
    async fn send(&self, message: &str) -> Result<ChatReply, ChatError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .json(&ChatRequest { message })
            .send()
            .await
            .map_err(|e| ChatError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("unknown status").to_owned();
            tracing::error!(status = status.as_u16(), %reason, endpoint = %self.endpoint, "failed to fetch reply");
            return Err(ChatError::Status { status: status.as_u16(), reason });
        }

        let text = response
            .text()
            .await
            .map_err(|e| ChatError::Request(e.to_string()))?;
        let reply = parse_reply(&text)?;
        tracing::debug!(has_reply = reply.reply.is_some(), echoed = reply.message_sent.is_some(), "reply received");
        Ok(reply)
    }
}

// =============================================================================
// PARSING
// =============================================================================

fn parse_reply(body: &str) -> Result<ChatReply, ChatError> {
    let value: serde_json::Value = serde_json::from_str(body).map_err(|e| ChatError::Decode(e.to_string()))?;
    // Derived Deserialize also takes a positional array; only objects count.
    if !value.is_object() {
        return Err(ChatError::Decode("expected a JSON object".to_owned()));
    }
    serde_json::from_value(value).map_err(|e| ChatError::Decode(e.to_string()))
}

#[cfg(test)]
#[path = "client_test.rs"]
mod client_test;
