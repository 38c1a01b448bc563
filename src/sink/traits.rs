use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Write cursor handed out by the sink. Every put must present the latest one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceToken(String);

impl SequenceToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SequenceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SequenceToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for SequenceToken {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

/// One event as submitted to the sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputLogEvent {
    pub message: String,
    pub timestamp_millis: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDescription {
    pub name: String,
    /// None for a stream that has never been written to
    pub upload_sequence_token: Option<SequenceToken>,
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("sequence token rejected (expected {})", .expected.as_ref().map(|t| t.as_str()).unwrap_or("none"))]
    TokenConflict { expected: Option<SequenceToken> },

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("sink returned {code}: {message}")]
    Api { code: String, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Capabilities required of an append-only, token-chained log store.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Create the group unless it already exists.
    async fn ensure_group(&self, group: &str) -> Result<(), SinkError>;

    /// Create the stream inside `group` unless it already exists.
    async fn ensure_stream(&self, group: &str, stream: &str) -> Result<(), SinkError>;

    /// List streams in `group` whose name starts with `prefix`.
    async fn describe_streams(
        &self,
        group: &str,
        prefix: &str,
    ) -> Result<Vec<StreamDescription>, SinkError>;

    /// Append `events` atomically. Returns the token for the next put.
    async fn put_batch(
        &self,
        group: &str,
        stream: &str,
        token: Option<&SequenceToken>,
        events: &[InputLogEvent],
    ) -> Result<Option<SequenceToken>, SinkError>;
}
