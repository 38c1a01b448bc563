use crate::config::types::TargetConfig;
use crate::pipeline::batch::Batch;
use crate::sink::{InputLogEvent, LogSink, SequenceToken, SinkError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("failed to create log group '{group}': {source}")]
    CreateGroup {
        group: String,
        #[source]
        source: SinkError,
    },

    #[error("failed to create log stream '{stream}': {source}")]
    CreateStream {
        stream: String,
        #[source]
        source: SinkError,
    },

    #[error("failed to describe log stream '{stream}': {source}")]
    Describe {
        stream: String,
        #[source]
        source: SinkError,
    },

    #[error("log stream '{stream}' not found in group '{group}'")]
    StreamNotFound { group: String, stream: String },

    #[error("delivery client used before setup")]
    NotReady,

    #[error("sequence token rejected, it will be refreshed before the next flush: {0}")]
    TokenConflict(#[source] SinkError),

    #[error("failed to put log events: {0}")]
    Put(#[source] SinkError),
}

/// Group and stream every batch is written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamTarget {
    pub group: String,
    pub stream: String,
}

impl From<&TargetConfig> for StreamTarget {
    fn from(config: &TargetConfig) -> Self {
        Self {
            group: config.group.clone(),
            stream: config.stream.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CursorState {
    Uninitialized,
    Ready(Option<SequenceToken>),
    /// The sink rejected our token; describe the stream before writing again
    Stale,
}

/// Owns the write cursor for one stream and serializes puts against it.
///
/// Takes `&mut self` for every write, so at most one put is ever in flight.
pub struct DeliveryClient {
    sink: Arc<dyn LogSink>,
    target: StreamTarget,
    state: CursorState,
}

impl DeliveryClient {
    pub fn new(sink: Arc<dyn LogSink>, target: StreamTarget) -> Self {
        Self {
            sink,
            target,
            state: CursorState::Uninitialized,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, CursorState::Ready(_))
    }

    pub fn is_stale(&self) -> bool {
        self.state == CursorState::Stale
    }

    /// Token the next put will present, if the cursor is known.
    pub fn sequence_token(&self) -> Option<&SequenceToken> {
        match &self.state {
            CursorState::Ready(token) => token.as_ref(),
            _ => None,
        }
    }

    /// Make sure group and stream exist and adopt the stream's current token.
    ///
    /// Any failure here leaves the client unusable; there is no cursor to resume from.
    pub async fn setup(&mut self) -> Result<(), DeliveryError> {
        let StreamTarget { group, stream } = &self.target;

        info!(group = %group, stream = %stream, "Setting up log stream");

        self.sink
            .ensure_group(group)
            .await
            .map_err(|source| DeliveryError::CreateGroup {
                group: group.clone(),
                source,
            })?;

        self.sink
            .ensure_stream(group, stream)
            .await
            .map_err(|source| DeliveryError::CreateStream {
                stream: stream.clone(),
                source,
            })?;

        let token = self.fetch_token().await?;

        info!(
            group = %self.target.group,
            stream = %self.target.stream,
            has_token = token.is_some(),
            "Log stream ready"
        );

        self.state = CursorState::Ready(token);
        Ok(())
    }

    async fn fetch_token(&self) -> Result<Option<SequenceToken>, DeliveryError> {
        let StreamTarget { group, stream } = &self.target;

        let streams = self
            .sink
            .describe_streams(group, stream)
            .await
            .map_err(|source| DeliveryError::Describe {
                stream: stream.clone(),
                source,
            })?;

        // Describe matches by prefix; "web-1" must not pick up "web-10"
        streams
            .into_iter()
            .find(|s| &s.name == stream)
            .map(|s| s.upload_sequence_token)
            .ok_or_else(|| DeliveryError::StreamNotFound {
                group: group.clone(),
                stream: stream.clone(),
            })
    }

    /// Submit one batch as a single put.
    ///
    /// On success the returned token becomes the cursor. A token conflict marks
    /// the cursor stale; any other failure leaves it untouched. The batch is
    /// never retried here.
    pub async fn flush(&mut self, batch: &Batch) -> Result<(), DeliveryError> {
        if self.state == CursorState::Stale {
            let token = self.fetch_token().await?;
            info!(has_token = token.is_some(), "Refreshed sequence token");
            self.state = CursorState::Ready(token);
        }

        let token = match &self.state {
            CursorState::Ready(token) => token.clone(),
            _ => return Err(DeliveryError::NotReady),
        };

        if batch.is_empty() {
            return Ok(());
        }

        let events: Vec<InputLogEvent> = batch
            .events()
            .iter()
            .map(|e| InputLogEvent {
                message: e.text.clone(),
                timestamp_millis: e.timestamp_millis(),
            })
            .collect();

        match self
            .sink
            .put_batch(
                &self.target.group,
                &self.target.stream,
                token.as_ref(),
                &events,
            )
            .await
        {
            Ok(next) => {
                debug!(events = events.len(), "Put log events");
                self.state = CursorState::Ready(next);
                Ok(())
            }
            Err(e @ SinkError::TokenConflict { .. }) => {
                warn!(error = %e, "Sequence token out of date");
                self.state = CursorState::Stale;
                Err(DeliveryError::TokenConflict(e))
            }
            Err(e) => Err(DeliveryError::Put(e)),
        }
    }
}
