use super::traits::{InputLogEvent, LogSink, SequenceToken, SinkError, StreamDescription};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::time::Instant;

/// In-process sink with the same token chaining rules as the remote one.
///
/// Clones share state, so a test can keep a handle while the shipper owns another.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<MemoryState>>,
}

/// Sink calls that can be made to fail on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkOp {
    CreateGroup,
    CreateStream,
    Describe,
    Put,
}

#[derive(Debug, Default)]
struct MemoryState {
    groups: HashSet<String>,
    streams: HashMap<(String, String), MemoryStream>,
    failing: HashMap<SinkOp, usize>,
    describe_calls: usize,
    puts: Vec<PutRecord>,
}

#[derive(Debug, Default)]
struct MemoryStream {
    writes: u64,
    events: Vec<InputLogEvent>,
}

impl MemoryState {
    fn injected_failure(&mut self, op: SinkOp) -> Option<SinkError> {
        let remaining = self.failing.get_mut(&op).filter(|n| **n > 0)?;
        *remaining -= 1;
        Some(SinkError::Api {
            code: "ServiceUnavailableException".to_string(),
            message: "injected failure".to_string(),
        })
    }
}

impl MemoryStream {
    fn token(&self) -> Option<SequenceToken> {
        (self.writes > 0).then(|| SequenceToken::new(format!("token-{:06}", self.writes)))
    }
}

/// A put attempt as the sink saw it.
#[derive(Debug, Clone)]
pub struct PutRecord {
    pub group: String,
    pub stream: String,
    pub token: Option<SequenceToken>,
    pub events: Vec<InputLogEvent>,
    pub accepted: bool,
    pub at: Instant,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next `count` puts fail with a service error.
    pub fn fail_next_puts(&self, count: usize) {
        self.fail_next(SinkOp::Put, count);
    }

    /// Make the next `count` calls of `op` fail with a service error.
    pub fn fail_next(&self, op: SinkOp, count: usize) {
        self.state().failing.insert(op, count);
    }

    /// Simulate another writer appending to the stream, invalidating held tokens.
    pub fn advance_token(&self, group: &str, stream: &str) {
        let mut state = self.state();
        if let Some(s) = state.streams.get_mut(&(group.to_string(), stream.to_string())) {
            s.writes += 1;
        }
    }

    pub fn current_token(&self, group: &str, stream: &str) -> Option<SequenceToken> {
        self.state()
            .streams
            .get(&(group.to_string(), stream.to_string()))
            .and_then(MemoryStream::token)
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.state().groups.contains(group)
    }

    pub fn has_stream(&self, group: &str, stream: &str) -> bool {
        self.state()
            .streams
            .contains_key(&(group.to_string(), stream.to_string()))
    }

    /// Every put attempt so far, accepted or not.
    pub fn puts(&self) -> Vec<PutRecord> {
        self.state().puts.clone()
    }

    pub fn accepted_puts(&self) -> Vec<PutRecord> {
        self.state()
            .puts
            .iter()
            .filter(|p| p.accepted)
            .cloned()
            .collect()
    }

    /// Events stored in a stream, in append order.
    pub fn events(&self, group: &str, stream: &str) -> Vec<InputLogEvent> {
        self.state()
            .streams
            .get(&(group.to_string(), stream.to_string()))
            .map(|s| s.events.clone())
            .unwrap_or_default()
    }

    pub fn describe_calls(&self) -> usize {
        self.state().describe_calls
    }
}

#[async_trait]
impl LogSink for MemorySink {
    async fn ensure_group(&self, group: &str) -> Result<(), SinkError> {
        let mut state = self.state();
        if let Some(err) = state.injected_failure(SinkOp::CreateGroup) {
            return Err(err);
        }
        state.groups.insert(group.to_string());
        Ok(())
    }

    async fn ensure_stream(&self, group: &str, stream: &str) -> Result<(), SinkError> {
        let mut state = self.state();
        if let Some(err) = state.injected_failure(SinkOp::CreateStream) {
            return Err(err);
        }
        if !state.groups.contains(group) {
            return Err(SinkError::NotFound(format!("log group '{}'", group)));
        }
        state
            .streams
            .entry((group.to_string(), stream.to_string()))
            .or_default();
        Ok(())
    }

    async fn describe_streams(
        &self,
        group: &str,
        prefix: &str,
    ) -> Result<Vec<StreamDescription>, SinkError> {
        let mut state = self.state();
        state.describe_calls += 1;
        if let Some(err) = state.injected_failure(SinkOp::Describe) {
            return Err(err);
        }
        if !state.groups.contains(group) {
            return Err(SinkError::NotFound(format!("log group '{}'", group)));
        }

        let mut streams: Vec<StreamDescription> = state
            .streams
            .iter()
            .filter(|((g, name), _)| g == group && name.starts_with(prefix))
            .map(|((_, name), s)| StreamDescription {
                name: name.clone(),
                upload_sequence_token: s.token(),
            })
            .collect();
        streams.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(streams)
    }

    async fn put_batch(
        &self,
        group: &str,
        stream: &str,
        token: Option<&SequenceToken>,
        events: &[InputLogEvent],
    ) -> Result<Option<SequenceToken>, SinkError> {
        let mut state = self.state();
        let mut record = PutRecord {
            group: group.to_string(),
            stream: stream.to_string(),
            token: token.cloned(),
            events: events.to_vec(),
            accepted: false,
            at: Instant::now(),
        };

        if let Some(err) = state.injected_failure(SinkOp::Put) {
            state.puts.push(record);
            return Err(err);
        }

        let key = (group.to_string(), stream.to_string());
        let Some(target) = state.streams.get_mut(&key) else {
            state.puts.push(record);
            return Err(SinkError::NotFound(format!("log stream '{}'", stream)));
        };

        let expected = target.token();
        if expected.as_ref() != token {
            state.puts.push(record);
            return Err(SinkError::TokenConflict { expected });
        }

        target.writes += 1;
        target.events.extend_from_slice(events);
        let next = target.token();

        record.accepted = true;
        state.puts.push(record);

        Ok(next)
    }
}
