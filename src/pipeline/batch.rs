use crate::source::timestamp::{TimestampError, TimestampExtractor};
use chrono::{DateTime, Utc};

/// A log line paired with the timestamp it starts with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl LogEvent {
    pub fn from_line(line: String, extractor: &TimestampExtractor) -> Result<Self, TimestampError> {
        let timestamp = extractor.extract(&line)?;
        Ok(Self {
            text: line,
            timestamp,
        })
    }

    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}

/// Events sealed for a single put, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    events: Vec<LogEvent>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[LogEvent] {
        &self.events
    }
}

impl From<Vec<LogEvent>> for Batch {
    fn from(events: Vec<LogEvent>) -> Self {
        Self { events }
    }
}

/// Collects events until the batch is full or the input goes quiet.
#[derive(Debug)]
pub struct BatchAccumulator {
    max_put_size: usize,
    events: Vec<LogEvent>,
}

impl BatchAccumulator {
    pub fn new(max_put_size: usize) -> Self {
        let max_put_size = max_put_size.max(1);
        Self {
            max_put_size,
            events: Vec::with_capacity(max_put_size),
        }
    }

    /// Add an event. Returns true once the batch holds `max_put_size` events.
    pub fn append(&mut self, event: LogEvent) -> bool {
        self.events.push(event);
        self.events.len() >= self.max_put_size
    }

    /// Hand over the pending batch after an idle timeout, if there is one.
    pub fn idle_flush(&mut self) -> Option<Batch> {
        if self.events.is_empty() {
            None
        } else {
            Some(self.take())
        }
    }

    /// Hand over everything pending and start a new, empty batch.
    pub fn take(&mut self) -> Batch {
        let events = std::mem::replace(&mut self.events, Vec::with_capacity(self.max_put_size));
        Batch { events }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn max_put_size(&self) -> usize {
        self.max_put_size
    }
}
