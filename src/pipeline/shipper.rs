use crate::config::types::BatchConfig;
use crate::delivery::DeliveryClient;
use crate::pipeline::batch::{Batch, BatchAccumulator, LogEvent};
use crate::pipeline::channel::{dequeue, Dequeued, Receiver};
use crate::source::timestamp::TimestampExtractor;
use std::time::Duration;
use tracing::{debug, error, info};

/// Counters kept by the shipper while it runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShipperStats {
    pub lines_received: u64,
    pub lines_dropped: u64,
    pub batches_delivered: u64,
    pub batches_failed: u64,
    pub events_delivered: u64,
}

/// The single consumer of the message queue.
///
/// Lines are timestamped, accumulated, and flushed when the batch is full or
/// when no line arrives for the debounce window. Flushes happen one at a time
/// on this task, so the delivery cursor never sees two writes in flight.
pub struct Shipper {
    delivery: DeliveryClient,
    extractor: TimestampExtractor,
    accumulator: BatchAccumulator,
    debounce: Duration,
    stats: ShipperStats,
}

impl Shipper {
    pub fn new(
        delivery: DeliveryClient,
        extractor: TimestampExtractor,
        config: &BatchConfig,
    ) -> Self {
        Self {
            delivery,
            extractor,
            accumulator: BatchAccumulator::new(config.max_put_size),
            debounce: config.debounce,
            stats: ShipperStats::default(),
        }
    }

    pub fn stats(&self) -> ShipperStats {
        self.stats
    }

    /// Drain `input` until every producer is gone.
    ///
    /// Whatever is pending when the queue closes is flushed before returning.
    pub async fn run(mut self, mut input: Receiver<String>) -> ShipperStats {
        info!(
            max_put_size = self.accumulator.max_put_size(),
            debounce_ms = self.debounce.as_millis() as u64,
            "Shipper started"
        );

        loop {
            match dequeue(&mut input, self.debounce).await {
                Dequeued::Item(line) => {
                    self.stats.lines_received += 1;
                    if self.accumulate(line) {
                        let batch = self.accumulator.take();
                        self.flush(batch).await;
                    }
                }
                Dequeued::Timeout => {
                    if let Some(batch) = self.accumulator.idle_flush() {
                        self.flush(batch).await;
                    }
                }
                Dequeued::Closed => {
                    info!("Input channel closed, flushing remaining events");
                    break;
                }
            }
        }

        if let Some(batch) = self.accumulator.idle_flush() {
            self.flush(batch).await;
        }

        info!(
            lines_received = self.stats.lines_received,
            lines_dropped = self.stats.lines_dropped,
            batches_delivered = self.stats.batches_delivered,
            batches_failed = self.stats.batches_failed,
            events_delivered = self.stats.events_delivered,
            "Shipper shutdown complete"
        );

        self.stats
    }

    /// Returns true when the batch is full.
    fn accumulate(&mut self, line: String) -> bool {
        match LogEvent::from_line(line, &self.extractor) {
            Ok(event) => self.accumulator.append(event),
            Err(e) => {
                debug!(error = %e, "Dropping line without a valid timestamp");
                self.stats.lines_dropped += 1;
                false
            }
        }
    }

    async fn flush(&mut self, batch: Batch) {
        let count = batch.len();

        match self.delivery.flush(&batch).await {
            Ok(()) => {
                debug!(count, "Flushed batch");
                self.stats.batches_delivered += 1;
                self.stats.events_delivered += count as u64;
            }
            Err(e) => {
                error!(count, error = %e, "Failed to deliver batch, dropping it");
                self.stats.batches_failed += 1;
            }
        }
    }
}
