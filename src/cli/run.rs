use crate::config::types::{Config, SourceType};
use crate::delivery::{DeliveryClient, DeliveryError, StreamTarget};
use crate::pipeline::{create_channel, Sender, Shipper, ShipperStats};
use crate::sink::{HttpLogSink, LogSink, SinkError};
use crate::source::stdin::forward_stdin;
use crate::source::udp::{forward_datagrams, UdpDatagramReader};
use crate::source::{SourceError, TimestampError, TimestampExtractor};
use std::sync::Arc;
use thiserror::Error;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("delivery setup failed: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("timestamp config error: {0}")]
    Timestamp(#[from] TimestampError),

    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Ship lines to the remote sink described by `config`.
pub async fn run(config: &Config) -> Result<ShipperStats, RunError> {
    let sink = HttpLogSink::new(&config.target)?;
    info!(endpoint = %sink.endpoint(), "Using log sink");

    run_with_sink(config, Arc::new(sink)).await
}

/// Same as [`run`] with a caller-provided sink.
pub async fn run_with_sink(
    config: &Config,
    sink: Arc<dyn LogSink>,
) -> Result<ShipperStats, RunError> {
    let extractor = TimestampExtractor::from_config(&config.timestamp)?;

    let mut delivery = DeliveryClient::new(sink, StreamTarget::from(&config.target));
    delivery.setup().await?;

    let (tx, rx) = create_channel::<String>(config.batch.message_buffer_size);
    let mut source_handle = spawn_source(config, tx).await?;

    let shipper = Shipper::new(delivery, extractor, &config.batch);
    let shipper_handle = tokio::spawn(shipper.run(rx));

    info!("Shipper running, press Ctrl+C to stop");

    // Either way the queue's sender goes away and the shipper drains what's left
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received, draining queue");
            source_handle.abort();
        }
        result = &mut source_handle => {
            if let Err(e) = result {
                warn!(error = %e, "Line source task failed");
            }
        }
    }

    let stats = shipper_handle.await?;

    Ok(stats)
}

async fn spawn_source(config: &Config, tx: Sender<String>) -> Result<JoinHandle<()>, RunError> {
    let source = &config.source;

    let handle = match source.source_type {
        SourceType::Stdin => {
            info!("Reading lines from stdin");
            tokio::spawn(forward_stdin(
                tx,
                source.read_buffer_size,
                source.read_error_backoff,
            ))
        }
        SourceType::Udp => {
            let addr = source
                .listen
                .as_deref()
                .ok_or(SourceError::MissingListenAddress)?;
            let reader = UdpDatagramReader::bind(addr, source.read_buffer_size).await?;
            tokio::spawn(forward_datagrams(reader, tx, source.read_error_backoff))
        }
    };

    Ok(handle)
}
