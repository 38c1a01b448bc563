use crate::pipeline::Sender;
use crate::source::SourceError;
use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

/// Something that hands out raw datagrams.
#[async_trait]
pub trait DatagramReader: Send {
    async fn read_datagram(&mut self) -> io::Result<Vec<u8>>;
}

pub struct UdpDatagramReader {
    socket: UdpSocket,
    buffer: Vec<u8>,
}

impl UdpDatagramReader {
    /// Bind a socket. Datagrams larger than `buffer_size` are truncated by the OS.
    pub async fn bind(addr: &str, buffer_size: usize) -> Result<Self, SourceError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| SourceError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        info!(addr = %addr, buffer_size, "UDP socket bound");

        Ok(Self {
            socket,
            buffer: vec![0u8; buffer_size],
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

#[async_trait]
impl DatagramReader for UdpDatagramReader {
    async fn read_datagram(&mut self) -> io::Result<Vec<u8>> {
        let len = self.socket.recv(&mut self.buffer).await?;
        Ok(self.buffer[..len].to_vec())
    }
}

/// Split one datagram into log lines.
///
/// Invalid UTF-8 is replaced and empty lines are skipped. A line cut off by
/// truncation is passed through as-is.
pub fn split_datagram(data: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(data)
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read datagrams forever and enqueue their lines.
///
/// Read errors are logged and followed by `error_backoff` before the next
/// read. Returns once the queue's consumer is gone.
pub async fn forward_datagrams<R>(mut reader: R, output: Sender<String>, error_backoff: Duration)
where
    R: DatagramReader,
{
    loop {
        let datagram = match reader.read_datagram().await {
            Ok(datagram) => datagram,
            Err(e) => {
                warn!(error = %e, "Failed to read datagram");
                tokio::time::sleep(error_backoff).await;
                continue;
            }
        };

        for line in split_datagram(&datagram) {
            if output.send(line).await.is_err() {
                debug!("Message queue closed, stopping datagram reader");
                return;
            }
        }
    }
}
