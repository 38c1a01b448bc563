pub mod stdin;
pub mod timestamp;
pub mod udp;

use thiserror::Error;

pub use timestamp::{TimestampError, TimestampExtractor};
pub use udp::{split_datagram, DatagramReader, UdpDatagramReader};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to bind UDP socket on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("udp source requires a listen address")]
    MissingListenAddress,
}
