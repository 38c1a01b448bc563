use crate::pipeline::Sender;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, info, warn};

/// Read newline-delimited text from `reader` and enqueue each line.
///
/// Lines are cut to `max_line_length` bytes, invalid UTF-8 is replaced.
/// Returns when the reader hits EOF or the queue's consumer is gone.
pub async fn forward_lines<R>(
    reader: R,
    output: Sender<String>,
    max_line_length: usize,
    error_backoff: Duration,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut forwarded: u64 = 0;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if let Some(line) = decode_line(&mut buf, max_line_length) {
                    if output.send(line).await.is_err() {
                        debug!("Message queue closed, stopping line reader");
                        return;
                    }
                    forwarded += 1;
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to read line");
                tokio::time::sleep(error_backoff).await;
            }
        }
    }

    info!(lines = forwarded, "Input closed");
}

pub async fn forward_stdin(
    output: Sender<String>,
    max_line_length: usize,
    error_backoff: Duration,
) {
    forward_lines(tokio::io::stdin(), output, max_line_length, error_backoff).await
}

fn decode_line(buf: &mut Vec<u8>, max_line_length: usize) -> Option<String> {
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    if buf.len() > max_line_length {
        warn!(length = buf.len(), max_line_length, "Truncating line longer than read buffer");
        buf.truncate(max_line_length);
    }
    if buf.is_empty() {
        return None;
    }
    Some(String::from_utf8_lossy(buf).into_owned())
}
