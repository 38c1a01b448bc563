use std::time::Duration;
use tokio::sync::mpsc;

pub type Sender<T> = mpsc::Sender<T>;
pub type Receiver<T> = mpsc::Receiver<T>;

/// Create a bounded channel with the specified buffer size.
///
/// Senders wait while the channel is full; nothing is dropped.
pub fn create_channel<T>(buffer_size: usize) -> (Sender<T>, Receiver<T>) {
    mpsc::channel(buffer_size)
}

/// Result of waiting on the queue.
#[derive(Debug, PartialEq, Eq)]
pub enum Dequeued<T> {
    Item(T),
    /// Nothing arrived within the idle window
    Timeout,
    /// Every sender is gone and the queue is drained
    Closed,
}

/// Wait for the next item, giving up after `idle`.
pub async fn dequeue<T>(receiver: &mut Receiver<T>, idle: Duration) -> Dequeued<T> {
    match tokio::time::timeout(idle, receiver.recv()).await {
        Ok(Some(item)) => Dequeued::Item(item),
        Ok(None) => Dequeued::Closed,
        Err(_) => Dequeued::Timeout,
    }
}
