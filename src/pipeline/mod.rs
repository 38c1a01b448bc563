pub mod batch;
pub mod channel;
pub mod shipper;

pub use batch::{Batch, BatchAccumulator, LogEvent};
pub use channel::{create_channel, dequeue, Dequeued, Receiver, Sender};
pub use shipper::{Shipper, ShipperStats};
