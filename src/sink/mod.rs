pub mod http;
pub mod memory;
pub mod traits;

pub use http::HttpLogSink;
pub use memory::{MemorySink, PutRecord, SinkOp};
pub use traits::{InputLogEvent, LogSink, SequenceToken, SinkError, StreamDescription};
