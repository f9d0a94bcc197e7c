mod async_logger;
mod bridge;
mod buffer;
mod formatters;
mod level;
mod logger;
mod macros;
mod registry;
mod sinks;
mod worker;

pub use async_logger::AsyncLogger;
pub use bridge::LogBridge;
pub use buffer::{Buffer, BufferConfig};
pub use formatters::{Config as FormatConfig, DefaultFormatter, Record};
pub use level::Level;
pub use logger::{Builder, Logger};
pub use registry::{Registry, DEFAULT_LOGGER};
pub use sinks::{FileSink, FlushMode, RollingFileSink, StdoutSink};
pub use worker::{AsyncWorker, Backpressure, DrainFn};

pub trait LogFormatter: Sync + Send {
    fn format(&self, record: &Record) -> String;
}

/// Destination for drained bytes.
///
/// A sink is only ever called from background worker threads. Sinks shared
/// between loggers serialize internally so each chunk lands whole.
pub trait LogSink: Sync + Send {
    fn flush(&self, bytes: &[u8]) -> crate::Result<()>;
}
