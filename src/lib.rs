//! Asynchronous logging pipeline.
//!
//! Callers format a line and push it into a double buffer; one background
//! thread per [`logging::Logger`] swaps the buffers and drains them into the
//! configured sinks. ERROR and FATAL lines are additionally pushed to a remote
//! backup collector from a shared [`pool::ThreadPool`].

pub mod backup;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod pool;
pub mod utils;

pub use context::LogContext;
pub use error::{Error, Result};
