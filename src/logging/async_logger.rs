use std::{future::Future, sync::Arc};

use super::{Level, Logger};
use crate::error::{Error, Result};

/// Awaitable front end over a [`Logger`] for code running on a tokio runtime.
///
/// Queueing can block under backpressure and severe records wait for their
/// backup attempt, so each call runs on tokio's blocking pool and the caller's
/// task is suspended instead of its worker thread. The returned future must be
/// polled from within a tokio runtime.
#[derive(Clone)]
pub struct AsyncLogger {
    logger: Arc<Logger>,
}

impl AsyncLogger {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self { logger }
    }

    pub fn logger(&self) -> &Arc<Logger> {
        &self.logger
    }

    /// Resolves once the record is in the worker's buffer, and for ERROR and
    /// FATAL once the backup attempt finished.
    ///
    /// Fails with [`Error::WorkerStopped`] after the logger shut down.
    pub fn log_async(
        &self,
        level: Level,
        file: &str,
        line: u32,
        message: impl Into<String>,
    ) -> impl Future<Output = Result<()>> + Send + 'static {
        let logger = Arc::clone(&self.logger);
        let file = file.to_string();
        let message = message.into();

        async move {
            match tokio::task::spawn_blocking(move || logger.try_log(level, &file, line, &message)).await {
                Ok(queued) => queued,
                Err(err) => {
                    tracing::error!(target: "asynclog", "async log call failed: {}", err);
                    Err(Error::TaskPanicked)
                }
            }
        }
    }

    /// Fire-and-forget variant; failures are reported, never returned.
    pub fn spawn_log(&self, level: Level, file: &str, line: u32, message: impl Into<String>) {
        let name = self.logger.name().to_string();
        let pending = self.log_async(level, file, line, message);

        tokio::spawn(async move {
            if let Err(err) = pending.await {
                tracing::warn!(target: "asynclog", "logger {}: {}", name, err);
            }
        });
    }
}

impl From<Arc<Logger>> for AsyncLogger {
    fn from(logger: Arc<Logger>) -> Self {
        Self::new(logger)
    }
}
