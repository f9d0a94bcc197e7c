use std::sync::Arc;

use crate::{
    backup::{BackupClient, BackupDispatcher},
    config::PipelineConfig,
    error::Result,
    logging::{AsyncLogger, Builder, Logger, Registry, DEFAULT_LOGGER},
    pool::ThreadPool,
};

/// Everything a process needs to log: the shared pool, the backup
/// dispatcher and the logger registry, built once from configuration.
pub struct LogContext {
    config: PipelineConfig,
    pool: Arc<ThreadPool>,
    backup: Option<Arc<BackupDispatcher>>,
    registry: Registry,
    closed: bool,
}

impl LogContext {
    pub fn init(config: PipelineConfig) -> Result<Self> {
        config.validate()?;

        let pool = Arc::new(ThreadPool::new(config.thread_count)?);
        let backup = config.backup_enabled.then(|| {
            Arc::new(BackupDispatcher::new(
                Arc::clone(&pool),
                BackupClient::from_config(&config),
            ))
        });

        let mut default = Builder::new(DEFAULT_LOGGER)
            .with_buffer(config.buffer())
            .with_backpressure(config.backpressure)
            .with_stdout_sink();
        if let Some(backup) = &backup {
            default = default.with_backup(Arc::clone(backup));
        }
        let registry = Registry::new(default.build()?);

        tracing::debug!(
            target: "asynclog",
            "log context ready: {} pool threads, backup {}",
            config.thread_count,
            backup
                .as_ref()
                .map(|b| b.client().destination())
                .unwrap_or_else(|| "disabled".to_string())
        );

        Ok(Self {
            config,
            pool,
            backup,
            registry,
            closed: false,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn pool(&self) -> &Arc<ThreadPool> {
        &self.pool
    }

    /// A builder carrying this context's buffer sizing, flush mode,
    /// backpressure and backup dispatcher.
    pub fn logger_builder(&self, name: impl Into<String>) -> Builder {
        let builder = Builder::new(name)
            .with_buffer(self.config.buffer())
            .with_backpressure(self.config.backpressure)
            .with_flush_mode(self.config.flush_log);

        match &self.backup {
            Some(backup) => builder.with_backup(Arc::clone(backup)),
            None => builder,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Registers `logger` unless its name is taken; returns the registered one.
    pub fn add_logger(&self, logger: Logger) -> Option<Arc<Logger>> {
        let name = logger.name().to_string();
        self.registry.add(logger);
        self.registry.get(&name)
    }

    pub fn logger(&self, name: &str) -> Option<Arc<Logger>> {
        self.registry.get(name)
    }

    pub fn default_logger(&self) -> Arc<Logger> {
        self.registry.default_logger()
    }

    /// The registered logger `name` behind an awaitable front end.
    pub fn async_logger(&self, name: &str) -> Option<AsyncLogger> {
        self.logger(name).map(AsyncLogger::new)
    }

    /// Drains every logger, then the pool.
    pub fn shutdown(mut self) {
        self.close();
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        self.registry.shutdown();
        self.pool.shutdown();
        tracing::debug!(target: "asynclog", "log context shut down");
    }
}

impl Drop for LogContext {
    fn drop(&mut self) {
        self.close();
    }
}
