use std::{path::PathBuf, sync::Arc};

use super::{
    buffer::BufferConfig,
    formatters::{DefaultFormatter, Record},
    sinks::{FileSink, FlushMode, RollingFileSink, StdoutSink},
    worker::{AsyncWorker, Backpressure},
    Level, LogFormatter, LogSink,
};
use crate::{
    backup::BackupDispatcher,
    error::{Error, Result},
};

pub struct Logger {
    name: String,
    level: Level,
    formatter: Box<dyn LogFormatter>,
    worker: AsyncWorker,
    backup: Option<Arc<BackupDispatcher>>,
}

impl Logger {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn enabled(&self, level: Level) -> bool {
        level >= self.level
    }

    /// Formats one record and queues it for the sinks.
    ///
    /// ERROR and FATAL records are also sent to the backup collector, and this
    /// call waits for that attempt to finish. Sink and backup failures are
    /// reported on the `asynclog` tracing target, never returned.
    pub fn log(&self, level: Level, file: &str, line: u32, message: &str) {
        if let Err(err) = self.try_log(level, file, line, message) {
            tracing::warn!(target: "asynclog", "logger {}: {}", self.name, err);
        }
    }

    /// Like [`Logger::log`], but hands back the queueing error instead of
    /// reporting it. The backup copy is still attempted when queueing fails.
    pub fn try_log(&self, level: Level, file: &str, line: u32, message: &str) -> Result<()> {
        if !self.enabled(level) {
            return Ok(());
        }

        let record = Record::now(level, &self.name, file, line, message);
        let formatted = self.formatter.format(&record);
        let queued = self.worker.push(formatted.as_bytes());

        if level.is_severe() {
            if let Some(backup) = &self.backup {
                backup.dispatch(formatted);
            }
        }

        queued
    }

    pub fn debug(&self, file: &str, line: u32, message: &str) {
        self.log(Level::Debug, file, line, message)
    }

    pub fn info(&self, file: &str, line: u32, message: &str) {
        self.log(Level::Info, file, line, message)
    }

    pub fn warn(&self, file: &str, line: u32, message: &str) {
        self.log(Level::Warn, file, line, message)
    }

    pub fn error(&self, file: &str, line: u32, message: &str) {
        self.log(Level::Error, file, line, message)
    }

    pub fn fatal(&self, file: &str, line: u32, message: &str) {
        self.log(Level::Fatal, file, line, message)
    }

    /// Stops accepting records and blocks until the sinks saw everything.
    pub fn shutdown(&self) {
        self.worker.stop();
        tracing::debug!(target: "asynclog", "logger {} shut down", self.name);
    }
}

fn drain_to(name: String, sinks: Vec<Arc<dyn LogSink>>) -> impl FnMut(&[u8]) + Send + 'static {
    let fallback = StdoutSink::new();

    move |bytes| {
        if sinks.is_empty() {
            if let Err(err) = fallback.flush(bytes) {
                tracing::error!(target: "asynclog", "logger {}: stdout write failed: {}", name, err);
            }
            return;
        }

        for sink in &sinks {
            if let Err(err) = sink.flush(bytes) {
                tracing::error!(target: "asynclog", "logger {}: sink write failed: {}", name, err);
            }
        }
    }
}

pub struct Builder {
    name: String,
    level: Level,
    buffer: BufferConfig,
    backpressure: Backpressure,
    flush_mode: FlushMode,
    sinks: Vec<Arc<dyn LogSink>>,
    formatter: Box<dyn LogFormatter>,
    backup: Option<Arc<BackupDispatcher>>,
}

impl Builder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: Level::Debug,
            buffer: BufferConfig::default(),
            backpressure: Backpressure::default(),
            flush_mode: FlushMode::default(),
            sinks: Vec::new(),
            formatter: Box::new(DefaultFormatter::default()),
            backup: None,
        }
    }

    pub fn with_level(self, level: Level) -> Self {
        Self { level, ..self }
    }

    pub fn with_buffer(self, buffer: BufferConfig) -> Self {
        Self { buffer, ..self }
    }

    pub fn with_backpressure(self, backpressure: Backpressure) -> Self {
        Self {
            backpressure,
            ..self
        }
    }

    /// Flush mode used by file sinks added after this call.
    pub fn with_flush_mode(self, flush_mode: FlushMode) -> Self {
        Self { flush_mode, ..self }
    }

    pub fn with_formatter(self, formatter: impl LogFormatter + 'static) -> Self {
        Self {
            formatter: Box::new(formatter),
            ..self
        }
    }

    pub fn with_backup(self, backup: Arc<BackupDispatcher>) -> Self {
        Self {
            backup: Some(backup),
            ..self
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn with_stdout_sink(self) -> Self {
        self.with_sink(Arc::new(StdoutSink::new()))
    }

    pub fn with_file_sink(self, path: impl Into<PathBuf>) -> Self {
        let sink = FileSink::new(path, self.flush_mode);
        self.with_sink(Arc::new(sink))
    }

    pub fn with_rolling_file_sink(self, base: impl Into<String>, max_size: u64) -> Self {
        let sink = RollingFileSink::new(base, max_size, self.flush_mode);
        self.with_sink(Arc::new(sink))
    }

    pub fn build(self) -> Result<Logger> {
        if self.name.is_empty() {
            return Err(Error::Config("logger name can't be empty".to_string()));
        }

        let worker = AsyncWorker::spawn(
            &self.name,
            self.buffer,
            self.backpressure,
            Box::new(drain_to(self.name.clone(), self.sinks)),
        )?;

        Ok(Logger {
            name: self.name,
            level: self.level,
            formatter: self.formatter,
            worker,
            backup: self.backup,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Capture(Mutex<Vec<u8>>);

    impl LogSink for Capture {
        fn flush(&self, bytes: &[u8]) -> Result<()> {
            self.0.lock().unwrap().extend_from_slice(bytes);
            Ok(())
        }
    }

    impl Capture {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    struct Failing;

    impl LogSink for Failing {
        fn flush(&self, _bytes: &[u8]) -> Result<()> {
            Err(Error::Transport(std::io::Error::other("disk gone")))
        }
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(matches!(Builder::new("").build(), Err(Error::Config(_))));
    }

    #[test]
    fn every_sink_sees_every_line_in_order() {
        let first = Arc::new(Capture::default());
        let second = Arc::new(Capture::default());
        let logger = Builder::new("orders")
            .with_sink(first.clone())
            .with_sink(second.clone())
            .build()
            .unwrap();

        logger.info("shop.rs", 10, "placed");
        logger.warn("shop.rs", 11, "slow");
        logger.shutdown();

        let text = first.text();
        assert_eq!(text, second.text());

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("[INFO][orders][shop.rs:10]\tplaced"));
        assert!(lines[1].ends_with("[WARN][orders][shop.rs:11]\tslow"));
    }

    #[test]
    fn records_below_level_are_skipped() {
        let capture = Arc::new(Capture::default());
        let logger = Builder::new("quiet")
            .with_level(Level::Warn)
            .with_sink(capture.clone())
            .build()
            .unwrap();

        logger.debug("a.rs", 1, "hidden");
        logger.info("a.rs", 2, "hidden");
        logger.error("a.rs", 3, "shown");
        logger.shutdown();

        let text = capture.text();
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("[ERROR][quiet][a.rs:3]\tshown"));
    }

    #[test]
    fn failing_sink_does_not_starve_the_others() {
        let capture = Arc::new(Capture::default());
        let logger = Builder::new("mixed")
            .with_sink(Arc::new(Failing))
            .with_sink(capture.clone())
            .build()
            .unwrap();

        logger.fatal("m.rs", 5, "still delivered");
        logger.shutdown();

        assert!(capture.text().contains("still delivered"));
    }

    #[test]
    fn logging_after_shutdown_is_swallowed() {
        let capture = Arc::new(Capture::default());
        let logger = Builder::new("closed")
            .with_sink(capture.clone())
            .build()
            .unwrap();

        logger.shutdown();
        logger.info("c.rs", 1, "too late");

        assert!(capture.text().is_empty());
        assert!(matches!(
            logger.try_log(Level::Info, "c.rs", 2, "still too late"),
            Err(Error::WorkerStopped)
        ));
    }
}
