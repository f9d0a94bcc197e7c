use std::sync::Arc;

use eyre::Context;
use log::Log;

use super::{Level, Logger};

/// Routes records from the `log` facade into a pipeline [`Logger`].
pub struct LogBridge {
    logger: Arc<Logger>,
}

impl LogBridge {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self { logger }
    }

    pub fn init(self) -> eyre::Result<()> {
        log::set_max_level(self.logger.level().into());
        log::set_boxed_logger(Box::new(self)).context("Failed registering boxed logger")?;

        Ok(())
    }
}

impl Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.logger.enabled(Level::from(metadata.level()))
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let message = record.args().to_string();
        self.logger.log(
            Level::from(record.level()),
            record.file().unwrap_or(record.target()),
            record.line().unwrap_or(0),
            &message,
        );
    }

    // draining happens on the worker thread
    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::logging::{Builder, LogSink};

    #[derive(Default)]
    struct Capture(Mutex<Vec<u8>>);

    impl LogSink for Capture {
        fn flush(&self, bytes: &[u8]) -> crate::Result<()> {
            self.0.lock().unwrap().extend_from_slice(bytes);
            Ok(())
        }
    }

    #[test]
    fn forwards_log_records_with_call_site() {
        let capture = Arc::new(Capture::default());
        let logger = Arc::new(
            Builder::new("facade")
                .with_level(Level::Info)
                .with_sink(capture.clone())
                .build()
                .unwrap(),
        );
        let bridge = LogBridge::new(Arc::clone(&logger));

        bridge.log(
            &log::Record::builder()
                .level(log::Level::Warn)
                .file(Some("net.rs"))
                .line(Some(8))
                .args(format_args!("retrying {}", 3))
                .build(),
        );
        bridge.log(
            &log::Record::builder()
                .level(log::Level::Trace)
                .args(format_args!("noise"))
                .build(),
        );
        logger.shutdown();

        let text = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("[WARN][facade][net.rs:8]\tretrying 3"));
    }
}
