use chrono::{DateTime, Local};

use super::{Level, LogFormatter};

/// One log call, captured on the calling thread.
#[derive(Debug, Clone)]
pub struct Record<'a> {
    pub level: Level,
    pub time: DateTime<Local>,
    pub thread: String,
    pub file: &'a str,
    pub line: u32,
    pub logger: &'a str,
    pub message: &'a str,
}

impl<'a> Record<'a> {
    pub fn now(level: Level, logger: &'a str, file: &'a str, line: u32, message: &'a str) -> Self {
        Self {
            level,
            time: Local::now(),
            thread: crate::utils::thread_label(),
            file,
            line,
            logger,
            message,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub time_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            time_format: "%H:%M:%S".to_string(),
        }
    }
}

/// `[HH:MM:SS][<thread>][<LEVEL>][<logger>][<file>:<line>]\t<message>\n`
pub struct DefaultFormatter {
    config: Config,
}

impl DefaultFormatter {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl Default for DefaultFormatter {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl LogFormatter for DefaultFormatter {
    fn format(&self, record: &Record) -> String {
        format!(
            "[{}][{}][{}][{}][{}:{}]\t{}\n",
            record.time.format(&self.config.time_format),
            record.thread,
            record.level,
            record.logger,
            record.file,
            record.line,
            record.message,
        )
    }
}
