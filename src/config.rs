use std::{path::PathBuf, time::Duration};

use eyre::{Context, OptionExt};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    logging::{Backpressure, BufferConfig, FlushMode},
    utils::human_duration,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub buffer_size: usize,
    pub threshold: usize,
    pub linear_growth: usize,
    pub flush_log: FlushMode,
    pub backpressure: Backpressure,

    pub backup_enabled: bool,
    pub backup_addr: String,
    pub backup_port: u16,
    pub backup_attempts: u32,
    #[serde(with = "human_duration")]
    pub connect_timeout: Duration,
    #[serde(with = "human_duration")]
    pub retry_delay: Duration,

    pub thread_count: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let buffer = BufferConfig::default();
        Self {
            buffer_size: buffer.buffer_size,
            threshold: buffer.threshold,
            linear_growth: buffer.linear_growth,
            flush_log: FlushMode::Flush,
            backpressure: Backpressure::Block,
            backup_enabled: true,
            backup_addr: "127.0.0.1".to_string(),
            backup_port: 8080,
            backup_attempts: 5,
            connect_timeout: Duration::from_secs(3),
            retry_delay: Duration::ZERO,
            thread_count: 4,
        }
    }
}

impl PipelineConfig {
    pub fn from_json(raw: &str) -> eyre::Result<Self> {
        let config: Self = serde_json::from_str(raw).context("Malformed pipeline config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn buffer(&self) -> BufferConfig {
        BufferConfig {
            buffer_size: self.buffer_size,
            threshold: self.threshold,
            linear_growth: self.linear_growth,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(Error::Config(msg.to_string()));

        if self.buffer_size == 0 {
            return invalid("buffer_size must be greater than zero");
        }
        if self.linear_growth == 0 {
            return invalid("linear_growth must be greater than zero");
        }
        if self.thread_count == 0 {
            return invalid("thread_count must be greater than zero");
        }
        if self.backup_enabled {
            if self.backup_addr.is_empty() {
                return invalid("backup_addr can't be empty");
            }
            if self.backup_port == 0 {
                return invalid("backup_port must be between 1 and 65535");
            }
            if self.backup_attempts == 0 {
                return invalid("backup_attempts must be at least 1");
            }
        }

        Ok(())
    }
}

pub trait ConfigManager: Sized + Clone + Send + Sync {
    fn config_path(&self) -> eyre::Result<PathBuf>;

    fn load(&self) -> eyre::Result<PipelineConfig>;
}

#[derive(Default, Clone, Debug)]
pub struct LocalConfigManager {
    path: Option<PathBuf>,
}

impl LocalConfigManager {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

#[cfg(not(target_os = "windows"))]
pub fn home_dir() -> eyre::Result<PathBuf> {
    let home = std::env::var("HOME").ok().ok_or_eyre("$HOME not found")?;
    Ok(PathBuf::from(home))
}

#[cfg(target_os = "windows")]
pub fn home_dir() -> eyre::Result<PathBuf> {
    let home = std::env::var("USERPROFILE")
        .ok()
        .ok_or_eyre("%userprofile% not found")?;
    Ok(PathBuf::from(home))
}

pub fn config_dir() -> eyre::Result<PathBuf> {
    let config_dir = match std::env::var("XDG_CONFIG_HOME") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => home_dir()?.join(".config"),
    };

    Ok(config_dir.join("asynclog"))
}

impl ConfigManager for LocalConfigManager {
    fn config_path(&self) -> eyre::Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => Ok(config_dir()?.join("config.json")),
        }
    }

    fn load(&self) -> eyre::Result<PipelineConfig> {
        let path = self.config_path()?;

        // NOTE: an explicit path has to exist, the default location may not.
        if !path.exists() && self.path.is_none() {
            tracing::debug!(target: "asynclog", "no config at {}, using defaults", path.display());
            return Ok(PipelineConfig::default());
        }

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed reading config file {}", path.display()))?;
        PipelineConfig::from_json(&raw)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_core_option_names() {
        let config = PipelineConfig::from_json(
            r#"{
                "buffer_size": 16,
                "threshold": 64,
                "linear_growth": 32,
                "flush_log": 2,
                "backup_addr": "10.0.0.7",
                "backup_port": 9000,
                "thread_count": 2
            }"#,
        )
        .unwrap();

        assert_eq!(
            config.buffer(),
            BufferConfig {
                buffer_size: 16,
                threshold: 64,
                linear_growth: 32
            }
        );
        assert_eq!(config.flush_log, FlushMode::Sync);
        assert_eq!(config.backup_addr, "10.0.0.7");
        assert_eq!(config.backup_port, 9000);
        assert_eq!(config.thread_count, 2);
        assert_eq!(config.backup_attempts, 5);
        assert_eq!(config.backpressure, Backpressure::Block);
    }

    #[test]
    fn parses_supplementary_options() {
        let config = PipelineConfig::from_json(
            r#"{ "backpressure": "unsafe", "connect_timeout": "250ms", "retry_delay": "1s" }"#,
        )
        .unwrap();

        assert_eq!(config.backpressure, Backpressure::Grow);
        assert_eq!(config.connect_timeout, Duration::from_millis(250));
        assert_eq!(config.retry_delay, Duration::from_secs(1));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(PipelineConfig::from_json(r#"{ "flush_log": 7 }"#).is_err());
        assert!(PipelineConfig::from_json(r#"{ "thread_count": 0 }"#).is_err());
        assert!(PipelineConfig::from_json(r#"{ "backup_port": 0 }"#).is_err());
        assert!(PipelineConfig::from_json(r#"{ "backup_enabled": false, "backup_port": 0 }"#).is_ok());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let manager = LocalConfigManager::new(Some(dir.path().join("absent.json")));

        assert!(manager.load().is_err());
    }

    #[test]
    fn loads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "thread_count": 7 }"#).unwrap();

        let config = LocalConfigManager::new(Some(path)).load().unwrap();
        assert_eq!(config.thread_count, 7);
    }
}
