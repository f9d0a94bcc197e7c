use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use super::Logger;

pub const DEFAULT_LOGGER: &str = "default";

/// Name to logger directory. The first logger registered under a name keeps it.
pub struct Registry {
    loggers: Mutex<HashMap<String, Arc<Logger>>>,
    default: Arc<Logger>,
}

impl Registry {
    /// `default` is reachable through [`Registry::default_logger`] and under its own name.
    pub fn new(default: Logger) -> Self {
        let default = Arc::new(default);
        let mut loggers = HashMap::new();
        loggers.insert(default.name().to_string(), Arc::clone(&default));

        Self {
            loggers: Mutex::new(loggers),
            default,
        }
    }

    fn loggers(&self) -> MutexGuard<'_, HashMap<String, Arc<Logger>>> {
        self.loggers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns false, leaving the registry untouched, when the name is taken.
    pub fn add(&self, logger: impl Into<Arc<Logger>>) -> bool {
        let logger = logger.into();
        let mut loggers = self.loggers();
        if loggers.contains_key(logger.name()) {
            tracing::debug!(target: "asynclog", "logger {} already registered", logger.name());
            return false;
        }

        loggers.insert(logger.name().to_string(), logger);
        true
    }

    pub fn get(&self, name: &str) -> Option<Arc<Logger>> {
        self.loggers().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.loggers().contains_key(name)
    }

    pub fn default_logger(&self) -> Arc<Logger> {
        Arc::clone(&self.default)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.loggers().keys().cloned().collect();
        names.sort();
        names
    }

    /// Drains and stops every registered logger.
    pub fn shutdown(&self) {
        let loggers: Vec<Arc<Logger>> = self.loggers().values().cloned().collect();
        for logger in loggers {
            logger.shutdown();
        }
    }
}
