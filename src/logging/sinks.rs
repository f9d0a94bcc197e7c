use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex, MutexGuard, PoisonError,
    },
};

use chrono::Local;
use serde::{Deserialize, Serialize};

use super::LogSink;
use crate::{
    error::{Error, Result},
    utils::{ensure_parent_dir, rolled_file_name},
};

/// How hard a file sink pushes bytes towards the disk after each write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum FlushMode {
    /// Leave bytes in the userspace buffer until it fills up.
    #[default]
    Buffered,
    /// Hand bytes to the OS after every write.
    Flush,
    /// Flush and fsync after every write.
    Sync,
}

impl TryFrom<u8> for FlushMode {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(FlushMode::Buffered),
            1 => Ok(FlushMode::Flush),
            2 => Ok(FlushMode::Sync),
            other => Err(format!("flush_log must be 0, 1 or 2, got {}", other)),
        }
    }
}

impl From<FlushMode> for u8 {
    fn from(mode: FlushMode) -> Self {
        match mode {
            FlushMode::Buffered => 0,
            FlushMode::Flush => 1,
            FlushMode::Sync => 2,
        }
    }
}

fn open_append(path: &Path) -> Result<BufWriter<File>> {
    ensure_parent_dir(path).map_err(|e| Error::io(path, e))?;

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::io(path, e))?;

    Ok(BufWriter::new(file))
}

fn write_with_mode(
    writer: &mut BufWriter<File>,
    bytes: &[u8],
    mode: FlushMode,
    path: &Path,
) -> Result<()> {
    writer.write_all(bytes).map_err(|e| Error::io(path, e))?;

    match mode {
        FlushMode::Buffered => Ok(()),
        FlushMode::Flush => writer.flush().map_err(|e| Error::io(path, e)),
        FlushMode::Sync => {
            writer.flush().map_err(|e| Error::io(path, e))?;
            writer.get_ref().sync_data().map_err(|e| Error::io(path, e))
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct StdoutSink {
    handle: std::io::Stdout,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self {
            handle: std::io::stdout(),
        }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for StdoutSink {
    fn flush(&self, bytes: &[u8]) -> Result<()> {
        let mut writer = self.handle.lock();
        writer.write_all(bytes)?;
        writer.flush()?;
        Ok(())
    }
}

/// Appends to one file for the life of the sink.
///
/// A file that can't be opened is reported once and the sink turns inert:
/// later writes are dropped silently.
pub struct FileSink {
    file: Mutex<Option<BufWriter<File>>>,
    file_path: PathBuf,
    mode: FlushMode,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>, mode: FlushMode) -> Self {
        let file_path = path.into();
        let file = match open_append(&file_path) {
            Ok(file) => Some(file),
            Err(err) => {
                tracing::error!(target: "asynclog", "file sink disabled: {}", err);
                None
            }
        };

        Self {
            file: Mutex::new(file),
            file_path,
            mode,
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    pub fn is_inert(&self) -> bool {
        lock(&self.file).is_none()
    }
}

impl LogSink for FileSink {
    fn flush(&self, bytes: &[u8]) -> Result<()> {
        match lock(&self.file).as_mut() {
            Some(writer) => write_with_mode(writer, bytes, self.mode, &self.file_path),
            None => Ok(()),
        }
    }
}

// Shared by every rolling sink so two sinks with one base never collide.
static ROLL_SEQUENCE: AtomicU64 = AtomicU64::new(1);

struct Roll {
    file: Option<BufWriter<File>>,
    path: Option<PathBuf>,
    written: u64,
    inert: bool,
}

/// Writes to `<base><YYYY><M><D><H><Min><S>-<seq>.log`, starting a new file
/// once `max_size` bytes have gone into the current one.
///
/// A chunk is never split: the size check happens before the write, so a
/// file can end up larger than `max_size` by at most one chunk. If a new file
/// can't be opened the failure is returned once and the sink drops everything
/// after it.
pub struct RollingFileSink {
    base: String,
    max_size: u64,
    mode: FlushMode,
    roll: Mutex<Roll>,
}

impl RollingFileSink {
    pub fn new(base: impl Into<String>, max_size: u64, mode: FlushMode) -> Self {
        let base = base.into();
        if let Err(err) = ensure_parent_dir(Path::new(&base)) {
            tracing::error!(target: "asynclog", "can't create directory for {}: {}", base, err);
        }

        Self {
            base,
            max_size,
            mode,
            roll: Mutex::new(Roll {
                file: None,
                path: None,
                written: 0,
                inert: false,
            }),
        }
    }

    /// Path of the file currently being written, if any.
    pub fn current_path(&self) -> Option<PathBuf> {
        lock(&self.roll).path.clone()
    }

    pub fn is_inert(&self) -> bool {
        lock(&self.roll).inert
    }

    fn roll_over(&self, roll: &mut Roll) -> Result<()> {
        if let Some(mut old) = roll.file.take() {
            if let Err(err) = old.flush() {
                tracing::warn!(target: "asynclog", "flushing rolled log file failed: {}", err);
            }
        }

        let seq = ROLL_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let path = PathBuf::from(rolled_file_name(&self.base, &Local::now(), seq));
        roll.written = 0;
        roll.path = Some(path.clone());
        roll.file = Some(open_append(&path)?);

        tracing::debug!(target: "asynclog", "rolled over to {}", path.display());
        Ok(())
    }
}

impl LogSink for RollingFileSink {
    fn flush(&self, bytes: &[u8]) -> Result<()> {
        let mut roll = lock(&self.roll);
        if roll.inert {
            return Ok(());
        }

        if roll.file.is_none() || roll.written >= self.max_size {
            if let Err(err) = self.roll_over(&mut roll) {
                roll.inert = true;
                return Err(err);
            }
        }

        let path = roll.path.clone().unwrap_or_default();
        match roll.file.as_mut() {
            Some(writer) => write_with_mode(writer, bytes, self.mode, &path)?,
            None => return Ok(()),
        }
        roll.written += bytes.len() as u64;

        Ok(())
    }
}
