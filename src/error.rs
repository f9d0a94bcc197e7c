use std::{io, path::PathBuf};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("thread pool is closed, task rejected")]
    PoolClosed,

    #[error("async worker has stopped, record dropped")]
    WorkerStopped,

    #[error("submitted task panicked before producing a result")]
    TaskPanicked,

    #[error("backup collector {addr} unreachable after {attempts} connect attempts")]
    BackupUnreachable {
        addr: String,
        attempts: u32,
        #[source]
        source: io::Error,
    },

    #[error("can't resolve backup address {0}")]
    Resolve(String),

    #[error("i/o failure on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Transport(#[from] io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
