mod client;
mod server;

use std::sync::Arc;

pub use client::BackupClient;
pub use server::{BackupServer, BACKLOG, DEFAULT_MAX_CONNECTIONS, READ_BUFFER_SIZE};

use crate::{error::Error, pool::ThreadPool};

/// Ships severe records to the backup collector through the shared pool.
pub struct BackupDispatcher {
    pool: Arc<ThreadPool>,
    client: Arc<BackupClient>,
}

impl BackupDispatcher {
    pub fn new(pool: Arc<ThreadPool>, client: BackupClient) -> Self {
        Self {
            pool,
            client: Arc::new(client),
        }
    }

    pub fn client(&self) -> &BackupClient {
        &self.client
    }

    /// Sends `line` on a pool thread and waits for the attempt to finish.
    ///
    /// Nothing is returned: an unreachable collector or a closed pool is
    /// reported and the line is dropped.
    pub fn dispatch(&self, line: String) {
        let client = Arc::clone(&self.client);
        let handle = match self.pool.submit(move || client.send(&line)) {
            Ok(handle) => handle,
            Err(Error::PoolClosed) => {
                tracing::warn!(target: "asynclog", "thread pool closed, backup record dropped");
                return;
            }
            Err(err) => {
                tracing::warn!(target: "asynclog", "backup not scheduled: {}", err);
                return;
            }
        };

        match handle.wait() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::warn!(target: "asynclog", "backup failed: {}", err),
            Err(err) => tracing::warn!(target: "asynclog", "backup task lost: {}", err),
        }
    }
}
