use std::{
    future::Future,
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
};

use eyre::Context;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpSocket, TcpStream},
    sync::{Mutex, Semaphore},
};

use crate::utils::ensure_parent_dir;

pub const BACKLOG: u32 = 32;
pub const DEFAULT_MAX_CONNECTIONS: usize = 32;
/// Payloads longer than this are truncated, one read per connection.
pub const READ_BUFFER_SIZE: usize = 1024;

/// Collector for backed-up records.
///
/// Every connection gets one read; the bytes are prefixed with the peer's
/// `ip:port` and appended to the store file. Concurrent connection tasks are
/// capped by a semaphore, so a burst of clients queues in the listen backlog
/// instead of spawning unbounded work.
pub struct BackupServer {
    listener: TcpListener,
    store: Arc<Mutex<File>>,
    store_path: PathBuf,
    limit: Arc<Semaphore>,
}

impl BackupServer {
    pub async fn bind(
        addr: SocketAddr,
        store_path: impl AsRef<Path>,
        max_connections: usize,
    ) -> eyre::Result<Self> {
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .context("Failed creating listen socket")?;
        socket.set_reuseaddr(true)?;
        socket
            .bind(addr)
            .with_context(|| format!("Failed binding {}", addr))?;
        let listener = socket.listen(BACKLOG).context("Failed listening")?;

        let store_path = store_path.as_ref().to_path_buf();
        ensure_parent_dir(&store_path)?;
        let store = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&store_path)
            .await
            .with_context(|| format!("Failed opening backup store {}", store_path.display()))?;

        Ok(Self {
            listener,
            store: Arc::new(Mutex::new(store)),
            store_path,
            limit: Arc::new(Semaphore::new(max_connections.max(1))),
        })
    }

    pub fn local_addr(&self) -> eyre::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    pub async fn run(self) -> eyre::Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Serves until `shutdown` resolves. In-flight connections finish on their own.
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> eyre::Result<()> {
        tracing::info!(
            target: "asynclog",
            "backup server listening on {}, storing to {}",
            self.local_addr()?,
            self.store_path.display()
        );
        tokio::pin!(shutdown);

        loop {
            let permit = tokio::select! {
                _ = &mut shutdown => break,
                permit = Arc::clone(&self.limit).acquire_owned() => permit?,
            };

            let (stream, peer) = tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(err) => {
                        tracing::warn!(target: "asynclog", "accept failed: {}", err);
                        continue;
                    }
                },
            };

            let store = Arc::clone(&self.store);
            tokio::spawn(async move {
                if let Err(err) = store_record(stream, peer, store).await {
                    tracing::warn!(target: "asynclog", "backup from {} failed: {:#}", peer, err);
                }
                drop(permit);
            });
        }

        tracing::info!(target: "asynclog", "backup server stopped");
        Ok(())
    }
}

async fn store_record(
    mut stream: TcpStream,
    peer: SocketAddr,
    store: Arc<Mutex<File>>,
) -> eyre::Result<()> {
    let mut buf = [0u8; READ_BUFFER_SIZE];
    let read = stream.read(&mut buf).await.context("Failed reading record")?;
    if read == 0 {
        return Ok(());
    }

    let mut record = format!("{}:{}", peer.ip(), peer.port()).into_bytes();
    record.extend_from_slice(&buf[..read]);

    let mut store = store.lock().await;
    store.write_all(&record).await.context("Failed appending record")?;
    store.flush().await?;

    tracing::trace!(target: "asynclog", "stored {} bytes from {}", read, peer);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::oneshot;

    use super::*;
    use crate::backup::BackupClient;

    async fn wait_for_contents(path: &Path, min_len: usize) -> String {
        for _ in 0..200 {
            let contents = tokio::fs::read_to_string(path).await.unwrap_or_default();
            if contents.len() >= min_len {
                return contents;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("backup store never reached {} bytes", min_len);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn stores_record_with_peer_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("backup.log");
        let server = BackupServer::bind("127.0.0.1:0".parse().unwrap(), &store, 4)
            .await
            .unwrap();
        let port = server.local_addr().unwrap().port();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let serving = tokio::spawn(server.run_until(async {
            let _ = stop_rx.await;
        }));

        let line = "[09:00:00][main][FATAL][db][pool.rs:3]\tout of connections\n";
        tokio::task::spawn_blocking(move || BackupClient::new("127.0.0.1", port).send(line))
            .await
            .unwrap()
            .unwrap();

        let contents = wait_for_contents(&store, line.len()).await;
        assert!(contents.starts_with("127.0.0.1:"));
        assert!(contents.ends_with(line));

        stop_tx.send(()).unwrap();
        serving.await.unwrap().unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn truncates_oversized_payload() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("backup.log");
        let server = BackupServer::bind("127.0.0.1:0".parse().unwrap(), &store, 4)
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let serving = tokio::spawn(server.run_until(async {
            let _ = stop_rx.await;
        }));

        let mut client = TcpStream::connect(addr).await.unwrap();
        let local = client.local_addr().unwrap();
        // one write, so the server sees at least a full buffer in its single read
        client.write_all(&[b'z'; 4 * READ_BUFFER_SIZE]).await.unwrap();
        drop(client);

        let prefix = format!("{}:{}", local.ip(), local.port());
        let contents = wait_for_contents(&store, prefix.len() + 1).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        let contents = tokio::fs::read_to_string(&store).await.unwrap_or(contents);

        assert!(contents.starts_with(&prefix));
        assert!(contents.len() - prefix.len() <= READ_BUFFER_SIZE);
        assert!(contents[prefix.len()..].bytes().all(|b| b == b'z'));

        stop_tx.send(()).unwrap();
        serving.await.unwrap().unwrap();
    }
}
