use std::{
    io::{self, Write},
    net::{SocketAddr, TcpStream, ToSocketAddrs},
    time::Duration,
};

use crate::{
    config::PipelineConfig,
    error::{Error, Result},
};

/// One-shot TCP push of a single record, with a bounded number of connects.
#[derive(Debug, Clone)]
pub struct BackupClient {
    host: String,
    port: u16,
    attempts: u32,
    connect_timeout: Duration,
    retry_delay: Duration,
}

impl BackupClient {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            attempts: 5,
            connect_timeout: Duration::from_secs(3),
            retry_delay: Duration::ZERO,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.backup_addr.clone(), config.backup_port)
            .with_attempts(config.backup_attempts)
            .with_connect_timeout(config.connect_timeout)
            .with_retry_delay(config.retry_delay)
    }

    pub fn with_attempts(self, attempts: u32) -> Self {
        Self {
            attempts: attempts.max(1),
            ..self
        }
    }

    pub fn with_connect_timeout(self, connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            ..self
        }
    }

    pub fn with_retry_delay(self, retry_delay: Duration) -> Self {
        Self {
            retry_delay,
            ..self
        }
    }

    pub fn destination(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Connects, writes `line`, closes. No acknowledgement is read.
    pub fn send(&self, line: &str) -> Result<()> {
        let mut stream = self.connect()?;
        stream.write_all(line.as_bytes())?;
        tracing::trace!(target: "asynclog", "backed up {} bytes to {}", line.len(), self.destination());

        Ok(())
    }

    fn resolve(&self) -> Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| Error::Resolve(self.destination()))
    }

    fn connect(&self) -> Result<TcpStream> {
        let addr = self.resolve()?;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match self.try_connect(&addr) {
                Ok(stream) => return Ok(stream),
                Err(err) => err,
            };

            if attempt >= self.attempts {
                return Err(Error::BackupUnreachable {
                    addr: self.destination(),
                    attempts: attempt,
                    source: err,
                });
            }

            tracing::warn!(
                target: "asynclog",
                "connecting to backup collector {} failed ({}), {} attempts left",
                self.destination(),
                err,
                self.attempts - attempt
            );
            if !self.retry_delay.is_zero() {
                std::thread::sleep(self.retry_delay);
            }
        }
    }

    fn try_connect(&self, addr: &SocketAddr) -> io::Result<TcpStream> {
        if self.connect_timeout.is_zero() {
            TcpStream::connect(addr)
        } else {
            TcpStream::connect_timeout(addr, self.connect_timeout)
        }
    }
}
