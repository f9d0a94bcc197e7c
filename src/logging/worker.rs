use std::{
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    thread::{self, JoinHandle},
};

use serde::{Deserialize, Serialize};

use super::buffer::{Buffer, BufferConfig};
use crate::error::{Error, Result};

/// What a producer does when the producer buffer can't take its record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Backpressure {
    /// Wait for the background thread to swap buffers.
    #[default]
    #[serde(rename = "safe", alias = "block")]
    Block,
    /// Accept immediately and grow the buffer without bound.
    #[serde(rename = "unsafe", alias = "grow")]
    Grow,
}

/// Receives every drained chunk on the background thread.
pub type DrainFn = Box<dyn FnMut(&[u8]) + Send + 'static>;

struct State {
    producer: Buffer,
    stopping: bool,
}

struct Shared {
    state: Mutex<State>,
    not_full: Condvar,
    not_empty: Condvar,
    backpressure: Backpressure,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Double-buffered handoff between producers and one background thread.
///
/// Producers append into the producer buffer under the lock. The background
/// thread swaps it with its private consumer buffer, releases the lock, and
/// hands the consumer bytes to the drain callback. Stopping drains whatever is
/// left before the thread exits.
pub struct AsyncWorker {
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl AsyncWorker {
    pub fn spawn(
        name: &str,
        config: BufferConfig,
        backpressure: Backpressure,
        drain: DrainFn,
    ) -> Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                producer: Buffer::new(config),
                stopping: false,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            backpressure,
        });

        let consumer = Buffer::new(config);
        let thread_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(format!("asynclog-{}", name))
            .spawn(move || run(thread_shared, consumer, drain))?;

        Ok(Self {
            shared,
            handle: Mutex::new(Some(handle)),
        })
    }

    pub fn push(&self, bytes: &[u8]) -> Result<()> {
        let mut state = self.shared.lock();

        if self.shared.backpressure == Backpressure::Block {
            // An empty producer always accepts, otherwise an oversized record
            // would wait forever.
            state = self
                .shared
                .not_full
                .wait_while(state, |s| {
                    !s.stopping && !s.producer.is_empty() && s.producer.writable_len() < bytes.len()
                })
                .unwrap_or_else(PoisonError::into_inner);
        }

        if state.stopping {
            return Err(Error::WorkerStopped);
        }

        state.producer.push(bytes);
        drop(state);

        self.shared.not_empty.notify_one();
        Ok(())
    }

    /// Requests shutdown and waits until everything pushed so far is drained.
    pub fn stop(&self) {
        self.shared.lock().stopping = true;
        self.shared.not_empty.notify_all();
        self.shared.not_full.notify_all();

        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!(target: "asynclog", "async worker thread panicked while draining");
            }
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.lock().stopping
    }

    #[cfg(test)]
    fn producer_capacity(&self) -> usize {
        self.shared.lock().producer.capacity()
    }
}

impl Drop for AsyncWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(shared: Arc<Shared>, mut consumer: Buffer, mut drain: DrainFn) {
    loop {
        {
            let mut state = shared
                .not_empty
                .wait_while(shared.lock(), |s| s.producer.is_empty() && !s.stopping)
                .unwrap_or_else(PoisonError::into_inner);

            if state.producer.is_empty() {
                // stopping and nothing left
                break;
            }

            state.producer.swap(&mut consumer);
        }

        if shared.backpressure == Backpressure::Block {
            shared.not_full.notify_all();
        }

        drain(consumer.readable());
        consumer.reset();
    }

    tracing::trace!(target: "asynclog", "async worker drained and stopped");
}
