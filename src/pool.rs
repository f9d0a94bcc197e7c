use std::{
    collections::VecDeque,
    panic::{self, AssertUnwindSafe},
    sync::{mpsc, Arc, Condvar, Mutex, MutexGuard, PoisonError},
    thread::{self, JoinHandle},
};

use crate::error::{Error, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Queue {
    jobs: VecDeque<Job>,
    stopping: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    available: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fixed set of threads draining one FIFO queue.
///
/// After [`ThreadPool::shutdown`] starts, queued jobs still run but new
/// submissions fail with [`Error::PoolClosed`].
pub struct ThreadPool {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

/// Result of a submitted job.
pub struct TaskHandle<T> {
    result: mpsc::Receiver<thread::Result<T>>,
}

impl<T> TaskHandle<T> {
    /// Blocks until the job ran.
    pub fn wait(self) -> Result<T> {
        match self.result.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) | Err(_) => Err(Error::TaskPanicked),
        }
    }
}

impl ThreadPool {
    pub fn new(threads: usize) -> Result<Self> {
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                jobs: VecDeque::new(),
                stopping: false,
            }),
            available: Condvar::new(),
        });

        let mut workers = Vec::with_capacity(threads.max(1));
        for i in 0..threads.max(1) {
            let shared = Arc::clone(&shared);
            let handle = thread::Builder::new()
                .name(format!("asynclog-pool-{}", i))
                .spawn(move || work(shared))?;
            workers.push(handle);
        }

        tracing::debug!(target: "asynclog", "thread pool started with {} workers", workers.len());
        Ok(Self {
            shared,
            workers: Mutex::new(workers),
        })
    }

    pub fn submit<F, T>(&self, task: F) -> Result<TaskHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (sender, result) = mpsc::sync_channel(1);
        let job: Job = Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(task));
            // the handle may have been dropped
            let _ = sender.send(outcome);
        });

        {
            let mut queue = self.shared.lock();
            if queue.stopping {
                return Err(Error::PoolClosed);
            }
            queue.jobs.push_back(job);
        }
        self.shared.available.notify_one();

        Ok(TaskHandle { result })
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().stopping
    }

    pub fn queued(&self) -> usize {
        self.shared.lock().jobs.len()
    }

    /// Rejects new work, runs what is queued, then joins every worker.
    pub fn shutdown(&self) {
        self.shared.lock().stopping = true;
        self.shared.available.notify_all();

        let workers = std::mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));
        for worker in workers {
            if worker.join().is_err() {
                tracing::error!(target: "asynclog", "thread pool worker panicked");
            }
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn work(shared: Arc<Shared>) {
    loop {
        let job = {
            let mut queue = shared
                .available
                .wait_while(shared.lock(), |q| q.jobs.is_empty() && !q.stopping)
                .unwrap_or_else(PoisonError::into_inner);

            match queue.jobs.pop_front() {
                Some(job) => job,
                None => return,
            }
        };

        job();
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use super::*;

    #[test]
    fn returns_task_results() {
        let pool = ThreadPool::new(3).unwrap();
        let handles: Vec<_> = (0..10).map(|i| pool.submit(move || i * 2).unwrap()).collect();

        let results: Vec<i32> = handles.into_iter().map(|h| h.wait().unwrap()).collect();
        assert_eq!(results, (0..10).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[test]
    fn panicking_task_is_reported_and_pool_survives() {
        let pool = ThreadPool::new(1).unwrap();

        let failed = pool.submit(|| -> u8 { panic!("boom") }).unwrap();
        assert!(matches!(failed.wait(), Err(Error::TaskPanicked)));
        assert_eq!(pool.submit(|| 5).unwrap().wait().unwrap(), 5);
    }

    #[test]
    fn shutdown_runs_queued_tasks_then_rejects() {
        let pool = Arc::new(ThreadPool::new(1).unwrap());
        let done = Arc::new(AtomicUsize::new(0));
        let (gate_tx, gate_rx) = mpsc::channel::<()>();

        let _blocker = pool
            .submit(move || {
                let _ = gate_rx.recv();
            })
            .unwrap();
        for _ in 0..3 {
            let done = Arc::clone(&done);
            pool.submit(move || {
                done.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }

        let stopper = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.shutdown())
        };
        while !pool.is_closed() {
            thread::sleep(Duration::from_millis(1));
        }

        assert!(matches!(pool.submit(|| ()), Err(Error::PoolClosed)));
        assert_eq!(done.load(Ordering::SeqCst), 0);

        drop(gate_tx);
        stopper.join().unwrap();
        assert_eq!(done.load(Ordering::SeqCst), 3);
        assert_eq!(pool.queued(), 0);
    }

    #[test]
    fn shutdown_is_idempotent() {
        let pool = ThreadPool::new(2).unwrap();
        pool.shutdown();
        pool.shutdown();
        assert!(pool.is_closed());
    }
}
