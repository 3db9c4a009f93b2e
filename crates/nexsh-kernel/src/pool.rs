//! Bounded worker pool backing asynchronous execution.
//!
//! A fixed set of long-lived OS threads drains a single FIFO queue guarded
//! by a mutex and signaled through a condition variable. There is no
//! priority, no work stealing, and no per-task timeout; ordering across
//! the queue is strict FIFO insertion order.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::{debug, trace};

/// Pool failure conditions. These surface to the async API caller
/// directly — no command context exists yet, so they are never data-level
/// error objects.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    /// Submission after shutdown has begun.
    #[error("worker pool is shut down")]
    ShutDown,
    /// The executing worker panicked before delivering a result.
    #[error("task was lost before completing")]
    TaskLost,
}

type Task = Box<dyn FnOnce() + Send + 'static>;

struct Shared {
    queue: Mutex<VecDeque<Task>>,
    available: Condvar,
    shutdown: AtomicBool,
    active: AtomicUsize,
}

/// Handle to an eventual task result.
///
/// Dropping the handle never cancels the task; the pool runs it to
/// completion regardless.
#[derive(Debug)]
pub struct TaskHandle<T> {
    rx: mpsc::Receiver<T>,
}

impl<T> TaskHandle<T> {
    /// Block until the task completes and take its result.
    pub fn wait(self) -> Result<T, PoolError> {
        self.rx.recv().map_err(|_| PoolError::TaskLost)
    }

    /// Non-blocking poll for the result.
    pub fn try_wait(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }
}

/// Fixed-size FIFO worker pool.
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Create a pool with `size` workers; zero falls back to the
    /// available hardware parallelism.
    pub fn new(size: usize) -> Self {
        let size = if size == 0 {
            thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
        } else {
            size
        };

        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            shutdown: AtomicBool::new(false),
            active: AtomicUsize::new(0),
        });

        let workers = (0..size).map(|i| spawn_worker(i, shared.clone())).collect();
        debug!(size, "worker pool started");

        Self {
            shared,
            workers: Mutex::new(workers),
        }
    }

    /// Create a pool sized to the hardware.
    pub fn with_default_size() -> Self {
        Self::new(0)
    }

    /// Enqueue a task and return a handle bound to its eventual result.
    pub fn submit<T, F>(&self, task: F) -> Result<TaskHandle<T>, PoolError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        {
            let mut queue = self.shared.queue.lock().unwrap_or_else(|e| e.into_inner());
            if self.shared.shutdown.load(Ordering::SeqCst) {
                return Err(PoolError::ShutDown);
            }
            queue.push_back(Box::new(move || {
                // Receiver may have been dropped; the task still ran.
                let _ = tx.send(task());
            }));
        }
        self.shared.available.notify_one();
        Ok(TaskHandle { rx })
    }

    /// Stop accepting work, let queued and in-flight tasks drain, then
    /// join every worker. Idempotent.
    pub fn shutdown(&self) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        self.shared.available.notify_all();

        let mut workers = self.workers.lock().unwrap_or_else(|e| e.into_inner());
        for handle in workers.drain(..) {
            let _ = handle.join();
        }
        debug!("worker pool drained and joined");
    }

    /// Drain-then-respawn with a new worker count.
    pub fn resize(&self, new_size: usize) {
        self.shutdown();
        self.shared.shutdown.store(false, Ordering::SeqCst);

        let mut workers = self.workers.lock().unwrap_or_else(|e| e.into_inner());
        for i in 0..new_size.max(1) {
            workers.push(spawn_worker(i, self.shared.clone()));
        }
        debug!(new_size, "worker pool respawned");
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.shutdown.load(Ordering::SeqCst)
    }

    pub fn thread_count(&self) -> usize {
        self.workers.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn queue_size(&self) -> usize {
        self.shared.queue.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn active_tasks(&self) -> usize {
        self.shared.active.load(Ordering::SeqCst)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_worker(index: usize, shared: Arc<Shared>) -> JoinHandle<()> {
    thread::Builder::new()
        .name(format!("nexsh-worker-{index}"))
        .spawn(move || worker_loop(shared))
        .unwrap_or_else(|e| panic!("failed to spawn worker thread: {e}"))
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let task = {
            let mut queue = shared.queue.lock().unwrap_or_else(|e| e.into_inner());
            loop {
                if let Some(task) = queue.pop_front() {
                    break task;
                }
                if shared.shutdown.load(Ordering::SeqCst) {
                    return;
                }
                queue = shared
                    .available
                    .wait(queue)
                    .unwrap_or_else(|e| e.into_inner());
            }
        };

        shared.active.fetch_add(1, Ordering::SeqCst);
        trace!("worker picked up task");
        // A panicking task must not take the worker down with it.
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(task));
        shared.active.fetch_sub(1, Ordering::SeqCst);
    }
}
