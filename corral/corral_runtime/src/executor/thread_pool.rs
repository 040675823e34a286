//! The shared worker pool draining the runtime's task queue.

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, error, info, trace};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

/// Error when submitting a task to the pool.
#[derive(Error, Debug)]
pub enum ThreadPoolError {
    /// The pool is shutting down or already stopped.
    #[error("thread pool is shutting down")]
    ShuttingDown,
}

/// Counters describing the pool's task traffic.
///
/// Advisory only: the counters are relaxed atomics read at a single point
/// in time.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ThreadPoolStats {
    /// Tasks accepted onto the queue.
    pub tasks_queued: usize,
    /// Tasks that ran to completion.
    pub tasks_completed: usize,
    /// Tasks that panicked while running.
    pub tasks_panicked: usize,
}

/// Configuration for the thread pool.
#[derive(Debug, Clone)]
pub struct ThreadPoolConfig {
    /// Number of worker threads. `0` is treated as `1`.
    pub threads: usize,
    /// Name prefix for worker threads.
    pub thread_name_prefix: String,
}

impl Default for ThreadPoolConfig {
    fn default() -> Self {
        Self {
            threads: num_cpus::get(),
            thread_name_prefix: "corral-worker".to_string(),
        }
    }
}

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Shared counters and the shutdown flag.
#[derive(Default)]
struct PoolShared {
    shutting_down: AtomicBool,
    tasks_queued: AtomicUsize,
    tasks_completed: AtomicUsize,
    tasks_panicked: AtomicUsize,
}

/// A clonable handle submitting tasks onto the pool.
#[derive(Clone)]
pub struct Executor {
    sender: Sender<Task>,
    shared: Arc<PoolShared>,
}

impl Executor {
    /// Submit a task for execution on some worker thread.
    ///
    /// The queue is unbounded; the only failure mode is a pool that is
    /// shutting down or already stopped.
    pub fn execute<F>(&self, f: F) -> Result<(), ThreadPoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.shared.shutting_down.load(Ordering::Relaxed) {
            return Err(ThreadPoolError::ShuttingDown);
        }
        self.sender
            .send(Box::new(f))
            .map_err(|_| ThreadPoolError::ShuttingDown)?;
        self.shared.tasks_queued.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Whether the pool behind this handle is shutting down.
    pub fn is_shutting_down(&self) -> bool {
        self.shared.shutting_down.load(Ordering::Relaxed)
    }
}

/// A pool of worker threads draining one unbounded task queue.
pub struct ThreadPool {
    executor: Executor,
    workers: parking_lot::Mutex<Vec<JoinHandle<()>>>,
    shared: Arc<PoolShared>,
}

impl ThreadPool {
    /// Create a pool with `threads` workers and default naming.
    pub fn new(threads: usize) -> Self {
        Self::with_config(ThreadPoolConfig {
            threads,
            ..Default::default()
        })
    }

    /// Create a pool with the given configuration.
    pub fn with_config(config: ThreadPoolConfig) -> Self {
        let threads = config.threads.max(1);
        let (sender, receiver) = unbounded::<Task>();
        let shared = Arc::new(PoolShared::default());

        info!("creating thread pool with {} workers", threads);

        let mut workers = Vec::with_capacity(threads);
        for id in 0..threads {
            let thread_name = format!("{}-{}", config.thread_name_prefix, id);
            let receiver = receiver.clone();
            let shared = Arc::clone(&shared);
            let handle = thread::Builder::new()
                .name(thread_name)
                .spawn(move || Self::worker_loop(id, receiver, shared))
                .expect("failed to spawn worker thread");
            workers.push(handle);
        }

        Self {
            executor: Executor {
                sender,
                shared: Arc::clone(&shared),
            },
            workers: parking_lot::Mutex::new(workers),
            shared,
        }
    }

    /// Worker thread main loop.
    fn worker_loop(id: usize, receiver: Receiver<Task>, shared: Arc<PoolShared>) {
        debug!("worker {id}: starting");

        while !shared.shutting_down.load(Ordering::Relaxed) {
            match receiver.recv_timeout(Duration::from_millis(100)) {
                Ok(task) => {
                    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(task));
                    match result {
                        Ok(()) => {
                            shared.tasks_completed.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(payload) => {
                            error!(
                                "worker {id}: task panicked: {:?}",
                                payload.downcast_ref::<&str>().unwrap_or(&"<unknown panic>")
                            );
                            shared.tasks_panicked.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
                Err(_) => {
                    trace!("worker {id}: idle");
                }
            }
        }

        debug!("worker {id}: shutting down");
    }

    /// A clonable submit handle for this pool.
    pub fn handle(&self) -> Executor {
        self.executor.clone()
    }

    /// Current task counters.
    pub fn stats(&self) -> ThreadPoolStats {
        ThreadPoolStats {
            tasks_queued: self.shared.tasks_queued.load(Ordering::Relaxed),
            tasks_completed: self.shared.tasks_completed.load(Ordering::Relaxed),
            tasks_panicked: self.shared.tasks_panicked.load(Ordering::Relaxed),
        }
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.workers.lock().len()
    }

    /// Whether the pool is shutting down.
    pub fn is_shutting_down(&self) -> bool {
        self.shared.shutting_down.load(Ordering::Relaxed)
    }

    /// Stop the pool and join its workers. Idempotent.
    ///
    /// Tasks not yet started when the flag is observed are dropped.
    pub fn shutdown(&self) {
        if self.shared.shutting_down.swap(true, Ordering::Relaxed) {
            return;
        }
        info!("shutting down thread pool");
        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            if worker.thread().id() == thread::current().id() {
                continue;
            }
            if let Err(payload) = worker.join() {
                error!("worker thread panicked during shutdown: {payload:?}");
            }
        }
        info!("thread pool shutdown complete");
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
