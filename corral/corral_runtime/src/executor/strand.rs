//! The serial sub-executor layered over the shared pool.

use super::thread_pool::{Executor, ThreadPoolError};
use log::{debug, error};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Tasks drained per pool turn before the strand yields to other work.
const DRAIN_BATCH: usize = 64;

type Task = Box<dyn FnOnce() + Send + 'static>;

struct StrandState {
    queue: VecDeque<Task>,
    draining: bool,
}

struct StrandInner {
    executor: Executor,
    state: Mutex<StrandState>,
}

/// A serial FIFO of tasks drained on the shared pool.
///
/// At any instant at most one of a strand's tasks is running, so tasks
/// posted through the same strand never overlap in time. FIFO order is
/// preserved per producer. Distinct strands drain in parallel on the pool's
/// workers.
#[derive(Clone)]
pub struct Strand {
    inner: Arc<StrandInner>,
}

impl Strand {
    /// Create a strand that drains on `executor`.
    pub fn new(executor: Executor) -> Self {
        Self {
            inner: Arc::new(StrandInner {
                executor,
                state: Mutex::new(StrandState {
                    queue: VecDeque::new(),
                    draining: false,
                }),
            }),
        }
    }

    /// Append a task to the strand's queue; schedules a drain when none is
    /// running.
    ///
    /// Returns immediately. When the underlying pool is shutting down the
    /// task is accepted but will never run.
    pub fn post<F>(&self, task: F) -> Result<(), ThreadPoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        let schedule = {
            let mut state = self.inner.state.lock();
            state.queue.push_back(Box::new(task));
            if state.draining {
                false
            } else {
                state.draining = true;
                true
            }
        };
        if schedule {
            self.schedule_drain()?;
        }
        Ok(())
    }

    /// Number of tasks waiting in the queue.
    pub fn pending(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    fn schedule_drain(&self) -> Result<(), ThreadPoolError> {
        let strand = self.clone();
        if let Err(e) = self.inner.executor.execute(move || strand.drain()) {
            let mut state = self.inner.state.lock();
            state.draining = false;
            let dropped = state.queue.len();
            state.queue.clear();
            if dropped > 0 {
                debug!("strand drain cancelled, {dropped} queued tasks dropped");
            }
            return Err(e);
        }
        Ok(())
    }

    fn drain(&self) {
        for _ in 0..DRAIN_BATCH {
            let task = {
                let mut state = self.inner.state.lock();
                match state.queue.pop_front() {
                    Some(task) => task,
                    None => {
                        state.draining = false;
                        return;
                    }
                }
            };
            if let Err(payload) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(task)) {
                error!(
                    "strand task panicked: {:?}",
                    payload.downcast_ref::<&str>().unwrap_or(&"<unknown panic>")
                );
            }
        }
        // Batch exhausted with work remaining; yield the worker and keep
        // the drain claimed.
        let _ = self.schedule_drain();
    }
}
