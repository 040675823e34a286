//! The execution substrate: a shared worker pool and per-actor strands.
//!
//! A [`ThreadPool`] runs N workers draining one unbounded task queue; the
//! clonable [`Executor`] handle submits work onto it. A [`Strand`] layers a
//! serial FIFO on top of an executor: at any instant at most one of its
//! tasks is running, so everything posted through one strand executes
//! without overlap while distinct strands run in parallel.

pub mod strand;
pub mod thread_pool;

pub use strand::Strand;
pub use thread_pool::{Executor, ThreadPool, ThreadPoolConfig, ThreadPoolError, ThreadPoolStats};
