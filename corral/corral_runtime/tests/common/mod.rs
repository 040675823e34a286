//! Shared helpers for the integration suites.

use corral_runtime::actor::ActorSystem;
use std::time::{Duration, Instant};

#[allow(dead_code)]
pub const DEFAULT_WAIT: Duration = Duration::from_secs(5);

/// Initialise test logging once; safe to call from every test.
#[allow(dead_code)]
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Poll `predicate` every 10 ms until it holds or `timeout` elapses.
#[allow(dead_code)]
pub fn wait_until(mut predicate: impl FnMut() -> bool, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if predicate() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    predicate()
}

/// Wait until the system's pool has drained every queued task.
#[allow(dead_code)]
pub fn wait_for_quiescence(system: &ActorSystem) -> bool {
    let drained = |system: &ActorSystem| {
        let stats = system.pool_stats();
        stats.tasks_queued == stats.tasks_completed + stats.tasks_panicked
    };
    if !wait_until(|| drained(system), Duration::from_secs(10)) {
        return false;
    }
    // One task can requeue another; require the condition to hold across a
    // settling pause.
    std::thread::sleep(Duration::from_millis(50));
    wait_until(|| drained(system), Duration::from_secs(10))
}
