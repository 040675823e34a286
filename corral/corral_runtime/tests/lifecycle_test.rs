//! Lifecycle behaviour of actors driven through a live system.

mod common;

use common::{wait_for_quiescence, wait_until, DEFAULT_WAIT};
use corral_runtime::actor::events::{
    GoPauseActor, GoResumeActor, GoStartActor, GoStopActor, GoTerminateActor,
};
use corral_runtime::actor::{ActorContext, ActorSystem, Behavior, BehaviorError, Lifecycle};
use corral_runtime::message::{AnyMsg, Msg};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

type CallLog = Arc<Mutex<Vec<&'static str>>>;

/// Records every hook invocation; `behaviour` counts user messages.
struct Tracking {
    calls: CallLog,
    user_messages: Arc<AtomicUsize>,
}

impl Tracking {
    fn new() -> (Self, CallLog, Arc<AtomicUsize>) {
        let calls = CallLog::default();
        let user_messages = Arc::new(AtomicUsize::new(0));
        (
            Self {
                calls: calls.clone(),
                user_messages: user_messages.clone(),
            },
            calls,
            user_messages,
        )
    }

    fn record(&self, name: &'static str) {
        self.calls.lock().unwrap().push(name);
    }
}

impl Behavior for Tracking {
    fn behaviour(&mut self, _ctx: &mut ActorContext, _message: &AnyMsg) -> Result<(), BehaviorError> {
        self.user_messages.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn on_initialize(&mut self, _ctx: &mut ActorContext) {
        self.record("on_initialize");
    }

    fn on_start(&mut self, _ctx: &mut ActorContext) {
        self.record("on_start");
    }

    fn on_started(&mut self, _ctx: &mut ActorContext) {
        self.record("on_started");
    }

    fn on_stop(&mut self, _ctx: &mut ActorContext) {
        self.record("on_stop");
    }

    fn on_stopped(&mut self, _ctx: &mut ActorContext) {
        self.record("on_stopped");
    }

    fn on_pause(&mut self, _ctx: &mut ActorContext) {
        self.record("on_pause");
    }

    fn on_resume(&mut self, _ctx: &mut ActorContext) {
        self.record("on_resume");
    }

    fn on_terminate(&mut self, _ctx: &mut ActorContext) {
        self.record("on_terminate");
    }

    fn on_terminated(&mut self, _ctx: &mut ActorContext) {
        self.record("on_terminated");
    }
}

struct UserMessage;

#[test]
fn test_new_actor_starts_in_created() {
    let system = ActorSystem::new("lifecycle", 1);
    let (behavior, _, _) = Tracking::new();
    let actor = system.create_actor("fresh", behavior);

    let state = actor.state();
    assert_eq!(state.lifecycle(), Lifecycle::Created);
    assert!(!state.is_running());
    assert!(!state.is_paused());
    assert!(!state.is_stopped());
    assert!(!state.is_terminated());
}

#[test]
fn test_created_actors_have_distinct_ids() {
    let system = ActorSystem::new("lifecycle", 1);
    let mut ids = HashSet::new();
    for i in 0..10 {
        let (behavior, _, _) = Tracking::new();
        let actor = system.create_actor(format!("actor-{i}"), behavior);
        assert!(actor.id().value() > 0);
        assert!(ids.insert(actor.id()), "duplicate id {}", actor.id());
    }
    assert_eq!(ids.len(), 10);
}

#[test]
fn test_start_invokes_hooks_in_order() {
    let system = ActorSystem::new("lifecycle", 1);
    let (behavior, calls, _) = Tracking::new();
    let actor = system.create_actor("starter", behavior);

    actor.receive(Msg::new(GoStartActor));

    assert!(wait_until(|| actor.state().is_running(), DEFAULT_WAIT));
    assert_eq!(
        *calls.lock().unwrap(),
        vec!["on_initialize", "on_start", "on_started"]
    );
}

#[test]
fn test_stop_from_running_invokes_full_trace() {
    let system = ActorSystem::new("lifecycle", 1);
    let (behavior, calls, _) = Tracking::new();
    let actor = system.create_actor("stopper", behavior);

    actor.receive(Msg::new(GoStartActor));
    assert!(wait_until(|| actor.state().is_running(), DEFAULT_WAIT));

    actor.receive(Msg::new(GoStopActor));
    assert!(wait_until(|| actor.state().is_stopped(), DEFAULT_WAIT));
    assert_eq!(
        *calls.lock().unwrap(),
        vec!["on_initialize", "on_start", "on_started", "on_stop", "on_stopped"]
    );
    let state = actor.state();
    assert!(!state.is_running());
    assert!(state.is_stopped());
}

#[test]
fn test_pause_and_resume() {
    let system = ActorSystem::new("lifecycle", 1);
    let (behavior, calls, _) = Tracking::new();
    let actor = system.create_actor("pauser", behavior);

    actor.receive(Msg::new(GoStartActor));
    actor.receive(Msg::new(GoPauseActor));
    assert!(wait_until(|| actor.state().is_paused(), DEFAULT_WAIT));

    actor.receive(Msg::new(GoResumeActor));
    assert!(wait_until(|| actor.state().is_running(), DEFAULT_WAIT));
    assert_eq!(
        *calls.lock().unwrap(),
        vec!["on_initialize", "on_start", "on_started", "on_pause", "on_resume"]
    );
}

#[test]
fn test_stopped_actor_starts_again_without_reinitializing() {
    let system = ActorSystem::new("lifecycle", 1);
    let (behavior, calls, _) = Tracking::new();
    let actor = system.create_actor("restarter", behavior);

    actor.receive(Msg::new(GoStartActor));
    actor.receive(Msg::new(GoStopActor));
    assert!(wait_until(|| actor.state().is_stopped(), DEFAULT_WAIT));

    actor.receive(Msg::new(GoStartActor));
    assert!(wait_until(|| actor.state().is_running(), DEFAULT_WAIT));
    assert_eq!(
        *calls.lock().unwrap(),
        vec![
            "on_initialize",
            "on_start",
            "on_started",
            "on_stop",
            "on_stopped",
            "on_start",
            "on_started",
        ]
    );
}

#[test]
fn test_terminate_invokes_both_hooks_and_is_final() {
    let system = ActorSystem::new("lifecycle", 1);
    let (behavior, calls, _) = Tracking::new();
    let actor = system.create_actor("terminator", behavior);

    actor.receive(Msg::new(GoStartActor));
    assert!(wait_until(|| actor.state().is_running(), DEFAULT_WAIT));

    actor.receive(Msg::new(GoTerminateActor));
    assert!(wait_until(|| actor.state().is_terminated(), DEFAULT_WAIT));
    assert_eq!(
        *calls.lock().unwrap(),
        vec![
            "on_initialize",
            "on_start",
            "on_started",
            "on_terminate",
            "on_terminated",
        ]
    );

    // A terminated actor never transitions again.
    actor.receive(Msg::new(GoStartActor));
    assert!(wait_for_quiescence(&system));
    assert!(actor.state().is_terminated());
}

#[test]
fn test_user_messages_require_running() {
    let system = ActorSystem::new("lifecycle", 2);

    // Created: dropped.
    let (behavior, _, count) = Tracking::new();
    let created = system.create_actor("created", behavior);
    created.receive(Msg::new(UserMessage));
    assert!(wait_for_quiescence(&system));
    assert_eq!(count.load(Ordering::Relaxed), 0);

    // Paused: dropped.
    let (behavior, _, count) = Tracking::new();
    let paused = system.create_actor("paused", behavior);
    paused.receive(Msg::new(GoStartActor));
    paused.receive(Msg::new(GoPauseActor));
    assert!(wait_until(|| paused.state().is_paused(), DEFAULT_WAIT));
    paused.receive(Msg::new(UserMessage));
    assert!(wait_for_quiescence(&system));
    assert_eq!(count.load(Ordering::Relaxed), 0);

    // Stopped: dropped.
    let (behavior, _, count) = Tracking::new();
    let stopped = system.create_actor("stopped", behavior);
    stopped.receive(Msg::new(GoStartActor));
    stopped.receive(Msg::new(GoStopActor));
    assert!(wait_until(|| stopped.state().is_stopped(), DEFAULT_WAIT));
    stopped.receive(Msg::new(UserMessage));
    assert!(wait_for_quiescence(&system));
    assert_eq!(count.load(Ordering::Relaxed), 0);

    // Terminated: dropped.
    let (behavior, _, count) = Tracking::new();
    let terminated = system.create_actor("terminated", behavior);
    terminated.receive(Msg::new(GoStartActor));
    terminated.receive(Msg::new(GoTerminateActor));
    assert!(wait_until(|| terminated.state().is_terminated(), DEFAULT_WAIT));
    terminated.receive(Msg::new(UserMessage));
    assert!(wait_for_quiescence(&system));
    assert_eq!(count.load(Ordering::Relaxed), 0);

    // Running: invoked.
    let (behavior, _, count) = Tracking::new();
    let running = system.create_actor("running", behavior);
    running.receive(Msg::new(GoStartActor));
    assert!(wait_until(|| running.state().is_running(), DEFAULT_WAIT));
    running.receive(Msg::new(UserMessage));
    assert!(wait_until(
        || count.load(Ordering::Relaxed) == 1,
        DEFAULT_WAIT
    ));
}

/// Guards every hook with an overlap counter.
struct Guarded {
    in_callback: Arc<AtomicUsize>,
    overlaps: Arc<AtomicUsize>,
}

impl Guarded {
    fn guard(&self) {
        if self.in_callback.fetch_add(1, Ordering::AcqRel) != 0 {
            self.overlaps.fetch_add(1, Ordering::Relaxed);
        }
        self.in_callback.fetch_sub(1, Ordering::AcqRel);
    }
}

impl Behavior for Guarded {
    fn behaviour(&mut self, _ctx: &mut ActorContext, _message: &AnyMsg) -> Result<(), BehaviorError> {
        self.guard();
        Ok(())
    }

    fn on_initialize(&mut self, _ctx: &mut ActorContext) {
        self.guard();
    }

    fn on_start(&mut self, _ctx: &mut ActorContext) {
        self.guard();
    }

    fn on_started(&mut self, _ctx: &mut ActorContext) {
        self.guard();
    }

    fn on_stop(&mut self, _ctx: &mut ActorContext) {
        self.guard();
    }

    fn on_stopped(&mut self, _ctx: &mut ActorContext) {
        self.guard();
    }

    fn on_pause(&mut self, _ctx: &mut ActorContext) {
        self.guard();
    }

    fn on_resume(&mut self, _ctx: &mut ActorContext) {
        self.guard();
    }

    fn on_terminate(&mut self, _ctx: &mut ActorContext) {
        self.guard();
    }

    fn on_terminated(&mut self, _ctx: &mut ActorContext) {
        self.guard();
    }
}

#[test]
fn test_concurrent_lifecycle_storm_stays_serialised() {
    let system = ActorSystem::new("storm", 4);
    let in_callback = Arc::new(AtomicUsize::new(0));
    let overlaps = Arc::new(AtomicUsize::new(0));
    let actor = system.create_actor(
        "stormy",
        Guarded {
            in_callback: in_callback.clone(),
            overlaps: overlaps.clone(),
        },
    );

    const THREADS: usize = 8;
    const PER_THREAD: usize = 500;

    let handles: Vec<_> = (0..THREADS)
        .map(|tid| {
            let actor = actor.clone();
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    match (tid + i) % 5 {
                        0 => actor.receive(Msg::new(GoStartActor)),
                        1 => actor.receive(Msg::new(GoPauseActor)),
                        2 => actor.receive(Msg::new(GoResumeActor)),
                        3 => actor.receive(Msg::new(GoStopActor)),
                        _ => actor.receive(Msg::new(GoTerminateActor)),
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(wait_for_quiescence(&system));
    assert_eq!(overlaps.load(Ordering::Relaxed), 0);
    assert_eq!(in_callback.load(Ordering::Relaxed), 0);

    let lifecycle = actor.state().lifecycle();
    assert!(
        matches!(
            lifecycle,
            Lifecycle::Running | Lifecycle::Paused | Lifecycle::Stopped | Lifecycle::Terminated
        ),
        "unexpected final state {lifecycle:?}"
    );
}

/// Records delivered sequence numbers and checks behaviour never overlaps.
struct Sequencing {
    received: Arc<Mutex<Vec<u32>>>,
    in_behaviour: Arc<AtomicUsize>,
    overlaps: Arc<AtomicUsize>,
}

struct SeqMessage(u32);

impl Behavior for Sequencing {
    fn behaviour(&mut self, _ctx: &mut ActorContext, message: &AnyMsg) -> Result<(), BehaviorError> {
        if self.in_behaviour.fetch_add(1, Ordering::AcqRel) != 0 {
            self.overlaps.fetch_add(1, Ordering::Relaxed);
        }
        if let Some(seq) = message.downcast_ref::<SeqMessage>() {
            self.received.lock().unwrap().push(seq.0);
        }
        self.in_behaviour.fetch_sub(1, Ordering::AcqRel);
        Ok(())
    }
}

#[test]
fn test_multi_producer_delivery_preserves_post_order() {
    const TOTAL: u32 = 5000;

    let system = ActorSystem::new("sequencing", 4);
    let received = Arc::new(Mutex::new(Vec::new()));
    let in_behaviour = Arc::new(AtomicUsize::new(0));
    let overlaps = Arc::new(AtomicUsize::new(0));
    let actor = system.create_actor(
        "sequencer",
        Sequencing {
            received: received.clone(),
            in_behaviour: in_behaviour.clone(),
            overlaps: overlaps.clone(),
        },
    );

    actor.receive(Msg::new(GoStartActor));
    assert!(wait_until(|| actor.state().is_running(), DEFAULT_WAIT));

    // Producers serialise their posts through a turn counter, so the global
    // post order is exactly 0..TOTAL even with several producer threads.
    let next_index = Arc::new(AtomicU32::new(0));
    let turn = Arc::new(AtomicU32::new(0));
    let producers = num_cpus::get().max(2);

    let handles: Vec<_> = (0..producers)
        .map(|_| {
            let actor = actor.clone();
            let next_index = next_index.clone();
            let turn = turn.clone();
            thread::spawn(move || loop {
                let index = next_index.fetch_add(1, Ordering::Relaxed);
                if index >= TOTAL {
                    break;
                }
                while turn.load(Ordering::Acquire) != index {
                    std::hint::spin_loop();
                }
                actor.receive(Msg::new(SeqMessage(index)));
                turn.fetch_add(1, Ordering::Release);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(wait_until(
        || received.lock().unwrap().len() == TOTAL as usize,
        std::time::Duration::from_secs(30)
    ));
    assert_eq!(overlaps.load(Ordering::Relaxed), 0);

    let received = received.lock().unwrap();
    for (expected, actual) in received.iter().enumerate() {
        assert_eq!(*actual, expected as u32, "order broke at {expected}");
    }
}
