//! The actor lifecycle state machine.
//!
//! Nine states driven by ten events. The transition table is total over the
//! legal pairs; any unlisted pair is a no-op, and a `Terminated` actor never
//! transitions again.

use corral_core::fsm::FiniteStateMachine;

/// The lifecycle phase of an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Constructed, nothing has run yet.
    Created,
    /// Running its initialization step.
    Initializing,
    /// Starting up.
    Starting,
    /// Processing user messages.
    Running,
    /// Suspended; user messages are dropped.
    Paused,
    /// Shutting down.
    Stopping,
    /// Shut down; can be started again.
    Stopped,
    /// Tearing down for good.
    Terminating,
    /// Final state; rejects all further transitions.
    Terminated,
}

/// Events driving the lifecycle machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Begin initialization (from `Created`).
    Initialize,
    /// Begin starting (from `Initializing` or `Stopped`).
    Start,
    /// Startup finished.
    Started,
    /// Begin stopping.
    Stop,
    /// Shutdown finished.
    Stopped,
    /// Suspend a running actor.
    Pause,
    /// Resume a paused actor.
    Resume,
    /// Begin final teardown (from any live state).
    Terminate,
    /// Teardown finished.
    Terminated,
    /// A user handler failed; the actor heads for `Stopping`.
    Failure,
}

impl FiniteStateMachine for Lifecycle {
    type Event = LifecycleEvent;

    fn transition(&self, event: &LifecycleEvent) -> Option<Lifecycle> {
        use Lifecycle::*;
        use LifecycleEvent as E;

        match (self, event) {
            (Terminated, _) => None,
            (_, E::Terminate) => Some(Terminating),
            (_, E::Failure) => Some(Stopping),
            (Created, E::Initialize) => Some(Initializing),
            (Initializing, E::Start) => Some(Starting),
            (Stopped, E::Start) => Some(Starting),
            (Starting, E::Started) => Some(Running),
            (Running, E::Stop) => Some(Stopping),
            (Running, E::Pause) => Some(Paused),
            (Paused, E::Resume) => Some(Running),
            (Paused, E::Stop) => Some(Stopping),
            (Stopping, E::Stopped) => Some(Stopped),
            (Terminating, E::Terminated) => Some(Terminated),
            _ => None,
        }
    }
}

/// An actor's current lifecycle state with its query predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorState {
    lifecycle: Lifecycle,
}

impl ActorState {
    /// A fresh state in `Created`.
    pub fn new() -> Self {
        Self {
            lifecycle: Lifecycle::Created,
        }
    }

    /// The current lifecycle phase.
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Fire `event`; unlisted pairs leave the state untouched.
    pub fn dispatch(&mut self, event: LifecycleEvent) {
        self.lifecycle.dispatch(event);
    }

    /// Whether the actor is processing user messages.
    pub fn is_running(&self) -> bool {
        self.lifecycle == Lifecycle::Running
    }

    /// Whether the actor is suspended.
    pub fn is_paused(&self) -> bool {
        self.lifecycle == Lifecycle::Paused
    }

    /// Whether the actor has stopped (and could be restarted).
    pub fn is_stopped(&self) -> bool {
        self.lifecycle == Lifecycle::Stopped
    }

    /// Whether the actor reached its final state.
    pub fn is_terminated(&self) -> bool {
        self.lifecycle == Lifecycle::Terminated
    }
}

impl Default for ActorState {
    fn default() -> Self {
        Self::new()
    }
}
