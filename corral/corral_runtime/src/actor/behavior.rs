//! The user-facing extension point of an actor.

use super::context::ActorContext;
use crate::message::AnyMsg;
use std::any::Any;
use std::sync::Arc;
use thiserror::Error;

/// The error type a behaviour reports on failure.
pub type BehaviorError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A behaviour failure as carried by failure events.
///
/// Shared so the same cause can travel up the supervision chain; strategies
/// inspect it with [`std::error::Error::downcast_ref`].
pub type FailureCause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// A panic that escaped a behaviour, captured as a failure cause.
#[derive(Error, Debug)]
#[error("behaviour panicked: {message}")]
pub struct BehaviourPanic {
    message: String,
}

impl BehaviourPanic {
    pub(crate) fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "<unknown panic>".to_string());
        Self { message }
    }

    /// The captured panic message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// The state and behaviour a user plugs into an actor.
///
/// [`Behavior::behaviour`] is the mandatory handler for user messages; it is
/// invoked only while the actor is `Running`. The lifecycle hooks default to
/// no-ops and are called inside the actor's serial slot, **after** the
/// corresponding state transition committed, so a hook observing the actor
/// state sees the new state. Hooks and `behaviour` receive the actor's
/// [`ActorContext`] for identity, child spawning, and failure routing; no
/// synchronisation is needed to touch `self`.
///
/// Failures are values: return an error (or panic — panics are captured) and
/// the runtime fires the `Failure` transition and reports an
/// [`super::events::ActorFailureEvent`] to the parent.
pub trait Behavior: Send + 'static {
    /// Handle a user message. Invoked only in the `Running` state.
    fn behaviour(
        &mut self,
        ctx: &mut ActorContext,
        message: &AnyMsg,
    ) -> Result<(), BehaviorError>;

    /// Called after `Created` → `Initializing`.
    fn on_initialize(&mut self, _ctx: &mut ActorContext) {}

    /// Called after `Initializing`/`Stopped` → `Starting`.
    fn on_start(&mut self, _ctx: &mut ActorContext) {}

    /// Called after `Starting` → `Running`.
    fn on_started(&mut self, _ctx: &mut ActorContext) {}

    /// Called after a stop command is accepted.
    fn on_stop(&mut self, _ctx: &mut ActorContext) {}

    /// Called after `Stopping` → `Stopped`.
    fn on_stopped(&mut self, _ctx: &mut ActorContext) {}

    /// Called after `Running` → `Paused`.
    fn on_pause(&mut self, _ctx: &mut ActorContext) {}

    /// Called after `Paused` → `Running`.
    fn on_resume(&mut self, _ctx: &mut ActorContext) {}

    /// Called after the transition to `Terminating`.
    fn on_terminate(&mut self, _ctx: &mut ActorContext) {}

    /// Called after `Terminating` → `Terminated`.
    fn on_terminated(&mut self, _ctx: &mut ActorContext) {}
}
