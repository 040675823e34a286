//! Lifecycle command messages and the failure event.
//!
//! The five `Go*` commands drive an actor's lifecycle from the outside;
//! [`ActorFailureEvent`] is synthesised by the runtime when a behaviour
//! fails and is routed to the failing actor's parent.

use super::behavior::FailureCause;
use crate::message::AnyMsg;
use corral_core::id::ActorId;

/// Command: advance the actor towards `Running`.
///
/// From `Created` the actor initializes, starts, and ends up `Running` in
/// one step, with each hook called along the way.
pub struct GoStartActor;

/// Command: stop the actor (from `Running`, `Paused` or `Starting`).
pub struct GoStopActor;

/// Command: pause a running actor.
pub struct GoPauseActor;

/// Command: resume a paused actor.
pub struct GoResumeActor;

/// Command: tear the actor down for good.
pub struct GoTerminateActor;

/// Report of a failed behaviour, delivered to the failing actor's parent.
pub struct ActorFailureEvent {
    /// Identifier of the actor whose behaviour failed.
    pub actor_id: ActorId,
    /// Name of the failing actor.
    pub actor_name: String,
    /// The error (or captured panic) the behaviour produced.
    pub cause: FailureCause,
    /// The message whose handling failed. On escalation this is the
    /// escalated failure event itself.
    pub failed_message: AnyMsg,
}
