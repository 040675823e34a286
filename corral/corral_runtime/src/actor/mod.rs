//! The actor subsystem: lifecycle, cells, references, supervision,
//! contexts, the registry, and the system facade.
//!
//! An [`Actor`] is a serial message consumer bound to a strand on the
//! shared pool; its user-supplied [`Behavior`] handles messages and
//! lifecycle hooks without any synchronisation of its own. Parents own
//! their children through the [`ActorContext`] and convert child failures
//! into [`Directive`]s via a [`SupervisionStrategy`]. The [`ActorSystem`]
//! ties it together: thread pool, root registry, and actor construction.

pub mod actor_ref;
pub mod behavior;
pub mod cell;
pub mod context;
pub mod events;
pub mod registry;
pub mod state;
pub mod supervision;
pub mod system;

pub use actor_ref::ActorRef;
pub use behavior::{Behavior, BehaviorError, BehaviourPanic, FailureCause};
pub use cell::{Actor, ActorError, AnyActor};
pub use context::ActorContext;
pub use events::{
    ActorFailureEvent, GoPauseActor, GoResumeActor, GoStartActor, GoStopActor, GoTerminateActor,
};
pub use registry::{
    ActorFoundResponseMessage, ActorNotFoundResponseMessage, ActorRegistry, FindActorMessage,
    FindActorWithCallbackMessage, RegisterActorMessage, UnregisterActorMessage,
};
pub use state::{ActorState, Lifecycle, LifecycleEvent};
pub use supervision::{Directive, OneForOneStrategy, SupervisionStrategy};
pub use system::{ActorSystem, ActorSystemConfig, SystemFacade, ACTOR_REGISTRY_NAME};
