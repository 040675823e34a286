//! The actor cell: a serial message consumer bound to a strand.

use super::behavior::{Behavior, BehaviourPanic, FailureCause};
use super::context::ActorContext;
use super::events::{
    ActorFailureEvent, GoPauseActor, GoResumeActor, GoStartActor, GoStopActor, GoTerminateActor,
};
use super::state::{ActorState, Lifecycle, LifecycleEvent};
use super::system::SystemFacade;
use crate::executor::{Executor, Strand, ThreadPoolError};
use crate::message::{AnyMsg, MessageTypeId, Msg};
use corral_core::id::ActorId;
use log::{debug, error, trace, warn};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use thiserror::Error;

/// Errors surfaced by the actor cell itself.
#[derive(Error, Debug)]
pub enum ActorError {
    /// A message arrived before the system installed the actor's context.
    #[error("actor context is not set")]
    ContextUnset,
}

/// The lifecycle commands recognised by every actor, plus the synthesised
/// failure event.
#[derive(Clone, Copy, Debug)]
enum SystemCommand {
    Start,
    Stop,
    Pause,
    Resume,
    Terminate,
    ChildFailure,
}

/// Table mapping system message type identifiers to their handlers.
static SYSTEM_COMMANDS: Lazy<HashMap<MessageTypeId, SystemCommand>> = Lazy::new(|| {
    HashMap::from([
        (MessageTypeId::of::<GoStartActor>(), SystemCommand::Start),
        (MessageTypeId::of::<GoStopActor>(), SystemCommand::Stop),
        (MessageTypeId::of::<GoPauseActor>(), SystemCommand::Pause),
        (MessageTypeId::of::<GoResumeActor>(), SystemCommand::Resume),
        (
            MessageTypeId::of::<GoTerminateActor>(),
            SystemCommand::Terminate,
        ),
        (
            MessageTypeId::of::<ActorFailureEvent>(),
            SystemCommand::ChildFailure,
        ),
    ])
});

/// The parts of an actor that are mutated during message processing.
///
/// Only ever locked from within the actor's strand, so the lock is
/// uncontended; it exists to make the cell shareable across pool threads.
struct ActorInner<B> {
    state: ActorState,
    behavior: B,
    context: Option<ActorContext>,
}

/// A serial message consumer bound to an executor strand.
///
/// The cell owns the actor's identity, lifecycle state, behaviour value,
/// and (once installed) its context. All mutation happens inside the
/// strand, one message at a time; external interaction goes through
/// [`Actor::receive`] or an [`super::actor_ref::ActorRef`]. The actor lives
/// until its last strong handle drops; deliveries racing with the drop are
/// discarded.
pub struct Actor<B: Behavior> {
    id: ActorId,
    name: String,
    strand: Strand,
    inner: Mutex<ActorInner<B>>,
    self_weak: Weak<Actor<B>>,
}

impl<B: Behavior> Actor<B> {
    /// Construct a cell in the `Created` state on `executor`.
    ///
    /// The cell is not usable until a context is installed; the system and
    /// context spawning paths do this before handing the actor out.
    pub fn new(executor: Executor, name: impl Into<String>, id: ActorId, behavior: B) -> Arc<Self> {
        Arc::new_cyclic(|self_weak| Self {
            id,
            name: name.into(),
            strand: Strand::new(executor),
            inner: Mutex::new(ActorInner {
                state: ActorState::new(),
                behavior,
                context: None,
            }),
            self_weak: self_weak.clone(),
        })
    }

    /// One-shot installation of the actor's context by the system.
    pub fn set_context(&self, context: ActorContext) {
        let mut inner = self.inner.lock();
        if inner.context.is_some() {
            warn!(
                "actor {} ({}): context installed twice, replacing",
                self.name, self.id
            );
        }
        inner.context = Some(context);
    }

    /// The actor's identifier.
    pub fn id(&self) -> ActorId {
        self.id
    }

    /// The actor's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// A snapshot of the lifecycle state.
    pub fn state(&self) -> ActorState {
        self.inner.lock().state
    }

    /// Enqueue `message` into the actor's serial slot.
    ///
    /// Returns immediately and never fails to the caller: a message posted
    /// while the executor is shutting down is discarded, and a message
    /// whose actor is dropped before processing is discarded at dequeue.
    pub fn receive(&self, message: impl Into<AnyMsg>) {
        let message = message.into();
        let weak = self.self_weak.clone();
        let posted = self.strand.post(move || {
            if let Some(actor) = weak.upgrade() {
                actor.process(message);
            }
        });
        if let Err(ThreadPoolError::ShuttingDown) = posted {
            debug!(
                "actor {} ({}): executor stopped, message discarded",
                self.name, self.id
            );
        }
    }

    /// Classify and handle one dequeued message. Runs inside the strand.
    fn process(&self, message: AnyMsg) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let Some(context) = inner.context.as_mut() else {
            error!(
                "actor {} ({}): {}; message dropped",
                self.name,
                self.id,
                ActorError::ContextUnset
            );
            return;
        };
        let state = &mut inner.state;
        let behavior = &mut inner.behavior;

        match SYSTEM_COMMANDS.get(&message.type_id()).copied() {
            Some(SystemCommand::Start) => self.handle_go_start(state, behavior, context),
            Some(SystemCommand::Stop) => self.handle_go_stop(state, behavior, context),
            Some(SystemCommand::Pause) => self.handle_go_pause(state, behavior, context),
            Some(SystemCommand::Resume) => self.handle_go_resume(state, behavior, context),
            Some(SystemCommand::Terminate) => self.handle_go_terminate(state, behavior, context),
            Some(SystemCommand::ChildFailure) => {
                if let Some(event) = message.cast::<ActorFailureEvent>() {
                    context.handle_child_failure(&event);
                }
            }
            None => self.handle_user_message(state, behavior, context, &message),
        }
    }

    /// A single start command walks the actor through every step that is
    /// legal from its current state, invoking each hook once per step.
    fn handle_go_start(&self, state: &mut ActorState, behavior: &mut B, context: &mut ActorContext) {
        if state.lifecycle() == Lifecycle::Created {
            state.dispatch(LifecycleEvent::Initialize);
            behavior.on_initialize(context);
        }
        if matches!(
            state.lifecycle(),
            Lifecycle::Initializing | Lifecycle::Stopped
        ) {
            state.dispatch(LifecycleEvent::Start);
            behavior.on_start(context);
        }
        if state.lifecycle() == Lifecycle::Starting {
            state.dispatch(LifecycleEvent::Started);
            behavior.on_started(context);
        }
        trace!("actor {} ({}): {:?}", self.name, self.id, state.lifecycle());
    }

    fn handle_go_stop(&self, state: &mut ActorState, behavior: &mut B, context: &mut ActorContext) {
        if matches!(
            state.lifecycle(),
            Lifecycle::Running | Lifecycle::Paused | Lifecycle::Starting
        ) {
            state.dispatch(LifecycleEvent::Stop);
            behavior.on_stop(context);
        }
        if state.lifecycle() == Lifecycle::Stopping {
            state.dispatch(LifecycleEvent::Stopped);
            behavior.on_stopped(context);
        }
        trace!("actor {} ({}): {:?}", self.name, self.id, state.lifecycle());
    }

    fn handle_go_pause(&self, state: &mut ActorState, behavior: &mut B, context: &mut ActorContext) {
        if state.lifecycle() == Lifecycle::Running {
            state.dispatch(LifecycleEvent::Pause);
            behavior.on_pause(context);
        }
    }

    fn handle_go_resume(
        &self,
        state: &mut ActorState,
        behavior: &mut B,
        context: &mut ActorContext,
    ) {
        if state.lifecycle() == Lifecycle::Paused {
            state.dispatch(LifecycleEvent::Resume);
            behavior.on_resume(context);
        }
    }

    fn handle_go_terminate(
        &self,
        state: &mut ActorState,
        behavior: &mut B,
        context: &mut ActorContext,
    ) {
        if state.lifecycle() != Lifecycle::Terminated {
            state.dispatch(LifecycleEvent::Terminate);
            behavior.on_terminate(context);
        }
        if state.lifecycle() == Lifecycle::Terminating {
            state.dispatch(LifecycleEvent::Terminated);
            behavior.on_terminated(context);
        }
        trace!("actor {} ({}): {:?}", self.name, self.id, state.lifecycle());
    }

    /// Run the user behaviour; a failure (error or panic) fires FAILURE and
    /// reports to the parent.
    fn handle_user_message(
        &self,
        state: &mut ActorState,
        behavior: &mut B,
        context: &mut ActorContext,
        message: &AnyMsg,
    ) {
        if !state.is_running() {
            trace!(
                "actor {} ({}): dropping user message in {:?}",
                self.name,
                self.id,
                state.lifecycle()
            );
            return;
        }

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            behavior.behaviour(context, message)
        }));
        let cause: FailureCause = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(error)) => Arc::from(error),
            Err(payload) => Arc::new(BehaviourPanic::from_payload(payload)),
        };

        warn!(
            "actor {} ({}): behaviour failed: {}",
            self.name, self.id, cause
        );
        state.dispatch(LifecycleEvent::Failure);

        let event = Msg::new(ActorFailureEvent {
            actor_id: self.id,
            actor_name: self.name.clone(),
            cause,
            failed_message: message.clone(),
        });
        if let Some(parent) = context.parent() {
            parent.receive(event.erase());
        }
    }
}

/// The type-erased, object-safe view of an actor cell.
///
/// Contexts, references, and the registry address actors through this
/// trait; it is the non-owning currency of the runtime.
pub trait AnyActor: Send + Sync {
    /// Enqueue a message into the actor's serial slot.
    fn receive(&self, message: AnyMsg);

    /// The actor's identifier.
    fn id(&self) -> ActorId;

    /// The actor's name.
    fn name(&self) -> &str;

    /// A snapshot of the lifecycle state.
    fn state(&self) -> ActorState;
}

impl<B: Behavior> AnyActor for Actor<B> {
    fn receive(&self, message: AnyMsg) {
        Actor::receive(self, message);
    }

    fn id(&self) -> ActorId {
        Actor::id(self)
    }

    fn name(&self) -> &str {
        Actor::name(self)
    }

    fn state(&self) -> ActorState {
        Actor::state(self)
    }
}

/// Construct a cell with a fresh identifier and install its context.
pub(crate) fn build_actor<B: Behavior>(
    executor: &Executor,
    name: &str,
    parent: Option<Weak<dyn AnyActor>>,
    facade: Weak<dyn SystemFacade>,
    behavior: B,
) -> Arc<Actor<B>> {
    let actor = Actor::new(executor.clone(), name, ActorId::next(), behavior);
    let self_handle: Weak<dyn AnyActor> = actor.self_weak.clone();
    let context = ActorContext::new(
        executor.clone(),
        parent,
        actor.id(),
        actor.name().to_string(),
        self_handle,
        facade,
    );
    actor.set_context(context);
    actor
}
