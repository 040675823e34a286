//! The parent-side registry of children: spawning, restarting, and failure
//! routing.

use super::actor_ref::ActorRef;
use super::behavior::Behavior;
use super::cell::{build_actor, AnyActor};
use super::events::{ActorFailureEvent, GoResumeActor, GoStopActor, GoTerminateActor};
use super::registry::RegisterActorMessage;
use super::supervision::{Directive, SupervisionStrategy};
use super::system::SystemFacade;
use crate::executor::Executor;
use crate::message::Msg;
use corral_core::id::ActorId;
use log::{debug, info};
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// One supervised child: the owning handle, its failure policy, and the
/// closure that reproduces a fresh instance on restart.
struct ChildInfo {
    actor: Arc<dyn AnyActor>,
    strategy: Option<Box<dyn SupervisionStrategy>>,
    factory: Box<dyn Fn() -> Arc<dyn AnyActor> + Send>,
}

/// An actor's execution context, installed by the system at construction.
///
/// The context carries the actor's identity, the shared executor, a weak
/// link to the parent, and the exclusively owned children map. It is only
/// ever touched from within the owning actor's serial slot, so mutation
/// needs no synchronisation.
pub struct ActorContext {
    executor: Executor,
    parent: Option<Weak<dyn AnyActor>>,
    self_id: ActorId,
    self_name: String,
    self_handle: Weak<dyn AnyActor>,
    facade: Weak<dyn SystemFacade>,
    children: HashMap<ActorId, ChildInfo>,
}

impl ActorContext {
    pub(crate) fn new(
        executor: Executor,
        parent: Option<Weak<dyn AnyActor>>,
        self_id: ActorId,
        self_name: String,
        self_handle: Weak<dyn AnyActor>,
        facade: Weak<dyn SystemFacade>,
    ) -> Self {
        Self {
            executor,
            parent,
            self_id,
            self_name,
            self_handle,
            facade,
            children: HashMap::new(),
        }
    }

    /// The owning actor's identifier.
    pub fn id(&self) -> ActorId {
        self.self_id
    }

    /// The owning actor's name.
    pub fn name(&self) -> &str {
        &self.self_name
    }

    /// The shared executor the actor's strand drains on.
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// The parent actor, while it is still alive.
    pub fn parent(&self) -> Option<Arc<dyn AnyActor>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// The system facade, while the system is still alive.
    pub fn facade(&self) -> Weak<dyn SystemFacade> {
        self.facade.clone()
    }

    /// Identifiers of the currently installed children.
    pub fn child_ids(&self) -> Vec<ActorId> {
        self.children.keys().copied().collect()
    }

    /// A reference to the child with `child_id`, if installed.
    pub fn child_ref(&self, child_id: ActorId) -> Option<ActorRef> {
        self.children
            .get(&child_id)
            .map(|info| ActorRef::for_any(&info.actor, self.facade.clone()))
    }

    /// Spawn a supervised child actor on the shared executor.
    ///
    /// `make_behavior` is retained as the child's recreation factory: a
    /// `Restart` directive reproduces the child with the same name and
    /// constructor arguments but a fresh identifier. The child is created
    /// in `Created`; send [`super::events::GoStartActor`] to start it.
    pub fn spawn_child<B: Behavior>(
        &mut self,
        name: impl Into<String>,
        strategy: Option<Box<dyn SupervisionStrategy>>,
        make_behavior: impl Fn() -> B + Send + 'static,
    ) -> ActorRef {
        let name = name.into();
        let executor = self.executor.clone();
        let parent = self.self_handle.clone();
        let facade = self.facade.clone();
        let factory: Box<dyn Fn() -> Arc<dyn AnyActor> + Send> = Box::new(move || {
            let child: Arc<dyn AnyActor> = build_actor(
                &executor,
                &name,
                Some(parent.clone()),
                facade.clone(),
                make_behavior(),
            );
            child
        });

        let child = factory();
        debug!(
            "actor {} ({}) spawned child {} ({})",
            self.self_name,
            self.self_id,
            child.name(),
            child.id()
        );
        let reference = ActorRef::for_any(&child, self.facade.clone());
        self.children.insert(
            child.id(),
            ChildInfo {
                actor: child,
                strategy,
                factory,
            },
        );
        reference
    }

    /// Route a child's failure event through its supervision strategy.
    ///
    /// Unknown children and children without a strategy escalate to this
    /// actor's own parent.
    pub fn handle_child_failure(&mut self, event: &Msg<ActorFailureEvent>) {
        let directive = match self.children.get(&event.actor_id) {
            Some(ChildInfo {
                strategy: Some(strategy),
                ..
            }) => strategy.decide(event),
            _ => {
                self.escalate(event);
                return;
            }
        };

        match directive {
            Directive::Resume => self.tell_child(event.actor_id, Msg::new(GoResumeActor).erase()),
            Directive::Restart => self.restart_child(event.actor_id),
            Directive::Stop => self.tell_child(event.actor_id, Msg::new(GoStopActor).erase()),
            Directive::Escalate => self.escalate(event),
        }
    }

    fn tell_child(&self, child_id: ActorId, message: crate::message::AnyMsg) {
        if let Some(info) = self.children.get(&child_id) {
            info.actor.receive(message);
        }
    }

    /// Re-emit a failure to this actor's parent, naming this actor and
    /// carrying the original event as the failed message.
    fn escalate(&self, event: &Msg<ActorFailureEvent>) {
        match self.parent() {
            Some(parent) => {
                let escalation = Msg::new(ActorFailureEvent {
                    actor_id: self.self_id,
                    actor_name: self.self_name.clone(),
                    cause: event.cause.clone(),
                    failed_message: event.clone().erase(),
                });
                parent.receive(escalation.erase());
            }
            None => debug!(
                "failure of actor {} ({}) reached the hierarchy root",
                event.actor_name, event.actor_id
            ),
        }
    }

    /// Terminate a child and install a fresh instance from its factory.
    fn restart_child(&mut self, child_id: ActorId) {
        let Some(ChildInfo {
            actor,
            strategy,
            factory,
        }) = self.children.remove(&child_id)
        else {
            return;
        };

        actor.receive(Msg::new(GoTerminateActor).erase());

        let replacement = factory();
        info!(
            "actor {} ({}) restarted child {} as {}",
            self.self_name,
            self.self_id,
            child_id,
            replacement.id()
        );

        if let Some(facade) = self.facade.upgrade() {
            facade.actor_registry().tell(Msg::new(RegisterActorMessage {
                actor_id: replacement.id(),
                actor_ref: ActorRef::for_any(&replacement, self.facade.clone()),
            }));
        }

        self.children.insert(
            replacement.id(),
            ChildInfo {
                actor: replacement,
                strategy,
                factory,
            },
        );
    }
}
