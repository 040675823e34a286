//! Lightweight handles that name an actor and deliver messages to it.

use super::cell::AnyActor;
use super::registry::FindActorWithCallbackMessage;
use super::system::SystemFacade;
use crate::message::{AnyMsg, Msg};
use corral_core::id::ActorId;
use log::debug;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// A copyable handle addressing one actor by identity.
///
/// The reference never owns the actor: it keeps a weak handle for fast
/// delivery plus the actor's identifier for re-resolution through the
/// system registry when the cached handle dies. Clones of a reference share
/// the cache, so a successful re-resolution benefits all of them.
#[derive(Clone)]
pub struct ActorRef {
    actor_id: ActorId,
    system: Weak<dyn SystemFacade>,
    cached: Arc<Mutex<Option<Weak<dyn AnyActor>>>>,
}

impl ActorRef {
    /// A reference by identifier alone; delivery resolves via the registry.
    pub fn new(actor_id: ActorId, system: Weak<dyn SystemFacade>) -> Self {
        Self {
            actor_id,
            system,
            cached: Arc::new(Mutex::new(None)),
        }
    }

    /// A reference to a live actor, primed for direct delivery.
    pub fn for_actor<A: AnyActor + 'static>(actor: &Arc<A>, system: Weak<dyn SystemFacade>) -> Self {
        let handle: Arc<dyn AnyActor> = actor.clone();
        Self::for_any(&handle, system)
    }

    pub(crate) fn for_any(actor: &Arc<dyn AnyActor>, system: Weak<dyn SystemFacade>) -> Self {
        Self {
            actor_id: actor.id(),
            system,
            cached: Arc::new(Mutex::new(Some(Arc::downgrade(actor)))),
        }
    }

    /// The identifier of the referenced actor.
    pub fn id(&self) -> ActorId {
        self.actor_id
    }

    /// Whether the cached handle still resolves to a live actor.
    pub fn is_valid(&self) -> bool {
        self.resolve().is_some()
    }

    /// Deliver `message` to the referenced actor.
    ///
    /// Never blocks and never fails to the caller. When the cached handle
    /// has died, the message is re-posted through the system registry and
    /// the cache is refreshed on resolution; when the system itself is gone
    /// the message becomes a dead letter.
    pub fn tell(&self, message: impl Into<AnyMsg>) {
        let message = message.into();
        if let Some(actor) = self.resolve() {
            actor.receive(message);
            return;
        }

        let Some(system) = self.system.upgrade() else {
            debug!(
                "dead letter: message for actor {} dropped, system is gone",
                self.actor_id
            );
            return;
        };

        let actor_id = self.actor_id;
        let cache = Arc::clone(&self.cached);
        let find = Msg::new(FindActorWithCallbackMessage {
            actor_id,
            callback: Box::new(move |found: ActorRef| {
                // Deliver through the resolved handle directly; bouncing
                // back into `tell` could ping-pong with the registry while
                // a registration is stale.
                match found.resolve() {
                    Some(actor) => {
                        actor.receive(message.clone());
                        *cache.lock() = Some(Arc::downgrade(&actor));
                    }
                    None => debug!(
                        "dead letter: actor {actor_id} is registered but no longer alive"
                    ),
                }
            }),
        });
        system.actor_registry().tell(find);
    }

    fn resolve(&self) -> Option<Arc<dyn AnyActor>> {
        self.cached.lock().as_ref().and_then(Weak::upgrade)
    }
}

impl std::fmt::Debug for ActorRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorRef")
            .field("actor_id", &self.actor_id)
            .field("valid", &self.is_valid())
            .finish()
    }
}
