//! The actor registry: an address book from identifier to reference,
//! itself implemented as an actor.

use super::actor_ref::ActorRef;
use super::behavior::{Behavior, BehaviorError};
use super::context::ActorContext;
use crate::message::{AnyMsg, MessageDispatcher, Msg};
use corral_core::id::ActorId;
use log::info;
use std::collections::HashMap;

/// Install (or overwrite) the mapping `actor_id` → `actor_ref`.
pub struct RegisterActorMessage {
    /// Identifier to register under.
    pub actor_id: ActorId,
    /// Reference stored for that identifier.
    pub actor_ref: ActorRef,
}

/// Remove the mapping for `actor_id`, if any.
pub struct UnregisterActorMessage {
    /// Identifier to remove.
    pub actor_id: ActorId,
}

/// Look up `actor_id` and reply to `reply_to` with
/// [`ActorFoundResponseMessage`] or [`ActorNotFoundResponseMessage`].
pub struct FindActorMessage {
    /// Identifier to look up.
    pub actor_id: ActorId,
    /// Where the response is delivered.
    pub reply_to: ActorRef,
}

/// Look up `actor_id` and run `callback` with the stored reference.
///
/// A miss is silent: the callback is simply not invoked, and any timeout is
/// the caller's responsibility.
pub struct FindActorWithCallbackMessage {
    /// Identifier to look up.
    pub actor_id: ActorId,
    /// Invoked with the stored reference on a hit.
    pub callback: Box<dyn Fn(ActorRef) + Send + Sync>,
}

/// Successful [`FindActorMessage`] response.
pub struct ActorFoundResponseMessage {
    /// The stored reference.
    pub actor_ref: ActorRef,
}

/// Negative [`FindActorMessage`] response.
pub struct ActorNotFoundResponseMessage {
    /// The identifier that had no mapping.
    pub actor_id: ActorId,
}

/// The root address book, spawned by the system under
/// [`super::system::ACTOR_REGISTRY_NAME`].
///
/// The registry holds only non-owning references; dropping an actor's last
/// strong handle is never prevented by a stale registration. The map is
/// cleared when the registry stops or terminates.
pub struct ActorRegistry {
    actors: HashMap<ActorId, ActorRef>,
    dispatcher: MessageDispatcher<HashMap<ActorId, ActorRef>>,
}

impl ActorRegistry {
    /// An empty registry with its message handlers installed.
    pub fn new() -> Self {
        let mut dispatcher = MessageDispatcher::new();
        dispatcher
            .register::<RegisterActorMessage>(|actors: &mut HashMap<ActorId, ActorRef>, message| {
                actors.insert(message.actor_id, message.actor_ref.clone());
                info!("registered actor {}", message.actor_id);
                Ok(())
            })
            .register::<UnregisterActorMessage>(|actors, message| {
                actors.remove(&message.actor_id);
                Ok(())
            })
            .register::<FindActorMessage>(|actors, message| {
                match actors.get(&message.actor_id) {
                    Some(found) => message.reply_to.tell(Msg::new(ActorFoundResponseMessage {
                        actor_ref: found.clone(),
                    })),
                    None => message
                        .reply_to
                        .tell(Msg::new(ActorNotFoundResponseMessage {
                            actor_id: message.actor_id,
                        })),
                }
                Ok(())
            })
            .register::<FindActorWithCallbackMessage>(|actors, message| {
                if let Some(found) = actors.get(&message.actor_id) {
                    (message.callback)(found.clone());
                }
                Ok(())
            });

        Self {
            actors: HashMap::new(),
            dispatcher,
        }
    }
}

impl Default for ActorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Behavior for ActorRegistry {
    fn behaviour(&mut self, _ctx: &mut ActorContext, message: &AnyMsg) -> Result<(), BehaviorError> {
        self.dispatcher.dispatch(&mut self.actors, message)
    }

    fn on_stop(&mut self, _ctx: &mut ActorContext) {
        self.actors.clear();
    }

    fn on_terminate(&mut self, _ctx: &mut ActorContext) {
        self.actors.clear();
    }
}
