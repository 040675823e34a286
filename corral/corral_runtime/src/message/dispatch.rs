//! Typed message dispatch over type-erased handler tables.

use super::shared::{AnyMsg, Msg, Payload};
use super::type_id::MessageTypeId;
use crate::actor::behavior::BehaviorError;
use std::collections::HashMap;

type ErasedHandler<S> = Box<dyn Fn(&mut S, &AnyMsg) -> Result<(), BehaviorError> + Send>;

/// A table mapping message type identifiers to handlers over a state `S`.
///
/// Handlers receive the state exclusively borrowed plus the typed message,
/// so an actor keeps its dispatcher and its routed state as separate fields
/// and borrows them disjointly:
///
/// ```
/// use corral_runtime::message::{MessageDispatcher, Msg};
///
/// struct Increment(u64);
///
/// let mut dispatcher = MessageDispatcher::<u64>::new();
/// dispatcher.register::<Increment>(|total, msg| {
///     *total += msg.0;
///     Ok(())
/// });
///
/// let mut total = 0;
/// dispatcher
///     .dispatch(&mut total, &Msg::new(Increment(5)).erase())
///     .unwrap();
/// assert_eq!(total, 5);
/// ```
pub struct MessageDispatcher<S> {
    handlers: HashMap<MessageTypeId, ErasedHandler<S>>,
}

impl<S> MessageDispatcher<S> {
    /// Create an empty dispatcher.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register the handler for message type `M`.
    ///
    /// A second registration for the same type overwrites the first.
    /// Returns `&mut Self` so registrations chain.
    pub fn register<M: Payload>(
        &mut self,
        handler: impl Fn(&mut S, &Msg<M>) -> Result<(), BehaviorError> + Send + 'static,
    ) -> &mut Self {
        self.handlers.insert(
            MessageTypeId::of::<M>(),
            Box::new(move |state, message| match message.cast::<M>() {
                Some(typed) => handler(state, &typed),
                None => Ok(()),
            }),
        );
        self
    }

    /// Route `message` to the handler registered for its type identifier.
    ///
    /// Messages with no registered handler are silently ignored; use
    /// [`MessageDispatcher::handles`] to apply a caller-side default.
    pub fn dispatch(&self, state: &mut S, message: &AnyMsg) -> Result<(), BehaviorError> {
        match self.handlers.get(&message.type_id()) {
            Some(handler) => handler(state, message),
            None => Ok(()),
        }
    }

    /// Whether a handler is registered for `type_id`.
    pub fn handles(&self, type_id: MessageTypeId) -> bool {
        self.handlers.contains_key(&type_id)
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<S> Default for MessageDispatcher<S> {
    fn default() -> Self {
        Self::new()
    }
}
