//! Supervision: turning a child failure into a recovery directive.

use super::behavior::FailureCause;
use super::events::ActorFailureEvent;
use log::debug;
use std::any::TypeId;
use std::marker::PhantomData;

/// What a supervisor does about a failed child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Leave the child as it is and keep going.
    Resume,
    /// Terminate the child and replace it with a fresh instance.
    Restart,
    /// Stop the child.
    Stop,
    /// Hand the failure to the next parent up.
    Escalate,
}

/// A policy deciding the directive for a child failure.
pub trait SupervisionStrategy: Send {
    /// Decide what to do about `failure`.
    fn decide(&self, failure: &ActorFailureEvent) -> Directive;
}

/// A handler responsible for one error type.
trait FailureHandler: Send {
    /// The error type this handler matches.
    fn error_type(&self) -> TypeId;

    /// The handler's directive when the cause matches its type, `None`
    /// otherwise.
    fn decide(&self, cause: &FailureCause) -> Option<Directive>;
}

struct TypedFailureHandler<E> {
    directive: Directive,
    _marker: PhantomData<fn() -> E>,
}

impl<E: std::error::Error + Send + Sync + 'static> FailureHandler for TypedFailureHandler<E> {
    fn error_type(&self) -> TypeId {
        TypeId::of::<E>()
    }

    fn decide(&self, cause: &FailureCause) -> Option<Directive> {
        cause.downcast_ref::<E>().map(|_| self.directive)
    }
}

/// A strategy acting on the failing child alone, never its siblings.
///
/// Holds typed handlers in registration order; `decide` returns the first
/// handler whose error type matches the failure's cause, or the configured
/// default directive (initially [`Directive::Escalate`]) when none applies.
///
/// ```
/// use corral_runtime::actor::{Directive, OneForOneStrategy};
///
/// #[derive(Debug, thiserror::Error)]
/// #[error("worker overloaded")]
/// struct Overloaded;
///
/// let strategy = OneForOneStrategy::new()
///     .on_error::<Overloaded>(Directive::Restart)
///     .with_default_directive(Directive::Stop);
/// ```
pub struct OneForOneStrategy {
    handlers: Vec<Box<dyn FailureHandler>>,
    default_directive: Directive,
}

impl OneForOneStrategy {
    /// A strategy with no handlers and `Escalate` as the default.
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            default_directive: Directive::Escalate,
        }
    }

    /// Register `directive` for failures of error type `E`.
    ///
    /// Re-registering an error type replaces its directive in place.
    pub fn on_error<E: std::error::Error + Send + Sync + 'static>(
        mut self,
        directive: Directive,
    ) -> Self {
        let handler: Box<dyn FailureHandler> = Box::new(TypedFailureHandler::<E> {
            directive,
            _marker: PhantomData,
        });
        match self
            .handlers
            .iter_mut()
            .find(|existing| existing.error_type() == TypeId::of::<E>())
        {
            Some(existing) => *existing = handler,
            None => self.handlers.push(handler),
        }
        self
    }

    /// Set the directive used when no handler matches.
    pub fn with_default_directive(mut self, directive: Directive) -> Self {
        self.default_directive = directive;
        self
    }
}

impl Default for OneForOneStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl SupervisionStrategy for OneForOneStrategy {
    fn decide(&self, failure: &ActorFailureEvent) -> Directive {
        let directive = self
            .handlers
            .iter()
            .find_map(|handler| handler.decide(&failure.cause))
            .unwrap_or(self.default_directive);
        debug!(
            "supervision decision for actor {} ({}): {:?}",
            failure.actor_name, failure.actor_id, directive
        );
        directive
    }
}
