#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

//! # Corral Runtime
//!
//! A lightweight, in-process actor runtime. Applications compose concurrent
//! state machines (actors) that exchange typed, reference-counted messages,
//! are supervised in a parent/child hierarchy, and execute on a shared
//! thread pool with per-actor serial dispatch.
//!
//! The crate is layered leaves-first:
//!
//! - **message**: type identity, the per-type pooled allocator, shared
//!   message handles, and the typed dispatcher
//! - **executor**: the shared thread pool and the serial sub-executor
//!   (strand) that guarantees non-overlapping execution per actor
//! - **actor**: the lifecycle state machine, the actor cell, references,
//!   supervision, the parent-side context, the registry, and the system
//!   facade
//!
//! # Example
//!
//! ```no_run
//! use corral_runtime::actor::{ActorContext, ActorRef, ActorSystem, Behavior, BehaviorError};
//! use corral_runtime::actor::events::GoStartActor;
//! use corral_runtime::message::{AnyMsg, Msg};
//!
//! struct Greeting(String);
//!
//! struct Greeter;
//!
//! impl Behavior for Greeter {
//!     fn behaviour(
//!         &mut self,
//!         _ctx: &mut ActorContext,
//!         message: &AnyMsg,
//!     ) -> Result<(), BehaviorError> {
//!         if let Some(greeting) = message.downcast_ref::<Greeting>() {
//!             println!("{}", greeting.0);
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let system = ActorSystem::new("example", 1);
//! let greeter = system.create_actor("greeter", Greeter);
//! let greeter_ref = ActorRef::for_actor(&greeter, system.facade());
//! greeter_ref.tell(Msg::new(GoStartActor));
//! greeter_ref.tell(Msg::new(Greeting("hello".into())));
//! system.stop();
//! ```

pub mod actor;
pub mod executor;
pub mod message;

// Re-export the high-traffic types at the crate root
pub use actor::{
    ActorContext, ActorRef, ActorState, ActorSystem, ActorSystemConfig, Behavior, BehaviorError,
    Directive, OneForOneStrategy, SupervisionStrategy, SystemFacade,
};
pub use corral_core::id::ActorId;
pub use message::{AnyMsg, MessageDispatcher, MessageTypeId, Msg};
