//! The actor system: thread pool, root registry, and the system facade.

use super::actor_ref::ActorRef;
use super::behavior::Behavior;
use super::cell::{build_actor, Actor};
use super::events::GoStartActor;
use super::registry::{ActorRegistry, FindActorWithCallbackMessage};
use crate::executor::{Executor, ThreadPool, ThreadPoolConfig, ThreadPoolStats};
use crate::message::{AnyMsg, Msg};
use corral_core::id::ActorId;
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Well-known name of the root registry actor.
pub const ACTOR_REGISTRY_NAME: &str = "system/actor-registry";

/// The system surface actors and references depend on.
///
/// Kept narrow so components hold a `Weak<dyn SystemFacade>` rather than
/// the concrete system, which keeps teardown order flexible.
pub trait SystemFacade: Send + Sync {
    /// A reference to the root registry actor.
    fn actor_registry(&self) -> ActorRef;

    /// Deliver `message` to the actor registered under `actor_id`.
    fn dispatch_message(&self, actor_id: ActorId, message: AnyMsg);
}

/// Configuration recognised by the runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorSystemConfig {
    /// Informational; used in diagnostics and worker thread names.
    pub name: String,
    /// Worker thread count. `0` is treated as `1`.
    pub worker_threads: usize,
}

impl Default for ActorSystemConfig {
    fn default() -> Self {
        Self {
            name: "corral".to_string(),
            worker_threads: num_cpus::get(),
        }
    }
}

/// Owns the shared thread pool and the root registry; the entry point of
/// the runtime.
///
/// ```no_run
/// use corral_runtime::actor::ActorSystem;
///
/// let system = ActorSystem::new("app", 4);
/// // ... create actors, exchange messages ...
/// system.stop();
/// ```
pub struct ActorSystem {
    config: ActorSystemConfig,
    pool: ThreadPool,
    registry: Arc<Actor<ActorRegistry>>,
    running: AtomicBool,
    self_weak: Weak<ActorSystem>,
}

impl ActorSystem {
    /// Build and start a system with `thread_count` workers.
    ///
    /// `0` workers is treated as `1`.
    pub fn new(name: impl Into<String>, thread_count: usize) -> Arc<Self> {
        Self::with_config(ActorSystemConfig {
            name: name.into(),
            worker_threads: thread_count,
        })
    }

    /// Build and start a system from a configuration.
    pub fn with_config(config: ActorSystemConfig) -> Arc<Self> {
        let threads = config.worker_threads.max(1);
        let system = Arc::new_cyclic(|self_weak: &Weak<ActorSystem>| {
            let pool = ThreadPool::with_config(ThreadPoolConfig {
                threads,
                thread_name_prefix: format!("{}-worker", config.name),
            });
            let facade: Weak<dyn SystemFacade> = self_weak.clone();
            let registry = build_actor(
                &pool.handle(),
                ACTOR_REGISTRY_NAME,
                None,
                facade,
                ActorRegistry::new(),
            );

            info!(
                "actor system '{}' starting with {} worker threads",
                config.name, threads
            );

            ActorSystem {
                config,
                pool,
                registry,
                running: AtomicBool::new(true),
                self_weak: self_weak.clone(),
            }
        });

        system.registry.receive(Msg::new(GoStartActor));
        system
    }

    /// The system's name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// The configuration the system was built from.
    pub fn config(&self) -> &ActorSystemConfig {
        &self.config
    }

    /// A weak handle to this system's facade, for building references.
    pub fn facade(&self) -> Weak<dyn SystemFacade> {
        self.self_weak.clone()
    }

    /// A submit handle onto the shared thread pool.
    pub fn executor(&self) -> Executor {
        self.pool.handle()
    }

    /// Task counters of the shared thread pool.
    pub fn pool_stats(&self) -> ThreadPoolStats {
        self.pool.stats()
    }

    /// Whether [`ActorSystem::stop`] has not run yet.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Instantiate an actor on the shared executor with a fresh identifier
    /// and a root-level context (no parent).
    ///
    /// The actor is **not** started and **not** registered: send
    /// [`GoStartActor`] to start it, and register it with the registry if
    /// it should be addressable by identifier.
    pub fn create_actor<B: Behavior>(
        &self,
        name: impl Into<String>,
        behavior: B,
    ) -> Arc<Actor<B>> {
        build_actor(
            &self.pool.handle(),
            &name.into(),
            None,
            self.facade(),
            behavior,
        )
    }

    /// Halt the executor and join the worker threads. Idempotent.
    ///
    /// Tasks not yet started are dropped; messages already delivered to an
    /// actor may or may not be observed.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        info!("stopping actor system '{}'", self.config.name);
        self.pool.shutdown();
    }
}

impl SystemFacade for ActorSystem {
    fn actor_registry(&self) -> ActorRef {
        ActorRef::for_actor(&self.registry, self.facade())
    }

    fn dispatch_message(&self, actor_id: ActorId, message: AnyMsg) {
        let find = Msg::new(FindActorWithCallbackMessage {
            actor_id,
            callback: Box::new(move |target: ActorRef| target.tell(message.clone())),
        });
        self.registry.receive(find);
    }
}

impl Drop for ActorSystem {
    fn drop(&mut self) {
        self.stop();
    }
}
