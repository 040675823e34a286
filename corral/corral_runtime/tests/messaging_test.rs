//! Message flow, dispatch, and pool accounting through live actors.

mod common;

use common::{wait_for_quiescence, wait_until, DEFAULT_WAIT};
use corral_runtime::actor::events::GoStartActor;
use corral_runtime::actor::{ActorContext, ActorSystem, Behavior, BehaviorError};
use corral_runtime::message::{message_pool_stats, AnyMsg, MessageDispatcher, Msg};
use std::sync::{Arc, Mutex};

struct Add(u64);
struct Publish;

#[derive(Default)]
struct Totals {
    total: u64,
    published: Arc<Mutex<Vec<u64>>>,
}

/// Routes its user messages through a dispatcher over its own state.
struct Summing {
    totals: Totals,
    dispatcher: MessageDispatcher<Totals>,
}

impl Summing {
    fn new(published: Arc<Mutex<Vec<u64>>>) -> Self {
        let mut dispatcher = MessageDispatcher::new();
        dispatcher
            .register::<Add>(|totals: &mut Totals, message| {
                totals.total += message.0;
                Ok(())
            })
            .register::<Publish>(|totals, _| {
                totals.published.lock().unwrap().push(totals.total);
                Ok(())
            });
        Self {
            totals: Totals {
                total: 0,
                published,
            },
            dispatcher,
        }
    }
}

impl Behavior for Summing {
    fn behaviour(&mut self, _ctx: &mut ActorContext, message: &AnyMsg) -> Result<(), BehaviorError> {
        self.dispatcher.dispatch(&mut self.totals, message)
    }
}

#[test]
fn test_dispatcher_backed_actor_processes_typed_messages() {
    let system = ActorSystem::new("messaging", 2);
    let published = Arc::new(Mutex::new(Vec::new()));
    let actor = system.create_actor("summing", Summing::new(published.clone()));

    actor.receive(Msg::new(GoStartActor));
    for value in [3, 4, 10] {
        actor.receive(Msg::new(Add(value)));
    }
    actor.receive(Msg::new(Publish));

    assert!(wait_until(
        || !published.lock().unwrap().is_empty(),
        DEFAULT_WAIT
    ));
    assert_eq!(*published.lock().unwrap(), vec![17]);
}

#[test]
fn test_unregistered_message_type_is_silently_dropped() {
    struct Stray;

    let system = ActorSystem::new("messaging", 2);
    let published = Arc::new(Mutex::new(Vec::new()));
    let actor = system.create_actor("summing", Summing::new(published.clone()));

    actor.receive(Msg::new(GoStartActor));
    actor.receive(Msg::new(Stray));
    actor.receive(Msg::new(Add(2)));
    actor.receive(Msg::new(Publish));

    assert!(wait_until(
        || !published.lock().unwrap().is_empty(),
        DEFAULT_WAIT
    ));
    // The stray message neither failed the actor nor affected its state.
    assert!(actor.state().is_running());
    assert_eq!(*published.lock().unwrap(), vec![2]);
}

#[test]
fn test_delivered_messages_return_to_their_pool() {
    struct Tracked([u8; 48]);

    struct Sink;

    impl Behavior for Sink {
        fn behaviour(
            &mut self,
            _ctx: &mut ActorContext,
            _message: &AnyMsg,
        ) -> Result<(), BehaviorError> {
            Ok(())
        }
    }

    const COUNT: usize = 500;

    let stats = message_pool_stats::<Tracked>();
    let base_allocs = stats.allocations();
    let base_deallocs = stats.deallocations();

    let system = ActorSystem::new("messaging", 2);
    let actor = system.create_actor("sink", Sink);
    actor.receive(Msg::new(GoStartActor));

    for _ in 0..COUNT {
        actor.receive(Msg::new(Tracked([0; 48])));
    }

    assert_eq!(stats.allocations(), base_allocs + COUNT);
    assert!(wait_until(
        || stats.deallocations() == base_deallocs + COUNT,
        DEFAULT_WAIT
    ));
    assert_eq!(stats.bytes_allocated(), stats.bytes_deallocated());
}

#[test]
fn test_message_shared_across_actors_is_freed_once() {
    struct Broadcast(u64);

    struct Collector {
        seen: Arc<Mutex<Vec<u64>>>,
    }

    impl Behavior for Collector {
        fn behaviour(
            &mut self,
            _ctx: &mut ActorContext,
            message: &AnyMsg,
        ) -> Result<(), BehaviorError> {
            if let Some(broadcast) = message.downcast_ref::<Broadcast>() {
                self.seen.lock().unwrap().push(broadcast.0);
            }
            Ok(())
        }
    }

    let stats = message_pool_stats::<Broadcast>();
    let base_allocs = stats.allocations();
    let base_deallocs = stats.deallocations();

    let system = ActorSystem::new("messaging", 4);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let actors: Vec<_> = (0..4)
        .map(|i| {
            let actor = system.create_actor(
                format!("collector-{i}"),
                Collector { seen: seen.clone() },
            );
            actor.receive(Msg::new(GoStartActor));
            actor
        })
        .collect();

    let message = Msg::new(Broadcast(99)).erase();
    for actor in &actors {
        actor.receive(message.clone());
    }
    drop(message);

    assert!(wait_until(|| seen.lock().unwrap().len() == 4, DEFAULT_WAIT));
    assert!(wait_until(
        || stats.deallocations() == base_deallocs + 1,
        DEFAULT_WAIT
    ));
    assert_eq!(stats.allocations(), base_allocs + 1);
    assert!(wait_for_quiescence(&system));
}
