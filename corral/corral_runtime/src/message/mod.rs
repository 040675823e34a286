//! The message system: type identity, pooled allocation, shared handles,
//! and typed dispatch.
//!
//! Every concrete message type gets a process-local [`MessageTypeId`] and a
//! dedicated thread-safe block pool servicing allocations of exactly its
//! size. Message payloads are heap values owned by cheap, clonable strong
//! handles ([`Msg`] for a known payload type, [`AnyMsg`] type-erased); the
//! reference count is embedded in the pooled block, so a handle is a single
//! word wide. Dropping the last handle runs the payload destructor exactly
//! once and returns the block to its pool.
//!
//! [`MessageDispatcher`] maps type identifiers to type-erased handlers and
//! is the building block actors use to route their user messages.

pub mod dispatch;
pub mod pool;
pub mod shared;
pub mod type_id;

pub use dispatch::MessageDispatcher;
pub use pool::{release_all_message_pools, BlockPool, PoolStats};
pub use shared::{message_pool_stats, release_message_pool, AnyMsg, Msg, Payload};
pub use type_id::MessageTypeId;
