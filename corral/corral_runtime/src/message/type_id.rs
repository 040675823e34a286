//! Process-local message type identity.

use std::any::TypeId;

/// A stable, process-local identifier for a message type.
///
/// Two identifiers compare equal exactly when they were derived from the
/// same Rust type. Equality is the only defined operation; values are not
/// ordered and are meaningless outside the process run that produced them.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct MessageTypeId(TypeId);

impl MessageTypeId {
    /// The identifier of the message type `M`.
    pub fn of<M: 'static>() -> Self {
        Self(TypeId::of::<M>())
    }
}
