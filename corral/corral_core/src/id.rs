//! Strongly-typed identifiers for the corral runtime.
//!
//! This module provides a generic identifier type that is specialized for
//! different entity kinds using a phantom type parameter. Identifiers are
//! opaque integers, unique within one process run: each marker type owns a
//! monotonically increasing counter, and equality is the only meaningful
//! operation between two identifiers.
//!
//! The value `0` is reserved as the "unassigned" sentinel and is never
//! produced by the generator.
//!
//! # Examples
//!
//! ```
//! use corral_core::id::ActorId;
//!
//! let a = ActorId::next();
//! let b = ActorId::next();
//! assert_ne!(a, b);
//! assert!(!a.is_unassigned());
//! assert!(ActorId::UNASSIGNED.is_unassigned());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

/// A marker type with a dedicated identifier counter.
///
/// Each marker owns one process-wide atomic counter, so identifiers drawn
/// for different entity kinds advance independently.
pub trait IdSpace {
    /// The counter backing `Id::<Self>::next()`. Starts at 1; 0 is reserved.
    fn counter() -> &'static AtomicU64;
}

/// A type-safe, process-local identifier.
///
/// `Id<T>` wraps a `u64` with a phantom marker so identifiers of different
/// entity kinds cannot be mixed up. Values are drawn monotonically from the
/// marker's counter; they are meaningful only within the process run that
/// produced them.
#[derive(Serialize, Deserialize)]
pub struct Id<T> {
    value: u64,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T> Id<T> {
    /// The reserved "unassigned" identifier.
    pub const UNASSIGNED: Self = Self {
        value: 0,
        _marker: PhantomData,
    };

    /// Check whether this is the reserved unassigned identifier.
    pub fn is_unassigned(&self) -> bool {
        self.value == 0
    }

    /// Get the raw integer value.
    pub fn value(&self) -> u64 {
        self.value
    }
}

impl<T: IdSpace> Id<T> {
    /// Draw the next identifier from this marker's counter.
    ///
    /// Identifiers are pairwise distinct for the lifetime of the process.
    pub fn next() -> Self {
        Self {
            value: T::counter().fetch_add(1, Ordering::Relaxed),
            _marker: PhantomData,
        }
    }
}

// Manual impls: derived ones would bound on `T`, which is only a marker.
impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Id<T> {}

impl<T> std::hash::Hash for Id<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.value)
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Marker type for actors.
pub struct ActorMarker;

impl IdSpace for ActorMarker {
    fn counter() -> &'static AtomicU64 {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        &COUNTER
    }
}

/// Identifier for an actor.
pub type ActorId = Id<ActorMarker>;
