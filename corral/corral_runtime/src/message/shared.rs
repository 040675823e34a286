//! Shared, reference-counted message handles backed by per-type pools.
//!
//! A message is allocated as one block: a [`Header`] carrying the atomic
//! reference count, the payload's type identifier, and drop glue, followed
//! by the payload itself. [`Msg`] is the typed strong handle, [`AnyMsg`] the
//! type-erased one; both are a single pointer wide and safe to send across
//! threads. Cloning bumps the count; dropping the last handle runs the
//! payload destructor exactly once and hands the block back to the payload
//! type's pool.
//!
//! Downcasting compares the dynamic type identifier with the static
//! identifier of the requested type; it never succeeds across distinct
//! types and only ever yields shared access.

use super::pool::{self, BlockPool, PoolStats};
use super::type_id::MessageTypeId;
use std::alloc::Layout;
use std::any::TypeId;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::ptr::NonNull;
use std::sync::atomic::{fence, AtomicUsize, Ordering};

/// Marker for types usable as message payloads.
///
/// Blanket-implemented: any `Send + Sync + 'static` type qualifies.
pub trait Payload: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Payload for T {}

/// Block header embedded ahead of every payload.
#[repr(C)]
struct Header {
    refs: AtomicUsize,
    type_id: MessageTypeId,
    drop_payload: unsafe fn(NonNull<Header>),
    pool: &'static BlockPool,
}

/// The full pooled block: header first, payload immediately after.
#[repr(C)]
struct Slot<M> {
    header: Header,
    payload: M,
}

/// Drop glue for a block holding an `M` payload.
///
/// Caller guarantees the pointer heads a live, uniquely referenced
/// `Slot<M>`; the block itself stays allocated.
unsafe fn drop_payload<M>(header: NonNull<Header>) {
    std::ptr::drop_in_place(header.cast::<Slot<M>>().as_ptr());
}

/// The pool servicing blocks of payload type `M`.
fn pool_for<M: Payload>() -> &'static BlockPool {
    pool::registered(TypeId::of::<M>(), || BlockPool::new(Layout::new::<Slot<M>>()))
}

/// Allocation statistics of the pool servicing payload type `M`.
pub fn message_pool_stats<M: Payload>() -> &'static PoolStats {
    pool_for::<M>().stats()
}

/// Return the free blocks of payload type `M`'s pool to the system.
pub fn release_message_pool<M: Payload>() {
    pool_for::<M>().release();
}

/// Decrement a block's reference count and destroy it on the last release.
///
/// Caller guarantees the pointer heads a live block and that the calling
/// handle owns one count.
unsafe fn release(header: NonNull<Header>) {
    let h = header.as_ref();
    if h.refs.fetch_sub(1, Ordering::Release) != 1 {
        return;
    }
    // Publish every prior access before running the destructor.
    fence(Ordering::Acquire);
    let pool = h.pool;
    let drop_fn = h.drop_payload;
    let layout = pool.block_layout();
    drop_fn(header);
    pool.deallocate(header.cast::<u8>(), layout);
}

/// A typed strong handle to a pooled message payload.
///
/// Clones share the same payload; the payload is destroyed when the last
/// handle (typed or erased) drops. `Msg` dereferences to the payload.
pub struct Msg<M: Payload> {
    slot: NonNull<Slot<M>>,
    _marker: PhantomData<Slot<M>>,
}

// Handles only expose shared access to a Send + Sync payload.
unsafe impl<M: Payload> Send for Msg<M> {}
unsafe impl<M: Payload> Sync for Msg<M> {}

impl<M: Payload> Msg<M> {
    /// Allocate `payload` from its type's pool behind a fresh handle.
    pub fn new(payload: M) -> Self {
        let pool = pool_for::<M>();
        let layout = Layout::new::<Slot<M>>();
        let slot = pool.allocate(layout).cast::<Slot<M>>();
        unsafe {
            slot.as_ptr().write(Slot {
                header: Header {
                    refs: AtomicUsize::new(1),
                    type_id: MessageTypeId::of::<M>(),
                    drop_payload: drop_payload::<M>,
                    pool,
                },
                payload,
            });
        }
        Self {
            slot,
            _marker: PhantomData,
        }
    }

    /// The number of live handles to this payload.
    pub fn ref_count(&self) -> usize {
        self.header().refs.load(Ordering::Acquire)
    }

    /// Exclusive access to the payload while this is the only handle.
    pub fn get_mut(&mut self) -> Option<&mut M> {
        if self.ref_count() == 1 {
            Some(unsafe { &mut self.slot.as_mut().payload })
        } else {
            None
        }
    }

    /// Erase the payload type, keeping the same reference count.
    pub fn erase(self) -> AnyMsg {
        self.into()
    }

    fn header(&self) -> &Header {
        unsafe { &self.slot.as_ref().header }
    }
}

impl<M: Payload> Deref for Msg<M> {
    type Target = M;

    fn deref(&self) -> &M {
        unsafe { &self.slot.as_ref().payload }
    }
}

impl<M: Payload> Clone for Msg<M> {
    fn clone(&self) -> Self {
        self.header().refs.fetch_add(1, Ordering::Relaxed);
        Self {
            slot: self.slot,
            _marker: PhantomData,
        }
    }
}

impl<M: Payload> Drop for Msg<M> {
    fn drop(&mut self) {
        unsafe { release(self.slot.cast::<Header>()) };
    }
}

impl<M: Payload + fmt::Debug> fmt::Debug for Msg<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Msg").field(&**self).finish()
    }
}

/// A type-erased strong handle to a pooled message payload.
///
/// Carries the payload's dynamic [`MessageTypeId`]; [`AnyMsg::cast`] and
/// [`AnyMsg::downcast_ref`] recover the concrete type when the identifiers
/// match.
pub struct AnyMsg {
    header: NonNull<Header>,
}

// Only `Send + Sync` payloads can enter a handle (see `Payload`).
unsafe impl Send for AnyMsg {}
unsafe impl Sync for AnyMsg {}

impl AnyMsg {
    /// The payload's dynamic type identifier.
    pub fn type_id(&self) -> MessageTypeId {
        self.header().type_id
    }

    /// Whether the payload is of type `M`.
    pub fn is<M: Payload>(&self) -> bool {
        self.type_id() == MessageTypeId::of::<M>()
    }

    /// Borrow the payload as `M` when the type identifiers match.
    pub fn downcast_ref<M: Payload>(&self) -> Option<&M> {
        if self.is::<M>() {
            let slot = self.header.cast::<Slot<M>>();
            Some(unsafe { &slot.as_ref().payload })
        } else {
            None
        }
    }

    /// Recover a typed handle when the type identifiers match.
    ///
    /// The returned handle holds its own reference count.
    pub fn cast<M: Payload>(&self) -> Option<Msg<M>> {
        if !self.is::<M>() {
            return None;
        }
        self.header().refs.fetch_add(1, Ordering::Relaxed);
        Some(Msg {
            slot: self.header.cast::<Slot<M>>(),
            _marker: PhantomData,
        })
    }

    /// The number of live handles to this payload.
    pub fn ref_count(&self) -> usize {
        self.header().refs.load(Ordering::Acquire)
    }

    fn header(&self) -> &Header {
        unsafe { self.header.as_ref() }
    }
}

impl<M: Payload> From<Msg<M>> for AnyMsg {
    fn from(msg: Msg<M>) -> Self {
        // `Slot` is `repr(C)` with the header first, so the pointers agree.
        let header = msg.slot.cast::<Header>();
        std::mem::forget(msg);
        Self { header }
    }
}

impl Clone for AnyMsg {
    fn clone(&self) -> Self {
        self.header().refs.fetch_add(1, Ordering::Relaxed);
        Self {
            header: self.header,
        }
    }
}

impl Drop for AnyMsg {
    fn drop(&mut self) {
        unsafe { release(self.header) };
    }
}

impl fmt::Debug for AnyMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyMsg")
            .field("type_id", &self.type_id())
            .field("ref_count", &self.ref_count())
            .finish()
    }
}
