//! Per-type pooled allocation for message payloads.
//!
//! Each concrete message type is serviced by one process-wide [`BlockPool`]
//! holding free blocks of exactly that type's allocation layout. Freed
//! blocks are kept on a freelist and handed back to subsequent allocations
//! of the same type; [`BlockPool::release`] returns the free blocks to the
//! system. Requests whose layout does not match the pool's fall through to
//! the global allocator and are not counted.
//!
//! The per-pool [`PoolStats`] counters are advisory: they use relaxed
//! atomics and are not causally ordered with the allocations they count.

use log::debug;
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use std::alloc::{self, handle_alloc_error, Layout};
use std::any::TypeId;
use std::collections::HashMap;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Allocation statistics for one block pool.
///
/// Counters never decrease. Once no live message of the pool's type exists,
/// `allocations == deallocations` and the byte counters agree.
#[derive(Debug, Default)]
pub struct PoolStats {
    allocations: AtomicUsize,
    deallocations: AtomicUsize,
    bytes_allocated: AtomicUsize,
    bytes_deallocated: AtomicUsize,
}

impl PoolStats {
    /// Number of blocks handed out.
    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::Relaxed)
    }

    /// Number of blocks returned.
    pub fn deallocations(&self) -> usize {
        self.deallocations.load(Ordering::Relaxed)
    }

    /// Total bytes handed out.
    pub fn bytes_allocated(&self) -> usize {
        self.bytes_allocated.load(Ordering::Relaxed)
    }

    /// Total bytes returned.
    pub fn bytes_deallocated(&self) -> usize {
        self.bytes_deallocated.load(Ordering::Relaxed)
    }
}

/// A freed block parked on the freelist.
///
/// The pointer owns a block of the pool's layout with no live content.
struct FreeBlock(NonNull<u8>);

// Blocks hold no payload while parked; moving the pointer between threads
// is sound.
unsafe impl Send for FreeBlock {}

/// A thread-safe object pool for blocks of one fixed layout.
///
/// `allocate`/`deallocate` requests with the pool's layout are counted and
/// served from the freelist when possible; any other layout falls through
/// to the global allocator, uncounted.
pub struct BlockPool {
    layout: Layout,
    free: Mutex<Vec<FreeBlock>>,
    stats: PoolStats,
}

impl BlockPool {
    /// Create an empty pool servicing `layout`.
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            free: Mutex::new(Vec::new()),
            stats: PoolStats::default(),
        }
    }

    /// The fixed block layout this pool services.
    pub fn block_layout(&self) -> Layout {
        self.layout
    }

    /// The pool's allocation counters.
    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }

    /// Hand out a block for `layout`.
    ///
    /// Reuses a freed block when the layout matches the pool's; otherwise
    /// the request falls through to the global allocator.
    pub fn allocate(&self, layout: Layout) -> NonNull<u8> {
        if layout != self.layout {
            debug!(
                "pool layout mismatch ({:?} vs {:?}), falling through to the global allocator",
                layout, self.layout
            );
            return global_alloc(layout);
        }

        self.stats.allocations.fetch_add(1, Ordering::Relaxed);
        self.stats
            .bytes_allocated
            .fetch_add(layout.size(), Ordering::Relaxed);

        if let Some(block) = self.free.lock().pop() {
            return block.0;
        }
        global_alloc(layout)
    }

    /// Return a block previously handed out for `layout`.
    ///
    /// Matching blocks are parked on the freelist for reuse; mismatched
    /// layouts go straight back to the global allocator.
    pub fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout != self.layout {
            unsafe { alloc::dealloc(ptr.as_ptr(), layout) };
            return;
        }

        self.stats.deallocations.fetch_add(1, Ordering::Relaxed);
        self.stats
            .bytes_deallocated
            .fetch_add(layout.size(), Ordering::Relaxed);

        self.free.lock().push(FreeBlock(ptr));
    }

    /// Return every currently free block to the system.
    ///
    /// Live blocks are unaffected and the counters are not touched; freed
    /// blocks re-enter the freelist as usual afterwards.
    pub fn release(&self) {
        let blocks = std::mem::take(&mut *self.free.lock());
        for block in blocks {
            unsafe { alloc::dealloc(block.0.as_ptr(), self.layout) };
        }
    }
}

impl Drop for BlockPool {
    fn drop(&mut self) {
        self.release();
    }
}

fn global_alloc(layout: Layout) -> NonNull<u8> {
    // Message slots always contain a header, so the layout is never
    // zero-sized.
    let ptr = unsafe { alloc::alloc(layout) };
    match NonNull::new(ptr) {
        Some(ptr) => ptr,
        None => handle_alloc_error(layout),
    }
}

/// Process-wide registry of per-type pools, keyed by payload type.
static POOLS: Lazy<RwLock<HashMap<TypeId, &'static BlockPool>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Fetch (or lazily create) the pool registered under `key`.
///
/// Pools live for the rest of the process once created, matching the
/// static storage of the per-type statistics they carry.
pub(crate) fn registered(key: TypeId, make: impl FnOnce() -> BlockPool) -> &'static BlockPool {
    if let Some(pool) = POOLS.read().get(&key).copied() {
        return pool;
    }
    let mut pools = POOLS.write();
    *pools.entry(key).or_insert_with(|| Box::leak(Box::new(make())))
}

/// Release the free blocks of every per-type message pool.
pub fn release_all_message_pools() {
    for pool in POOLS.read().values() {
        pool.release();
    }
}
