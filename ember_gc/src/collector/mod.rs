//! The collector and its three tables.
//!
//! Reclamation itself lives in the submodules: [`rc`] for the
//! reference-counting pass, [`mark_sweep`] for the conservative tracer.
//! This module owns everything both share: tracked allocation, root and
//! nested-reference bookkeeping, and the destruction path that returns a
//! block to the heap and scrubs it from every table.

mod mark_sweep;
mod rc;

use crate::error::GcError;
use crate::stats::GcStats;

use ember_heap::{BlockHeader, Heap, HeapError, HEADER_SIZE, WORD_SIZE};
use rustc_hash::FxHashMap;

use std::ptr::NonNull;

/// The dual garbage collector.
///
/// Tracks every allocation it hands out in three tables:
///
/// - **allocations**: user-visible address → header address. Membership
///   is the definition of "live"; the mark phase also uses it to decide
///   whether a scanned word is a pointer.
/// - **roots**: a multiset (address → multiplicity) simulating stack and
///   global references. Seeded with one entry per allocation.
/// - **reference counts**: address → explicit non-negative count,
///   incremented on allocation, root addition, and nested-reference
///   installation; decremented (clamped at zero) on root deletion.
///
/// All methods borrow the [`Heap`] per call; the caller must pass the same
/// heap the blocks came from.
pub struct GarbageCollector {
    /// Live allocations: user address → header address.
    allocations: FxHashMap<usize, *mut BlockHeader>,
    /// Root multiset: address → number of outstanding root references.
    roots: FxHashMap<usize, usize>,
    /// Explicit reference counts: address → count.
    ref_counts: FxHashMap<usize, usize>,
    stats: GcStats,
}

impl GarbageCollector {
    /// Create a collector with empty tables.
    pub fn new() -> Self {
        Self {
            allocations: FxHashMap::default(),
            roots: FxHashMap::default(),
            ref_counts: FxHashMap::default(),
            stats: GcStats::new(),
        }
    }

    /// Allocate `size` payload bytes and track the block.
    ///
    /// On success the block enters the allocations table, its reference
    /// count is seeded to one, and one root entry is added. On allocator
    /// failure, returns `None` and mutates no collector state.
    pub fn alloc(&mut self, heap: &mut Heap, size: usize) -> Option<NonNull<u8>> {
        let ptr = heap.alloc(size)?;
        let header = unsafe { ptr.as_ptr().sub(HEADER_SIZE) } as *mut BlockHeader;
        self.allocations.insert(ptr.as_ptr() as usize, header);
        self.add_root(ptr);
        self.stats.record_allocation(size);
        Some(ptr)
    }

    /// Add one root reference to `ptr` and increment its count.
    ///
    /// Membership in the allocations table is not validated; the caller
    /// contract is that only addresses previously returned by
    /// [`GarbageCollector::alloc`] are passed.
    pub fn add_root(&mut self, ptr: NonNull<u8>) {
        let addr = ptr.as_ptr() as usize;
        *self.roots.entry(addr).or_insert(0) += 1;
        *self.ref_counts.entry(addr).or_insert(0) += 1;
    }

    /// Remove one root reference from `ptr` and decrement its count,
    /// clamping at zero.
    ///
    /// A silent no-op when `ptr` holds no root reference.
    pub fn delete_root(&mut self, ptr: NonNull<u8>) {
        let addr = ptr.as_ptr() as usize;
        match self.roots.get_mut(&addr) {
            Some(multiplicity) => {
                *multiplicity -= 1;
                if *multiplicity == 0 {
                    self.roots.remove(&addr);
                }
            }
            None => return,
        }
        if let Some(count) = self.ref_counts.get_mut(&addr) {
            *count = count.saturating_sub(1);
        }
    }

    /// Install a nested reference: write `dest`'s address into the first
    /// payload word of `src` and increment `dest`'s count.
    ///
    /// Does not touch the root multiset; a nested reference is exactly
    /// what lets cycles form. One outgoing slot per block: the mark phase
    /// would discover a pointer anywhere in the payload, but the explicit
    /// count relies on this increment.
    pub fn add_nested(&mut self, src: NonNull<u8>, dest: NonNull<u8>) -> Result<(), GcError> {
        let header = *self
            .allocations
            .get(&(src.as_ptr() as usize))
            .ok_or(GcError::UntrackedAddress)?;
        let size = unsafe { BlockHeader::read(header) }.size;
        if size < WORD_SIZE {
            return Err(GcError::NestedTooSmall { size });
        }
        unsafe {
            src.as_ptr()
                .cast::<usize>()
                .write_unaligned(dest.as_ptr() as usize);
        }
        *self.ref_counts.entry(dest.as_ptr() as usize).or_insert(0) += 1;
        Ok(())
    }

    /// Tear down: clear every table and wipe the heap back to its initial
    /// free state.
    pub fn reset(&mut self, heap: &mut Heap) -> Result<(), HeapError> {
        self.allocations.clear();
        self.roots.clear();
        self.ref_counts.clear();
        heap.reset()
    }

    /// Number of live tracked allocations.
    #[inline]
    pub fn live_count(&self) -> usize {
        self.allocations.len()
    }

    /// Whether `ptr` is a live tracked allocation.
    #[inline]
    pub fn is_tracked(&self, ptr: NonNull<u8>) -> bool {
        self.allocations.contains_key(&(ptr.as_ptr() as usize))
    }

    /// The explicit reference count of `ptr`, if tracked in the counts
    /// table.
    #[inline]
    pub fn ref_count(&self, ptr: NonNull<u8>) -> Option<usize> {
        self.ref_counts.get(&(ptr.as_ptr() as usize)).copied()
    }

    /// How many root references `ptr` currently holds.
    #[inline]
    pub fn root_multiplicity(&self, ptr: NonNull<u8>) -> usize {
        self.roots
            .get(&(ptr.as_ptr() as usize))
            .copied()
            .unwrap_or(0)
    }

    /// Collection statistics.
    #[inline]
    pub fn stats(&self) -> &GcStats {
        &self.stats
    }

    /// Destroy the tracked block at `addr`: free it on the heap and remove
    /// it from all three tables.
    ///
    /// Returns the reclaimed user-visible pointer, or `None` when `addr`
    /// is not in the allocations table (nothing is touched in that case).
    fn destroy(&mut self, heap: &mut Heap, addr: usize) -> Option<NonNull<u8>> {
        let header = self.allocations.remove(&addr)?;
        self.roots.remove(&addr);
        self.ref_counts.remove(&addr);

        let size = unsafe { BlockHeader::read(header) }.size;
        // Re-derive the user pointer from the header pointer so the free
        // path works on a pointer with provenance over the region.
        let user = unsafe { NonNull::new_unchecked((header as *mut u8).add(HEADER_SIZE)) };
        unsafe { heap.free(user) };
        self.stats.record_reclaim(size);
        Some(user)
    }
}

impl Default for GarbageCollector {
    fn default() -> Self {
        Self::new()
    }
}
