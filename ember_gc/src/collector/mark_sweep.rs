//! Conservative mark-and-sweep collection.
//!
//! # Algorithm
//!
//! 1. **Mark**: clear every header's mark bit, then trace from the root
//!    multiset. Tracing a block scans its payload one machine word at a
//!    time; any word whose bit pattern equals a tracked user address is
//!    treated as a pointer and its block joins the worklist.
//! 2. **Sweep**: destroy every unmarked block. If the allocations table is
//!    empty afterwards, the heap is reset to re-home the free list.
//!
//! The scan is conservative: it has no type information, does not realign,
//! and does not distinguish pointers from integers. An integer that
//! happens to equal a live address retains that block for one extra
//! cycle, the documented false positive of conservative collectors. Scanned
//! words are read as raw bytes and only ever *compared* against table
//! keys; blocks are reached through the header pointers the table already
//! holds, never by promoting a scanned word to a pointer.

use super::GarbageCollector;

use ember_heap::{BlockHeader, Heap, HEADER_SIZE, WORD_SIZE};

use std::collections::VecDeque;
use std::ptr::NonNull;

impl GarbageCollector {
    /// Run one full mark-and-sweep cycle. Returns the reclaimed
    /// user-visible addresses in destruction order.
    pub fn ms_collect(&mut self, heap: &mut Heap) -> Vec<NonNull<u8>> {
        self.stats.record_ms_collection();
        self.mark();
        self.sweep(heap)
    }

    /// Mark every block transitively reachable from the root multiset.
    fn mark(&self) {
        // Every block starts white.
        for &header in self.allocations.values() {
            unsafe { BlockHeader::set_marked(header, false) };
        }

        // Roots not present in the allocations table (foreign addresses
        // registered through the unvalidated root interface) are skipped.
        let mut worklist: VecDeque<usize> = VecDeque::new();
        for &root in self.roots.keys() {
            if let Some(&header) = self.allocations.get(&root) {
                if !unsafe { BlockHeader::read(header) }.marked {
                    unsafe { BlockHeader::set_marked(header, true) };
                    worklist.push_back(root);
                }
            }
        }

        while let Some(addr) = worklist.pop_front() {
            let header = self.allocations[&addr];
            let size = unsafe { BlockHeader::read(header) }.size;
            let payload = unsafe { (header as *const u8).add(HEADER_SIZE) };

            let mut offset = 0;
            while offset + WORD_SIZE <= size {
                let word = unsafe { payload.add(offset).cast::<usize>().read_unaligned() };
                if let Some(&target) = self.allocations.get(&word) {
                    if !unsafe { BlockHeader::read(target) }.marked {
                        unsafe { BlockHeader::set_marked(target, true) };
                        worklist.push_back(word);
                    }
                }
                offset += WORD_SIZE;
            }
        }
    }

    /// Destroy every unmarked block and return the reclaimed addresses.
    fn sweep(&mut self, heap: &mut Heap) -> Vec<NonNull<u8>> {
        let dead: Vec<usize> = self
            .allocations
            .iter()
            .filter(|&(_, &header)| !unsafe { BlockHeader::read(header) }.marked)
            .map(|(&addr, _)| addr)
            .collect();

        let mut reclaimed = Vec::with_capacity(dead.len());
        for addr in dead {
            if let Some(user) = self.destroy(heap, addr) {
                reclaimed.push(user);
            }
        }

        // Nothing tracked: re-home the free list on a fresh mapping.
        if self.allocations.is_empty() {
            heap.reset().expect("heap reset after full sweep failed");
        }
        reclaimed
    }
}
