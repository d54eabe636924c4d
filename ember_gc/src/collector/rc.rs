//! Reference-counted collection.

use super::GarbageCollector;

use ember_heap::Heap;
use smallvec::SmallVec;

use std::ptr::NonNull;

impl GarbageCollector {
    /// Destroy every tracked block whose reference count has dropped to
    /// zero. Returns the reclaimed user-visible addresses in destruction
    /// order.
    ///
    /// The pass is one sweep over the counts table; counts of blocks
    /// referenced *by* a destroyed block are not decremented, so a linear
    /// chain `A -> B -> C` whose only root (on `A`) was dropped loses `A`
    /// alone. That non-cascade, like the inability to reclaim cycles, is
    /// the observable difference from the tracing collector.
    pub fn rc_collect(&mut self, heap: &mut Heap) -> Vec<NonNull<u8>> {
        self.stats.record_rc_collection();

        // Gather first: destruction mutates the table being inspected.
        let dead: SmallVec<[usize; 16]> = self
            .ref_counts
            .iter()
            .filter(|&(_, &count)| count == 0)
            .map(|(&addr, _)| addr)
            .collect();

        let mut reclaimed = Vec::with_capacity(dead.len());
        for addr in dead {
            match self.destroy(heap, addr) {
                Some(user) => reclaimed.push(user),
                // A count entry with no tracked block can only come from
                // root operations on a foreign address; drop the stale
                // entry without touching the heap.
                None => {
                    self.ref_counts.remove(&addr);
                }
            }
        }
        reclaimed
    }
}
