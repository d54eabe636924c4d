//! Collection statistics.
//!
//! Counters for allocation and reclamation activity, kept out of the hot
//! paths' way and rendered on demand for the driver's `stats` command.

use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics about allocator and collector activity.
#[derive(Debug)]
pub struct GcStats {
    /// Total tracked allocations since start.
    pub objects_allocated: AtomicU64,
    /// Total payload bytes handed out since start.
    pub bytes_allocated: AtomicU64,
    /// Total blocks reclaimed by either collector.
    pub objects_reclaimed: AtomicU64,
    /// Total payload bytes reclaimed by either collector.
    pub bytes_reclaimed: AtomicU64,
    /// Reference-counting passes run.
    pub rc_collections: AtomicU64,
    /// Mark-and-sweep passes run.
    pub ms_collections: AtomicU64,
}

impl GcStats {
    /// Create new empty statistics.
    pub const fn new() -> Self {
        Self {
            objects_allocated: AtomicU64::new(0),
            bytes_allocated: AtomicU64::new(0),
            objects_reclaimed: AtomicU64::new(0),
            bytes_reclaimed: AtomicU64::new(0),
            rc_collections: AtomicU64::new(0),
            ms_collections: AtomicU64::new(0),
        }
    }

    /// Record a tracked allocation.
    #[inline]
    pub fn record_allocation(&self, size: usize) {
        self.objects_allocated.fetch_add(1, Ordering::Relaxed);
        self.bytes_allocated.fetch_add(size as u64, Ordering::Relaxed);
    }

    /// Record one reclaimed block.
    #[inline]
    pub fn record_reclaim(&self, size: usize) {
        self.objects_reclaimed.fetch_add(1, Ordering::Relaxed);
        self.bytes_reclaimed.fetch_add(size as u64, Ordering::Relaxed);
    }

    /// Record a reference-counting pass.
    #[inline]
    pub fn record_rc_collection(&self) {
        self.rc_collections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a mark-and-sweep pass.
    #[inline]
    pub fn record_ms_collection(&self) {
        self.ms_collections.fetch_add(1, Ordering::Relaxed);
    }

    /// Blocks currently believed live (allocated minus reclaimed).
    pub fn live_objects(&self) -> u64 {
        self.objects_allocated
            .load(Ordering::Relaxed)
            .saturating_sub(self.objects_reclaimed.load(Ordering::Relaxed))
    }

    /// Render a multi-line summary.
    pub fn render(&self) -> String {
        format!(
            "Allocated:  {} objects, {} bytes\n\
             Reclaimed:  {} objects, {} bytes\n\
             Live:       {} objects\n\
             Collections: {} rc, {} ms\n",
            self.objects_allocated.load(Ordering::Relaxed),
            self.bytes_allocated.load(Ordering::Relaxed),
            self.objects_reclaimed.load(Ordering::Relaxed),
            self.bytes_reclaimed.load(Ordering::Relaxed),
            self.live_objects(),
            self.rc_collections.load(Ordering::Relaxed),
            self.ms_collections.load(Ordering::Relaxed),
        )
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.objects_allocated.store(0, Ordering::Relaxed);
        self.bytes_allocated.store(0, Ordering::Relaxed);
        self.objects_reclaimed.store(0, Ordering::Relaxed);
        self.bytes_reclaimed.store(0, Ordering::Relaxed);
        self.rc_collections.store(0, Ordering::Relaxed);
        self.ms_collections.store(0, Ordering::Relaxed);
    }
}

impl Default for GcStats {
    fn default() -> Self {
        Self::new()
    }
}
