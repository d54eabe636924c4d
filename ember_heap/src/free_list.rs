//! The fixed-size heap and its embedded free list.
//!
//! Allocation is first-fit over an address-ordered singly-linked list whose
//! nodes live inside the region. A found block is split: the prefix becomes
//! the allocation (header + payload), the suffix becomes a new free node.
//! When the remainder could not hold a node header, the whole block is
//! handed to the allocation instead and its header records the full
//! capacity, so freeing restores the exact footprint.
//!
//! Freeing overlays a node on the block header, re-inserts it in address
//! order, and coalesces with both neighbors. Keeping the list sorted makes
//! coalescing a local check against `prev` and `next`; the sentinel is
//! never merged.

use crate::layout::{BlockHeader, FreeNode, HEADER_SIZE, NODE_SIZE};
use crate::region::Region;
use crate::REGION_SIZE;

use std::fmt::Write as _;
use std::ptr::{self, NonNull};

/// Errors surfaced by heap construction and reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapError {
    /// The OS refused the anonymous mapping. The heap cannot function
    /// without its region.
    RegionMapFailed {
        /// Requested mapping length in bytes.
        size: usize,
    },
    /// The requested region cannot hold even the initial free node.
    RegionTooSmall {
        /// Requested usable size in bytes.
        size: usize,
    },
}

impl std::fmt::Display for HeapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HeapError::RegionMapFailed { size } => {
                write!(f, "failed to map {} bytes of anonymous memory", size)
            }
            HeapError::RegionTooSmall { size } => {
                write!(
                    f,
                    "region of {} bytes cannot hold a {}-byte free node",
                    size, NODE_SIZE
                )
            }
        }
    }
}

impl std::error::Error for HeapError {}

/// A fixed-size heap over one anonymous mapping.
///
/// The usable region is `[base, base + size)`; the sentinel's node header
/// sits just past it at `base + size`. See the crate docs for the layout.
pub struct Heap {
    region: Region,
    /// First free node, or the sentinel when the list is empty.
    head: *mut FreeNode,
    /// Sentinel node at `base + size`: `size = 0`, `next = null`.
    tail: *mut FreeNode,
    /// Usable region size in bytes.
    size: usize,
}

impl Heap {
    /// Create a heap over a fresh region of [`REGION_SIZE`] bytes.
    pub fn new() -> Result<Self, HeapError> {
        Self::with_size(REGION_SIZE)
    }

    /// Create a heap over a fresh region of `size` usable bytes.
    ///
    /// The mapping is `size` plus one node header for the sentinel.
    pub fn with_size(size: usize) -> Result<Self, HeapError> {
        if size < NODE_SIZE {
            return Err(HeapError::RegionTooSmall { size });
        }
        let region =
            Region::map(size + NODE_SIZE).ok_or(HeapError::RegionMapFailed { size: size + NODE_SIZE })?;
        let mut heap = Self {
            region,
            head: ptr::null_mut(),
            tail: ptr::null_mut(),
            size,
        };
        heap.init_free_list();
        Ok(heap)
    }

    /// Write the initial free node and the sentinel into the region.
    fn init_free_list(&mut self) {
        let base = self.region.base().as_ptr();
        let head = base as *mut FreeNode;
        let tail = unsafe { base.add(self.size) } as *mut FreeNode;
        unsafe {
            FreeNode::write(
                tail,
                FreeNode {
                    size: 0,
                    next: ptr::null_mut(),
                },
            );
            FreeNode::write(
                head,
                FreeNode {
                    size: self.size - NODE_SIZE,
                    next: tail,
                },
            );
        }
        self.head = head;
        self.tail = tail;
    }

    /// Unmap the region and reinitialize the heap over a fresh mapping.
    ///
    /// Every previously returned pointer is invalidated. The fresh mapping
    /// is zero-filled, which keeps conservative scans of recycled memory
    /// deterministic.
    pub fn reset(&mut self) -> Result<(), HeapError> {
        let len = self.region.len();
        self.region = Region::map(len).ok_or(HeapError::RegionMapFailed { size: len })?;
        self.init_free_list();
        Ok(())
    }

    /// Allocate `size` payload bytes.
    ///
    /// First-fit: the first free block with capacity for `size` is carved.
    /// Returns `None` when no block fits; the free list is unchanged in
    /// that case. The payload is zeroed.
    pub fn alloc(&mut self, size: usize) -> Option<NonNull<u8>> {
        let (prev, found) = self.find_fit(size)?;
        let ptr = unsafe { self.carve(prev, found, size) };
        #[cfg(debug_assertions)]
        self.verify();
        Some(ptr)
    }

    /// Return a block to the free list.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by [`Heap::alloc`] on this heap since
    /// the last [`Heap::reset`], and must not already have been freed.
    pub unsafe fn free(&mut self, ptr: NonNull<u8>) {
        let header = unsafe { ptr.as_ptr().sub(HEADER_SIZE) } as *mut BlockHeader;
        let block = unsafe { BlockHeader::read(header) };
        let node = header as *mut FreeNode;
        unsafe {
            FreeNode::write(
                node,
                FreeNode {
                    size: block.size,
                    next: ptr::null_mut(),
                },
            );
            self.coalesce(node);
        }
        #[cfg(debug_assertions)]
        self.verify();
    }

    /// Total free payload capacity: the sum of every free node's `size`.
    pub fn available(&self) -> usize {
        let mut total = 0;
        let mut curr = self.head;
        while curr != self.tail {
            let node = unsafe { FreeNode::read(curr) };
            total += node.size;
            curr = node.next;
        }
        total
    }

    /// Number of nodes on the free list (sentinel excluded).
    pub fn free_block_count(&self) -> usize {
        let mut count = 0;
        let mut curr = self.head;
        while curr != self.tail {
            count += 1;
            curr = unsafe { FreeNode::read(curr) }.next;
        }
        count
    }

    /// Render the free list as `Free(s1)->Free(s2)->...Free(sn)->` plus a
    /// trailing newline. The sentinel is not printed. This exact format is
    /// a tested contract.
    pub fn format_free_list(&self) -> String {
        let mut out = String::new();
        let mut curr = self.head;
        while curr != self.tail {
            let node = unsafe { FreeNode::read(curr) };
            let _ = write!(out, "Free({})->", node.size);
            curr = node.next;
        }
        out.push('\n');
        out
    }

    /// Usable region size in bytes.
    #[inline]
    pub fn region_size(&self) -> usize {
        self.size
    }

    /// Whether `addr` falls inside the usable region.
    #[inline]
    pub fn contains(&self, addr: usize) -> bool {
        let base = self.region.base().as_ptr() as usize;
        addr >= base && addr < base + self.size
    }

    /// Walk the free list for the first node with capacity `size`.
    ///
    /// Returns `(prev, found)`; `prev` is null when `found` is the head.
    fn find_fit(&self, size: usize) -> Option<(*mut FreeNode, *mut FreeNode)> {
        let mut prev: *mut FreeNode = ptr::null_mut();
        let mut curr = self.head;
        while curr != self.tail {
            let node = unsafe { FreeNode::read(curr) };
            if node.size >= size {
                return Some((prev, curr));
            }
            prev = curr;
            curr = node.next;
        }
        None
    }

    /// Carve an allocation of `size` payload bytes out of `found`.
    ///
    /// # Safety
    ///
    /// `(prev, found)` must come from [`Heap::find_fit`] for this `size` on
    /// the current list state.
    unsafe fn carve(
        &mut self,
        prev: *mut FreeNode,
        found: *mut FreeNode,
        size: usize,
    ) -> NonNull<u8> {
        let node = unsafe { FreeNode::read(found) };

        let (replacement, payload_size) = if node.size - size >= NODE_SIZE {
            // Split: the suffix becomes a new node. Its capacity may be
            // zero; it still owns a node header.
            let rem = unsafe { (found as *mut u8).add(HEADER_SIZE + size) } as *mut FreeNode;
            unsafe {
                FreeNode::write(
                    rem,
                    FreeNode {
                        size: node.size - size - NODE_SIZE,
                        next: node.next,
                    },
                );
            }
            (rem, size)
        } else {
            // The remainder cannot hold a node header: the allocation takes
            // the whole block and the header records the full capacity.
            (node.next, node.size)
        };

        if prev.is_null() {
            self.head = replacement;
        } else {
            unsafe { FreeNode::set_next(prev, replacement) };
        }

        let header = found as *mut BlockHeader;
        let payload = unsafe { (found as *mut u8).add(HEADER_SIZE) };
        unsafe {
            BlockHeader::write(
                header,
                BlockHeader {
                    size: payload_size,
                    marked: false,
                },
            );
            ptr::write_bytes(payload, 0, payload_size);
            NonNull::new_unchecked(payload)
        }
    }

    /// Insert `node` in address order and merge it with adjacent neighbors.
    ///
    /// # Safety
    ///
    /// `node` must be a fully written free node inside the region, not yet
    /// on the list.
    unsafe fn coalesce(&mut self, node: *mut FreeNode) {
        let mut prev: *mut FreeNode = ptr::null_mut();
        let mut next = self.head;
        while (next as usize) < (node as usize) {
            prev = next;
            next = unsafe { FreeNode::read(next) }.next;
        }

        unsafe { FreeNode::set_next(node, next) };
        if prev.is_null() {
            self.head = node;
        } else {
            unsafe { FreeNode::set_next(prev, node) };
        }

        // Forward merge. The sentinel delimits the region and is never
        // merged, even when the freed block abuts it.
        let freed = unsafe { FreeNode::read(node) };
        if next != self.tail && (node as usize) + NODE_SIZE + freed.size == next as usize {
            let n = unsafe { FreeNode::read(next) };
            unsafe {
                FreeNode::write(
                    node,
                    FreeNode {
                        size: freed.size + NODE_SIZE + n.size,
                        next: n.next,
                    },
                );
            }
        }

        // Backward merge.
        if !prev.is_null() {
            let p = unsafe { FreeNode::read(prev) };
            if (prev as usize) + NODE_SIZE + p.size == node as usize {
                let n = unsafe { FreeNode::read(node) };
                unsafe {
                    FreeNode::write(
                        prev,
                        FreeNode {
                            size: p.size + NODE_SIZE + n.size,
                            next: n.next,
                        },
                    );
                }
            }
        }
    }

    /// Check free-list structure: strictly ascending addresses, in-bounds
    /// nodes, sentinel termination.
    #[cfg(debug_assertions)]
    fn verify(&self) {
        let base = self.region.base().as_ptr() as usize;
        let mut last = 0usize;
        let mut curr = self.head;
        while curr != self.tail {
            let addr = curr as usize;
            debug_assert!(addr >= base && addr < base + self.size, "node out of bounds");
            debug_assert!(addr > last, "free list not address-ordered");
            last = addr;
            curr = unsafe { FreeNode::read(curr) }.next;
        }
    }
}
