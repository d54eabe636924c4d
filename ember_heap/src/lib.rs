//! Ember Heap
//!
//! A fixed-size heap carved out of a single anonymous OS mapping, managed
//! through an embedded, address-ordered free list. This is the allocator
//! half of the Ember memory-management sandbox; the collectors in
//! `ember_gc` layer on top of it.
//!
//! # Architecture
//!
//! The heap owns one contiguous region of `REGION_SIZE` bytes plus one
//! trailing node header for the sentinel. All metadata is in-band:
//!
//! ```text
//! ┌──────────┬─────────────┬──────────┬──────────────┬──────────┐
//! │ FreeNode │   (free)    │ BlockHdr │   payload    │ sentinel │
//! │ size,next│             │ size,mark│  (size bytes)│ size = 0 │
//! └──────────┴─────────────┴──────────┴──────────────┴──────────┘
//! base                                            base + REGION_SIZE
//! ```
//!
//! - Free blocks start with a [`FreeNode`]; live blocks start with a
//!   [`BlockHeader`]. The two layouts are the same size, so freeing a block
//!   overlays a node on top of what used to be its header without moving
//!   any payload bytes.
//! - The free list is kept sorted by address and terminated by a zero-sized
//!   sentinel node placed just past the usable region.
//! - Allocation is first-fit with block splitting; freeing re-inserts in
//!   address order and coalesces with both neighbors.
//!
//! # Usage
//!
//! ```ignore
//! use ember_heap::Heap;
//!
//! let mut heap = Heap::new()?;
//! let p = heap.alloc(100).expect("out of memory");
//! unsafe { heap.free(p) };
//! assert_eq!(heap.available(), heap.region_size() - ember_heap::NODE_SIZE);
//! ```
//!
//! # Safety
//!
//! The heap hands out raw `NonNull<u8>` payload pointers. Callers must not
//! write outside `[p, p + size)` and must pass only pointers returned by
//! [`Heap::alloc`] (and not yet freed) back to [`Heap::free`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(unsafe_op_in_unsafe_fn)]

mod free_list;
mod layout;
mod region;

pub use free_list::{Heap, HeapError};
pub use layout::{BlockHeader, FreeNode, HEADER_SIZE, NODE_SIZE};
pub use region::Region;

/// Usable region size in bytes (excludes the sentinel's node header).
///
/// Compile-time constant; tests that need a differently sized heap use
/// [`Heap::with_size`].
pub const REGION_SIZE: usize = 4096;

/// Size of one machine word, the granularity of the collectors'
/// conservative payload scan.
pub const WORD_SIZE: usize = std::mem::size_of::<usize>();
