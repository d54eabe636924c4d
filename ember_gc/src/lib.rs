//! Ember Garbage Collector
//!
//! Two interchangeable reclaimers over the fixed-size heap in
//! [`ember_heap`], built to make their difference observable:
//!
//! - **Reference counting** ([`GarbageCollector::rc_collect`]): destroys
//!   every tracked block whose explicit count has dropped to zero. Cheap
//!   and incremental in spirit, but a cycle of blocks referencing each
//!   other keeps every count above zero forever; cycles are never
//!   reclaimed.
//!
//! - **Conservative mark-and-sweep** ([`GarbageCollector::ms_collect`]):
//!   traces from the root multiset through block payloads one machine word
//!   at a time, treating any word that equals a tracked address as a
//!   pointer, then destroys everything unmarked. Cycles fall out for free;
//!   the price is the occasional integer that happens to look like an
//!   address and retains a dead block for one extra cycle.
//!
//! The collector keeps three process-wide tables: live allocations
//! (user address → header address), the root multiset (simulated
//! stack/global references), and the explicit reference counts. The counts
//! are plain integers maintained here, deliberately not a library
//! smart-pointer, which would quietly fix the cycle leak this sandbox
//! exists to demonstrate.
//!
//! # Usage
//!
//! ```ignore
//! use ember_gc::GarbageCollector;
//! use ember_heap::Heap;
//!
//! let mut heap = Heap::new()?;
//! let mut gc = GarbageCollector::new();
//!
//! let a = gc.alloc(&mut heap, 64).expect("out of memory");
//! let b = gc.alloc(&mut heap, 64).expect("out of memory");
//! gc.add_nested(a, b)?;      // a's first payload word now points at b
//! gc.delete_root(b);
//! gc.rc_collect(&mut heap);  // b survives: a still references it
//! gc.delete_root(a);
//! gc.ms_collect(&mut heap);  // both reclaimed
//! ```
//!
//! The collector is single-mutator and synchronous: every operation
//! borrows the heap for the duration of the call and runs to completion.
//! Pass the same heap to every call; mixing heaps is a contract violation.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod collector;
mod error;
mod stats;

pub use collector::GarbageCollector;
pub use error::GcError;
pub use stats::GcStats;
