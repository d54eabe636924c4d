//! In-band metadata layouts.
//!
//! Both records live inside the region itself: a [`FreeNode`] at the start
//! of every free block, a [`BlockHeader`] immediately before every live
//! payload. Freeing a block reinterprets its header bytes as a node, so the
//! two layouts must agree on size and keep `size` in the leading slot.
//!
//! Block addresses are not rounded up (a 100-byte allocation leaves its
//! successor 4-byte aligned), so neither layout may ever be accessed
//! through a reference. All access goes through the unaligned whole-struct
//! helpers below.

use std::ptr;

/// Node at the start of every free block.
///
/// `size` is the payload capacity the block would offer if allocated: the
/// block's total footprint minus one node header.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FreeNode {
    /// Payload capacity in bytes.
    pub size: usize,
    /// Next free node in address order, or the sentinel.
    pub next: *mut FreeNode,
}

/// Header immediately preceding every live payload.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct BlockHeader {
    /// Payload size in bytes, excluding this header.
    pub size: usize,
    /// Mark bit, meaningful only during a mark-and-sweep cycle.
    pub marked: bool,
}

/// Size of a free-list node header.
pub const NODE_SIZE: usize = std::mem::size_of::<FreeNode>();

/// Size of a live-block header.
pub const HEADER_SIZE: usize = std::mem::size_of::<BlockHeader>();

// The free path overlays a node on a header in place; the split path does
// the reverse. Footprint arithmetic is only correct if both occupy the
// same number of bytes.
const _: () = assert!(NODE_SIZE == HEADER_SIZE, "header layouts must match");

impl FreeNode {
    /// Read the node at `p`.
    ///
    /// # Safety
    ///
    /// `p` must point at a free-list node within a mapped region. No
    /// alignment requirement.
    #[inline]
    pub unsafe fn read(p: *const FreeNode) -> FreeNode {
        unsafe { p.read_unaligned() }
    }

    /// Overwrite the node at `p`.
    ///
    /// # Safety
    ///
    /// `p` must point at [`NODE_SIZE`] writable bytes within a mapped
    /// region. No alignment requirement.
    #[inline]
    pub unsafe fn write(p: *mut FreeNode, node: FreeNode) {
        unsafe { p.write_unaligned(node) }
    }

    /// Update only the `next` link of the node at `p`.
    ///
    /// # Safety
    ///
    /// Same contract as [`FreeNode::write`].
    #[inline]
    pub unsafe fn set_next(p: *mut FreeNode, next: *mut FreeNode) {
        unsafe { ptr::addr_of_mut!((*p).next).write_unaligned(next) }
    }
}

impl BlockHeader {
    /// Read the header at `p`.
    ///
    /// # Safety
    ///
    /// `p` must point at a live block header. No alignment requirement.
    #[inline]
    pub unsafe fn read(p: *const BlockHeader) -> BlockHeader {
        unsafe { p.read_unaligned() }
    }

    /// Overwrite the header at `p`.
    ///
    /// # Safety
    ///
    /// `p` must point at [`HEADER_SIZE`] writable bytes within a mapped
    /// region. No alignment requirement.
    #[inline]
    pub unsafe fn write(p: *mut BlockHeader, header: BlockHeader) {
        unsafe { p.write_unaligned(header) }
    }

    /// Update only the mark bit of the header at `p`.
    ///
    /// # Safety
    ///
    /// Same contract as [`BlockHeader::write`].
    #[inline]
    pub unsafe fn set_marked(p: *mut BlockHeader, marked: bool) {
        unsafe { ptr::addr_of_mut!((*p).marked).write_unaligned(marked) }
    }
}
