//! Collector errors.

use ember_heap::WORD_SIZE;

/// Errors surfaced by collector operations.
///
/// Allocator exhaustion is not an error here: tracked allocation returns
/// `None` and mutates no collector state, per the collaborator contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcError {
    /// The source block's payload is smaller than one machine word, so it
    /// cannot hold a nested reference.
    NestedTooSmall {
        /// The source block's payload size in bytes.
        size: usize,
    },
    /// The address is not in the allocations table. Raised only where the
    /// collector must dereference the block (nested-reference
    /// installation); root operations deliberately do not validate.
    UntrackedAddress,
}

impl std::fmt::Display for GcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GcError::NestedTooSmall { size } => write!(
                f,
                "payload of {} bytes cannot hold a {}-byte nested reference",
                size, WORD_SIZE
            ),
            GcError::UntrackedAddress => write!(f, "address is not a tracked allocation"),
        }
    }
}

impl std::error::Error for GcError {}
