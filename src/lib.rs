//! Buddy Tree Allocator
//!
//! This crate implements a buddy memory allocator over one fixed-size arena,
//! featuring:
//! - A lazily built binary tree of power-of-two blocks
//! - Left-first, depth-first block search with on-demand splitting
//! - Bottom-up coalescing of freed buddies
//! - Index-based node pool (no per-node heap allocation)
//! - Optional statistics and failure reports (`tracking` feature)

#![no_std]

extern crate alloc;

use core::alloc::Layout;
use core::fmt;
use core::ptr::NonNull;

// Logging support - conditionally import log crate
#[cfg(feature = "log")]
extern crate log;

// Stub macros when log is disabled - these become no-ops
#[cfg(not(feature = "log"))]
macro_rules! error {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
macro_rules! warn {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
macro_rules! info {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
macro_rules! debug {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

/// The error type used for allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// Invalid `size` or configuration. (e.g. not a power of two)
    InvalidParam,
    /// No free block large enough for the request.
    NoMemory,
    /// Pointer lies outside the managed arena.
    InvalidPointer,
    /// Deallocate a pointer that is not the start of an allocated block.
    NotAllocated,
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            AllocError::InvalidParam => "invalid parameter",
            AllocError::NoMemory => "no free block large enough",
            AllocError::InvalidPointer => "pointer outside of managed memory",
            AllocError::NotAllocated => "pointer is not an allocated block",
        };
        f.write_str(msg)
    }
}

/// A [`Result`] type with [`AllocError`] as the error type.
pub type AllocResult<T = ()> = Result<T, AllocError>;

/// Byte-granularity allocator.
pub trait ByteAllocator {
    /// Allocate memory with the given size (in bytes) and alignment.
    fn alloc(&mut self, layout: Layout) -> AllocResult<NonNull<u8>>;

    /// Deallocate memory at the given position, size, and alignment.
    fn dealloc(&mut self, pos: NonNull<u8>, layout: Layout);

    /// Returns total memory size in bytes.
    fn total_bytes(&self) -> usize;

    /// Returns allocated memory size in bytes.
    fn used_bytes(&self) -> usize;

    /// Returns available memory size in bytes.
    fn available_bytes(&self) -> usize;
}

/// Checks whether the address has the demanded alignment.
///
/// Equivalent to `addr % align == 0`, but the alignment must be a power of two.
#[inline]
pub const fn is_aligned(base_addr: usize, align: usize) -> bool {
    base_addr & (align - 1) == 0
}

/// Order of `v`, i.e. `floor(log2(v))`. `v` must be non-zero.
#[inline]
pub const fn order_of(v: usize) -> u32 {
    usize::BITS - 1 - v.leading_zeros()
}

pub mod arena;
pub use arena::Arena;

pub mod config;
pub use config::BuddyConfig;

pub mod buddy;
#[cfg(feature = "tracking")]
pub use buddy::BuddyStats;
pub use buddy::{BlockEntry, BlockState, BuddyAllocator, BuddyBlock, NodePoolStats};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_of() {
        assert_eq!(order_of(1), 0);
        assert_eq!(order_of(2), 1);
        assert_eq!(order_of(3), 1);
        assert_eq!(order_of(1 << 16), 16);
        assert_eq!(order_of((1 << 20) - 1), 19);
    }

    #[test]
    fn test_is_aligned() {
        assert!(is_aligned(0x10000, 0x10000));
        assert!(!is_aligned(0x10800, 0x1000));
        assert!(is_aligned(0x10800, 0x800));
    }
}
