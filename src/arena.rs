//! Backing memory for the buddy allocator
//!
//! The arena is one contiguous, zero-initialized region obtained from the
//! global allocator. It is aligned to its own size, so a block of order `k`
//! at an offset that is a multiple of `2^k` is also aligned to `2^k` in
//! absolute terms.

use alloc::alloc::{alloc_zeroed, dealloc};
use core::alloc::Layout;
use core::ptr::NonNull;

use crate::{AllocError, AllocResult};

#[cfg(feature = "log")]
use log::error;

/// Fixed-size byte arena, exclusively owned and never resized.
pub struct Arena {
    ptr: NonNull<u8>,
    layout: Layout,
}

// The arena is plain memory owned by exactly one allocator instance.
unsafe impl Send for Arena {}

impl Arena {
    /// Allocate a new arena of `size` bytes.
    ///
    /// `size` must be a non-zero power of two.
    pub fn new(size: usize) -> AllocResult<Self> {
        if size == 0 || !size.is_power_of_two() {
            error!("arena: size {:#x} is not a power of two", size);
            return Err(AllocError::InvalidParam);
        }

        let layout = Layout::from_size_align(size, size).map_err(|_| AllocError::InvalidParam)?;
        let ptr = unsafe { alloc_zeroed(layout) };
        let ptr = NonNull::new(ptr).ok_or_else(|| {
            error!("arena: failed to reserve {:#x} bytes", size);
            AllocError::NoMemory
        })?;

        Ok(Self { ptr, layout })
    }

    /// First byte of the arena.
    #[inline]
    pub fn base(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// One past the last byte of the arena.
    #[inline]
    pub fn end(&self) -> *mut u8 {
        self.ptr.as_ptr().wrapping_add(self.layout.size())
    }

    /// Arena size in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.layout.size()
    }

    /// Check if an address belongs to this arena
    #[inline]
    pub fn contains(&self, addr: usize) -> bool {
        let base = self.base() as usize;
        addr >= base && addr < base + self.size()
    }

    /// Offset of `ptr` from the arena base, or `None` if out of range.
    #[inline]
    pub fn offset_of(&self, ptr: *const u8) -> Option<usize> {
        let addr = ptr as usize;
        if self.contains(addr) {
            Some(addr - self.base() as usize)
        } else {
            None
        }
    }

    /// Pointer to the byte at `offset`. `offset` must be inside the arena.
    #[inline]
    pub(crate) fn ptr_at(&self, offset: usize) -> NonNull<u8> {
        debug_assert!(offset < self.size());
        // SAFETY: offset is within the allocation, so the result is non-null.
        unsafe { NonNull::new_unchecked(self.ptr.as_ptr().add(offset)) }
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        unsafe { dealloc(self.ptr.as_ptr(), self.layout) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_bounds() {
        let arena = Arena::new(0x1000).unwrap();
        assert_eq!(arena.size(), 0x1000);
        assert_eq!(arena.end() as usize - arena.base() as usize, 0x1000);
        assert_eq!(arena.base() as usize % 0x1000, 0);
    }

    #[test]
    fn test_arena_offset_of() {
        let arena = Arena::new(0x1000).unwrap();
        let base = arena.base();
        assert_eq!(arena.offset_of(base), Some(0));
        assert_eq!(arena.offset_of(base.wrapping_add(0xfff)), Some(0xfff));
        assert_eq!(arena.offset_of(arena.end()), None);
        assert_eq!(arena.offset_of(base.wrapping_sub(1)), None);
    }

    #[test]
    fn test_arena_rejects_bad_size() {
        assert_eq!(Arena::new(0).err(), Some(AllocError::InvalidParam));
        assert_eq!(Arena::new(0x1800).err(), Some(AllocError::InvalidParam));
    }

    #[test]
    fn test_arena_zeroed() {
        let arena = Arena::new(0x100).unwrap();
        let bytes = unsafe { core::slice::from_raw_parts(arena.base(), arena.size()) };
        assert!(bytes.iter().all(|&b| b == 0));
    }
}
