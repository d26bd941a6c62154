//! Block size bounds for the buddy allocator

use crate::{order_of, AllocError, AllocResult};

#[cfg(feature = "log")]
use log::error;

/// Minimum and maximum block sizes, both powers of two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuddyConfig {
    min_block: usize,
    max_block: usize,
}

impl BuddyConfig {
    /// Create a validated configuration.
    pub fn new(min_block: usize, max_block: usize) -> AllocResult<Self> {
        if !min_block.is_power_of_two() || !max_block.is_power_of_two() {
            error!(
                "config: block bounds must be powers of two: min={:#x}, max={:#x}",
                min_block, max_block
            );
            return Err(AllocError::InvalidParam);
        }
        if min_block > max_block {
            error!(
                "config: min block {:#x} exceeds max block {:#x}",
                min_block, max_block
            );
            return Err(AllocError::InvalidParam);
        }
        Ok(Self {
            min_block,
            max_block,
        })
    }

    /// Create a configuration from orders instead of sizes.
    pub fn from_orders(min_order: u32, max_order: u32) -> AllocResult<Self> {
        if min_order > max_order || max_order >= usize::BITS {
            return Err(AllocError::InvalidParam);
        }
        Self::new(1usize << min_order, 1usize << max_order)
    }

    pub const fn min_block(&self) -> usize {
        self.min_block
    }

    pub const fn max_block(&self) -> usize {
        self.max_block
    }

    pub const fn min_order(&self) -> u32 {
        order_of(self.min_block)
    }

    pub const fn max_order(&self) -> u32 {
        order_of(self.max_block)
    }

    /// Order of the block serving a `size`-byte request, clamped to `min_order`.
    ///
    /// Returns `None` if `size` is zero or larger than the max block.
    pub fn order_for(&self, size: usize) -> Option<u32> {
        if size == 0 || size > self.max_block {
            return None;
        }
        let order = order_of(size.next_power_of_two());
        Some(order.max(self.min_order()))
    }
}
