//! Statistics and debugging for buddy allocator
//!
//! Provides usage statistics gathered from the allocation tree and
//! failure reporting.

use crate::BuddyConfig;

use super::buddy_block::{BlockEntry, BlockState};

/// Number of distinct block orders a `usize` arena can hold
pub const MAX_TRACKED_ORDERS: usize = usize::BITS as usize;

/// Buddy system statistics
#[derive(Debug, Clone, Copy)]
pub struct BuddyStats {
    pub total_bytes: usize,
    pub used_bytes: usize,
    pub free_bytes: usize,
    /// Tree nodes currently marking a block as split
    pub split_nodes: usize,
    pub allocated_blocks: usize,
    pub allocated_blocks_by_order: [usize; MAX_TRACKED_ORDERS],
}

impl Default for BuddyStats {
    fn default() -> Self {
        Self::new()
    }
}

impl BuddyStats {
    pub const fn new() -> Self {
        Self {
            total_bytes: 0,
            used_bytes: 0,
            free_bytes: 0,
            split_nodes: 0,
            allocated_blocks: 0,
            allocated_blocks_by_order: [0; MAX_TRACKED_ORDERS],
        }
    }

    /// Account for one visited tree node
    pub fn record(&mut self, entry: &BlockEntry) {
        match entry.state {
            BlockState::Split => self.split_nodes += 1,
            BlockState::Allocated => {
                self.allocated_blocks += 1;
                self.allocated_blocks_by_order[entry.block.order as usize] += 1;
                self.used_bytes += entry.block.size();
            }
        }
    }

    /// Fill in the free byte count once every node has been recorded
    pub fn finish(&mut self, total_bytes: usize) {
        self.total_bytes = total_bytes;
        self.free_bytes = total_bytes.saturating_sub(self.used_bytes);
    }
}

/// Detailed memory statistics reporter
pub struct MemoryStatsReporter;

impl MemoryStatsReporter {
    /// Print detailed allocation failure statistics
    #[allow(unused_variables)]
    pub fn print_alloc_failure_stats(
        config: &BuddyConfig,
        stats: &BuddyStats,
        request_size: usize,
        request_order: u32,
    ) {
        #[cfg(feature = "log")]
        use log::error;
        error!("========================================");
        error!(
            "Request: {} bytes (order {}, block {} KB)",
            request_size,
            request_order,
            (1usize << request_order) / 1024
        );
        error!(
            "Block bounds: [{:#x}, {:#x}] (orders {}..={})",
            config.min_block(),
            config.max_block(),
            config.min_order(),
            config.max_order()
        );
        error!(
            "  Total: {} KB, used: {} KB, free: {} KB",
            stats.total_bytes / 1024,
            stats.used_bytes / 1024,
            stats.free_bytes / 1024
        );
        error!(
            "  Split nodes: {}, allocated blocks: {}",
            stats.split_nodes, stats.allocated_blocks
        );
        error!("  Allocated blocks by order:");
        for order in (0..MAX_TRACKED_ORDERS).rev() {
            let count = stats.allocated_blocks_by_order[order];
            if count > 0 {
                error!(
                    "    Order {}: {} blocks ({} KB each)",
                    order,
                    count,
                    (1usize << order) / 1024
                );
            }
        }
        error!("========================================");
    }
}
