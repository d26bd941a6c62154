//! Tree-based buddy allocator over a fixed arena
//!
//! Owns the arena and the allocation tree. Requests are rounded up to a
//! power of two (at least the minimum block) and served from the
//! lowest-addressed free block of that order; freed blocks coalesce with
//! their buddies back up the tree.

use alloc::vec::Vec;
use core::alloc::Layout;
use core::ptr::NonNull;

use crate::{order_of, AllocError, AllocResult, Arena, BuddyConfig, ByteAllocator};

#[cfg(feature = "log")]
use log::{debug, error, info, warn};

#[cfg(feature = "tracking")]
use super::stats::{BuddyStats, MemoryStatsReporter};

use super::{
    alloc_tree::AllocTree,
    buddy_block::{BlockEntry, BuddyBlock},
    node_pool::NodePoolStats,
};

/// Buddy allocator managing one arena of `total_size` bytes
///
/// The tree root covers the whole arena. A missing root means nothing is
/// allocated. All mutating calls take `&mut self`; sharing an instance across
/// threads requires external locking.
pub struct BuddyAllocator {
    config: BuddyConfig,
    arena: Arena,
    tree: AllocTree,
    used_bytes: usize,
}

impl BuddyAllocator {
    /// Create an allocator with a fresh arena of `total_size` bytes.
    ///
    /// `total_size` must be a power of two within
    /// `[config.min_block(), config.max_block()]`.
    pub fn new(config: BuddyConfig, total_size: usize) -> AllocResult<Self> {
        if total_size < config.min_block() || total_size > config.max_block() {
            error!(
                "buddy allocator: arena size {:#x} outside of [{:#x}, {:#x}]",
                total_size,
                config.min_block(),
                config.max_block()
            );
            return Err(AllocError::InvalidParam);
        }
        if !total_size.is_power_of_two() {
            error!(
                "buddy allocator: arena size {:#x} is not a power of two",
                total_size
            );
            return Err(AllocError::InvalidParam);
        }

        let arena = Arena::new(total_size)?;
        let tree = AllocTree::new(order_of(total_size), config.min_order());
        debug!(
            "buddy allocator: arena [{:p}, {:p}), orders {}..={}",
            arena.base(),
            arena.end(),
            config.min_order(),
            order_of(total_size)
        );

        Ok(Self {
            config,
            arena,
            tree,
            used_bytes: 0,
        })
    }

    /// Shorthand for [`BuddyConfig::new`] followed by [`BuddyAllocator::new`].
    pub fn with_bounds(min_block: usize, max_block: usize, total_size: usize) -> AllocResult<Self> {
        Self::new(BuddyConfig::new(min_block, max_block)?, total_size)
    }

    pub fn config(&self) -> &BuddyConfig {
        &self.config
    }

    pub fn total_size(&self) -> usize {
        self.arena.size()
    }

    /// Order of the block covered by the tree root
    pub fn root_order(&self) -> u32 {
        self.tree.root_block().order
    }

    pub fn base_pointer(&self) -> *mut u8 {
        self.arena.base()
    }

    pub fn end_pointer(&self) -> *mut u8 {
        self.arena.end()
    }

    /// Whether every block of the arena is free
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Number of live tree nodes (split and allocated)
    pub fn node_count(&self) -> usize {
        self.tree.node_count()
    }

    /// Get node pool statistics
    pub fn node_pool_stats(&self) -> NodePoolStats {
        self.tree.pool_stats()
    }

    /// Allocate a block of at least `size` bytes.
    pub fn allocate(&mut self, size: usize) -> AllocResult<NonNull<u8>> {
        self.allocate_labeled(size, "")
    }

    /// Allocate a block of at least `size` bytes; `label` only tags log output.
    #[allow(unused_variables)]
    pub fn allocate_labeled(&mut self, size: usize, label: &str) -> AllocResult<NonNull<u8>> {
        if size == 0 {
            warn!("allocate({}): zero-sized request", label);
            return Err(AllocError::InvalidParam);
        }
        if size > self.config.max_block() {
            warn!(
                "allocate({}): {} bytes exceeds max block {:#x}",
                label,
                size,
                self.config.max_block()
            );
            return Err(AllocError::NoMemory);
        }

        let order = self.config.order_for(size).ok_or(AllocError::InvalidParam)?;
        debug!(
            "allocate({}: sz={}, o={})",
            label,
            size.next_power_of_two(),
            order
        );

        match self.tree.allocate(order) {
            Some(block) => {
                self.used_bytes += block.size();
                Ok(self.arena.ptr_at(block.offset))
            }
            None => {
                debug!(
                    "allocate({}): no free block of order {} ({} bytes used)",
                    label, order, self.used_bytes
                );
                #[cfg(feature = "tracking")]
                self.print_alloc_failure_stats(size, order);
                Err(AllocError::NoMemory)
            }
        }
    }

    /// Free a block previously returned by [`allocate`](Self::allocate).
    pub fn free(&mut self, ptr: NonNull<u8>) -> AllocResult {
        self.free_labeled(ptr, "")
    }

    /// Free a block; `label` only tags log output.
    ///
    /// Pointers outside the arena fail with `InvalidPointer`. Pointers that
    /// are not the start of a live allocation (double free, interior
    /// pointers) fail with `NotAllocated` and leave the allocator unchanged.
    #[allow(unused_variables)]
    pub fn free_labeled(&mut self, ptr: NonNull<u8>, label: &str) -> AllocResult {
        debug!(
            "free({}: p={:p}, [{:p}, {:p}])",
            label,
            ptr,
            self.base_pointer(),
            self.end_pointer()
        );
        let Some(offset) = self.arena.offset_of(ptr.as_ptr()) else {
            error!(
                "free({}): invalid pointer {:p} (out of managed memory)",
                label, ptr
            );
            return Err(AllocError::InvalidPointer);
        };

        let block = self.tree.free(offset).map_err(|e| {
            error!("free({}): could not free pointer {:p}", label, ptr);
            e
        })?;
        self.used_bytes -= block.size();
        Ok(())
    }

    /// Release every allocation at once. The arena bytes are left as they are.
    pub fn destroy(&mut self) {
        debug!(
            "buddy allocator: destroy ({} nodes, {} bytes used)",
            self.tree.node_count(),
            self.used_bytes
        );
        self.tree.clear();
        self.used_bytes = 0;
    }

    /// The allocated block starting at `ptr`, if any
    pub fn block_of(&self, ptr: NonNull<u8>) -> Option<BuddyBlock> {
        let offset = self.arena.offset_of(ptr.as_ptr())?;
        self.tree.find(offset)
    }

    /// Pre-order structural dump of the allocation tree
    pub fn dump(&self) -> Vec<BlockEntry> {
        let mut entries = Vec::with_capacity(self.tree.node_count());
        self.tree.visit_preorder(|entry| entries.push(*entry));
        entries
    }

    pub fn visit_preorder<F: FnMut(&BlockEntry)>(&self, f: F) {
        self.tree.visit_preorder(f);
    }

    pub fn visit_inorder<F: FnMut(&BlockEntry)>(&self, f: F) {
        self.tree.visit_inorder(f);
    }

    pub fn visit_postorder<F: FnMut(&BlockEntry)>(&self, f: F) {
        self.tree.visit_postorder(f);
    }

    /// Log the allocation tree in pre-order, one node per line
    #[allow(unused_variables)]
    pub fn print_tree(&self, ptr: Option<NonNull<u8>>) {
        let ptr = ptr.map_or(core::ptr::null_mut(), NonNull::as_ptr);
        info!("{:p}, [", ptr);
        self.tree.visit_preorder(|entry| {
            info!(
                "{:>width$}- order={}",
                "",
                entry.block.order,
                width = entry.depth as usize
            );
        });
        info!("]");
    }

    /// Log configuration, usage and node pool statistics
    pub fn print_info(&self) {
        info!("========== Buddy Allocator Info ==========");
        info!(
            "Arena: [{:p}, {:p}) ({} KB)",
            self.base_pointer(),
            self.end_pointer(),
            self.total_size() / 1024
        );
        info!(
            "Block bounds: [{:#x}, {:#x}], root order {}",
            self.config.min_block(),
            self.config.max_block(),
            self.root_order()
        );
        info!(
            "Used: {} bytes, available: {} bytes",
            self.used_bytes,
            self.total_size() - self.used_bytes
        );
        let _pool_stats = self.tree.pool_stats();
        info!(
            "Node pool: {} live, {} vacant, {} allocations, {} deallocations",
            _pool_stats.allocated_nodes,
            _pool_stats.free_nodes,
            _pool_stats.total_allocations,
            _pool_stats.total_deallocations
        );
        info!("==========================================");
    }

    /// Collect statistics by walking the allocation tree
    #[cfg(feature = "tracking")]
    pub fn get_stats(&self) -> BuddyStats {
        let mut stats = BuddyStats::new();
        self.tree.visit_preorder(|entry| stats.record(entry));
        stats.finish(self.total_size());
        stats
    }

    #[cfg(feature = "tracking")]
    fn print_alloc_failure_stats(&self, size: usize, order: u32) {
        MemoryStatsReporter::print_alloc_failure_stats(&self.config, &self.get_stats(), size, order);
    }
}

impl ByteAllocator for BuddyAllocator {
    fn alloc(&mut self, layout: Layout) -> AllocResult<NonNull<u8>> {
        // Blocks are aligned to their own size.
        self.allocate(layout.size().max(layout.align()))
    }

    fn dealloc(&mut self, pos: NonNull<u8>, _layout: Layout) {
        if let Err(_e) = self.free(pos) {
            warn!("buddy allocator: dealloc at {:p} failed: {}", pos, _e);
        }
    }

    fn total_bytes(&self) -> usize {
        self.total_size()
    }

    fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    fn available_bytes(&self) -> usize {
        self.total_size() - self.used_bytes
    }
}
