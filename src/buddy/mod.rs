//! Buddy allocator module
//!
//! This module provides a tree-based buddy system implementation with:
//! - Lazily built allocation tree with index-based node pool
//! - Left-first block search and bottom-up coalescing
//! - Statistics and debugging dumps

pub mod alloc_tree;
pub mod buddy_allocator;
pub mod buddy_block;
pub mod node_pool;
#[cfg(feature = "tracking")]
pub mod stats;

pub use alloc_tree::AllocTree;
pub use buddy_allocator::BuddyAllocator;
pub use buddy_block::{BlockEntry, BlockState, BuddyBlock};
pub use node_pool::{NodeId, NodePool, NodePoolStats, TreeNode};
#[cfg(feature = "tracking")]
pub use stats::{BuddyStats, MemoryStatsReporter};
