//! Allocation tree
//!
//! Tracks which power-of-two blocks of the arena are split or allocated.
//! A missing link means the whole block at that position is free. Nodes are
//! created on demand while allocating and released bottom-up while freeing,
//! so two free buddies never outlive their parent's `Split` node.
//!
//! Block offsets are never stored; every recursive call receives the block
//! it covers and derives the children's blocks from it.

use crate::{AllocError, AllocResult};

#[cfg(feature = "log")]
use log::{error, trace};

use super::{
    buddy_block::{BlockEntry, BlockState, BuddyBlock},
    node_pool::{NodeId, NodePool, NodePoolStats, TreeNode},
};

/// Preallocated node slots are capped at this many tree levels.
const PREALLOC_LEVELS: u32 = 10;

#[derive(Debug, Clone, Copy)]
enum Half {
    Low,
    High,
}

#[derive(Debug, Clone, Copy)]
enum Traversal {
    PreOrder,
    InOrder,
    PostOrder,
}

/// Binary tree of split/allocated blocks rooted at the whole arena
pub struct AllocTree {
    root: Option<NodeId>,
    root_order: u32,
    min_order: u32,
    pool: NodePool,
}

impl AllocTree {
    /// Create an empty tree whose root block has order `root_order`
    pub fn new(root_order: u32, min_order: u32) -> Self {
        debug_assert!(min_order <= root_order);
        let levels = (root_order - min_order).min(PREALLOC_LEVELS);
        Self {
            root: None,
            root_order,
            min_order,
            pool: NodePool::with_capacity((2usize << levels) - 1),
        }
    }

    /// The block covered by the root
    #[inline]
    pub fn root_block(&self) -> BuddyBlock {
        BuddyBlock::new(self.root_order, 0)
    }

    /// Whether no block is split or allocated
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of live tree nodes
    #[inline]
    pub fn node_count(&self) -> usize {
        self.pool.allocated_node_count()
    }

    pub fn pool_stats(&self) -> NodePoolStats {
        self.pool.get_stats()
    }

    /// Release every node, leaving the whole arena free
    pub fn clear(&mut self) {
        self.root = None;
        self.pool.clear();
    }

    /// Find the lowest-addressed free block of `order` and mark it allocated.
    ///
    /// Returns the block, or `None` if no free block of that order exists.
    pub fn allocate(&mut self, order: u32) -> Option<BuddyBlock> {
        if order < self.min_order || order > self.root_order {
            return None;
        }
        let (root, offset) = self.allocate_in(self.root, self.root_block(), order)?;
        self.root = Some(root);
        Some(BuddyBlock::new(order, offset))
    }

    /// Release the allocated block starting at `offset`, coalescing free
    /// buddies up to the root.
    ///
    /// Fails with `NotAllocated` if `offset` is not the start of an allocated
    /// block; the tree is not modified in that case.
    pub fn free(&mut self, offset: usize) -> AllocResult<BuddyBlock> {
        let Some(root) = self.root else {
            error!("free: offset {:#x} but nothing is allocated", offset);
            return Err(AllocError::NotAllocated);
        };
        let (root, block) = self.free_in(root, self.root_block(), offset)?;
        self.root = root;
        Ok(block)
    }

    /// The allocated block starting exactly at `offset`, if any
    pub fn find(&self, offset: usize) -> Option<BuddyBlock> {
        let mut link = self.root;
        let mut block = self.root_block();
        while let Some(id) = link {
            match self.pool.get(id)? {
                TreeNode::Allocated => {
                    return (block.offset == offset).then_some(block);
                }
                TreeNode::Split { left, right } => {
                    let (lo, hi) = block.split();
                    if offset < hi.offset {
                        link = *left;
                        block = lo;
                    } else {
                        link = *right;
                        block = hi;
                    }
                }
            }
        }
        None
    }

    /// Visit nodes as self, low half, high half
    pub fn visit_preorder<F: FnMut(&BlockEntry)>(&self, mut f: F) {
        self.visit(Traversal::PreOrder, &mut f);
    }

    /// Visit nodes as low half, self, high half
    pub fn visit_inorder<F: FnMut(&BlockEntry)>(&self, mut f: F) {
        self.visit(Traversal::InOrder, &mut f);
    }

    /// Visit nodes as low half, high half, self
    pub fn visit_postorder<F: FnMut(&BlockEntry)>(&self, mut f: F) {
        self.visit(Traversal::PostOrder, &mut f);
    }

    fn visit<F: FnMut(&BlockEntry)>(&self, traversal: Traversal, f: &mut F) {
        if let Some(root) = self.root {
            self.walk(root, self.root_block(), 0, traversal, f);
        }
    }

    fn walk<F: FnMut(&BlockEntry)>(
        &self,
        id: NodeId,
        block: BuddyBlock,
        depth: u32,
        traversal: Traversal,
        f: &mut F,
    ) {
        let Some(node) = self.pool.get(id) else {
            return;
        };
        let (left, right, state) = match *node {
            TreeNode::Allocated => (None, None, BlockState::Allocated),
            TreeNode::Split { left, right } => (left, right, BlockState::Split),
        };
        let entry = BlockEntry {
            depth,
            block,
            state,
        };

        if let Traversal::PreOrder = traversal {
            f(&entry);
        }
        if state == BlockState::Split {
            let (lo, hi) = block.split();
            if let Some(left) = left {
                self.walk(left, lo, depth + 1, traversal, f);
            }
            if let Traversal::InOrder = traversal {
                f(&entry);
            }
            if let Some(right) = right {
                self.walk(right, hi, depth + 1, traversal, f);
            }
        } else if let Traversal::InOrder = traversal {
            f(&entry);
        }
        if let Traversal::PostOrder = traversal {
            f(&entry);
        }
    }

    /// Try to place an `order` block inside `block`, whose tree position is `link`.
    ///
    /// On success returns the node now occupying this position (to be stored
    /// by the caller) and the offset of the allocated block.
    fn allocate_in(
        &mut self,
        link: Option<NodeId>,
        block: BuddyBlock,
        order: u32,
    ) -> Option<(NodeId, usize)> {
        let Some(id) = link else {
            // Completely free position, cannot fail.
            return Some(self.materialize(block, order));
        };
        if block.order <= order {
            return None;
        }

        let (left, right) = match self.pool.get(id)? {
            TreeNode::Split { left, right } => (*left, *right),
            TreeNode::Allocated => return None,
        };

        let (lo, hi) = block.split();
        if let Some((child, offset)) = self.allocate_in(left, lo, order) {
            self.set_child(id, Half::Low, Some(child));
            return Some((id, offset));
        }
        if let Some((child, offset)) = self.allocate_in(right, hi, order) {
            self.set_child(id, Half::High, Some(child));
            return Some((id, offset));
        }
        None
    }

    /// Build the left spine of a free `block` down to `order`.
    fn materialize(&mut self, block: BuddyBlock, order: u32) -> (NodeId, usize) {
        if block.order == order {
            return (self.pool.alloc_node(TreeNode::Allocated), block.offset);
        }
        trace!("allocate: split order {} at {:#x}", block.order, block.offset);
        let (lo, _) = block.split();
        let (child, offset) = self.materialize(lo, order);
        let id = self.pool.alloc_node(TreeNode::Split {
            left: Some(child),
            right: None,
        });
        (id, offset)
    }

    /// Free the allocated block at `offset` below node `id` covering `block`.
    ///
    /// Returns the new link for this position (`None` once the block is
    /// entirely free) and the freed block.
    fn free_in(
        &mut self,
        id: NodeId,
        block: BuddyBlock,
        offset: usize,
    ) -> AllocResult<(Option<NodeId>, BuddyBlock)> {
        let (left, right) = match self.pool.get(id).copied() {
            Some(TreeNode::Allocated) => {
                if block.offset != offset {
                    error!(
                        "free: offset {:#x} is inside allocated block [{:#x}, {:#x}) but not its start",
                        offset,
                        block.offset,
                        block.end()
                    );
                    return Err(AllocError::NotAllocated);
                }
                trace!("free: leaf order {} at {:#x}", block.order, block.offset);
                self.pool.dealloc_node(id);
                return Ok((None, block));
            }
            Some(TreeNode::Split { left, right }) => (left, right),
            None => return Err(AllocError::NotAllocated),
        };

        let (lo, hi) = block.split();
        let (half, child, sub) = if offset < hi.offset {
            trace!("free: left of {:#x} at order {}", hi.offset, block.order);
            (Half::Low, left, lo)
        } else {
            trace!("free: right of {:#x} at order {}", hi.offset, block.order);
            (Half::High, right, hi)
        };
        let Some(child) = child else {
            error!(
                "free: offset {:#x} lies in free block [{:#x}, {:#x})",
                offset,
                sub.offset,
                sub.end()
            );
            return Err(AllocError::NotAllocated);
        };

        let (child, freed) = self.free_in(child, sub, offset)?;
        self.set_child(id, half, child);

        let coalesce = matches!(
            self.pool.get(id),
            Some(TreeNode::Split {
                left: None,
                right: None,
            })
        );
        if coalesce {
            trace!("free: coalesce order {} at {:#x}", block.order, block.offset);
            self.pool.dealloc_node(id);
            return Ok((None, freed));
        }
        Ok((Some(id), freed))
    }

    fn set_child(&mut self, id: NodeId, half: Half, child: Option<NodeId>) {
        if let Some(TreeNode::Split { left, right }) = self.pool.get_mut(id) {
            match half {
                Half::Low => *left = child,
                Half::High => *right = child,
            }
        }
    }
}
