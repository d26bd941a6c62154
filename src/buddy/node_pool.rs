//! Node pool for the allocation tree
//!
//! Tree nodes live in one growable slot vector and are referenced by index.
//! Released slots are chained into an intrusive free list and reused before
//! the vector grows, so steady-state split/coalesce cycles do not touch the
//! heap.

use alloc::vec::Vec;

/// Index of a node inside the [`NodePool`]
pub type NodeId = usize;

/// A tree position that is not entirely free
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeNode {
    /// Block handed out as one unit (leaf)
    Allocated,
    /// Block divided into a low and a high buddy; `None` means that half is free
    Split {
        left: Option<NodeId>,
        right: Option<NodeId>,
    },
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Vacant { next: Option<NodeId> },
    Occupied(TreeNode),
}

/// Pool of tree nodes with a free list of vacant slots
pub struct NodePool {
    slots: Vec<Slot>,
    /// Free list head - first vacant slot
    free_head: Option<NodeId>,
    /// Current number of vacant slots
    free_nodes: usize,
    /// Allocation statistics
    total_allocations: usize,
    total_deallocations: usize,
}

impl NodePool {
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_head: None,
            free_nodes: 0,
            total_allocations: 0,
            total_deallocations: 0,
        }
    }

    /// Create a pool with room for `capacity` nodes before it has to grow
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            ..Self::new()
        }
    }

    /// Store `node` and return its index
    pub fn alloc_node(&mut self, node: TreeNode) -> NodeId {
        self.total_allocations += 1;
        match self.free_head {
            Some(idx) => {
                let next = match self.slots[idx] {
                    Slot::Vacant { next } => next,
                    Slot::Occupied(_) => panic!("node pool: free list points at live node {}", idx),
                };
                self.free_head = next;
                self.free_nodes -= 1;
                self.slots[idx] = Slot::Occupied(node);
                idx
            }
            None => {
                self.slots.push(Slot::Occupied(node));
                self.slots.len() - 1
            }
        }
    }

    /// Return a node's slot to the pool
    ///
    /// The node must not be referenced by any live parent.
    pub fn dealloc_node(&mut self, idx: NodeId) {
        debug_assert!(matches!(self.slots[idx], Slot::Occupied(_)));
        self.slots[idx] = Slot::Vacant {
            next: self.free_head,
        };
        self.free_head = Some(idx);
        self.free_nodes += 1;
        self.total_deallocations += 1;
    }

    /// Get a node by index
    pub fn get(&self, idx: NodeId) -> Option<&TreeNode> {
        match self.slots.get(idx)? {
            Slot::Occupied(node) => Some(node),
            Slot::Vacant { .. } => None,
        }
    }

    /// Get a mutable reference to a node by index
    pub fn get_mut(&mut self, idx: NodeId) -> Option<&mut TreeNode> {
        match self.slots.get_mut(idx)? {
            Slot::Occupied(node) => Some(node),
            Slot::Vacant { .. } => None,
        }
    }

    /// Drop every node at once, keeping the backing storage
    pub fn clear(&mut self) {
        let live = self.allocated_node_count();
        self.slots.clear();
        self.free_head = None;
        self.free_nodes = 0;
        self.total_deallocations += live;
    }

    /// Get the number of vacant slots in the pool
    pub fn free_node_count(&self) -> usize {
        self.free_nodes
    }

    /// Get the number of live nodes
    pub fn allocated_node_count(&self) -> usize {
        self.slots.len() - self.free_nodes
    }

    /// Get pool statistics
    pub fn get_stats(&self) -> NodePoolStats {
        NodePoolStats {
            total_nodes: self.slots.len(),
            free_nodes: self.free_nodes,
            allocated_nodes: self.allocated_node_count(),
            total_allocations: self.total_allocations,
            total_deallocations: self.total_deallocations,
        }
    }
}

impl Default for NodePool {
    fn default() -> Self {
        Self::new()
    }
}

/// Node pool statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NodePoolStats {
    pub total_nodes: usize,
    pub free_nodes: usize,
    pub allocated_nodes: usize,
    pub total_allocations: usize,
    pub total_deallocations: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_dealloc() {
        let mut pool = NodePool::new();

        let idx1 = pool.alloc_node(TreeNode::Allocated);
        assert_eq!(pool.allocated_node_count(), 1);
        assert_eq!(pool.free_node_count(), 0);

        let idx2 = pool.alloc_node(TreeNode::Split {
            left: Some(idx1),
            right: None,
        });
        assert_ne!(idx1, idx2);
        assert_eq!(pool.allocated_node_count(), 2);

        pool.dealloc_node(idx1);
        assert_eq!(pool.free_node_count(), 1);
        assert_eq!(pool.allocated_node_count(), 1);
        assert!(pool.get(idx1).is_none());

        pool.dealloc_node(idx2);
        assert_eq!(pool.free_node_count(), 2);
        assert_eq!(pool.allocated_node_count(), 0);
    }

    #[test]
    fn test_slot_reuse() {
        let mut pool = NodePool::with_capacity(4);
        let a = pool.alloc_node(TreeNode::Allocated);
        let b = pool.alloc_node(TreeNode::Allocated);
        pool.dealloc_node(a);
        pool.dealloc_node(b);

        // LIFO reuse of vacant slots
        assert_eq!(pool.alloc_node(TreeNode::Allocated), b);
        assert_eq!(pool.alloc_node(TreeNode::Allocated), a);
        assert_eq!(pool.get_stats().total_nodes, 2);
    }

    #[test]
    fn test_node_access() {
        let mut pool = NodePool::new();
        let idx = pool.alloc_node(TreeNode::Split {
            left: None,
            right: None,
        });

        if let Some(TreeNode::Split { right, .. }) = pool.get_mut(idx) {
            *right = Some(7);
        }

        assert_eq!(
            pool.get(idx),
            Some(&TreeNode::Split {
                left: None,
                right: Some(7)
            })
        );
        assert!(pool.get(idx + 1).is_none());
    }

    #[test]
    fn test_stats_and_clear() {
        let mut pool = NodePool::new();
        let idx1 = pool.alloc_node(TreeNode::Allocated);
        let _idx2 = pool.alloc_node(TreeNode::Allocated);
        pool.dealloc_node(idx1);

        let stats = pool.get_stats();
        assert_eq!(stats.total_nodes, 2);
        assert_eq!(stats.free_nodes, 1);
        assert_eq!(stats.allocated_nodes, 1);
        assert_eq!(stats.total_allocations, 2);
        assert_eq!(stats.total_deallocations, 1);

        pool.clear();
        let stats = pool.get_stats();
        assert_eq!(stats.total_nodes, 0);
        assert_eq!(stats.allocated_nodes, 0);
        assert_eq!(stats.total_deallocations, 2);
    }
}
