//! Buddy block metadata
//!
//! Represents a block of the arena by its order and its offset from the
//! arena base. Blocks are never stored in the tree; they are derived from
//! the traversal path.

use core::cmp::PartialOrd;

/// Buddy block metadata
#[derive(Debug, Clone, Copy)]
pub struct BuddyBlock {
    pub order: u32,
    pub offset: usize,
}

impl BuddyBlock {
    /// Create a new buddy block
    pub const fn new(order: u32, offset: usize) -> Self {
        Self { order, offset }
    }

    /// Size of the block in bytes
    #[inline]
    pub const fn size(&self) -> usize {
        1 << self.order
    }

    /// Offset one past the last byte of the block
    #[inline]
    pub const fn end(&self) -> usize {
        self.offset + self.size()
    }

    /// Calculate the buddy offset for this block
    /// The buddy is the other half of the parent block at the next higher order
    /// For a block at order k with offset A, its buddy is at A ^ 2^k
    #[inline]
    pub const fn buddy_offset(&self) -> usize {
        self.offset ^ self.size()
    }

    /// The two halves of this block, low half first.
    #[inline]
    pub const fn split(&self) -> (BuddyBlock, BuddyBlock) {
        let order = self.order - 1;
        (
            BuddyBlock::new(order, self.offset),
            BuddyBlock::new(order, self.offset + (1 << order)),
        )
    }

    /// Whether `offset` falls inside this block
    #[inline]
    pub const fn contains(&self, offset: usize) -> bool {
        offset >= self.offset && offset < self.end()
    }

    /// Whether two blocks share at least one byte
    #[inline]
    pub const fn overlaps(&self, other: &BuddyBlock) -> bool {
        self.offset < other.end() && other.offset < self.end()
    }
}

impl PartialOrd for BuddyBlock {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        self.offset.partial_cmp(&other.offset)
    }
}

impl PartialEq for BuddyBlock {
    fn eq(&self, other: &Self) -> bool {
        self.offset == other.offset && self.order == other.order
    }
}

impl Eq for BuddyBlock {}

/// State of a tree position that has a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    /// Block is divided into two buddies
    Split,
    /// Block is handed out as one unit
    Allocated,
}

/// One node visited during a tree traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockEntry {
    /// Distance from the root (root is depth 0)
    pub depth: u32,
    pub block: BuddyBlock,
    pub state: BlockState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buddy_offset() {
        let left = BuddyBlock::new(16, 0);
        let right = BuddyBlock::new(16, 0x10000);
        assert_eq!(left.buddy_offset(), right.offset);
        assert_eq!(right.buddy_offset(), left.offset);
        assert_eq!(BuddyBlock::new(17, 0x60000).buddy_offset(), 0x40000);
    }

    #[test]
    fn test_split_and_overlap() {
        let block = BuddyBlock::new(18, 0x40000);
        let (lo, hi) = block.split();
        assert_eq!(lo, BuddyBlock::new(17, 0x40000));
        assert_eq!(hi, BuddyBlock::new(17, 0x60000));
        assert!(!lo.overlaps(&hi));
        assert!(block.overlaps(&lo));
        assert!(block.contains(0x7ffff));
        assert!(!block.contains(0x80000));
        assert!(lo < hi);
    }
}
