//! The A/B/C/D walkthrough: four mixed-order allocations in a 1 MiB arena
//! with 64 KiB minimum blocks, freed out of order until the tree is empty.

#![no_std]

extern crate alloc;
extern crate buddy_tree_allocator;

use alloc::vec::Vec;
use buddy_tree_allocator::{BlockState, BuddyAllocator, BuddyBlock};
use core::ptr::NonNull;

const MIN: usize = 1 << 16;
const MAX: usize = 1 << 20;

fn shape(allocator: &BuddyAllocator) -> Vec<(u32, u32, usize, BlockState)> {
    allocator
        .dump()
        .iter()
        .map(|e| (e.depth, e.block.order, e.block.offset, e.state))
        .collect()
}

fn block(allocator: &BuddyAllocator, ptr: NonNull<u8>) -> BuddyBlock {
    allocator.block_of(ptr).unwrap()
}

#[test]
fn test_worked_example() {
    let mut mem = BuddyAllocator::with_bounds(MIN, MAX, MAX).unwrap();
    mem.print_tree(NonNull::new(mem.base_pointer()));

    let a = mem.allocate_labeled(34_000, "A").unwrap();
    let b = mem.allocate_labeled(66_000, "B").unwrap();
    let c = mem.allocate_labeled(35_000, "C").unwrap();
    let d = mem.allocate_labeled(67_000, "D").unwrap();
    mem.print_tree(Some(d));

    assert_eq!(block(&mem, a), BuddyBlock::new(16, 0));
    assert_eq!(block(&mem, b), BuddyBlock::new(17, 0x20000));
    assert_eq!(block(&mem, c), BuddyBlock::new(16, 0x10000));
    assert_eq!(block(&mem, d), BuddyBlock::new(17, 0x40000));

    let blocks = [a, b, c, d].map(|p| block(&mem, p));
    for (i, x) in blocks.iter().enumerate() {
        for y in &blocks[i + 1..] {
            assert!(!x.overlaps(y), "{:?} overlaps {:?}", x, y);
        }
    }

    assert_eq!(
        shape(&mem),
        [
            (0, 20, 0, BlockState::Split),
            (1, 19, 0, BlockState::Split),
            (2, 18, 0, BlockState::Split),
            (3, 17, 0, BlockState::Split),
            (4, 16, 0, BlockState::Allocated),
            (4, 16, 0x10000, BlockState::Allocated),
            (3, 17, 0x20000, BlockState::Allocated),
            (2, 18, 0x40000, BlockState::Split),
            (3, 17, 0x40000, BlockState::Allocated),
        ]
    );

    mem.free_labeled(b, "B").unwrap();
    mem.print_tree(Some(b));
    mem.free_labeled(d, "D").unwrap();
    mem.print_tree(Some(d));
    // Both order-17 blocks are gone and the high order-18 half merged back.
    assert_eq!(
        shape(&mem),
        [
            (0, 20, 0, BlockState::Split),
            (1, 19, 0, BlockState::Split),
            (2, 18, 0, BlockState::Split),
            (3, 17, 0, BlockState::Split),
            (4, 16, 0, BlockState::Allocated),
            (4, 16, 0x10000, BlockState::Allocated),
        ]
    );

    mem.free_labeled(a, "A").unwrap();
    mem.print_tree(Some(a));
    mem.free_labeled(c, "C").unwrap();
    mem.print_tree(Some(c));

    assert!(mem.is_empty());
    assert_eq!(mem.node_count(), 0);

    mem.destroy();
    mem.print_tree(None);
    assert!(mem.is_empty());
}

#[test]
fn test_worked_example_destroy_mid_way() {
    let mut mem = BuddyAllocator::with_bounds(MIN, MAX, MAX).unwrap();
    for size in [34_000, 66_000, 35_000, 67_000] {
        mem.allocate(size).unwrap();
    }
    assert_eq!(mem.node_count(), 9);

    mem.destroy();
    assert!(mem.is_empty());
    assert_eq!(mem.node_pool_stats().allocated_nodes, 0);
    assert_eq!(mem.allocate(MAX).unwrap().as_ptr(), mem.base_pointer());
}
