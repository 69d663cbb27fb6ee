//! Free-list memory manager.
//!
//! One address-ordered free list over a fixed physical range serves two
//! policies: best-fit general allocation from the low end of a region and
//! highest-fit stack allocation from the high end.

#![cfg_attr(not(test), no_std)]

pub mod kernel_heap;
pub mod mm_constants;
mod stack_alloc;
#[cfg(test)]
mod tests;

pub use kernel_heap::{round_granule, FreeBlocks, FreeListHeap, HeapStats};
