//! Memory manager constants.

use core::mem::size_of;

/// Allocation granule. Every request is rounded up to a multiple of this,
/// which is also the size of the in-place free-list header.
pub const MEM_GRANULE: usize = 8;

/// Machine word; the stack handle sits one word below the top of its region.
pub const WORD_SIZE: usize = size_of::<usize>();

/// Free-list links are 32-bit offsets from the heap base, so the managed
/// span must stay below the end-of-list marker.
pub const MAX_HEAP_SPAN: usize = (u32::MAX as usize) & !(MEM_GRANULE - 1);
