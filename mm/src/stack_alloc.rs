//! Stack allocation over the shared free list.
//!
//! Stacks grow downward, so they are carved from the top of the
//! highest-addressed region that fits, leaving low memory to `allocate`.

use core::ptr::NonNull;

use hearth_abi::{KernelError, KernelResult};
use hearth_lib::klog_debug;

use crate::kernel_heap::{round_granule, FreeListHeap, Link, MemBlock, NIL};
use crate::mm_constants::WORD_SIZE;

impl FreeListHeap {
    /// Allocate a stack of `nbytes` (rounded to the granule).
    ///
    /// Returns the initial stack pointer: the address one word below the top
    /// of the carved region.
    pub fn allocate_stack(&mut self, nbytes: usize) -> KernelResult<NonNull<u8>> {
        if nbytes == 0 {
            return Err(KernelError::InvalidArgument);
        }
        let nbytes = round_granule(nbytes);

        // The list is address ordered, so the last fit is the highest one.
        let mut fits: Option<(Link, u32, MemBlock)> = None;
        let mut prev = Link::Head;
        let mut curr = self.first_free();
        while curr != NIL {
            let block = self.read_block(curr);
            if block.length as usize >= nbytes {
                fits = Some((prev, curr, block));
            }
            prev = Link::Block(curr);
            curr = block.next;
        }

        let Some((fits_prev, fits_off, block)) = fits else {
            klog_debug!("stack_alloc: no region fits {} bytes", nbytes);
            return Err(KernelError::ExhaustedResource);
        };

        let nbytes = nbytes as u32;
        let carved = if block.length == nbytes {
            self.set_next(fits_prev, block.next);
            fits_off
        } else {
            let remaining = block.length - nbytes;
            self.write_block(
                fits_off,
                MemBlock {
                    next: block.next,
                    length: remaining,
                },
            );
            fits_off + remaining
        };
        self.take_free(nbytes);

        let top = self.ptr_at(carved + nbytes);
        NonNull::new(top.wrapping_sub(WORD_SIZE)).ok_or(KernelError::Corruption)
    }

    /// Release a stack given the pointer `allocate_stack` returned and the
    /// size originally requested.
    pub fn release_stack(&mut self, stack_top: *mut u8, nbytes: usize) -> KernelResult<()> {
        if nbytes == 0 {
            return Err(KernelError::InvalidArgument);
        }
        let nbytes = round_granule(nbytes);
        let base = stack_top.wrapping_add(WORD_SIZE).wrapping_sub(nbytes);
        self.release(base, nbytes)
    }
}
