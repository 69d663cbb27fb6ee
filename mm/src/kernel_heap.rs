use core::mem::size_of;
use core::ptr::{self, NonNull};

use hearth_abi::{KernelError, KernelResult};
use hearth_lib::{align_down, align_up, is_aligned, klog_debug, klog_info, klog_warn};

use crate::mm_constants::{MAX_HEAP_SPAN, MEM_GRANULE};

/// End-of-list marker for free-list links.
pub(crate) const NIL: u32 = u32::MAX;

/// Header written into the first bytes of every free region.
///
/// `next` is the offset of the following free region from the heap base and
/// `length` covers the whole region, header included.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct MemBlock {
    pub(crate) next: u32,
    pub(crate) length: u32,
}

const _: () = assert!(size_of::<MemBlock>() == MEM_GRANULE);

/// Position in the list whose `next` link may be rewritten: the sentinel head
/// or a real free region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Link {
    Head,
    Block(u32),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeapStats {
    pub total_size: usize,
    pub free_size: usize,
    pub free_blocks: u32,
    pub largest_free_block: usize,
}

/// Round a request up to the allocation granule.
#[inline]
pub const fn round_granule(nbytes: usize) -> usize {
    align_up(nbytes, MEM_GRANULE)
}

/// Address-ordered free list living inside the memory it manages.
///
/// `memlist` is the sentinel: its `next` is the first free region and its
/// `length` is the running total of free bytes.
pub struct FreeListHeap {
    memlist: MemBlock,
    base: *mut u8,
    min_heap: usize,
    max_heap: usize,
}

// SAFETY: the heap is the sole owner of the arena handed to `init`; the raw
// base pointer is never shared outside of `&mut self` methods.
unsafe impl Send for FreeListHeap {}

impl Default for FreeListHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl FreeListHeap {
    pub const fn new() -> Self {
        Self {
            memlist: MemBlock {
                next: NIL,
                length: 0,
            },
            base: ptr::null_mut(),
            min_heap: 0,
            max_heap: 0,
        }
    }

    /// Take ownership of `[start, end)` as one free region.
    ///
    /// The range is shrunk inwards to granule boundaries. Calling this again
    /// forgets every outstanding allocation.
    ///
    /// # Safety
    ///
    /// The range must be valid for reads and writes, must not be accessed
    /// through any other path except memory this heap hands out, and must
    /// outlive every use of the heap.
    pub unsafe fn init(&mut self, start: *mut u8, end: *mut u8) -> KernelResult<()> {
        if start.is_null() {
            return Err(KernelError::InvalidArgument);
        }
        let lo = align_up(start as usize, MEM_GRANULE);
        let hi = align_down(end as usize, MEM_GRANULE);
        if hi <= lo {
            klog_info!("heap_init: empty range 0x{:x}..0x{:x}", start as usize, end as usize);
            return Err(KernelError::InvalidArgument);
        }
        let span = hi - lo;
        if span > MAX_HEAP_SPAN {
            klog_info!("heap_init: range of {} bytes exceeds the offset space", span);
            return Err(KernelError::OutOfRange);
        }

        self.base = start.wrapping_add(lo - start as usize);
        self.min_heap = lo;
        self.max_heap = hi;
        self.memlist = MemBlock {
            next: 0,
            length: span as u32,
        };
        self.write_block(
            0,
            MemBlock {
                next: NIL,
                length: span as u32,
            },
        );

        klog_info!("Heap initialized at 0x{:x}, {} bytes free", lo, span);
        Ok(())
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.max_heap > self.min_heap
    }

    /// `(min_heap, max_heap)`; the range is half-open.
    #[inline]
    pub fn bounds(&self) -> (usize, usize) {
        (self.min_heap, self.max_heap)
    }

    #[inline]
    pub fn free_bytes(&self) -> usize {
        self.memlist.length as usize
    }

    #[inline]
    pub fn total_bytes(&self) -> usize {
        self.max_heap - self.min_heap
    }

    #[inline]
    pub(crate) fn ptr_at(&self, off: u32) -> *mut u8 {
        self.base.wrapping_add(off as usize)
    }

    #[inline]
    pub(crate) fn read_block(&self, off: u32) -> MemBlock {
        debug_assert!((off as usize) + MEM_GRANULE <= self.total_bytes());
        // SAFETY: free-list offsets are granule aligned and lie inside the
        // arena that `init` took ownership of.
        unsafe { ptr::read(self.ptr_at(off) as *const MemBlock) }
    }

    #[inline]
    pub(crate) fn write_block(&mut self, off: u32, block: MemBlock) {
        debug_assert!((off as usize) + MEM_GRANULE <= self.total_bytes());
        // SAFETY: as for `read_block`; the region at `off` is free or being freed.
        unsafe { ptr::write(self.ptr_at(off) as *mut MemBlock, block) }
    }

    #[inline]
    pub(crate) fn first_free(&self) -> u32 {
        self.memlist.next
    }

    pub(crate) fn set_next(&mut self, link: Link, next: u32) {
        match link {
            Link::Head => self.memlist.next = next,
            Link::Block(off) => {
                let mut block = self.read_block(off);
                block.next = next;
                self.write_block(off, block);
            }
        }
    }

    pub(crate) fn take_free(&mut self, nbytes: u32) {
        self.memlist.length -= nbytes;
    }

    /// Allocate `nbytes` (rounded to the granule) from the smallest free
    /// region that fits; equal sizes go to the lowest address.
    pub fn allocate(&mut self, nbytes: usize) -> KernelResult<NonNull<u8>> {
        if nbytes == 0 {
            return Err(KernelError::InvalidArgument);
        }
        let nbytes = round_granule(nbytes);

        let mut best: Option<(Link, u32, MemBlock)> = None;
        let mut prev = Link::Head;
        let mut curr = self.memlist.next;
        while curr != NIL {
            let block = self.read_block(curr);
            if block.length as usize >= nbytes
                && best.is_none_or(|(_, _, b)| block.length < b.length)
            {
                best = Some((prev, curr, block));
            }
            prev = Link::Block(curr);
            curr = block.next;
        }

        let Some((best_prev, best_off, block)) = best else {
            klog_debug!("heap_alloc: no region fits {} bytes", nbytes);
            return Err(KernelError::ExhaustedResource);
        };

        let nbytes = nbytes as u32;
        if block.length == nbytes {
            self.set_next(best_prev, block.next);
        } else {
            let leftover = best_off + nbytes;
            self.write_block(
                leftover,
                MemBlock {
                    next: block.next,
                    length: block.length - nbytes,
                },
            );
            self.set_next(best_prev, leftover);
        }
        self.memlist.length -= nbytes;

        NonNull::new(self.ptr_at(best_off)).ok_or(KernelError::Corruption)
    }

    /// Return `[blkaddr, blkaddr + nbytes)` to the free list, merging with
    /// free neighbours on either side.
    pub fn release(&mut self, blkaddr: *mut u8, nbytes: usize) -> KernelResult<()> {
        if nbytes == 0 {
            return Err(KernelError::InvalidArgument);
        }
        let addr = blkaddr as usize;
        if !self.is_initialized() || addr < self.min_heap || addr >= self.max_heap {
            klog_info!("heap_free: 0x{:x} outside heap bounds", addr);
            return Err(KernelError::OutOfRange);
        }
        let offset = addr - self.min_heap;
        if !is_aligned(offset, MEM_GRANULE) {
            klog_info!("heap_free: 0x{:x} is not granule aligned", addr);
            return Err(KernelError::InvalidArgument);
        }
        let nbytes = round_granule(nbytes);
        if nbytes > self.max_heap - addr {
            klog_info!("heap_free: 0x{:x}+{} runs past the heap top", addr, nbytes);
            return Err(KernelError::OutOfRange);
        }
        let block = offset as u32;
        let nbytes = nbytes as u32;

        let mut prev = Link::Head;
        let mut next = self.memlist.next;
        while next != NIL && next < block {
            prev = Link::Block(next);
            next = self.read_block(next).next;
        }

        let top = match prev {
            Link::Head => None,
            Link::Block(p) => Some(p + self.read_block(p).length),
        };

        if top.is_some_and(|top| block < top) || (next != NIL && block + nbytes > next) {
            klog_warn!(
                "heap_free: 0x{:x}+{} overlaps a free region (double free?)",
                addr,
                nbytes
            );
            return Err(KernelError::Corruption);
        }

        self.memlist.length += nbytes;

        let merged = match prev {
            Link::Block(p) if top == Some(block) => {
                let mut left = self.read_block(p);
                left.length += nbytes;
                self.write_block(p, left);
                p
            }
            _ => {
                self.write_block(
                    block,
                    MemBlock {
                        next,
                        length: nbytes,
                    },
                );
                self.set_next(prev, block);
                block
            }
        };

        let merged_block = self.read_block(merged);
        if next != NIL && merged + merged_block.length == next {
            let right = self.read_block(next);
            self.write_block(
                merged,
                MemBlock {
                    next: right.next,
                    length: merged_block.length + right.length,
                },
            );
        }
        Ok(())
    }

    /// Walk the free list in address order as `(address, length)` pairs.
    pub fn free_blocks(&self) -> FreeBlocks<'_> {
        FreeBlocks {
            heap: self,
            cursor: self.memlist.next,
        }
    }

    /// Check ordering, adjacency, bounds and the running total.
    pub fn verify(&self) -> KernelResult<()> {
        let mut total = 0usize;
        let mut prev_end: Option<usize> = None;
        for (addr, len) in self.free_blocks() {
            if len == 0 || addr + len > self.max_heap {
                return Err(KernelError::Corruption);
            }
            if let Some(end) = prev_end {
                // Equal would mean two adjacent regions that should have merged.
                if addr <= end {
                    return Err(KernelError::Corruption);
                }
            }
            prev_end = Some(addr + len);
            total += len;
        }
        if total != self.free_bytes() {
            return Err(KernelError::Corruption);
        }
        Ok(())
    }

    pub fn stats(&self) -> HeapStats {
        let mut stats = HeapStats {
            total_size: self.total_bytes(),
            free_size: self.free_bytes(),
            ..HeapStats::default()
        };
        for (_, len) in self.free_blocks() {
            stats.free_blocks += 1;
            stats.largest_free_block = stats.largest_free_block.max(len);
        }
        stats
    }

    pub fn print_heap_stats(&self) {
        let stats = self.stats();
        klog_info!("=== Heap Statistics ===");
        klog_info!("Total size: {} bytes", stats.total_size);
        klog_info!("Free: {} bytes in {} regions", stats.free_size, stats.free_blocks);
        klog_info!("Largest free region: {} bytes", stats.largest_free_block);

        if stats.free_size > 0 {
            let fragmented = stats.free_size - stats.largest_free_block;
            klog_info!(
                "Fragmented bytes: {} ({}%)",
                fragmented,
                fragmented * 100 / stats.free_size
            );
        }
    }
}

pub struct FreeBlocks<'a> {
    heap: &'a FreeListHeap,
    cursor: u32,
}

impl Iterator for FreeBlocks<'_> {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == NIL {
            return None;
        }
        let block = self.heap.read_block(self.cursor);
        let item = (
            self.heap.min_heap + self.cursor as usize,
            block.length as usize,
        );
        self.cursor = block.next;
        Some(item)
    }
}
