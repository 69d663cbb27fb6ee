use hearth_abi::KernelError;

use crate::kernel_heap::{round_granule, FreeListHeap};
use crate::mm_constants::WORD_SIZE;

/// Heap over a host buffer. The buffer is `u64` backed so the base is
/// granule aligned.
struct Arena {
    words: Vec<u64>,
    heap: FreeListHeap,
}

impl Arena {
    fn new(bytes: usize) -> Self {
        let mut words = vec![0u64; bytes / 8];
        let mut heap = FreeListHeap::new();
        let range = words.as_mut_ptr_range();
        unsafe { heap.init(range.start as *mut u8, range.end as *mut u8) }
            .expect("arena init");
        Self { words, heap }
    }

    fn base(&self) -> usize {
        self.words.as_ptr() as usize
    }

    fn at(&self, offset: usize) -> *mut u8 {
        (self.base() + offset) as *mut u8
    }

    fn offset_of(&self, ptr: *mut u8) -> usize {
        ptr as usize - self.base()
    }

    fn alloc(&mut self, n: usize) -> usize {
        let ptr = self.heap.allocate(n).expect("allocate");
        self.offset_of(ptr.as_ptr())
    }

    fn free(&mut self, offset: usize, n: usize) {
        let ptr = self.at(offset);
        self.heap.release(ptr, n).expect("release");
    }

    /// Free list as `(offset, length)` pairs relative to the arena base.
    fn blocks(&self) -> Vec<(usize, usize)> {
        let base = self.base();
        self.heap
            .free_blocks()
            .map(|(addr, len)| (addr - base, len))
            .collect()
    }
}

#[test]
fn alloc_then_release_restores_single_region() {
    let mut arena = Arena::new(4096);
    let a = arena.alloc(100);
    let b = arena.alloc(50);
    assert_eq!(a, 0);
    assert_eq!(b, 104);
    assert_eq!(arena.heap.free_bytes(), 4096 - 104 - 56);

    arena.free(a, 100);
    arena.free(b, 50);
    assert_eq!(arena.heap.free_bytes(), 4096);
    assert_eq!(arena.blocks(), vec![(0, 4096)]);
}

#[test]
fn round_trip_preserves_list_shape() {
    let mut arena = Arena::new(4096);
    let a = arena.alloc(256);
    let _guard = arena.alloc(8);
    arena.free(a, 256);
    let before = arena.blocks();
    let free_before = arena.heap.free_bytes();

    for n in [1, 7, 8, 9, 100, 255, 256, 1000] {
        let p = arena.alloc(n);
        arena.free(p, n);
        assert_eq!(arena.blocks(), before, "size {n}");
        assert_eq!(arena.heap.free_bytes(), free_before);
    }
}

/// Lays out free fragments of 64, 32 and 128 bytes separated by live guards,
/// followed by the free tail.
fn fragmented() -> Arena {
    let mut arena = Arena::new(4096);
    let a = arena.alloc(64);
    arena.alloc(8);
    let b = arena.alloc(32);
    arena.alloc(8);
    let c = arena.alloc(128);
    arena.alloc(8);
    arena.free(a, 64);
    arena.free(b, 32);
    arena.free(c, 128);
    arena
}

#[test]
fn best_fit_picks_smallest_sufficient_region() {
    let mut arena = fragmented();
    assert_eq!(
        arena.blocks(),
        vec![(0, 64), (72, 32), (112, 128), (248, 4096 - 248)]
    );

    assert_eq!(arena.alloc(24), 72);
    // Split from the low end; the remainder keeps its list position.
    assert_eq!(
        arena.blocks(),
        vec![(0, 64), (96, 8), (112, 128), (248, 4096 - 248)]
    );

    assert_eq!(arena.alloc(100), 112);
}

#[test]
fn best_fit_ties_go_to_lowest_address() {
    let mut arena = Arena::new(4096);
    let a = arena.alloc(32);
    arena.alloc(8);
    let b = arena.alloc(32);
    arena.alloc(8);
    arena.free(b, 32);
    arena.free(a, 32);

    assert_eq!(arena.alloc(32), a);
    assert_eq!(arena.alloc(32), b);
}

#[test]
fn exact_fit_unlinks_region() {
    let mut arena = fragmented();
    let count = arena.blocks().len();
    assert_eq!(arena.alloc(32), 72);
    assert_eq!(arena.blocks().len(), count - 1);
    assert!(arena.blocks().iter().all(|&(off, _)| off != 72));
}

#[test]
fn release_coalesces_right_then_both_sides() {
    let mut arena = Arena::new(4096);
    let a = arena.alloc(64);
    let b = arena.alloc(64);
    let c = arena.alloc(64);

    arena.free(b, 64);
    assert_eq!(arena.blocks(), vec![(64, 64), (192, 4096 - 192)]);

    // a's end meets b's start.
    arena.free(a, 64);
    assert_eq!(arena.blocks(), vec![(0, 128), (192, 4096 - 192)]);

    // c touches both neighbours.
    arena.free(c, 64);
    assert_eq!(arena.blocks(), vec![(0, 4096)]);
    assert_eq!(arena.heap.free_bytes(), 4096);
}

#[test]
fn release_coalesces_left() {
    let mut arena = Arena::new(4096);
    let a = arena.alloc(64);
    let b = arena.alloc(64);
    let _c = arena.alloc(64);

    arena.free(a, 64);
    arena.free(b, 64);
    assert_eq!(arena.blocks(), vec![(0, 128), (192, 4096 - 192)]);
    arena.heap.verify().expect("list invariants");
}

#[test]
fn zero_sized_requests_are_rejected() {
    let mut arena = Arena::new(4096);
    assert_eq!(arena.heap.allocate(0), Err(KernelError::InvalidArgument));
    assert_eq!(arena.heap.allocate_stack(0), Err(KernelError::InvalidArgument));
    let p = arena.at(0);
    assert_eq!(arena.heap.release(p, 0), Err(KernelError::InvalidArgument));
    assert_eq!(arena.heap.free_bytes(), 4096);
}

#[test]
fn oversized_request_exhausts() {
    let mut arena = Arena::new(4096);
    assert_eq!(arena.heap.allocate(4097), Err(KernelError::ExhaustedResource));
    assert_eq!(
        arena.heap.allocate_stack(8192),
        Err(KernelError::ExhaustedResource)
    );
    assert_eq!(arena.alloc(4096), 0);
    assert_eq!(arena.heap.free_bytes(), 0);
    assert_eq!(arena.heap.allocate(8), Err(KernelError::ExhaustedResource));
}

#[test]
fn release_rejects_foreign_and_misaligned_pointers() {
    let mut arena = Arena::new(4096);
    let _a = arena.alloc(64);

    let below = arena.base().wrapping_sub(8) as *mut u8;
    let above = arena.at(4096);
    assert_eq!(arena.heap.release(below, 8), Err(KernelError::OutOfRange));
    assert_eq!(arena.heap.release(above, 8), Err(KernelError::OutOfRange));

    let odd = arena.at(4);
    assert_eq!(arena.heap.release(odd, 8), Err(KernelError::InvalidArgument));

    let tail = arena.at(4088);
    assert_eq!(arena.heap.release(tail, 64), Err(KernelError::OutOfRange));

    assert_eq!(arena.heap.free_bytes(), 4096 - 64);
}

#[test]
fn double_free_is_reported_without_side_effects() {
    let mut arena = Arena::new(4096);
    let a = arena.alloc(64);
    let _b = arena.alloc(64);
    arena.free(a, 64);
    let snapshot = arena.blocks();

    let p = arena.at(a);
    assert_eq!(arena.heap.release(p, 64), Err(KernelError::Corruption));
    let inner = arena.at(a + 8);
    assert_eq!(arena.heap.release(inner, 8), Err(KernelError::Corruption));

    assert_eq!(arena.blocks(), snapshot);
    assert_eq!(arena.heap.free_bytes(), 4096 - 64);
}

#[test]
fn stack_comes_from_highest_fitting_region() {
    let mut arena = Arena::new(4096);
    let low = arena.alloc(512);
    arena.alloc(8);
    arena.free(low, 512);
    assert_eq!(arena.blocks(), vec![(0, 512), (520, 4096 - 520)]);

    let sp = arena.heap.allocate_stack(256).expect("stack");
    let sp = arena.offset_of(sp.as_ptr());
    assert_eq!(sp, 4096 - WORD_SIZE);
    assert_eq!(arena.blocks(), vec![(0, 512), (520, 4096 - 520 - 256)]);
}

#[test]
fn stack_falls_back_to_lower_region_when_top_is_small() {
    let mut arena = Arena::new(4096);
    let low = arena.alloc(1024);
    arena.alloc(4096 - 1024 - 128);
    arena.free(low, 1024);
    assert_eq!(arena.blocks(), vec![(0, 1024), (4096 - 128, 128)]);

    let sp = arena.heap.allocate_stack(512).expect("stack");
    assert_eq!(arena.offset_of(sp.as_ptr()), 1024 - WORD_SIZE);
    assert_eq!(arena.blocks(), vec![(0, 512), (4096 - 128, 128)]);
}

#[test]
fn stack_exact_fit_unlinks_region() {
    let mut arena = Arena::new(4096);
    arena.alloc(4096 - 256);
    let sp = arena.heap.allocate_stack(256).expect("stack");
    assert_eq!(arena.offset_of(sp.as_ptr()), 4096 - WORD_SIZE);
    assert!(arena.blocks().is_empty());
    assert_eq!(arena.heap.free_bytes(), 0);

    arena.heap.release_stack(sp.as_ptr(), 256).expect("release stack");
    assert_eq!(arena.blocks(), vec![(4096 - 256, 256)]);
}

#[test]
fn stack_round_trip_restores_heap() {
    let mut arena = Arena::new(8192);
    let before = arena.blocks();
    let sp = arena.heap.allocate_stack(1000).expect("stack");
    assert_eq!(arena.heap.free_bytes(), 8192 - round_granule(1000));
    arena.heap.release_stack(sp.as_ptr(), 1000).expect("release stack");
    assert_eq!(arena.blocks(), before);
    assert_eq!(arena.heap.free_bytes(), 8192);
}

#[test]
fn stats_reflect_fragmentation() {
    let arena = fragmented();
    let stats = arena.heap.stats();
    assert_eq!(stats.total_size, 4096);
    assert_eq!(stats.free_blocks, 4);
    assert_eq!(stats.largest_free_block, 4096 - 248);
    assert_eq!(stats.free_size, 64 + 32 + 128 + 4096 - 248);
    arena.heap.print_heap_stats();
}

#[test]
fn init_rejects_bad_ranges() {
    let mut words = vec![0u64; 16];
    let range = words.as_mut_ptr_range();
    let start = range.start as *mut u8;
    let end = range.end as *mut u8;

    let mut heap = FreeListHeap::new();
    assert_eq!(
        unsafe { heap.init(core::ptr::null_mut(), end) },
        Err(KernelError::InvalidArgument)
    );
    assert_eq!(unsafe { heap.init(end, start) }, Err(KernelError::InvalidArgument));
    // Shrinks to nothing once both ends are aligned inwards.
    assert_eq!(
        unsafe { heap.init(start.wrapping_add(1), start.wrapping_add(8)) },
        Err(KernelError::InvalidArgument)
    );
    assert!(!heap.is_initialized());

    // Unaligned ends are trimmed to the granule.
    unsafe { heap.init(start.wrapping_add(3), end.wrapping_sub(2)) }.expect("init");
    assert_eq!(heap.total_bytes(), 128 - 16);
    assert_eq!(heap.bounds().0, start as usize + 8);
}

#[cfg(target_pointer_width = "64")]
#[test]
fn init_rejects_spans_beyond_offset_space() {
    let mut words = vec![0u64; 16];
    let start = words.as_mut_ptr() as *mut u8;
    let mut heap = FreeListHeap::new();
    // Rejected before anything is written.
    let far = start.wrapping_add(1 << 33);
    assert_eq!(unsafe { heap.init(start, far) }, Err(KernelError::OutOfRange));
}

#[test]
fn uninitialized_heap_refuses_work() {
    let mut heap = FreeListHeap::new();
    assert_eq!(heap.allocate(8), Err(KernelError::ExhaustedResource));
    let mut word = 0u64;
    let p = &mut word as *mut u64 as *mut u8;
    assert_eq!(heap.release(p, 8), Err(KernelError::OutOfRange));
}

/// Small deterministic generator so the mixed workload is reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }
}

#[derive(Clone, Copy)]
enum Live {
    Heap(*mut u8, usize),
    Stack(*mut u8, usize),
}

#[test]
fn mixed_workload_keeps_list_invariants() {
    const SIZE: usize = 16 * 1024;
    let mut arena = Arena::new(SIZE);
    let mut rng = Lcg(0x5eed);
    let mut live: Vec<Live> = Vec::new();
    let mut in_use = 0usize;

    for _ in 0..2000 {
        let roll = rng.next();
        if roll % 3 == 0 && !live.is_empty() {
            let idx = (rng.next() as usize) % live.len();
            match live.swap_remove(idx) {
                Live::Heap(p, n) => {
                    arena.heap.release(p, n).expect("release");
                    in_use -= round_granule(n);
                }
                Live::Stack(sp, n) => {
                    arena.heap.release_stack(sp, n).expect("release stack");
                    in_use -= round_granule(n);
                }
            }
        } else {
            let n = 1 + (rng.next() as usize) % 300;
            let result = if roll % 5 == 1 {
                arena
                    .heap
                    .allocate_stack(n)
                    .map(|sp| Live::Stack(sp.as_ptr(), n))
            } else {
                arena.heap.allocate(n).map(|p| Live::Heap(p.as_ptr(), n))
            };
            match result {
                Ok(entry) => {
                    live.push(entry);
                    in_use += round_granule(n);
                }
                Err(err) => assert_eq!(err, KernelError::ExhaustedResource),
            }
        }
        arena.heap.verify().expect("list invariants");
        assert_eq!(arena.heap.free_bytes() + in_use, SIZE);
    }

    for entry in live.drain(..) {
        match entry {
            Live::Heap(p, n) => arena.heap.release(p, n).expect("release"),
            Live::Stack(sp, n) => arena.heap.release_stack(sp, n).expect("release stack"),
        }
    }
    assert_eq!(arena.blocks(), vec![(0, SIZE)]);
}
