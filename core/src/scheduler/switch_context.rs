//! Stack image consumed by `hearth_context_switch` and the guarded call into it.
//!
//! A suspended process is a single saved stack pointer. The switch routine
//! pushes `rbp, rbx, r12, r13, r14, r15`, so the word at the saved pointer
//! is `r15` and the word after `rbp` is the address `ret` resumes at.

use core::mem::size_of;
use core::ptr::NonNull;

use hearth_lib::{align_down, StateFlag};

use super::task::ProcessEntry;

/// Callee-saved registers the switch routine saves and restores.
pub const CALLEE_SAVED_REGS: usize = 6;
pub const STACK_ALIGN: usize = 16;

/// Set while a switch is in flight; the assembly clears it once the
/// incoming stack is live.
#[unsafe(export_name = "hearth_switch_busy")]
pub static SWITCH_BUSY: StateFlag = StateFlag::new();

/// Initial image of a process that has never run.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InitialFrame {
    /// Popped as `r15, r14, r13, r12, rbx, rbp`.
    pub callee_saved: [usize; CALLEE_SAVED_REGS],
    /// First `ret` of the switch routine lands here.
    pub resume: usize,
    /// Return address seen by `resume` if the entry function returns.
    pub fallback_return: usize,
}

const _: () = assert!(size_of::<InitialFrame>() % STACK_ALIGN == 0);

impl InitialFrame {
    pub fn new(entry: ProcessEntry) -> Self {
        Self {
            callee_saved: [0; CALLEE_SAVED_REGS],
            resume: entry as usize,
            fallback_return: exit_thunk_addr(),
        }
    }
}

/// Lay down an `InitialFrame` below `stack` and return the stack pointer
/// to save as the process context.
///
/// The frame ends just under the 16-byte boundary at or below `stack`, so
/// `resume` starts with the stack aligned as if it had been called.
///
/// # Safety
///
/// `stack` must be the handle of a stack at least
/// `size_of::<InitialFrame>() + STACK_ALIGN` bytes deep, owned by the caller.
pub unsafe fn write_initial_frame(stack: NonNull<u8>, entry: ProcessEntry) -> usize {
    let aligned = align_down(stack.as_ptr() as usize, STACK_ALIGN);
    let sp = aligned - size_of::<InitialFrame>();
    // SAFETY: `sp..aligned` lies inside the caller's stack per the contract.
    unsafe {
        stack
            .as_ptr()
            .wrapping_sub(stack.as_ptr() as usize - sp)
            .cast::<InitialFrame>()
            .write(InitialFrame::new(entry));
    }
    sp
}

#[cfg(all(target_arch = "x86_64", not(windows), not(target_vendor = "apple")))]
fn exit_thunk_addr() -> usize {
    super::ffi_boundary::hearth_process_exit_thunk as usize
}

#[cfg(not(all(target_arch = "x86_64", not(windows), not(target_vendor = "apple"))))]
fn exit_thunk_addr() -> usize {
    0
}

/// Save the running context into `*prev_sp` and resume `next_sp`.
///
/// Returns once some later switch resumes `*prev_sp`.
///
/// # Safety
///
/// `prev_sp` must stay valid until the switch completes and `next_sp` must be
/// a context saved by this routine or built by `write_initial_frame` whose
/// stack is still owned by its process.
#[cfg(all(target_arch = "x86_64", not(windows), not(target_vendor = "apple")))]
pub unsafe fn switch_to(prev_sp: *mut usize, next_sp: usize) {
    if !SWITCH_BUSY.enter() {
        panic!("context switch re-entered");
    }
    // SAFETY: forwarded from the caller; the routine clears SWITCH_BUSY.
    unsafe { super::ffi_boundary::context_switch(prev_sp, next_sp) }
}

#[cfg(not(all(target_arch = "x86_64", not(windows), not(target_vendor = "apple"))))]
pub unsafe fn switch_to(_prev_sp: *mut usize, _next_sp: usize) {
    panic!("context switching is only implemented for x86_64");
}
