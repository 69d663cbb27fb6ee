//! Global kernel object and the operations running processes call.
//!
//! Every operation takes the kernel lock, decides what to do, and drops the
//! lock before any context switch so the next process can take it.

use core::ptr::NonNull;

use hearth_abi::{KernelResult, Message, Pid, ProcessName, ProcessState};
use hearth_lib::{klog_warn, InitFlag};
use hearth_mm::HeapStats;
use spin::Mutex;

use crate::scheduler::switch_context::switch_to;
use crate::scheduler::{Kernel, ProcessEntry, Receive, SchedStats, Switch};

static KERNEL: Mutex<Kernel> = Mutex::new(Kernel::new());
static MEMORY_READY: InitFlag = InitFlag::new();

#[inline]
fn with_kernel<R>(f: impl FnOnce(&mut Kernel) -> R) -> R {
    let mut guard = KERNEL.lock();
    f(&mut guard)
}

/// Carry out a switch decided under the lock.
fn run_switch(plan: Option<Switch>) {
    if let Some(switch) = plan {
        // SAFETY: both pointers come from the kernel object, which lives in a
        // static, and `next_sp` was saved by a switch or built at creation.
        unsafe { switch_to(switch.prev_sp, switch.next_sp) }
    }
}

// =============================================================================
// Memory
// =============================================================================

/// Hand `[start, end)` to the heap.
///
/// # Safety
///
/// The range must be valid, unused by anything else, and live for as long as
/// the kernel does.
pub unsafe fn memory_init(start: *mut u8, end: *mut u8) -> KernelResult<()> {
    if !MEMORY_READY.init_once() {
        klog_warn!("memory_init: called again, discarding the previous heap");
    }
    with_kernel(|k| unsafe { k.heap_mut().init(start, end) })
}

pub fn mem_alloc(nbytes: usize) -> KernelResult<NonNull<u8>> {
    with_kernel(|k| k.heap_mut().allocate(nbytes))
}

pub fn mem_free(ptr: *mut u8, nbytes: usize) -> KernelResult<()> {
    with_kernel(|k| k.heap_mut().release(ptr, nbytes))
}

pub fn stack_alloc(nbytes: usize) -> KernelResult<NonNull<u8>> {
    with_kernel(|k| k.heap_mut().allocate_stack(nbytes))
}

pub fn stack_free(stack_top: *mut u8, nbytes: usize) -> KernelResult<()> {
    with_kernel(|k| k.heap_mut().release_stack(stack_top, nbytes))
}

pub fn heap_stats() -> HeapStats {
    with_kernel(|k| k.heap().stats())
}

// =============================================================================
// Processes
// =============================================================================

/// Reset the process table and adopt the calling context as the idle process.
pub fn process_init() {
    with_kernel(Kernel::process_init)
}

pub fn process_create(entry: ProcessEntry, name: &str) -> KernelResult<Pid> {
    with_kernel(|k| k.create(entry, name))
}

/// Terminate the caller. Returns only when called by the idle process.
pub fn process_exit() {
    let plan = with_kernel(Kernel::exit_current);
    run_switch(plan);
}

pub fn getpid() -> Pid {
    with_kernel(|k| k.getpid())
}

pub fn process_state(pid: Pid) -> KernelResult<ProcessState> {
    with_kernel(|k| k.state_of(pid))
}

pub fn process_name(pid: Pid) -> Option<ProcessName> {
    with_kernel(|k| k.name_of(pid))
}

/// Suspend the caller until someone calls `wakeup` on it. No-op for idle.
pub fn block_current() {
    let plan = with_kernel(Kernel::block_current);
    run_switch(plan);
}

pub fn wakeup(pid: Pid) -> KernelResult<()> {
    with_kernel(|k| k.wakeup(pid))
}

pub fn set_priority(pid: Pid, priority: u8) -> KernelResult<()> {
    with_kernel(|k| k.set_priority(pid, priority))
}

pub fn get_priority(pid: Pid) -> KernelResult<u8> {
    with_kernel(|k| k.priority_of(pid))
}

pub fn live_processes() -> usize {
    with_kernel(|k| k.live_processes())
}

// =============================================================================
// Mailbox
// =============================================================================

pub fn send(pid: Pid, msg: Message) -> KernelResult<()> {
    with_kernel(|k| k.send(pid, msg))
}

/// Wait for and return the caller's next message.
pub fn receive() -> Message {
    loop {
        match with_kernel(Kernel::receive_or_block) {
            Receive::Message(msg) => return msg,
            Receive::Wait(plan) => run_switch(plan),
        }
    }
}

pub fn try_receive() -> Option<Message> {
    with_kernel(Kernel::try_receive)
}

// =============================================================================
// Scheduler
// =============================================================================

pub fn scheduler_init() {
    with_kernel(Kernel::scheduler_init)
}

pub fn yield_now() {
    let plan = with_kernel(Kernel::yield_current);
    run_switch(plan);
}

/// One dispatch pass; the idle loop's way of handing out the CPU.
pub fn schedule() {
    let plan = with_kernel(Kernel::dispatch);
    run_switch(plan);
}

pub fn sched_stats() -> SchedStats {
    with_kernel(|k| k.stats())
}
