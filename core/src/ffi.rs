//! C-ABI entry points over `kernel`, for boot and shell code that is not
//! written in Rust.
//!
//! Results are flattened to integers: non-negative on success, a negative
//! `KernelError` code on failure. Pointer-returning calls yield null.

use core::ffi::{c_char, c_int, c_void, CStr};
use core::ptr;

use hearth_abi::{result_to_c_int, KernelError, KernelResult, Message, Pid};

use crate::kernel;
use crate::scheduler::ProcessEntry;

#[inline]
fn pid_from_c(pid: c_int) -> KernelResult<Pid> {
    Pid::try_from(pid).map_err(|_| KernelError::InvalidState)
}

#[inline]
fn value_or_code(result: KernelResult<c_int>) -> c_int {
    result.unwrap_or_else(KernelError::as_c_int)
}

/// # Safety
///
/// See [`kernel::memory_init`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hearth_memory_init(start: *mut c_void, end: *mut c_void) -> c_int {
    result_to_c_int(unsafe { kernel::memory_init(start.cast(), end.cast()) })
}

#[unsafe(no_mangle)]
pub extern "C" fn hearth_mem_alloc(nbytes: usize) -> *mut c_void {
    kernel::mem_alloc(nbytes).map_or(ptr::null_mut(), |p| p.as_ptr().cast())
}

#[unsafe(no_mangle)]
pub extern "C" fn hearth_mem_free(block: *mut c_void, nbytes: usize) -> c_int {
    result_to_c_int(kernel::mem_free(block.cast(), nbytes))
}

#[unsafe(no_mangle)]
pub extern "C" fn hearth_stack_alloc(nbytes: usize) -> *mut c_void {
    kernel::stack_alloc(nbytes).map_or(ptr::null_mut(), |p| p.as_ptr().cast())
}

#[unsafe(no_mangle)]
pub extern "C" fn hearth_stack_free(stack_top: *mut c_void, nbytes: usize) -> c_int {
    result_to_c_int(kernel::stack_free(stack_top.cast(), nbytes))
}

#[unsafe(no_mangle)]
pub extern "C" fn hearth_process_init() {
    kernel::process_init();
}

/// Returns the new pid. A null `entry` is rejected.
///
/// # Safety
///
/// `name` must be null or point to a NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hearth_process_create(
    entry: Option<ProcessEntry>,
    name: *const c_char,
) -> c_int {
    let Some(entry) = entry else {
        return KernelError::InvalidArgument.as_c_int();
    };
    let name = if name.is_null() {
        ""
    } else {
        // SAFETY: caller guarantees a NUL-terminated string.
        unsafe { CStr::from_ptr(name) }.to_str().unwrap_or("")
    };
    value_or_code(kernel::process_create(entry, name).map(|pid| pid as c_int))
}

#[unsafe(no_mangle)]
pub extern "C" fn hearth_process_exit() {
    kernel::process_exit();
}

#[unsafe(no_mangle)]
pub extern "C" fn hearth_getpid() -> c_int {
    kernel::getpid() as c_int
}

/// Returns the `ProcessState` discriminant.
#[unsafe(no_mangle)]
pub extern "C" fn hearth_process_state(pid: c_int) -> c_int {
    value_or_code(pid_from_c(pid).and_then(kernel::process_state).map(|s| s as c_int))
}

/// Copy the NUL-terminated name of `pid` into `buf` and return its length.
///
/// # Safety
///
/// `buf` must be valid for `len` bytes of writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hearth_process_name(pid: c_int, buf: *mut c_char, len: usize) -> c_int {
    if buf.is_null() || len == 0 {
        return KernelError::InvalidArgument.as_c_int();
    }
    let Some(name) = pid_from_c(pid).ok().and_then(kernel::process_name) else {
        return KernelError::InvalidState.as_c_int();
    };
    let bytes = name.as_str().as_bytes();
    let n = bytes.len().min(len - 1);
    // SAFETY: `n + 1 <= len` bytes fit in the caller's buffer.
    unsafe {
        ptr::copy_nonoverlapping(bytes.as_ptr(), buf.cast::<u8>(), n);
        buf.add(n).write(0);
    }
    n as c_int
}

#[unsafe(no_mangle)]
pub extern "C" fn hearth_block_current() {
    kernel::block_current();
}

#[unsafe(no_mangle)]
pub extern "C" fn hearth_wakeup(pid: c_int) -> c_int {
    result_to_c_int(pid_from_c(pid).and_then(kernel::wakeup))
}

#[unsafe(no_mangle)]
pub extern "C" fn hearth_set_priority(pid: c_int, priority: c_int) -> c_int {
    let result = pid_from_c(pid).and_then(|pid| {
        let priority = u8::try_from(priority).map_err(|_| KernelError::InvalidArgument)?;
        kernel::set_priority(pid, priority)
    });
    result_to_c_int(result)
}

#[unsafe(no_mangle)]
pub extern "C" fn hearth_get_priority(pid: c_int) -> c_int {
    value_or_code(pid_from_c(pid).and_then(kernel::get_priority).map(c_int::from))
}

#[unsafe(no_mangle)]
pub extern "C" fn hearth_send(pid: c_int, msg: Message) -> c_int {
    result_to_c_int(pid_from_c(pid).and_then(|pid| kernel::send(pid, msg)))
}

#[unsafe(no_mangle)]
pub extern "C" fn hearth_receive() -> Message {
    kernel::receive()
}

#[unsafe(no_mangle)]
pub extern "C" fn hearth_scheduler_init() {
    kernel::scheduler_init();
}

#[unsafe(no_mangle)]
pub extern "C" fn hearth_yield() {
    kernel::yield_now();
}

#[unsafe(no_mangle)]
pub extern "C" fn hearth_schedule() {
    kernel::schedule();
}
