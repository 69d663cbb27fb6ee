//! FFI boundary between the scheduler and context_switch.s.
//!
//! Only the symbols the assembly defines or calls live here; everything else
//! is plain Rust.

// ============================================================================
// Functions called FROM assembly (must be extern "C")
// ============================================================================

/// Reached through `hearth_process_exit_thunk` when a process entry returns.
#[unsafe(no_mangle)]
pub extern "C" fn hearth_entry_returned() -> ! {
    crate::kernel::process_exit();
    // Only idle survives exit, and idle never starts from an initial frame.
    loop {
        core::hint::spin_loop();
    }
}

// ============================================================================
// Functions defined IN assembly (must be declared as extern "C")
// ============================================================================

unsafe extern "C" {
    #[link_name = "hearth_context_switch"]
    fn context_switch_impl(prev_sp: *mut usize, next_sp: usize);
    pub fn hearth_process_exit_thunk();
}

/// # Safety
///
/// See `switch_context::switch_to`; callers must hold `SWITCH_BUSY`.
pub unsafe fn context_switch(prev_sp: *mut usize, next_sp: usize) {
    unsafe { context_switch_impl(prev_sp, next_sp) }
}
