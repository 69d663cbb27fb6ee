//! Process-related types and constants shared between kernel subsystems.

use core::fmt;

// =============================================================================
// Process Configuration Constants
// =============================================================================

/// Number of slots in the process table, idle process included.
pub const NPROC: usize = 8;
/// Name buffer size; stored names hold at most `NAME_LEN - 1` bytes.
pub const NAME_LEN: usize = 16;
/// Pid of the idle (null) process.
pub const NULL_PID: Pid = 0;
pub const PROC_STACK_SIZE: usize = 0x8000; // 32KB

// =============================================================================
// Priority Constants
// =============================================================================

/// Priorities are `0..NUM_PRIORITY_LEVELS`; higher values run first.
pub const NUM_PRIORITY_LEVELS: usize = 8;
pub const MAX_PRIORITY: u8 = (NUM_PRIORITY_LEVELS - 1) as u8;
pub const DEFAULT_PRIORITY: u8 = 1;
pub const IDLE_PRIORITY: u8 = 0;
/// Dispatch passes a Ready process waits before it is promoted one level.
pub const AGING_THRESHOLD: u32 = 100;

pub type Pid = u32;
pub type Message = i32;

// =============================================================================
// Process State
// =============================================================================

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessState {
    /// Slot unused; pid may be handed out again.
    #[default]
    Free = 0,
    Ready = 1,
    Current = 2,
    /// Reserved; exit resets a slot straight to `Free`.
    Terminated = 3,
    /// Reserved; no operation enters it.
    Sleeping = 4,
    Blocked = 5,
}

impl ProcessState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Ready => "ready",
            Self::Current => "current",
            Self::Terminated => "terminated",
            Self::Sleeping => "sleeping",
            Self::Blocked => "blocked",
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ProcessName - fixed-size display name
// =============================================================================

/// Inline process name, truncated on a character boundary to fit the buffer.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessName {
    bytes: [u8; NAME_LEN],
    len: u8,
}

impl ProcessName {
    pub const fn empty() -> Self {
        Self {
            bytes: [0; NAME_LEN],
            len: 0,
        }
    }

    pub fn new(name: &str) -> Self {
        let mut end = name.len().min(NAME_LEN - 1);
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        let mut bytes = [0u8; NAME_LEN];
        bytes[..end].copy_from_slice(&name.as_bytes()[..end]);
        Self {
            bytes,
            len: end as u8,
        }
    }

    pub fn as_str(&self) -> &str {
        // Only ever filled from a &str cut at a char boundary.
        core::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Debug for ProcessName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for ProcessName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True when `pid` indexes the process table at all (state is not checked).
#[inline]
pub const fn pid_in_table(pid: Pid) -> bool {
    (pid as usize) < NPROC
}
