#![cfg_attr(not(test), no_std)]

#[cfg(all(target_arch = "x86_64", not(windows), not(target_vendor = "apple")))]
use core::arch::global_asm;

#[cfg(all(target_arch = "x86_64", not(windows), not(target_vendor = "apple")))]
global_asm!(include_str!("../context_switch.s"), options(att_syntax));

pub mod ffi;
pub mod kernel;
pub mod scheduler;

pub use scheduler::scheduler as sched;
pub use scheduler::task;

pub use kernel::*;
pub use scheduler::{Kernel, Process, ProcessEntry, Receive, SchedStats, Switch};
