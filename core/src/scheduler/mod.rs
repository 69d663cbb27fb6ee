//! Process table, ready queues, dispatch and mailboxes.

#[cfg(all(target_arch = "x86_64", not(windows), not(target_vendor = "apple")))]
pub mod ffi_boundary;
pub mod mailbox;
pub mod ready_queue;
#[allow(clippy::module_inception)]
pub mod scheduler;
pub mod switch_context;
pub mod task;


pub use mailbox::Receive;
pub use ready_queue::{ReadyQueue, ReadyQueues};
pub use scheduler::{Kernel, SchedStats, Switch};
pub use switch_context::{InitialFrame, SWITCH_BUSY};
pub use task::{Process, ProcessEntry, ProcessTable};
