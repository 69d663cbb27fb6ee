#![cfg_attr(not(test), no_std)]

pub mod alignment;
pub mod console;
pub mod init_flag;
pub mod klog;
pub mod service_cell;
pub mod service_macro;

#[doc(hidden)]
pub use paste;

pub use alignment::{align_down, align_up, is_aligned};
pub use init_flag::{InitFlag, StateFlag};
pub use klog::{klog_get_level, klog_init, klog_is_enabled, klog_set_level, KlogLevel};
pub use service_cell::ServiceCell;
