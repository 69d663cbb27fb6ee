//! hearth shared kernel types
//!
//! Canonical definitions for everything the memory manager, the process
//! table and the scheduler pass between each other: error codes, process
//! identity and state, mailbox messages and the tunable constants.

#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]

pub mod error;
pub mod process;

pub use error::*;
pub use process::*;
