//! Single-slot synchronous mailboxes.
//!
//! Each process holds at most one undelivered message. A send to a full
//! mailbox fails instead of queueing, and a receive with nothing pending
//! blocks the receiver until a sender wakes it.

use hearth_abi::{KernelError, KernelResult, Message, Pid, ProcessState, NULL_PID};
use hearth_lib::klog_trace;

use super::scheduler::{Kernel, Switch};

/// Outcome of one receive attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Receive {
    Message(Message),
    /// Nothing pending; carry out the switch (if any) and try again.
    Wait(Option<Switch>),
}

impl Kernel {
    /// Deliver `msg` to `pid`, waking it if it is blocked. Never blocks.
    pub fn send(&mut self, pid: Pid, msg: Message) -> KernelResult<()> {
        let target = self.procs.get_mut(pid).ok_or(KernelError::InvalidState)?;
        if target.mailbox.is_some() {
            klog_trace!("send: pid {} mailbox full", pid);
            return Err(KernelError::ExhaustedResource);
        }
        target.mailbox = Some(msg);
        if target.state == ProcessState::Blocked {
            self.wakeup(pid)?;
        }
        Ok(())
    }

    /// Take the running process's pending message, if any.
    pub fn try_receive(&mut self) -> Option<Message> {
        self.procs.slot_mut(self.current).mailbox.take()
    }

    /// Take the pending message or suspend the caller until one arrives.
    ///
    /// Idle cannot block, so it yields instead.
    pub fn receive_or_block(&mut self) -> Receive {
        if let Some(msg) = self.try_receive() {
            return Receive::Message(msg);
        }
        let switch = if self.current == NULL_PID {
            self.yield_current()
        } else {
            self.block_current()
        };
        Receive::Wait(switch)
    }
}
