//! Process control blocks and the fixed process table.

use hearth_abi::{
    pid_in_table, KernelError, KernelResult, Message, Pid, ProcessName, ProcessState,
    DEFAULT_PRIORITY, IDLE_PRIORITY, NPROC, NULL_PID, NUM_PRIORITY_LEVELS, PROC_STACK_SIZE,
};
use hearth_lib::{klog_debug, klog_info, klog_warn};

use super::scheduler::{Kernel, Switch};
use super::switch_context::write_initial_frame;

/// Entry point of a process. Returning from it exits the process.
pub type ProcessEntry = extern "C" fn();

/// Process control block.
#[derive(Clone, Copy, Debug)]
pub struct Process {
    pub state: ProcessState,
    pub priority: u8,
    /// Dispatch passes spent Ready since the last dispatch or promotion.
    pub wait_ticks: u32,
    /// Saved stack pointer; meaningful only while the process is not running.
    pub context: usize,
    /// Handle returned by the stack allocator, zero for the idle process.
    pub stack_top: usize,
    pub stack_size: usize,
    pub entry: Option<ProcessEntry>,
    pub mailbox: Option<Message>,
    pub name: ProcessName,
}

impl Process {
    pub const fn free() -> Self {
        Self {
            state: ProcessState::Free,
            priority: 0,
            wait_ticks: 0,
            context: 0,
            stack_top: 0,
            stack_size: 0,
            entry: None,
            mailbox: None,
            name: ProcessName::empty(),
        }
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        self.state == ProcessState::Free
    }
}

impl Default for Process {
    fn default() -> Self {
        Self::free()
    }
}

pub struct ProcessTable {
    slots: [Process; NPROC],
    next_pid: Pid,
}

impl ProcessTable {
    pub const fn new() -> Self {
        Self {
            slots: [Process::free(); NPROC],
            next_pid: 1,
        }
    }

    /// Free every slot and install the idle process as the running one.
    pub fn reset(&mut self) {
        self.slots = [Process::free(); NPROC];
        self.next_pid = 1;
        let idle = &mut self.slots[NULL_PID as usize];
        idle.state = ProcessState::Current;
        idle.priority = IDLE_PRIORITY;
        idle.name = ProcessName::new("idle");
    }

    /// Round-robin search for a free slot, never handing out the idle pid.
    fn allocate_pid(&mut self) -> Option<Pid> {
        for _ in 0..NPROC {
            let pid = self.next_pid;
            self.next_pid = (self.next_pid + 1) % NPROC as Pid;
            if pid != NULL_PID && self.slots[pid as usize].is_free() {
                return Some(pid);
            }
        }
        None
    }

    /// Slot for `pid` if it names a live process.
    pub fn get(&self, pid: Pid) -> Option<&Process> {
        if !pid_in_table(pid) {
            return None;
        }
        Some(&self.slots[pid as usize]).filter(|p| !p.is_free())
    }

    pub fn get_mut(&mut self, pid: Pid) -> Option<&mut Process> {
        if !pid_in_table(pid) {
            return None;
        }
        Some(&mut self.slots[pid as usize]).filter(|p| !p.is_free())
    }

    /// Live processes other than idle.
    pub fn live_count(&self) -> usize {
        self.iter().filter(|(pid, p)| *pid != NULL_PID && !p.is_free()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Pid, &Process)> {
        self.slots.iter().enumerate().map(|(i, p)| (i as Pid, p))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (Pid, &mut Process)> {
        self.slots.iter_mut().enumerate().map(|(i, p)| (i as Pid, p))
    }

    pub(crate) fn slot_mut(&mut self, pid: Pid) -> &mut Process {
        &mut self.slots[pid as usize]
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Kernel {
    pub fn process_init(&mut self) {
        self.procs.reset();
        self.queues.clear();
        self.current = NULL_PID;
        self.started = false;
        klog_info!("Process table initialized, {} slots", NPROC);
    }

    /// Create a Ready process that starts at `entry` on first dispatch.
    pub fn create(&mut self, entry: ProcessEntry, name: &str) -> KernelResult<Pid> {
        let Some(pid) = self.procs.allocate_pid() else {
            klog_info!("create: process table full");
            return Err(KernelError::ExhaustedResource);
        };
        let stack = self.heap.allocate_stack(PROC_STACK_SIZE)?;
        // SAFETY: the stack was just carved from the heap and is owned by `pid`.
        let context = unsafe { write_initial_frame(stack, entry) };
        let name = ProcessName::new(name);

        *self.procs.slot_mut(pid) = Process {
            state: ProcessState::Ready,
            priority: DEFAULT_PRIORITY,
            wait_ticks: 0,
            context,
            stack_top: stack.as_ptr() as usize,
            stack_size: PROC_STACK_SIZE,
            entry: Some(entry),
            mailbox: None,
            name,
        };

        if self.started {
            self.enqueue(pid)?;
        }
        klog_debug!("create: pid {} '{}'", pid, name);
        Ok(pid)
    }

    /// Tear down the running process and pick its successor.
    ///
    /// Returns `None` when called by idle, which never terminates.
    pub fn exit_current(&mut self) -> Option<Switch> {
        let pid = self.current;
        if pid == NULL_PID {
            return None;
        }
        let proc = *self.procs.slot_mut(pid);
        if proc.stack_top != 0 {
            if let Err(err) = self
                .heap
                .release_stack(proc.stack_top as *mut u8, proc.stack_size)
            {
                klog_warn!("exit: pid {} stack release failed: {}", pid, err);
            }
        }
        *self.procs.slot_mut(pid) = Process::free();
        klog_debug!("exit: pid {} '{}'", pid, proc.name);
        self.dispatch()
    }

    /// Mark the running process Blocked and dispatch. No-op for idle.
    pub fn block_current(&mut self) -> Option<Switch> {
        if self.current == NULL_PID {
            return None;
        }
        self.procs.slot_mut(self.current).state = ProcessState::Blocked;
        self.yield_current()
    }

    /// Move a Blocked process back to the ready queues.
    pub fn wakeup(&mut self, pid: Pid) -> KernelResult<()> {
        let proc = self.procs.get_mut(pid).ok_or(KernelError::InvalidState)?;
        if proc.state != ProcessState::Blocked {
            return Err(KernelError::InvalidState);
        }
        proc.state = ProcessState::Ready;
        self.enqueue(pid)
    }

    #[inline]
    pub fn getpid(&self) -> Pid {
        self.current
    }

    pub fn state_of(&self, pid: Pid) -> KernelResult<ProcessState> {
        self.procs
            .get(pid)
            .map(|p| p.state)
            .ok_or(KernelError::InvalidState)
    }

    pub fn name_of(&self, pid: Pid) -> Option<ProcessName> {
        self.procs.get(pid).map(|p| p.name)
    }

    pub fn priority_of(&self, pid: Pid) -> KernelResult<u8> {
        self.procs
            .get(pid)
            .map(|p| p.priority)
            .ok_or(KernelError::InvalidState)
    }

    /// Takes effect the next time the process is enqueued.
    pub fn set_priority(&mut self, pid: Pid, priority: u8) -> KernelResult<()> {
        let proc = self.procs.get_mut(pid).ok_or(KernelError::InvalidState)?;
        if priority as usize >= NUM_PRIORITY_LEVELS {
            return Err(KernelError::InvalidArgument);
        }
        proc.priority = priority;
        Ok(())
    }

    pub fn live_processes(&self) -> usize {
        self.procs.live_count()
    }

    pub fn processes(&self) -> &ProcessTable {
        &self.procs
    }
}
