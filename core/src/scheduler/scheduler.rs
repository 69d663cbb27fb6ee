use hearth_abi::{KernelResult, Pid, ProcessState, AGING_THRESHOLD, MAX_PRIORITY, NPROC, NULL_PID};
use hearth_lib::{klog_debug, klog_info, klog_trace, klog_warn};
use hearth_mm::FreeListHeap;

use super::ready_queue::ReadyQueues;
use super::task::ProcessTable;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedStats {
    pub switches: u64,
    pub yields: u64,
    pub dispatches: u64,
    pub promotions: u64,
}

/// A context switch decided under the kernel lock, to be carried out after
/// the lock is dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Switch {
    pub from: Pid,
    pub to: Pid,
    /// Where the outgoing stack pointer is saved.
    pub prev_sp: *mut usize,
    pub next_sp: usize,
}

/// All kernel state: the heap, the process table, the ready queues and the
/// running pid.
pub struct Kernel {
    pub(crate) heap: FreeListHeap,
    pub(crate) procs: ProcessTable,
    pub(crate) queues: ReadyQueues,
    pub(crate) current: Pid,
    /// Set by `scheduler_init`; later creations are queued immediately.
    pub(crate) started: bool,
    /// Receives the stack pointer of a process that exited mid-switch.
    discard_sp: usize,
    stats: SchedStats,
}

impl Kernel {
    pub const fn new() -> Self {
        Self {
            heap: FreeListHeap::new(),
            procs: ProcessTable::new(),
            queues: ReadyQueues::new(),
            current: NULL_PID,
            started: false,
            discard_sp: 0,
            stats: SchedStats {
                switches: 0,
                yields: 0,
                dispatches: 0,
                promotions: 0,
            },
        }
    }

    pub fn heap(&self) -> &FreeListHeap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut FreeListHeap {
        &mut self.heap
    }

    pub fn queues(&self) -> &ReadyQueues {
        &self.queues
    }

    pub fn stats(&self) -> SchedStats {
        self.stats
    }

    pub(crate) fn enqueue(&mut self, pid: Pid) -> KernelResult<()> {
        let priority = self.procs.slot_mut(pid).priority;
        self.queues.enqueue(pid, priority).inspect_err(|_| {
            klog_warn!("enqueue: ready queue {} full, pid {} dropped", priority, pid);
        })
    }

    /// Seed the ready queues with every Ready process in table order.
    pub fn scheduler_init(&mut self) {
        self.queues.clear();
        let mut seeded = 0;
        for pid in 1..NPROC as Pid {
            if self.procs.slot_mut(pid).state == ProcessState::Ready && self.enqueue(pid).is_ok() {
                seeded += 1;
            }
        }
        self.started = true;
        klog_info!("Scheduler initialized, {} ready", seeded);
    }

    /// Give up the CPU. A caller that is still Current goes to the back of
    /// its priority queue first.
    pub fn yield_current(&mut self) -> Option<Switch> {
        self.stats.yields += 1;
        let pid = self.current;
        if pid != NULL_PID {
            let proc = self.procs.slot_mut(pid);
            if proc.state == ProcessState::Current {
                proc.state = ProcessState::Ready;
                if self.enqueue(pid).is_err() {
                    self.procs.slot_mut(pid).state = ProcessState::Current;
                    return None;
                }
            }
        }
        self.dispatch()
    }

    /// Age every waiting process, then pick the next one to run.
    pub fn dispatch(&mut self) -> Option<Switch> {
        self.stats.dispatches += 1;
        self.age();

        let prev = self.current;
        let prev_state = self.procs.slot_mut(prev).state;
        let next = match self.queues.dequeue_highest() {
            Some(pid) => pid,
            None if prev_state == ProcessState::Current => return None,
            None => {
                klog_trace!("dispatch: nothing ready, falling back to idle");
                NULL_PID
            }
        };

        if next == prev {
            let proc = self.procs.slot_mut(next);
            proc.state = ProcessState::Current;
            proc.wait_ticks = 0;
            return None;
        }

        let prev_sp = match prev_state {
            ProcessState::Free => &raw mut self.discard_sp,
            ProcessState::Current => {
                // Switched away without going through yield.
                self.procs.slot_mut(prev).state = ProcessState::Ready;
                if prev != NULL_PID {
                    let _ = self.enqueue(prev);
                }
                &raw mut self.procs.slot_mut(prev).context
            }
            _ => &raw mut self.procs.slot_mut(prev).context,
        };

        let proc = self.procs.slot_mut(next);
        proc.state = ProcessState::Current;
        proc.wait_ticks = 0;
        let next_sp = proc.context;
        self.current = next;
        self.stats.switches += 1;
        klog_trace!("switch: pid {} -> pid {}", prev, next);

        Some(Switch {
            from: prev,
            to: next,
            prev_sp,
            next_sp,
        })
    }

    /// Bump the wait of every Ready process, promoting those that reach
    /// `AGING_THRESHOLD` by one level.
    fn age(&mut self) {
        let mut promotions = 0;
        for (pid, proc) in self.procs.iter_mut() {
            if pid == NULL_PID || proc.state != ProcessState::Ready {
                continue;
            }
            proc.wait_ticks += 1;
            if proc.wait_ticks >= AGING_THRESHOLD {
                proc.wait_ticks = 0;
                if proc.priority < MAX_PRIORITY {
                    proc.priority += 1;
                    promotions += 1;
                    klog_debug!("aging: pid {} promoted to {}", pid, proc.priority);
                }
            }
        }
        self.stats.promotions += promotions;
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}
