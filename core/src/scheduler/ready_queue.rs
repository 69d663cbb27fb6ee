use hearth_abi::{KernelError, KernelResult, Pid, NPROC, NUM_PRIORITY_LEVELS};

/// Circular FIFO of ready pids for one priority level.
#[derive(Clone, Copy)]
pub struct ReadyQueue {
    slots: [Pid; NPROC],
    head: usize,
    count: usize,
}

impl ReadyQueue {
    pub const fn new() -> Self {
        Self {
            slots: [0; NPROC],
            head: 0,
            count: 0,
        }
    }

    fn clear(&mut self) {
        self.head = 0;
        self.count = 0;
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    fn enqueue(&mut self, pid: Pid) -> KernelResult<()> {
        if self.count == NPROC {
            return Err(KernelError::ExhaustedResource);
        }
        let tail = (self.head + self.count) % NPROC;
        self.slots[tail] = pid;
        self.count += 1;
        Ok(())
    }

    fn dequeue(&mut self) -> Option<Pid> {
        if self.is_empty() {
            return None;
        }
        let pid = self.slots[self.head];
        self.head = (self.head + 1) % NPROC;
        self.count -= 1;
        Some(pid)
    }

    /// Queued pids, head first.
    pub fn iter(&self) -> impl Iterator<Item = Pid> + '_ {
        (0..self.count).map(move |i| self.slots[(self.head + i) % NPROC])
    }
}

impl Default for ReadyQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// One queue per priority level; higher levels are served first.
pub struct ReadyQueues {
    levels: [ReadyQueue; NUM_PRIORITY_LEVELS],
}

impl ReadyQueues {
    pub const fn new() -> Self {
        Self {
            levels: [ReadyQueue::new(); NUM_PRIORITY_LEVELS],
        }
    }

    pub fn clear(&mut self) {
        for queue in self.levels.iter_mut() {
            queue.clear();
        }
    }

    pub fn enqueue(&mut self, pid: Pid, priority: u8) -> KernelResult<()> {
        let idx = (priority as usize).min(NUM_PRIORITY_LEVELS - 1);
        self.levels[idx].enqueue(pid)
    }

    pub fn dequeue_highest(&mut self) -> Option<Pid> {
        self.levels.iter_mut().rev().find_map(|queue| queue.dequeue())
    }

    pub fn level(&self, priority: u8) -> &ReadyQueue {
        &self.levels[(priority as usize).min(NUM_PRIORITY_LEVELS - 1)]
    }

    pub fn total(&self) -> usize {
        self.levels.iter().map(ReadyQueue::len).sum()
    }
}

impl Default for ReadyQueues {
    fn default() -> Self {
        Self::new()
    }
}
