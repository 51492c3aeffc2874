use super::{Sandbox, Thrown};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, VecDeque};

pub type Task = Box<dyn FnOnce(&mut Sandbox) -> Result<(), Thrown>>;

type TimerId = u64;

/// Timer queue keyed by `(due_ms, seq)`: earliest deadline first, ties broken
/// by registration order.
#[derive(Default)]
pub struct EventLoop {
    now_ms: u64,
    next_seq: TimerId,
    timers: BinaryHeap<Reverse<(u64, TimerId)>>,
    callbacks: HashMap<TimerId, Task>,
    microtasks: VecDeque<Task>,
}

impl EventLoop {
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn schedule(&mut self, delay_ms: u64, task: Task) {
        let id = self.next_seq;
        self.next_seq += 1;
        self.timers
            .push(Reverse((self.now_ms.saturating_add(delay_ms), id)));
        self.callbacks.insert(id, task);
    }

    pub fn enqueue_microtask(&mut self, task: Task) {
        self.microtasks.push_back(task);
    }

    pub fn pop_microtask(&mut self) -> Option<Task> {
        self.microtasks.pop_front()
    }

    pub fn next_due(&self) -> Option<u64> {
        self.timers.peek().map(|Reverse((due, _))| *due)
    }

    /// Removes the earliest timer and advances virtual time to its deadline.
    pub fn pop_timer(&mut self) -> Option<(u64, Task)> {
        let Reverse((due, id)) = self.timers.pop()?;
        let task = self.callbacks.remove(&id)?;
        self.now_ms = self.now_ms.max(due);
        Some((due, task))
    }
}
