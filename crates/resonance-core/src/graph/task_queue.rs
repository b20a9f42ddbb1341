//! Out-of-graph task queue.
//!
//! Nodes enqueue work here instead of calling user code directly from
//! `process()` — e.g. a buffer player's "playback ended" notification. The
//! scheduler drains the queue, in FIFO order, after the block's final stage,
//! with the mix lock already released, so user callbacks can safely re-enter
//! the simulation's public API (connect a new node, start another
//! `playAsync`, etc.) without deadlocking.

/// A single deferred task: a boxed closure run once, outside the mix lock.
pub type Task = Box<dyn FnOnce() + Send>;

/// FIFO queue of deferred tasks accumulated during one block.
#[derive(Default)]
pub struct TaskQueue {
    pending: Vec<Task>,
}

impl TaskQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `task` to run after the current block, outside the mix lock.
    pub fn enqueue(&mut self, task: Task) {
        self.pending.push(task);
    }

    /// Drains and runs every queued task, in FIFO order. Intended to be
    /// called with the mix lock already released.
    pub fn drain_and_run(&mut self) {
        for task in self.pending.drain(..) {
            task();
        }
    }

    /// Removes and returns every queued task, in FIFO order, without
    /// running them — used by the scheduler, which must hand tasks back to
    /// a caller that runs them after releasing the mix lock rather than
    /// running them itself.
    pub fn drain(&mut self) -> Vec<Task> {
        self.pending.drain(..).collect()
    }

    /// `true` if no tasks are queued.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
