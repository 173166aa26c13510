//! Deferred task queue for idle processing.
//!
//! Tasks are posted to run during idle time, when no other events are pending.
//! Both host loops keep one of these and work through it in batches.

use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::error::panic_message;
use crate::idle::IdleTask;

new_key_type! {
    /// A unique identifier for a posted idle task.
    pub struct IdleTaskId;
}

/// Default number of tasks processed per idle cycle.
pub(crate) const DEFAULT_BATCH_SIZE: usize = 32;

/// Manages the deferred task queue.
pub struct TaskQueue {
    /// Posted tasks that have not run or been cancelled.
    tasks: SlotMap<IdleTaskId, IdleTask>,
    /// Posting order. May hold ids of cancelled tasks; those are skipped.
    order: VecDeque<IdleTaskId>,
    /// Maximum number of tasks to process per idle cycle.
    batch_size: usize,
}

impl TaskQueue {
    /// Create a new task queue.
    pub fn new() -> Self {
        Self::with_batch_size(DEFAULT_BATCH_SIZE)
    }

    /// Create a new task queue with a custom batch size.
    ///
    /// A batch size of zero is treated as one.
    pub fn with_batch_size(batch_size: usize) -> Self {
        Self {
            tasks: SlotMap::with_key(),
            order: VecDeque::new(),
            batch_size: batch_size.max(1),
        }
    }

    /// Post a task to be executed during idle time.
    ///
    /// Returns the task ID that can be used to cancel the task.
    pub fn post(&mut self, task: IdleTask) -> IdleTaskId {
        let id = self.tasks.insert(task);
        self.order.push_back(id);
        id
    }

    /// Cancel a pending task.
    ///
    /// Returns `true` if the task was found and cancelled.
    pub fn cancel(&mut self, id: IdleTaskId) -> bool {
        self.tasks.remove(id).is_some()
    }

    /// Check if there are any pending tasks.
    pub fn has_pending(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Get the number of pending tasks.
    pub fn pending_count(&self) -> usize {
        self.tasks.len()
    }

    /// Remove the oldest live task.
    pub fn pop(&mut self) -> Option<IdleTask> {
        while let Some(id) = self.order.pop_front() {
            if let Some(task) = self.tasks.remove(id) {
                return Some(task);
            }
        }
        None
    }

    /// Remove every pending task without running it.
    pub fn take_all(&mut self) -> Vec<IdleTask> {
        self.order.clear();
        self.tasks.drain().map(|(_, task)| task).collect()
    }

    /// Get the batch size for idle processing.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Set the batch size for idle processing.
    pub fn set_batch_size(&mut self, size: usize) {
        self.batch_size = size.max(1);
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Run one idle task, containing any panic it raises.
///
/// Returns `false` if the task panicked.
pub(crate) fn run_isolated(task: IdleTask) -> bool {
    match catch_unwind(AssertUnwindSafe(task)) {
        Ok(()) => true,
        Err(payload) => {
            tracing::error!(
                target: "arcadia_core::idle",
                panic = %panic_message(payload.as_ref()),
                "idle task panicked"
            );
            false
        }
    }
}

/// A thread-safe wrapper around `TaskQueue` shared by a loop and its handles.
///
/// Tasks are popped under the lock and run with it released, so a running
/// task may post or cancel further tasks.
pub(crate) struct SharedTaskQueue {
    inner: Mutex<TaskQueue>,
}

impl SharedTaskQueue {
    pub fn with_batch_size(batch_size: usize) -> Self {
        Self {
            inner: Mutex::new(TaskQueue::with_batch_size(batch_size)),
        }
    }

    pub fn post(&self, task: IdleTask) -> IdleTaskId {
        self.inner.lock().post(task)
    }

    pub fn cancel(&self, id: IdleTaskId) -> bool {
        self.inner.lock().cancel(id)
    }

    pub fn has_pending(&self) -> bool {
        self.inner.lock().has_pending()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.lock().pending_count()
    }

    /// Drop every pending task without running it. Returns how many were
    /// dropped.
    pub fn discard_all(&self) -> usize {
        // Dropped outside the lock: a task's destructor may post again.
        let discarded = self.inner.lock().take_all();
        discarded.len()
    }

    /// Process up to `batch_size` tasks. Returns the number of tasks run.
    pub fn process_batch(&self) -> usize {
        let batch_size = self.inner.lock().batch_size();
        let mut count = 0;
        while count < batch_size {
            let task = self.inner.lock().pop();
            let Some(task) = task else {
                break;
            };
            run_isolated(task);
            count += 1;
        }
        count
    }

    /// Process tasks until the queue is empty, including tasks posted while
    /// processing. Returns the number of tasks run.
    #[cfg(test)]
    pub fn process_all(&self) -> usize {
        let mut count = 0;
        loop {
            let task = self.inner.lock().pop();
            let Some(task) = task else {
                break;
            };
            run_isolated(task);
            count += 1;
        }
        count
    }
}

impl Default for SharedTaskQueue {
    fn default() -> Self {
        Self::with_batch_size(DEFAULT_BATCH_SIZE)
    }
}
