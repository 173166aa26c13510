//! Idle scheduling: "run this once, later, on the loop's own thread".
//!
//! [`NotificationSource`](crate::NotificationSource) never talks to a concrete
//! event loop. It is handed an [`IdleScheduler`] and asks it to run the drain
//! routine at idle time. Host loops implement the trait:
//!
//! - [`crate::MainLoopHandle`] for the headless [`crate::MainLoop`]
//! - [`crate::AppIdleScheduler`] for the windowed [`crate::Application`]
//! - `TokioIdleScheduler` behind the `tokio` feature
//!
//! Two loop-free implementations live here for tests and synchronous tools:
//! [`ImmediateScheduler`] and [`ManualScheduler`].

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

/// A boxed zero-argument callable handed to an idle scheduler.
pub type IdleTask = Box<dyn FnOnce() + Send + 'static>;

/// Capability to run a task once, later, on the owning loop's thread.
///
/// Implementations must run each task at most once. Scheduling the same
/// logical work many times is allowed; callers are expected to make their
/// tasks idempotent.
pub trait IdleScheduler: Send + Sync {
    /// Schedule `task` to run once when the loop is otherwise idle.
    ///
    /// A scheduler whose loop has already shut down drops the task without
    /// running it.
    fn schedule_once_at_idle(&self, task: IdleTask);

    /// Whether the loop behind this scheduler has shut down for good.
    ///
    /// Tasks scheduled on a closed scheduler will never run.
    fn is_closed(&self) -> bool {
        false
    }
}

impl<S: IdleScheduler + ?Sized> IdleScheduler for Arc<S> {
    fn schedule_once_at_idle(&self, task: IdleTask) {
        (**self).schedule_once_at_idle(task);
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }
}

/// Runs every task synchronously, inside `schedule_once_at_idle`.
///
/// Delivery is no longer deferred, which makes this the simplest substitute
/// for a real loop in unit tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateScheduler;

impl IdleScheduler for ImmediateScheduler {
    fn schedule_once_at_idle(&self, task: IdleTask) {
        task();
    }
}

/// Collects scheduled tasks until [`run_pending`](Self::run_pending) is called.
///
/// This gives tests full control over when "idle time" happens.
///
/// # Example
///
/// ```
/// use arcadia_core::{IdleScheduler, ManualScheduler};
///
/// let scheduler = ManualScheduler::new();
/// scheduler.schedule_once_at_idle(Box::new(|| println!("idle")));
/// assert_eq!(scheduler.pending(), 1);
/// assert_eq!(scheduler.run_pending(), 1);
/// ```
#[derive(Default)]
pub struct ManualScheduler {
    tasks: Mutex<VecDeque<IdleTask>>,
}

impl ManualScheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks waiting to run.
    pub fn pending(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Run tasks until none are left, including tasks scheduled by the tasks
    /// themselves. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut count = 0;
        loop {
            // Pop under the lock, run without it: tasks may schedule more.
            let task = self.tasks.lock().pop_front();
            let Some(task) = task else {
                break;
            };
            task();
            count += 1;
        }
        count
    }

    /// Drop every queued task without running it.
    pub fn discard_pending(&self) -> usize {
        let drained: Vec<IdleTask> = self.tasks.lock().drain(..).collect();
        drained.len()
    }
}

impl IdleScheduler for ManualScheduler {
    fn schedule_once_at_idle(&self, task: IdleTask) {
        self.tasks.lock().push_back(task);
    }
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}
