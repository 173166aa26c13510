//! Tokio integration: an idle scheduler driven by an async task.
//!
//! Services that already run a Tokio runtime have no winit loop and often no
//! dedicated thread for a [`MainLoop`](crate::MainLoop). [`idle_channel`]
//! gives them a scheduler plus an [`IdleDriver`] that runs scheduled tasks
//! one at a time, yielding to the runtime before each one so that other ready
//! work goes first.
//!
//! Tasks run one at a time but not necessarily on one OS thread: a driver
//! spawned on a multi-thread runtime can be resumed on any worker. When
//! callbacks must all run on the same thread, drive it from a
//! current-thread runtime or spawn it with `tokio::task::spawn_local` inside
//! a `LocalSet`.
//!
//! # Feature Flag
//!
//! This module requires the `tokio` feature to be enabled:
//!
//! ```toml
//! [dependencies]
//! arcadia-core = { version = "0.3", features = ["tokio"] }
//! ```
//!
//! # Example
//!
//! ```no_run
//! use arcadia_core::NotificationSource;
//! use arcadia_core::async_idle::idle_channel;
//!
//! # async fn example() {
//! let (scheduler, driver) = idle_channel();
//! let library_changed = NotificationSource::<()>::new(scheduler.shared());
//! library_changed.register(|_| println!("refresh the game list"));
//!
//! // Deliveries happen inside this task, one drain at a time.
//! tokio::spawn(driver.run());
//! library_changed.fire(());
//! # }
//! ```

use std::sync::Arc;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, error::TryRecvError, unbounded_channel};

use crate::idle::{IdleScheduler, IdleTask};
use crate::task::run_isolated;

/// Create a connected scheduler and driver.
pub fn idle_channel() -> (TokioIdleScheduler, IdleDriver) {
    let (sender, receiver) = unbounded_channel();
    (TokioIdleScheduler { sender }, IdleDriver { receiver })
}

/// Idle scheduler whose tasks are run by an [`IdleDriver`].
#[derive(Debug, Clone)]
pub struct TokioIdleScheduler {
    sender: UnboundedSender<IdleTask>,
}

impl TokioIdleScheduler {
    /// Wrap this scheduler for use with a notification source.
    pub fn shared(&self) -> Arc<dyn IdleScheduler> {
        Arc::new(self.clone())
    }

    /// Check if the driver has been dropped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl IdleScheduler for TokioIdleScheduler {
    fn schedule_once_at_idle(&self, task: IdleTask) {
        if self.sender.send(task).is_err() {
            tracing::debug!(target: "arcadia_core::idle", "idle driver dropped; discarding task");
        }
    }

    fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Runs tasks scheduled through a [`TokioIdleScheduler`].
#[derive(Debug)]
pub struct IdleDriver {
    receiver: UnboundedReceiver<IdleTask>,
}

impl IdleDriver {
    /// Run tasks until every scheduler handle has been dropped.
    ///
    /// Callbacks run inside this future, one at a time. On a multi-thread
    /// runtime consecutive tasks may run on different worker threads; use a
    /// current-thread runtime or a `LocalSet` for single-thread delivery.
    pub async fn run(mut self) {
        tracing::debug!(target: "arcadia_core::idle", "idle driver started");
        while let Some(task) = self.receiver.recv().await {
            // Let any other ready work go first.
            tokio::task::yield_now().await;
            run_isolated(task);
        }
        tracing::debug!(target: "arcadia_core::idle", "idle driver stopped");
    }

    /// Run every task that is already queued, without waiting.
    ///
    /// Returns the number of tasks run.
    pub fn run_pending(&mut self) -> usize {
        let mut count = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(task) => {
                    run_isolated(task);
                    count += 1;
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_run_pending() {
        let (scheduler, mut driver) = idle_channel();
        let hits = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let hits = hits.clone();
            scheduler.schedule_once_at_idle(Box::new(move || {
                hits.fetch_add(1, Ordering::SeqCst);
            }));
        }

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(driver.run_pending(), 3);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_schedule_after_driver_dropped() {
        let (scheduler, driver) = idle_channel();
        drop(driver);
        assert!(scheduler.is_closed());
        assert!(scheduler.shared().is_closed());
        scheduler.schedule_once_at_idle(Box::new(|| {}));
    }

    #[tokio::test]
    async fn test_driver_stops_when_schedulers_dropped() {
        let (scheduler, driver) = idle_channel();
        let hits = Arc::new(AtomicUsize::new(0));

        let hits_clone = hits.clone();
        scheduler.schedule_once_at_idle(Box::new(move || {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        }));
        drop(scheduler);

        driver.run().await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
