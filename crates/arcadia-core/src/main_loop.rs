//! A headless, single-threaded main loop.
//!
//! [`MainLoop`] is the host loop for tools and services that have no window:
//! it owns the thread it was created on and runs two kinds of work there.
//!
//! - **Invocations** posted with [`MainLoopHandle::invoke`] run as soon as the
//!   loop gets to them.
//! - **Idle tasks** posted with [`MainLoopHandle::post_idle`] (and every
//!   [`NotificationSource`](crate::NotificationSource) drain scheduled through
//!   the handle) run only when no invocation is waiting.
//!
//! Handles are cheap to clone and can be sent to any thread.
//!
//! # Example
//!
//! ```
//! use arcadia_core::{MainLoop, NotificationSource};
//!
//! let main_loop = MainLoop::new();
//! let library_changed = NotificationSource::<()>::new(main_loop.scheduler());
//! library_changed.register(|_| println!("refresh the game list"));
//!
//! let handle = main_loop.handle();
//! std::thread::spawn(move || {
//!     library_changed.fire(());
//!     let quit = handle.clone();
//!     handle.post_idle(Box::new(move || quit.quit())).unwrap();
//! });
//!
//! main_loop.run().unwrap();
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};

use crate::error::{CoreError, Result};
use crate::idle::{IdleScheduler, IdleTask};
use crate::logging::{PerfSpan, span_names};
use crate::task::{DEFAULT_BATCH_SIZE, IdleTaskId, SharedTaskQueue, run_isolated};
use crate::thread_check::OwnerThread;

/// Configuration for creating a [`MainLoop`].
#[derive(Debug, Clone)]
pub struct MainLoopConfig {
    /// Name used in log output.
    pub name: String,
    /// Maximum number of idle tasks run before the loop checks for new
    /// invocations again.
    pub batch_size: usize,
}

impl Default for MainLoopConfig {
    fn default() -> Self {
        Self {
            name: "arcadia-main".to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl MainLoopConfig {
    /// Create a new configuration with the given loop name.
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Builder for creating a [`MainLoop`] with custom configuration.
#[derive(Debug, Default)]
pub struct MainLoopBuilder {
    config: MainLoopConfig,
}

impl MainLoopBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the loop name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set the idle batch size.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    /// Build the loop, bound to the calling thread.
    pub fn build(self) -> MainLoop {
        MainLoop::with_config(self.config)
    }
}

/// Messages that wake the loop.
enum LoopMessage {
    /// Run as soon as possible.
    Invoke(IdleTask),
    /// Idle work was queued; nothing else to do.
    WakeUp,
    /// Stop `run()`.
    Quit,
}

/// State shared by the loop and its handles.
struct LoopShared {
    name: String,
    tasks: SharedTaskQueue,
    should_quit: AtomicBool,
    /// Set once the `MainLoop` is dropped. Nothing posted afterwards runs.
    closed: AtomicBool,
}

/// A single-threaded loop that runs posted work on the thread that owns it.
pub struct MainLoop {
    shared: Arc<LoopShared>,
    sender: Sender<LoopMessage>,
    receiver: Receiver<LoopMessage>,
    owner: OwnerThread,
}

impl Default for MainLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl MainLoop {
    /// Create a loop bound to the calling thread.
    pub fn new() -> Self {
        Self::with_config(MainLoopConfig::default())
    }

    /// Create a loop with a custom configuration, bound to the calling thread.
    pub fn with_config(config: MainLoopConfig) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            shared: Arc::new(LoopShared {
                name: config.name,
                tasks: SharedTaskQueue::with_batch_size(config.batch_size),
                should_quit: AtomicBool::new(false),
                closed: AtomicBool::new(false),
            }),
            sender,
            receiver,
            owner: OwnerThread::current(),
        }
    }

    /// Create a builder for custom configuration.
    pub fn builder() -> MainLoopBuilder {
        MainLoopBuilder::new()
    }

    /// Get a handle for posting work from any thread.
    pub fn handle(&self) -> MainLoopHandle {
        MainLoopHandle {
            shared: self.shared.clone(),
            sender: self.sender.clone(),
        }
    }

    /// Get this loop as a shareable idle scheduler for notification sources.
    pub fn scheduler(&self) -> Arc<dyn IdleScheduler> {
        Arc::new(self.handle())
    }

    /// The loop's name.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Get the number of idle tasks waiting to run.
    pub fn pending_idle_count(&self) -> usize {
        self.shared.tasks.pending_count()
    }

    /// Run the loop until [`MainLoopHandle::quit`] is called.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::WrongThread`] if called from a thread other than
    /// the one that created the loop.
    #[tracing::instrument(skip(self), fields(name = %self.shared.name), target = "arcadia_core::main_loop", level = "debug")]
    pub fn run(&self) -> Result<()> {
        self.owner.check()?;
        tracing::debug!(target: "arcadia_core::main_loop", "starting main loop");

        loop {
            self.dispatch_ready_messages();
            if self.take_quit() {
                break;
            }

            if self.shared.tasks.has_pending() {
                self.process_idle_batch();
                continue;
            }

            // Nothing to do: block until someone posts.
            match self.receiver.recv() {
                Ok(message) => {
                    self.dispatch(message);
                }
                Err(_) => break,
            }
        }

        tracing::debug!(target: "arcadia_core::main_loop", "main loop stopped");
        Ok(())
    }

    /// Process every invocation and idle task that is ready, without blocking.
    ///
    /// Work posted while processing is included. Returns how many tasks ran.
    /// This is how tests, and hosts that embed the loop in another loop, pump
    /// it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::WrongThread`] if called from a thread other than
    /// the one that created the loop.
    pub fn run_until_idle(&self) -> Result<usize> {
        self.owner.check()?;
        let mut count = 0;
        loop {
            count += self.dispatch_ready_messages();
            if !self.shared.tasks.has_pending() {
                break;
            }
            count += self.process_idle_batch();
        }
        // A quit request has nothing to stop here.
        self.take_quit();
        Ok(count)
    }

    fn take_quit(&self) -> bool {
        self.shared.should_quit.swap(false, Ordering::SeqCst)
    }

    /// Dispatch messages until the channel is empty. Returns how many
    /// invocations ran.
    fn dispatch_ready_messages(&self) -> usize {
        let mut invoked = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(message) => invoked += self.dispatch(message),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        invoked
    }

    fn dispatch(&self, message: LoopMessage) -> usize {
        match message {
            LoopMessage::Invoke(task) => {
                run_isolated(task);
                1
            }
            LoopMessage::WakeUp => 0,
            LoopMessage::Quit => {
                tracing::trace!(target: "arcadia_core::main_loop", "quit message received");
                self.shared.should_quit.store(true, Ordering::SeqCst);
                0
            }
        }
    }

    fn process_idle_batch(&self) -> usize {
        let _span = PerfSpan::new(span_names::IDLE_BATCH);
        let count = self.shared.tasks.process_batch();
        tracing::trace!(target: "arcadia_core::main_loop", count, "processed idle tasks");
        count
    }
}

impl Drop for MainLoop {
    fn drop(&mut self) {
        // Handles may outlive the loop; release the work they can no longer
        // get run.
        self.shared.closed.store(true, Ordering::SeqCst);
        let discarded = self.shared.tasks.discard_all();
        if discarded > 0 {
            tracing::debug!(
                target: "arcadia_core::main_loop",
                name = %self.shared.name,
                discarded,
                "loop dropped with idle tasks pending"
            );
        }
    }
}

impl std::fmt::Debug for MainLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainLoop")
            .field("name", &self.shared.name)
            .field("pending_idle", &self.shared.tasks.pending_count())
            .finish()
    }
}

/// A cloneable, thread-safe handle onto a [`MainLoop`].
#[derive(Clone)]
pub struct MainLoopHandle {
    shared: Arc<LoopShared>,
    sender: Sender<LoopMessage>,
}

impl MainLoopHandle {
    /// Queue `task` to run when the loop is idle.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LoopClosed`] if the loop has been dropped. The
    /// task is dropped without running.
    pub fn post_idle(&self, task: IdleTask) -> Result<IdleTaskId> {
        if self.is_closed() {
            return Err(CoreError::LoopClosed);
        }
        let id = self.shared.tasks.post(task);
        // Checked again after posting: the loop may have been dropped and
        // cleared its queue in between.
        if self.is_closed() || self.sender.send(LoopMessage::WakeUp).is_err() {
            self.shared.tasks.cancel(id);
            return Err(CoreError::LoopClosed);
        }
        Ok(id)
    }

    /// Check if the loop has been dropped.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Cancel an idle task that has not run yet.
    ///
    /// Returns `true` if the task was found and cancelled.
    pub fn cancel_idle(&self, id: IdleTaskId) -> bool {
        self.shared.tasks.cancel(id)
    }

    /// Run `task` on the loop thread ahead of any idle work.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LoopClosed`] if the loop has been dropped.
    pub fn invoke(&self, task: IdleTask) -> Result<()> {
        if self.is_closed() {
            return Err(CoreError::LoopClosed);
        }
        self.sender
            .send(LoopMessage::Invoke(task))
            .map_err(|_| CoreError::LoopClosed)
    }

    /// Ask the loop to return from [`MainLoop::run`].
    ///
    /// The quit is not immediate; work already dispatched finishes first.
    pub fn quit(&self) {
        tracing::debug!(target: "arcadia_core::main_loop", name = %self.shared.name, "quit requested");
        self.shared.should_quit.store(true, Ordering::SeqCst);
        let _ = self.sender.send(LoopMessage::Quit);
    }
}

impl IdleScheduler for MainLoopHandle {
    fn schedule_once_at_idle(&self, task: IdleTask) {
        if let Err(err) = self.post_idle(task) {
            tracing::debug!(
                target: "arcadia_core::main_loop",
                name = %self.shared.name,
                %err,
                "dropping idle task"
            );
        }
    }

    fn is_closed(&self) -> bool {
        MainLoopHandle::is_closed(self)
    }
}

impl std::fmt::Debug for MainLoopHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainLoopHandle")
            .field("name", &self.shared.name)
            .finish()
    }
}

static_assertions::assert_impl_all!(MainLoopHandle: Send, Sync, Clone);
