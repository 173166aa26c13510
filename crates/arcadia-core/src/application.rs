//! The windowed host: a singleton `Application` driving a winit event loop.
//!
//! Idle tasks posted to the application run from winit's `about_to_wait`
//! callback, after the loop has handled every pending window event. This is
//! the "main thread, when idle" that notification drains rely on.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy};
use winit::window::WindowId;

use crate::error::{CoreError, Result};
use crate::event::HostEvent;
use crate::idle::{IdleScheduler, IdleTask};
use crate::logging::{PerfSpan, span_names};
use crate::task::{IdleTaskId, SharedTaskQueue};
use crate::thread_check;

static APPLICATION: OnceLock<Application> = OnceLock::new();

/// The windowed host loop. One per process, created with [`Application::new`]
/// and reached afterwards through [`Application::instance`].
///
/// # Example
///
/// ```no_run
/// use arcadia_core::{Application, NotificationSource};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let app = Application::new()?;
///     let library_changed = NotificationSource::<()>::new(app.idle_scheduler().into());
///     library_changed.register(|_| println!("refresh the game list"));
///     Ok(app.run()?)
/// }
/// ```
pub struct Application {
    /// Wakes the loop from other threads.
    proxy: EventLoopProxy<HostEvent>,
    /// Idle work, including notification drains.
    tasks: SharedTaskQueue,
    should_quit: AtomicBool,
}

impl Application {
    /// Create the application instance and record the main thread.
    ///
    /// This must be called from the main thread before any notification
    /// source is bound to [`Application::idle_scheduler`].
    ///
    /// # Errors
    ///
    /// Returns an error if an `Application` has already been initialized, if
    /// another thread was already recorded as the main thread, or if the event
    /// loop could not be created.
    ///
    /// # Panics
    ///
    /// winit panics on some platforms when the event loop is created off the
    /// process's first thread.
    pub fn new() -> Result<&'static Application> {
        thread_check::record_main_thread()?;
        let event_loop: EventLoop<HostEvent> = EventLoop::with_user_event()
            .build()
            .map_err(|e| CoreError::EventLoopCreation(e.to_string()))?;

        let app = Application {
            proxy: event_loop.create_proxy(),
            tasks: SharedTaskQueue::default(),
            should_quit: AtomicBool::new(false),
        };

        APPLICATION
            .set(app)
            .map_err(|_| CoreError::ApplicationAlreadyInitialized)?;

        EVENT_LOOP.with(|cell| {
            *cell.borrow_mut() = Some(event_loop);
        });

        tracing::debug!(target: "arcadia_core::event_loop", "application created");
        APPLICATION
            .get()
            .ok_or(CoreError::ApplicationAlreadyInitialized)
    }

    /// The application created by [`Application::new`].
    ///
    /// # Panics
    ///
    /// Panics when called before the application exists.
    pub fn instance() -> &'static Application {
        APPLICATION
            .get()
            .expect("Application not initialized. Call Application::new() first.")
    }

    /// The application, or `None` before [`Application::new`] has run.
    pub fn try_instance() -> Option<&'static Application> {
        APPLICATION.get()
    }

    /// Drive the event loop until [`quit`](Self::quit). Idle tasks run each
    /// time winit is about to wait for new events.
    ///
    /// Some platforms never return from this call.
    ///
    /// # Errors
    ///
    /// [`CoreError::EventLoopExited`] on a second call, or
    /// [`CoreError::WrongThread`] off the main thread.
    #[tracing::instrument(skip(self), target = "arcadia_core::event_loop", level = "debug")]
    pub fn run(&self) -> Result<()> {
        if !thread_check::is_main_thread() {
            return Err(CoreError::WrongThread);
        }
        tracing::info!(target: "arcadia_core::event_loop", "starting event loop");

        let event_loop = EVENT_LOOP.with(|cell| cell.borrow_mut().take());
        let Some(event_loop) = event_loop else {
            return Err(CoreError::EventLoopExited);
        };

        let mut handler = AppHandler::new(self);
        event_loop
            .run_app(&mut handler)
            .map_err(|e| CoreError::EventLoopCreation(e.to_string()))?;

        Ok(())
    }

    /// Ask [`run`](Self::run) to return. Safe from any thread; takes effect
    /// once the loop next wakes.
    pub fn quit(&self) {
        tracing::info!(target: "arcadia_core::event_loop", "quit requested");
        self.should_quit.store(true, Ordering::SeqCst);
        let _ = self.proxy.send_event(HostEvent::Quit);
    }

    /// Whether [`quit`](Self::quit) has been called.
    pub fn should_quit(&self) -> bool {
        self.should_quit.load(Ordering::SeqCst)
    }

    /// Queue `task` for the next idle pass, from any thread. The returned id
    /// can be passed to [`cancel_idle`](Self::cancel_idle).
    pub fn post_idle(&self, task: IdleTask) -> IdleTaskId {
        let id = self.tasks.post(task);
        if self.proxy.send_event(HostEvent::WakeUp).is_err() {
            tracing::debug!(
                target: "arcadia_core::event_loop",
                "event loop closed; idle task will not run"
            );
        }
        id
    }

    /// Drop a queued idle task. Returns `false` if it already ran.
    pub fn cancel_idle(&self, id: IdleTaskId) -> bool {
        self.tasks.cancel(id)
    }

    /// Get the number of idle tasks waiting to run.
    pub fn pending_idle_count(&self) -> usize {
        self.tasks.pending_count()
    }

    /// Get an idle scheduler that runs tasks on this application's loop.
    pub fn idle_scheduler(&'static self) -> AppIdleScheduler {
        AppIdleScheduler { app: self }
    }

    fn process_idle_tasks(&self) -> usize {
        let _span = PerfSpan::new(span_names::IDLE_BATCH);
        self.tasks.process_batch()
    }

    fn has_pending_tasks(&self) -> bool {
        self.tasks.has_pending()
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("pending_idle", &self.tasks.pending_count())
            .field("should_quit", &self.should_quit())
            .finish()
    }
}

/// Idle scheduler backed by the global [`Application`].
#[derive(Debug, Clone, Copy)]
pub struct AppIdleScheduler {
    app: &'static Application,
}

impl IdleScheduler for AppIdleScheduler {
    fn schedule_once_at_idle(&self, task: IdleTask) {
        self.app.post_idle(task);
    }
}

impl From<AppIdleScheduler> for std::sync::Arc<dyn IdleScheduler> {
    fn from(scheduler: AppIdleScheduler) -> Self {
        std::sync::Arc::new(scheduler)
    }
}

// `EventLoop` is not `Send`, so it waits on the creating thread until `run`.
thread_local! {
    static EVENT_LOOP: std::cell::RefCell<Option<EventLoop<HostEvent>>> =
        const { std::cell::RefCell::new(None) };
}

/// Bridges winit callbacks to the application's idle queue.
struct AppHandler<'a> {
    app: &'a Application,
}

impl<'a> AppHandler<'a> {
    fn new(app: &'a Application) -> Self {
        Self { app }
    }

    fn update_control_flow(&self, event_loop: &ActiveEventLoop) {
        if self.app.should_quit() {
            event_loop.exit();
            return;
        }

        // Keep polling while idle work remains; otherwise sleep until woken.
        let control_flow = if self.app.has_pending_tasks() {
            ControlFlow::Poll
        } else {
            ControlFlow::Wait
        };
        event_loop.set_control_flow(control_flow);
    }
}

impl ApplicationHandler<HostEvent> for AppHandler<'_> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        self.update_control_flow(event_loop);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let WindowEvent::CloseRequested = event {
            self.app.quit();
        }
        self.update_control_flow(event_loop);
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: HostEvent) {
        tracing::trace!(target: "arcadia_core::event_loop", ?event, "received user event");
        if event.is_quit() {
            tracing::debug!(target: "arcadia_core::event_loop", "processing quit event");
            event_loop.exit();
            return;
        }
        self.update_control_flow(event_loop);
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.app.has_pending_tasks() {
            let count = self.app.process_idle_tasks();
            tracing::trace!(target: "arcadia_core::event_loop", count, "processed idle tasks");
        }
        self.update_control_flow(event_loop);
    }
}
