//! Core systems for Arcadia.
//!
//! This crate provides the plumbing that the Arcadia library layer is built on:
//!
//! - **Notification Sources**: Broadcast channels fired from any thread and
//!   delivered later, in order, on the host loop's thread
//! - **Idle Scheduling**: The `IdleScheduler` seam between sources and loops
//! - **Main Loop**: A headless single-threaded loop built on crossbeam channels
//! - **Application**: A windowed host loop built on winit
//! - **Task Queue**: Cancellable deferred tasks processed in idle batches
//!
//! # Notification Example
//!
//! ```
//! use arcadia_core::{MainLoop, NotificationSource};
//!
//! let main_loop = MainLoop::new();
//! let collection_changed = NotificationSource::<u32>::new(main_loop.scheduler());
//!
//! let id = collection_changed.register(|count| {
//!     println!("collection now holds {count} games");
//! });
//!
//! // Fire from anywhere; nothing is delivered yet.
//! collection_changed.fire(12);
//! assert_eq!(collection_changed.generation_number(), 1);
//!
//! // The loop delivers when it is idle.
//! main_loop.run_until_idle().unwrap();
//!
//! collection_changed.unregister(id);
//! ```
//!
//! # Event Loop Example
//!
//! ```no_run
//! use arcadia_core::Application;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let app = Application::new()?;
//!
//!     // Post a deferred task
//!     app.post_idle(Box::new(|| {
//!         println!("Idle task executed!");
//!     }));
//!
//!     // Run the event loop (blocks until quit)
//!     Ok(app.run()?)
//! }
//! ```

mod application;
#[cfg(feature = "tokio")]
pub mod async_idle;
mod error;
mod event;
mod idle;
pub mod logging;
mod main_loop;
pub mod notification;
mod task;
pub mod thread_check;

pub use application::{AppIdleScheduler, Application};
pub use error::{CoreError, DeliveryError, Result};
pub use event::HostEvent;
pub use idle::{IdleScheduler, IdleTask, ImmediateScheduler, ManualScheduler};
pub use logging::PerfSpan;
pub use main_loop::{MainLoop, MainLoopBuilder, MainLoopConfig, MainLoopHandle};
pub use notification::{
    GenerationWatch, NotificationSource, SourceConfig, Subscription, SubscriptionId,
};
pub use task::{IdleTaskId, TaskQueue};
