//! Wake-up events sent through the winit event loop proxy.

/// Events dispatched through the [`Application`](crate::Application) event loop.
///
/// These carry no work themselves. Idle work sits in the application's task
/// queue; the event only makes sure a waiting loop comes around to run it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostEvent {
    /// Wake up the event loop so it re-checks its idle queue.
    WakeUp,
    /// Request to quit the application.
    Quit,
}

impl HostEvent {
    /// Whether this event stops the loop.
    pub fn is_quit(self) -> bool {
        matches!(self, Self::Quit)
    }
}
