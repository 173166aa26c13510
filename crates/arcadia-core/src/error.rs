//! Error types for Arcadia core.

use std::fmt;

/// The main error type for Arcadia core operations.
///
/// Notification sources themselves never fail; these errors come from the
/// host loops that deliver their notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Application has already been initialized.
    ApplicationAlreadyInitialized,
    /// Failed to create the event loop.
    EventLoopCreation(String),
    /// The event loop has already exited or was consumed by an earlier `run()`.
    EventLoopExited,
    /// The receiving main loop has been dropped; nothing will run posted work.
    LoopClosed,
    /// A loop was driven from a thread other than the one that owns it.
    WrongThread,
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApplicationAlreadyInitialized => {
                write!(f, "Application has already been initialized")
            }
            Self::EventLoopCreation(msg) => {
                write!(f, "Failed to create event loop: {msg}")
            }
            Self::EventLoopExited => {
                write!(f, "The event loop has already exited")
            }
            Self::LoopClosed => write!(f, "The main loop is closed"),
            Self::WrongThread => {
                write!(f, "The loop must be driven from the thread that created it")
            }
        }
    }
}

impl std::error::Error for CoreError {}

/// A callback failure caught while draining a notification source.
///
/// Failures are isolated per callback: they are reported through `tracing`
/// and the drain carries on with the next queued item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryError {
    /// Raw value of the subscription whose callback failed.
    pub subscription: u64,
    /// The panic message, when the payload was a string.
    pub message: String,
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Subscriber {} panicked during delivery: {}",
            self.subscription, self.message
        )
    }
}

impl std::error::Error for DeliveryError {}

/// Extract a readable message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

/// A specialized Result type for Arcadia core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
