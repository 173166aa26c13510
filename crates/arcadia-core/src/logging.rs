//! Logging facilities for Arcadia core.
//!
//! Arcadia uses the `tracing` crate for instrumentation. Nothing is printed
//! unless the application installs a subscriber:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter("arcadia_core::notification=debug")
//!         .init();
//!
//!     // Your application code...
//! }
//! ```
//!
//! Every event emitted by this crate carries one of the [`targets`] below, so
//! subsystems can be filtered independently.

/// Span names used throughout Arcadia for tracing.
pub mod span_names {
    /// Notification drain span.
    pub const DRAIN: &str = "arcadia::drain";
    /// Idle batch processing span.
    pub const IDLE_BATCH: &str = "arcadia::idle_batch";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core framework target.
    pub const CORE: &str = "arcadia_core";
    /// Notification source target.
    pub const NOTIFICATION: &str = "arcadia_core::notification";
    /// Idle scheduling and task queue target.
    pub const IDLE: &str = "arcadia_core::idle";
    /// Headless main loop target.
    pub const MAIN_LOOP: &str = "arcadia_core::main_loop";
    /// Windowed event loop target.
    pub const EVENT_LOOP: &str = "arcadia_core::event_loop";
}

/// A guard that keeps a tracing span entered until it is dropped.
///
/// This is useful for tracking the duration of operations.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    ///
    /// The span will be active until the guard is dropped.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::trace_span!(target: "arcadia::perf", "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_targets_share_crate_prefix() {
        for target in [
            targets::NOTIFICATION,
            targets::IDLE,
            targets::MAIN_LOOP,
            targets::EVENT_LOOP,
        ] {
            assert!(target.starts_with(targets::CORE));
        }
    }

    #[test]
    fn test_perf_span() {
        // Just ensure it doesn't panic without a subscriber installed
        let _span = PerfSpan::new(span_names::DRAIN);
    }
}
