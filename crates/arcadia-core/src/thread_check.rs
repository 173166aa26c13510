//! Which thread owns a host loop.
//!
//! Notifications are fired from anywhere but delivered on the thread that
//! drives the host loop. A loop remembers its owner with an [`OwnerThread`]
//! and refuses to be driven from anywhere else.
//!
//! The windowed [`Application`](crate::Application) also records itself as
//! the process-wide main thread, which [`is_main_thread`] reports on.

use std::sync::OnceLock;
use std::thread::ThreadId;

use crate::error::{CoreError, Result};

static MAIN_THREAD: OnceLock<ThreadId> = OnceLock::new();

/// Record the calling thread as the process-wide main thread.
///
/// Recording the same thread twice is allowed.
///
/// # Errors
///
/// Returns [`CoreError::WrongThread`] if another thread was recorded first.
pub fn record_main_thread() -> Result<()> {
    let caller = std::thread::current().id();
    let recorded = *MAIN_THREAD.get_or_init(|| caller);
    if recorded == caller {
        Ok(())
    } else {
        Err(CoreError::WrongThread)
    }
}

/// The recorded main thread, if any.
pub fn main_thread_id() -> Option<ThreadId> {
    MAIN_THREAD.get().copied()
}

/// Whether the caller is the recorded main thread.
///
/// Before anything is recorded every thread counts as the main thread.
pub fn is_main_thread() -> bool {
    main_thread_id().is_none_or(|main| main == std::thread::current().id())
}

/// The thread a loop was created on.
///
/// # Example
///
/// ```
/// use arcadia_core::thread_check::OwnerThread;
///
/// let owner = OwnerThread::current();
/// assert!(owner.check().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerThread(ThreadId);

impl OwnerThread {
    /// Bind to the calling thread.
    pub fn current() -> Self {
        Self(std::thread::current().id())
    }

    /// The owning thread's id.
    pub fn id(self) -> ThreadId {
        self.0
    }

    /// Whether the caller is the owner.
    #[inline]
    pub fn is_current(self) -> bool {
        std::thread::current().id() == self.0
    }

    /// Fail with [`CoreError::WrongThread`] unless the caller is the owner.
    pub fn check(self) -> Result<()> {
        if self.is_current() {
            Ok(())
        } else {
            tracing::warn!(
                target: "arcadia_core",
                owner = ?self.0,
                caller = ?std::thread::current().id(),
                "loop driven from a thread that does not own it"
            );
            Err(CoreError::WrongThread)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_on_same_thread() {
        let owner = OwnerThread::current();
        assert!(owner.is_current());
        assert_eq!(owner.check(), Ok(()));
        assert_eq!(owner.id(), std::thread::current().id());
    }

    #[test]
    fn test_owner_on_other_thread() {
        let owner = OwnerThread::current();
        let result = std::thread::spawn(move || owner.check()).join().unwrap();
        assert_eq!(result, Err(CoreError::WrongThread));
    }

    #[test]
    fn test_record_main_thread_twice_from_different_threads() {
        // Two different threads can never both be the main thread.
        let here = record_main_thread();
        let there = std::thread::spawn(record_main_thread).join().unwrap();
        assert!(!(here.is_ok() && there.is_ok()));
        assert!(main_thread_id().is_some());
    }
}
