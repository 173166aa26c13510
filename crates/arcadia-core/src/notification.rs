//! Notification sources: broadcast channels with deferred, idle-time delivery.
//!
//! A [`NotificationSource`] informs interested code of changes in some piece of
//! shared state, like a signal that is not attached to any object.
//! Producers call [`fire`](NotificationSource::fire) from any thread; every
//! subscriber registered at that moment is called later, on the host loop's
//! thread, when the loop is idle.
//!
//! # Key Types
//!
//! - [`NotificationSource<Args>`] - The channel itself; cheap to clone
//! - [`SubscriptionId`] - Returned by [`register`](NotificationSource::register)
//! - [`Subscription`] - RAII guard that unregisters when dropped
//! - [`GenerationWatch`] - Passive "did it fire since I last looked?" poller
//! - [`SourceConfig`] - Name and delivery policy
//!
//! # Delivery Model
//!
//! `fire` bumps the generation number, snapshots the current subscribers in
//! registration order, appends one pending delivery per subscriber to the
//! source's queue and asks the [`IdleScheduler`] to run the drain routine.
//! Requests are coalesced: while a drain is scheduled, further firings only
//! append to the queue. The drain delivers every queued item in order and
//! keeps going until the queue is empty, so items fired by a callback during
//! the drain are delivered by that same drain.
//!
//! Callbacks are invoked with no lock held. They may fire, register or
//! unregister on the same source.
//!
//! # Unregistering
//!
//! After [`unregister`](NotificationSource::unregister) returns, the callback
//! is not invoked for future firings. Deliveries that were already queued for
//! it are skipped too, unless the source was built with
//! [`SourceConfig::deliver_after_unregister`]. An item the drain has already
//! popped when unregistration happens on another thread may still be
//! delivered.
//!
//! Subscriptions hold strong references to their callbacks. Anything a
//! callback captures stays alive until it is unregistered; use
//! [`register_scoped`](NotificationSource::register_scoped) to tie that to a
//! scope.
//!
//! # Failures
//!
//! A panicking callback does not stop the drain. The panic is caught, logged
//! at `error` level on the `arcadia_core::notification` target, counted in
//! [`delivery_failures`](NotificationSource::delivery_failures), and the next
//! queued item is delivered.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! use arcadia_core::{ManualScheduler, NotificationSource};
//!
//! let scheduler = Arc::new(ManualScheduler::new());
//! let games_changed = NotificationSource::<String>::new(scheduler.clone());
//!
//! let seen = Arc::new(AtomicUsize::new(0));
//! let seen_clone = seen.clone();
//! let id = games_changed.register(move |game| {
//!     println!("{game} changed");
//!     seen_clone.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! games_changed.fire("quake".to_string());
//! assert_eq!(games_changed.generation_number(), 1);
//! assert_eq!(seen.load(Ordering::SeqCst), 0); // not delivered yet
//!
//! scheduler.run_pending(); // the loop becomes idle
//! assert_eq!(seen.load(Ordering::SeqCst), 1);
//!
//! games_changed.unregister(id);
//! ```

use std::borrow::Cow;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::error::{DeliveryError, panic_message};
use crate::idle::IdleScheduler;
use crate::logging::{PerfSpan, span_names};

/// Identifies one registration on a [`NotificationSource`].
///
/// Ids are handed out sequentially starting at 1 and are never reused for the
/// lifetime of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Get the raw u64 value of this id.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for SubscriptionId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Configuration for a [`NotificationSource`].
#[derive(Debug, Clone, Default)]
pub struct SourceConfig {
    /// Name used in log output.
    pub name: Option<Cow<'static, str>>,
    /// Deliver items that were already queued for a subscription when it was
    /// unregistered. Off by default.
    pub deliver_after_unregister: bool,
}

impl SourceConfig {
    /// Create a configuration with the given log name.
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Keep delivering already-queued items to unregistered subscribers.
    pub fn deliver_after_unregister(mut self, deliver: bool) -> Self {
        self.deliver_after_unregister = deliver;
        self
    }
}

type Callback<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// One queued delivery: a callback and the payload of the firing that
/// enqueued it.
struct PendingDelivery<Args> {
    subscription: SubscriptionId,
    callback: Callback<Args>,
    args: Arc<Args>,
}

struct SourceState<Args> {
    /// Live subscriptions; ids grow monotonically, so key order is
    /// registration order.
    subscribers: BTreeMap<SubscriptionId, Callback<Args>>,
    next_id: u64,
    pending: VecDeque<PendingDelivery<Args>>,
    /// A drain task has been handed to the scheduler and has not finished.
    drain_scheduled: bool,
}

struct SourceInner<Args> {
    state: Mutex<SourceState<Args>>,
    /// Shared with [`GenerationWatch`]es. Only bumped under `state`'s lock.
    generation: Arc<AtomicU64>,
    failures: AtomicU64,
    scheduler: Arc<dyn IdleScheduler>,
    config: SourceConfig,
}

/// Counters for a single drain pass.
#[derive(Debug, Default, Clone, Copy)]
struct DrainStats {
    delivered: usize,
    skipped: usize,
    failed: usize,
}

/// A broadcast channel whose deliveries run at idle time on the host loop.
///
/// Cloning yields another handle onto the same channel. Separately
/// constructed sources are fully isolated from each other.
///
/// # Type Parameter
///
/// - `Args`: The payload passed to every subscriber by reference. Use `()`
///   for plain "it happened" notifications, or a tuple/struct for data.
pub struct NotificationSource<Args> {
    inner: Arc<SourceInner<Args>>,
}

impl<Args> Clone for NotificationSource<Args> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<Args: Send + Sync + 'static> NotificationSource<Args> {
    /// Create a source that delivers through `scheduler`.
    pub fn new(scheduler: Arc<dyn IdleScheduler>) -> Self {
        Self::with_config(scheduler, SourceConfig::default())
    }

    /// Create a source with a custom configuration.
    pub fn with_config(scheduler: Arc<dyn IdleScheduler>, config: SourceConfig) -> Self {
        Self {
            inner: Arc::new(SourceInner {
                state: Mutex::new(SourceState {
                    subscribers: BTreeMap::new(),
                    next_id: 1,
                    pending: VecDeque::new(),
                    drain_scheduled: false,
                }),
                generation: Arc::new(AtomicU64::new(0)),
                failures: AtomicU64::new(0),
                scheduler,
                config,
            }),
        }
    }

    /// Signal that the thing, whatever it is, has happened.
    ///
    /// Increments the generation number and queues one delivery of `args` for
    /// every current subscriber, in registration order. Subscribers registered
    /// after this call are not included. Delivery happens later, at idle time.
    ///
    /// This never fails and may be called from any thread. Once the
    /// scheduler's loop has shut down only the generation number changes.
    pub fn fire(&self, args: Args) {
        let args = Arc::new(args);
        let closed = self.inner.scheduler.is_closed();
        let (generation, subscriber_count, schedule) = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;

            if !closed {
                for (&subscription, callback) in &state.subscribers {
                    state.pending.push_back(PendingDelivery {
                        subscription,
                        callback: callback.clone(),
                        args: args.clone(),
                    });
                }
            }

            let schedule = !state.pending.is_empty() && !state.drain_scheduled && !closed;
            if schedule {
                state.drain_scheduled = true;
            }
            (generation, state.subscribers.len(), schedule)
        };

        tracing::trace!(
            target: "arcadia_core::notification",
            source = self.inner.name(),
            generation,
            subscriber_count,
            schedule,
            closed,
            "notification fired"
        );

        if schedule {
            let task = DrainTask {
                source: Arc::downgrade(&self.inner),
                ran: false,
            };
            self.inner
                .scheduler
                .schedule_once_at_idle(Box::new(move || task.run()));
        }
    }

    /// Returns a number that is incremented on each call to [`fire`](Self::fire).
    ///
    /// This can be polled passively when registering a callback is
    /// inappropriate. See also [`watch`](Self::watch).
    pub fn generation_number(&self) -> u64 {
        self.inner.generation.load(Ordering::Acquire)
    }

    /// Register a callback to be called, at idle time, after each firing.
    ///
    /// The callback is kept alive until unregistered, along with everything
    /// it captures. Returns the id to pass to [`unregister`](Self::unregister).
    pub fn register<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let id = {
            let mut state = self.inner.state.lock();
            let id = SubscriptionId(state.next_id);
            state.next_id += 1;
            state.subscribers.insert(id, Arc::new(callback));
            id
        };
        tracing::trace!(
            target: "arcadia_core::notification",
            source = self.inner.name(),
            subscription = id.0,
            "subscriber registered"
        );
        id
    }

    /// Register a callback that is unregistered when the returned guard drops.
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::Arc;
    /// use arcadia_core::{ImmediateScheduler, NotificationSource};
    ///
    /// let source = NotificationSource::<()>::new(Arc::new(ImmediateScheduler));
    /// {
    ///     let _subscription = source.register_scoped(|_| println!("fired"));
    ///     assert_eq!(source.subscriber_count(), 1);
    /// }
    /// assert_eq!(source.subscriber_count(), 0);
    /// ```
    #[must_use = "dropping the Subscription unregisters the callback immediately"]
    pub fn register_scoped<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let id = self.register(callback);
        let source: Weak<dyn Unsubscribe> = Arc::downgrade(&self.inner) as Weak<dyn Unsubscribe>;
        Subscription {
            source,
            id: Some(id),
        }
    }

    /// Unregister a callback that [`register`](Self::register) had registered.
    ///
    /// Unknown or already-removed ids are silently ignored.
    pub fn unregister(&self, id: SubscriptionId) {
        self.inner.unsubscribe(id);
    }

    /// Unregister every callback.
    pub fn unregister_all(&self) {
        let removed = std::mem::take(&mut self.inner.state.lock().subscribers);
        tracing::trace!(
            target: "arcadia_core::notification",
            source = self.inner.name(),
            count = removed.len(),
            "all subscribers unregistered"
        );
        drop(removed);
    }

    /// Create a passive poller starting at the current generation.
    pub fn watch(&self) -> GenerationWatch {
        GenerationWatch {
            last_seen: self.generation_number(),
            generation: self.inner.generation.clone(),
        }
    }

    /// Get the number of registered callbacks.
    pub fn subscriber_count(&self) -> usize {
        self.inner.state.lock().subscribers.len()
    }

    /// Get the number of deliveries waiting for the next drain.
    pub fn pending_count(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    /// Check whether a drain has been requested and has not finished yet.
    pub fn is_drain_scheduled(&self) -> bool {
        self.inner.state.lock().drain_scheduled
    }

    /// Total number of callback panics caught while draining.
    pub fn delivery_failures(&self) -> u64 {
        self.inner.failures.load(Ordering::Relaxed)
    }

    /// The configured log name, or `"<unnamed>"`.
    pub fn name(&self) -> &str {
        self.inner.name()
    }
}

impl<Args> SourceInner<Args> {
    fn name(&self) -> &str {
        self.config.name.as_deref().unwrap_or("<unnamed>")
    }

    /// Deliver queued items until the queue is empty.
    fn drain(&self) -> DrainStats {
        let _span = PerfSpan::new(span_names::DRAIN);
        let mut stats = DrainStats::default();

        loop {
            let (item, live) = {
                let mut state = self.state.lock();
                let Some(item) = state.pending.pop_front() else {
                    // Cleared under the same lock `fire` checks, so a firing
                    // racing with the end of this drain schedules a new one.
                    state.drain_scheduled = false;
                    break;
                };
                let live = self.config.deliver_after_unregister
                    || state.subscribers.contains_key(&item.subscription);
                (item, live)
            };

            if !live {
                stats.skipped += 1;
                continue;
            }

            let PendingDelivery {
                subscription,
                callback,
                args,
            } = item;
            match catch_unwind(AssertUnwindSafe(|| callback(&*args))) {
                Ok(()) => stats.delivered += 1,
                Err(payload) => {
                    stats.failed += 1;
                    self.failures.fetch_add(1, Ordering::Relaxed);
                    let error = DeliveryError {
                        subscription: subscription.0,
                        message: panic_message(payload.as_ref()),
                    };
                    tracing::error!(
                        target: "arcadia_core::notification",
                        source = self.name(),
                        %error,
                        "notification callback failed; continuing drain"
                    );
                }
            }
        }

        tracing::trace!(
            target: "arcadia_core::notification",
            source = self.name(),
            delivered = stats.delivered,
            skipped = stats.skipped,
            failed = stats.failed,
            "drain finished"
        );
        stats
    }
}

/// Type-erased unregistration, so [`Subscription`] need not name `Args`.
trait Unsubscribe: Send + Sync {
    fn unsubscribe(&self, id: SubscriptionId);
}

impl<Args: Send + Sync + 'static> Unsubscribe for SourceInner<Args> {
    fn unsubscribe(&self, id: SubscriptionId) {
        // Drop the callback after releasing the lock: its captures may
        // touch this source when they are destroyed.
        let removed = self.state.lock().subscribers.remove(&id);
        if removed.is_some() {
            tracing::trace!(
                target: "arcadia_core::notification",
                source = self.name(),
                subscription = id.0,
                "subscriber unregistered"
            );
        }
        drop(removed);
    }
}

/// The task handed to the idle scheduler.
///
/// If a scheduler drops it without running it, the scheduled flag is cleared
/// so the next firing requests a fresh drain instead of waiting forever. When
/// the scheduler's loop has shut down the queued deliveries are dropped too.
struct DrainTask<Args: Send + Sync + 'static> {
    source: Weak<SourceInner<Args>>,
    ran: bool,
}

impl<Args: Send + Sync + 'static> DrainTask<Args> {
    fn run(mut self) {
        self.ran = true;
        if let Some(inner) = self.source.upgrade() {
            inner.drain();
        }
    }
}

impl<Args: Send + Sync + 'static> Drop for DrainTask<Args> {
    fn drop(&mut self) {
        if self.ran {
            return;
        }
        let Some(inner) = self.source.upgrade() else {
            return;
        };
        // A closed loop will never drain; release what was queued for it.
        let discarded = {
            let mut state = inner.state.lock();
            state.drain_scheduled = false;
            if inner.scheduler.is_closed() {
                std::mem::take(&mut state.pending)
            } else {
                VecDeque::new()
            }
        };
        tracing::debug!(
            target: "arcadia_core::notification",
            source = inner.name(),
            discarded = discarded.len(),
            "drain task dropped without running"
        );
    }
}

impl<Args> fmt::Debug for NotificationSource<Args> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("NotificationSource")
            .field("name", &self.inner.name())
            .field("generation", &self.inner.generation.load(Ordering::Acquire))
            .field("subscribers", &state.subscribers.len())
            .field("pending", &state.pending.len())
            .field("drain_scheduled", &state.drain_scheduled)
            .finish()
    }
}

/// A registration that is removed when this guard is dropped.
///
/// Created via [`NotificationSource::register_scoped`]. The guard holds only a
/// weak reference to the source, so it never keeps the source alive.
pub struct Subscription {
    source: Weak<dyn Unsubscribe>,
    id: Option<SubscriptionId>,
}

impl Subscription {
    /// The id of the underlying registration.
    pub fn id(&self) -> Option<SubscriptionId> {
        self.id
    }

    /// Keep the callback registered past this guard's lifetime.
    ///
    /// Returns the id, which must then be unregistered manually.
    pub fn detach(mut self) -> Option<SubscriptionId> {
        self.id.take()
    }

    /// Unregister now. Equivalent to dropping the guard.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let (Some(id), Some(source)) = (self.id.take(), self.source.upgrade()) {
            source.unsubscribe(id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Polls a source's generation number without subscribing.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use arcadia_core::{ManualScheduler, NotificationSource};
///
/// let source = NotificationSource::<()>::new(Arc::new(ManualScheduler::new()));
/// let mut watch = source.watch();
/// assert!(!watch.has_changed());
///
/// source.fire(());
/// assert!(watch.has_changed());
/// assert!(!watch.has_changed()); // consumed
/// ```
#[derive(Debug, Clone)]
pub struct GenerationWatch {
    last_seen: u64,
    generation: Arc<AtomicU64>,
}

impl GenerationWatch {
    /// Report whether the source fired since the last check, and remember the
    /// current generation.
    pub fn has_changed(&mut self) -> bool {
        let current = self.current();
        let changed = current != self.last_seen;
        self.last_seen = current;
        changed
    }

    /// Report whether the source fired since the last check without
    /// consuming the change.
    pub fn peek_changed(&self) -> bool {
        self.current() != self.last_seen
    }

    /// Number of firings since the last consumed check.
    pub fn fires_since_seen(&self) -> u64 {
        self.current().saturating_sub(self.last_seen)
    }

    /// The source's current generation number.
    pub fn current(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// The generation recorded at the last consumed check.
    pub fn last_seen(&self) -> u64 {
        self.last_seen
    }
}

static_assertions::assert_impl_all!(NotificationSource<()>: Send, Sync, Clone);
static_assertions::assert_impl_all!(Subscription: Send, Sync);
static_assertions::assert_impl_all!(GenerationWatch: Send, Sync);
