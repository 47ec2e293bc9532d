//! Per-field debouncing.
//!
//! Each field gets one `FieldDebouncer` for the lifetime of its registry. A
//! debouncer holds the pending payload, the armed timer and a monotonic
//! sequence number. Scheduling cancels the armed timer, overwrites the payload
//! and arms a new timer; when a timer survives its full window the handler runs
//! exactly once with the last payload.
//!
//! Cancellation only ever reaches the waiting timer. Once the handler has
//! started it runs to completion, even if newer calls arrive meanwhile; the
//! handler can ask its `Ticket` whether it has been superseded.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Callback invoked when a field's debounce window elapses.
pub type Handler<P> = Arc<dyn Fn(String, P, Ticket) -> BoxFuture<'static, ()> + Send + Sync>;

/// Wrap an async closure into a [`Handler`].
pub fn handler<P, F, Fut>(f: F) -> Handler<P>
where
    F: Fn(String, P, Ticket) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |field: String, payload: P, ticket: Ticket| {
        f(field, payload, ticket).boxed()
    })
}

/// Identifies one resolution of a field.
#[derive(Debug, Clone)]
pub struct Ticket {
    sequence: u64,
    latest: Arc<AtomicU64>,
}

impl Ticket {
    /// Sequence number of the call that produced this resolution.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// `true` once a newer call has been scheduled for the same field.
    pub fn is_superseded(&self) -> bool {
        self.latest.load(Ordering::SeqCst) != self.sequence
    }

    /// Ticket for `sequence` whose field has since seen `latest` calls.
    #[cfg(test)]
    pub(crate) fn detached(sequence: u64, latest: u64) -> Self {
        Self {
            sequence,
            latest: Arc::new(AtomicU64::new(latest)),
        }
    }
}

/// Outcome of scheduling a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scheduled {
    /// Sequence number assigned to this call
    pub sequence: u64,
    /// Whether a pending payload was overwritten
    pub superseded: bool,
}

struct Slot<P> {
    pending: Option<P>,
    timer: Option<JoinHandle<()>>,
    running: usize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Debounced invoker bound to a single field.
pub struct FieldDebouncer<P> {
    field: String,
    window: Duration,
    handler: Handler<P>,
    slot: Arc<Mutex<Slot<P>>>,
    latest: Arc<AtomicU64>,
    activity: Arc<watch::Sender<usize>>,
}

impl<P: Send + 'static> FieldDebouncer<P> {
    fn new(
        field: &str,
        window: Duration,
        handler: Handler<P>,
        activity: Arc<watch::Sender<usize>>,
    ) -> Self {
        Self {
            field: field.to_string(),
            window,
            handler,
            slot: Arc::new(Mutex::new(Slot {
                pending: None,
                timer: None,
                running: 0,
            })),
            latest: Arc::new(AtomicU64::new(0)),
            activity,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Sequence number of the most recent call.
    pub fn sequence(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    /// `true` while a timer is armed.
    pub fn is_pending(&self) -> bool {
        lock(&self.slot).timer.is_some()
    }

    /// `true` when no timer is armed and no handler is running.
    pub fn is_idle(&self) -> bool {
        let slot = lock(&self.slot);
        slot.timer.is_none() && slot.running == 0
    }

    /// Replace the pending payload and restart the timer.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    pub fn schedule(&self, payload: P) -> Scheduled {
        self.schedule_then(payload, |_| {})
    }

    /// Like [`schedule`](Self::schedule), running `notify` before the new
    /// timer is armed so it always precedes the handler for this call.
    pub fn schedule_then<F>(&self, payload: P, notify: F) -> Scheduled
    where
        F: FnOnce(&Scheduled),
    {
        let mut slot = lock(&self.slot);

        let sequence = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let superseded = slot.pending.replace(payload).is_some();
        let scheduled = Scheduled {
            sequence,
            superseded,
        };
        notify(&scheduled);

        match slot.timer.take() {
            Some(timer) => timer.abort(),
            None => self.activity.send_modify(|n| *n += 1),
        }

        let task_slot = Arc::clone(&self.slot);
        let handler = Arc::clone(&self.handler);
        let latest = Arc::clone(&self.latest);
        let activity = Arc::clone(&self.activity);
        let field = self.field.clone();
        let window = self.window;

        slot.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;

            let payload = {
                let mut slot = lock(&task_slot);
                if latest.load(Ordering::SeqCst) != sequence {
                    // Rescheduled while waking up; the newer timer owns the slot.
                    return;
                }
                slot.timer = None;
                slot.running += 1;
                slot.pending.take()
            };

            if let Some(payload) = payload {
                debug!("{}: debounce window elapsed (sequence {})", field, sequence);
                let run = handler(field.clone(), payload, Ticket { sequence, latest });
                if AssertUnwindSafe(run).catch_unwind().await.is_err() {
                    warn!("{}: handler panicked (sequence {})", field, sequence);
                }
            }

            lock(&task_slot).running -= 1;
            activity.send_modify(|n| *n = n.saturating_sub(1));
        }));

        scheduled
    }
}

impl<P> Drop for FieldDebouncer<P> {
    fn drop(&mut self) {
        let mut slot = lock(&self.slot);
        if let Some(timer) = slot.timer.take() {
            timer.abort();
            slot.pending = None;
            self.activity.send_modify(|n| *n = n.saturating_sub(1));
        }
    }
}

impl<P> std::fmt::Debug for FieldDebouncer<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDebouncer")
            .field("field", &self.field)
            .field("window", &self.window)
            .field("sequence", &self.latest.load(Ordering::SeqCst))
            .finish()
    }
}

/// Field name to debounced invoker. Grows monotonically; entries are never removed.
pub struct DebounceRegistry<P> {
    window: Duration,
    handler: Handler<P>,
    entries: Mutex<HashMap<String, Arc<FieldDebouncer<P>>>>,
    activity: Arc<watch::Sender<usize>>,
}

impl<P: Send + 'static> DebounceRegistry<P> {
    /// Create an empty registry whose invokers all wait `window` and then run `handler`.
    pub fn new(window: Duration, handler: Handler<P>) -> Self {
        let (activity, _rx) = watch::channel(0);
        Self {
            window,
            handler,
            entries: Mutex::new(HashMap::new()),
            activity: Arc::new(activity),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Look up the invoker for `field`, creating it on first use.
    ///
    /// Returns the invoker and whether it was created by this call.
    pub fn register(&self, field: &str) -> (Arc<FieldDebouncer<P>>, bool) {
        let mut entries = lock(&self.entries);
        if let Some(existing) = entries.get(field) {
            return (Arc::clone(existing), false);
        }

        debug!("Registering debounced invoker for field '{}'", field);
        let debouncer = Arc::new(FieldDebouncer::new(
            field,
            self.window,
            Arc::clone(&self.handler),
            Arc::clone(&self.activity),
        ));
        entries.insert(field.to_string(), Arc::clone(&debouncer));
        (debouncer, true)
    }

    pub fn get(&self, field: &str) -> Option<Arc<FieldDebouncer<P>>> {
        lock(&self.entries).get(field).cloned()
    }

    pub fn contains(&self, field: &str) -> bool {
        lock(&self.entries).contains_key(field)
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }

    /// Registered field names, sorted.
    pub fn fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = lock(&self.entries).keys().cloned().collect();
        fields.sort();
        fields
    }

    /// Number of armed timers plus running handlers.
    ///
    /// A field whose handler is still running while a newer timer is armed
    /// counts twice.
    pub fn in_flight(&self) -> usize {
        *self.activity.borrow()
    }

    /// Wait until no timer is armed and no resolution is running.
    pub async fn settle(&self) {
        let mut rx = self.activity.subscribe();
        // The sender lives as long as `self`, so this cannot observe a closed channel.
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

impl<P> std::fmt::Debug for DebounceRegistry<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebounceRegistry")
            .field("window", &self.window)
            .field("fields", &lock(&self.entries).len())
            .finish()
    }
}
