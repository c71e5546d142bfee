//! Ordered toast store with per-toast auto-dismiss timers.
//!
//! A [`ToastQueue`] is created once per application and handed to whoever needs
//! to show toasts or draw them. Handles are cheap clones over the same state.
//! Every mutation is broadcast to subscribers together with the resulting
//! snapshot, so a renderer never has to poll.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use async_channel::{Receiver, Sender, TryRecvError, TrySendError};
use chrono::Utc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use crate::config::ToastConfig;
use crate::render::ToastEvent;
use crate::types::{ToastId, ToastKind, ToastOptions, ToastRecord};

/// Events a subscriber may lag behind before the oldest ones are dropped.
pub const SUBSCRIPTION_BUFFER: usize = 64;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RemovalReason {
    /// Closed by the user or by the application.
    Dismissed,
    /// The auto-dismiss timer elapsed.
    Expired,
    /// Pushed out by a newer toast once `max_toasts` was reached.
    Evicted,
    /// The toast's action was clicked and closes the toast.
    Action,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum QueueChange {
    Shown(ToastId),
    Removed { id: ToastId, reason: RemovalReason },
    Cleared,
    /// The global defaults changed; carries the new configuration.
    Reconfigured(ToastConfig),
}

/// One mutation of the queue and the ordered records that resulted from it.
#[derive(Clone, Debug)]
pub struct QueueEvent {
    pub change: QueueChange,
    pub snapshot: Arc<[ToastRecord]>,
}

/// Receiving end of [`ToastQueue::subscribe`]. Closed once every queue handle
/// is dropped.
pub struct Subscription {
    rx: Receiver<QueueEvent>,
}

impl Subscription {
    pub async fn recv(&self) -> Option<QueueEvent> {
        self.rx.recv().await.ok()
    }

    pub fn try_recv(&self) -> Option<QueueEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Closed) => None,
        }
    }

    /// Drain everything currently buffered.
    pub fn drain(&self) -> Vec<QueueEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("pending", &self.rx.len())
            .finish()
    }
}

struct Entry {
    record: ToastRecord,
    timer: Option<JoinHandle<()>>,
}

/// Sending half of a subscription. The queue keeps its own receiver so it
/// can discard the oldest buffered event when the subscriber falls behind.
struct Subscriber {
    tx: Sender<QueueEvent>,
    backlog: Receiver<QueueEvent>,
}

impl Subscriber {
    /// Returns `false` once the subscription has been dropped.
    fn deliver(&self, mut event: QueueEvent) -> bool {
        // our own `backlog` handle is the last receiver left
        if self.tx.receiver_count() <= 1 {
            return false;
        }
        loop {
            match self.tx.try_send(event) {
                Ok(()) => return true,
                Err(TrySendError::Full(rejected)) => {
                    if let Ok(stale) = self.backlog.try_recv() {
                        warn!(change = ?stale.change, "toast subscriber lagging; dropping oldest event");
                    }
                    event = rejected;
                }
                Err(TrySendError::Closed(_)) => return false,
            }
        }
    }
}

struct Inner {
    config: ToastConfig,
    entries: Vec<Entry>,
    subscribers: Vec<Subscriber>,
}

impl Inner {
    fn snapshot(&self) -> Arc<[ToastRecord]> {
        self.entries.iter().map(|e| e.record.clone()).collect()
    }

    fn position(&self, id: ToastId) -> Option<usize> {
        self.entries.iter().position(|e| e.record.id == id)
    }

    fn resolve(&self, options: ToastOptions) -> ToastRecord {
        ToastRecord {
            id: ToastId::new(),
            kind: options.kind.unwrap_or_default(),
            message: options.message.unwrap_or_default(),
            title: options.title,
            duration: options.duration.unwrap_or(self.config.duration),
            dismissible: options.dismissible.unwrap_or(self.config.dismissible),
            show_progress: options.show_progress.unwrap_or(self.config.show_progress),
            action: options.action,
            metadata: options.metadata.unwrap_or_default(),
            created_at: Utc::now(),
            shown_at: Instant::now(),
        }
    }

    fn remove(&mut self, id: ToastId, reason: RemovalReason) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        let entry = self.entries.remove(index);
        if let Some(timer) = entry.timer {
            // an expiring timer is the running task itself
            if reason != RemovalReason::Expired {
                timer.abort();
            }
        }
        debug!(%id, ?reason, remaining = self.entries.len(), "toast removed");
        self.notify(QueueChange::Removed { id, reason });
        true
    }

    /// Drop the oldest toasts until at most `keep` remain.
    fn evict_down_to(&mut self, keep: usize) {
        while self.entries.len() > keep {
            let id = self.entries[0].record.id;
            self.remove(id, RemovalReason::Evicted);
        }
    }

    fn notify(&mut self, change: QueueChange) {
        if self.subscribers.is_empty() {
            return;
        }
        let event = QueueEvent {
            change,
            snapshot: self.snapshot(),
        };
        self.subscribers.retain(|sub| sub.deliver(event.clone()));
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        for timer in self.entries.iter_mut().filter_map(|e| e.timer.take()) {
            timer.abort();
        }
    }
}

#[derive(Clone)]
pub struct ToastQueue {
    inner: Arc<Mutex<Inner>>,
}

impl fmt::Debug for ToastQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("ToastQueue")
            .field("len", &inner.entries.len())
            .field("max_toasts", &inner.config.max_toasts)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

impl Default for ToastQueue {
    fn default() -> Self {
        Self::new(ToastConfig::default())
    }
}

impl ToastQueue {
    #[must_use]
    pub fn new(config: ToastConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                config: config.clamped(),
                entries: Vec::new(),
                subscribers: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        lock(&self.inner)
    }

    /// Append a toast and return its id.
    ///
    /// When the queue already holds `max_toasts` records the oldest ones are
    /// evicted first. A timer is started when the resolved duration is non-zero;
    /// outside a tokio runtime the toast stays until dismissed.
    pub fn show(&self, options: ToastOptions) -> ToastId {
        let mut inner = self.lock();
        let record = inner.resolve(options);
        let id = record.id;

        let keep = inner.config.max_toasts.saturating_sub(1);
        inner.evict_down_to(keep);

        let timer = if record.auto_dismisses() {
            self.spawn_timer(id, record.duration)
        } else {
            None
        };
        debug!(
            %id,
            kind = %record.kind,
            duration_ms = u64::try_from(record.duration.as_millis()).unwrap_or(u64::MAX),
            "toast shown"
        );
        inner.entries.push(Entry { record, timer });
        inner.notify(QueueChange::Shown(id));
        id
    }

    pub fn success(&self, message: impl Into<String>) -> ToastId {
        self.show(ToastOptions::new(ToastKind::Success, message))
    }

    pub fn error(&self, message: impl Into<String>) -> ToastId {
        self.show(ToastOptions::new(ToastKind::Error, message))
    }

    pub fn warning(&self, message: impl Into<String>) -> ToastId {
        self.show(ToastOptions::new(ToastKind::Warning, message))
    }

    pub fn info(&self, message: impl Into<String>) -> ToastId {
        self.show(ToastOptions::new(ToastKind::Info, message))
    }

    /// Remove a toast and cancel its timer. Returns `false` for unknown ids.
    pub fn dismiss(&self, id: ToastId) -> bool {
        self.lock().remove(id, RemovalReason::Dismissed)
    }

    /// Remove every toast and cancel every pending timer.
    pub fn clear(&self) {
        let mut inner = self.lock();
        if inner.entries.is_empty() {
            return;
        }
        for timer in inner.entries.drain(..).filter_map(|e| e.timer) {
            timer.abort();
        }
        debug!("toast queue cleared");
        inner.notify(QueueChange::Cleared);
    }

    /// Record a click on a toast's action button.
    ///
    /// Returns `true` when the toast exists and carries that action; the toast
    /// is removed if the action closes on click.
    pub fn trigger_action(&self, id: ToastId, action_id: &str) -> bool {
        let mut inner = self.lock();
        let close = match inner
            .position(id)
            .and_then(|index| inner.entries[index].record.action.as_ref())
        {
            Some(action) if action.id == action_id => action.close_on_click,
            _ => {
                debug!(%id, action_id, "action does not match any toast");
                return false;
            }
        };
        debug!(%id, action_id, close, "toast action triggered");
        if close {
            inner.remove(id, RemovalReason::Action);
        }
        true
    }

    /// Apply a signal forwarded by the renderer.
    ///
    /// A close request is ignored for toasts that are not dismissible.
    pub fn handle_event(&self, event: &ToastEvent) {
        match event {
            ToastEvent::Close(id) => {
                let mut inner = self.lock();
                match inner.position(*id).map(|i| inner.entries[i].record.dismissible) {
                    Some(true) => {
                        inner.remove(*id, RemovalReason::Dismissed);
                    }
                    Some(false) => debug!(%id, "close ignored for non-dismissible toast"),
                    None => {}
                }
            }
            ToastEvent::Action { id, action_id } => {
                self.trigger_action(*id, action_id);
            }
        }
    }

    /// Ordered copy of the current toasts, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ToastRecord> {
        self.lock().entries.iter().map(|e| e.record.clone()).collect()
    }

    #[must_use]
    pub fn get(&self, id: ToastId) -> Option<ToastRecord> {
        let inner = self.lock();
        inner.position(id).map(|i| inner.entries[i].record.clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    #[must_use]
    pub fn config(&self) -> ToastConfig {
        self.lock().config.clone()
    }

    /// Change the global defaults. Toasts already shown keep their resolved
    /// values, but lowering `max_toasts` evicts the oldest surplus. Subscribers
    /// receive [`QueueChange::Reconfigured`] whenever the configuration differs.
    pub fn update_config(&self, f: impl FnOnce(&mut ToastConfig)) {
        let mut inner = self.lock();
        let mut config = inner.config.clone();
        f(&mut config);
        let config = config.clamped();
        if config == inner.config {
            return;
        }
        inner.config = config;
        let keep = inner.config.max_toasts;
        inner.evict_down_to(keep);
        debug!(position = %inner.config.position, max_toasts = keep, "toast config updated");
        let change = QueueChange::Reconfigured(inner.config.clone());
        inner.notify(change);
    }

    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = async_channel::bounded(SUBSCRIPTION_BUFFER);
        self.lock().subscribers.push(Subscriber {
            tx,
            backlog: rx.clone(),
        });
        Subscription { rx }
    }

    fn spawn_timer(&self, id: ToastId, duration: Duration) -> Option<JoinHandle<()>> {
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(err) => {
                warn!(%id, error = %err, "no tokio runtime; toast will not auto-dismiss");
                return None;
            }
        };
        let state: Weak<Mutex<Inner>> = Arc::downgrade(&self.inner);
        Some(runtime.spawn(async move {
            sleep(duration).await;
            if let Some(state) = state.upgrade() {
                lock(&state).remove(id, RemovalReason::Expired);
            }
        }))
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToastAction;

    fn queue_with_max(max_toasts: usize) -> ToastQueue {
        ToastQueue::new(ToastConfig {
            max_toasts,
            ..ToastConfig::default()
        })
    }

    fn sticky(message: &str) -> ToastOptions {
        ToastOptions::new(ToastKind::Info, message).sticky()
    }

    #[test]
    fn show_resolves_defaults_from_config() {
        let queue = ToastQueue::default();
        let id = queue.show(ToastOptions::default().sticky());
        let record = queue.get(id).unwrap_or_else(|| panic!("record missing"));

        assert_eq!(record.kind, ToastKind::Info);
        assert!(record.message.is_empty());
        assert!(record.dismissible);
        assert!(record.metadata.is_empty());
        assert!(!record.auto_dismisses());
    }

    #[test]
    fn ids_are_unique() {
        let queue = ToastQueue::default();
        let a = queue.show(sticky("a"));
        let b = queue.show(sticky("b"));
        assert_ne!(a, b);
    }

    #[test]
    fn snapshot_keeps_insertion_order() {
        let queue = ToastQueue::default();
        for message in ["first", "second", "third"] {
            queue.show(sticky(message));
        }
        let messages: Vec<_> = queue.snapshot().into_iter().map(|r| r.message).collect();
        assert_eq!(messages, ["first", "second", "third"]);
    }

    #[test]
    fn sixth_toast_evicts_the_oldest() {
        let queue = queue_with_max(5);
        let ids: Vec<_> = (0..6).map(|i| queue.show(sticky(&format!("t{i}")))).collect();

        let snapshot = queue.snapshot();
        assert_eq!(snapshot.len(), 5);
        assert!(queue.get(ids[0]).is_none());
        let kept: Vec<_> = snapshot.iter().map(|r| r.id).collect();
        assert_eq!(kept, ids[1..]);
    }

    #[test]
    fn eviction_is_announced_before_the_new_toast() {
        let queue = queue_with_max(1);
        let first = queue.show(sticky("first"));
        let sub = queue.subscribe();
        let second = queue.show(sticky("second"));

        let events = sub.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0].change,
            QueueChange::Removed {
                id: first,
                reason: RemovalReason::Evicted
            }
        );
        assert!(events[0].snapshot.is_empty());
        assert_eq!(events[1].change, QueueChange::Shown(second));
        assert_eq!(events[1].snapshot.len(), 1);
    }

    #[test]
    fn snapshot_never_exceeds_max_toasts() {
        let queue = queue_with_max(3);
        let sub = queue.subscribe();
        for i in 0..20 {
            queue.show(sticky(&format!("t{i}")));
            assert!(queue.len() <= 3);
        }
        assert!(sub.drain().iter().all(|e| e.snapshot.len() <= 3));
    }

    #[test]
    fn dismiss_unknown_id_returns_false() {
        let queue = ToastQueue::default();
        assert!(!queue.dismiss(ToastId::new()));
    }

    #[test]
    fn clear_empties_and_notifies_once() {
        let queue = ToastQueue::default();
        queue.show(sticky("a"));
        queue.show(sticky("b"));
        let sub = queue.subscribe();

        queue.clear();
        queue.clear();

        assert!(queue.is_empty());
        let events = sub.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].change, QueueChange::Cleared);
    }

    #[test]
    fn closing_action_removes_the_toast() {
        let queue = ToastQueue::default();
        let id = queue.show(sticky("deleted").action(ToastAction::new("undo", "Undo")));

        assert!(!queue.trigger_action(id, "redo"));
        assert_eq!(queue.len(), 1);
        assert!(queue.trigger_action(id, "undo"));
        assert!(queue.is_empty());
    }

    #[test]
    fn keep_open_action_leaves_the_toast() {
        let queue = ToastQueue::default();
        let id = queue.show(sticky("x").action(ToastAction::new("details", "Details").keep_open()));
        assert!(queue.trigger_action(id, "details"));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn close_event_respects_dismissible_flag() {
        let queue = ToastQueue::default();
        let locked = queue.show(sticky("locked").dismissible(false));
        let open = queue.show(sticky("open"));

        queue.handle_event(&ToastEvent::Close(locked));
        queue.handle_event(&ToastEvent::Close(open));

        assert!(queue.get(locked).is_some());
        assert!(queue.get(open).is_none());
        assert!(queue.dismiss(locked));
    }

    #[test]
    fn lowering_max_toasts_evicts_surplus() {
        let queue = queue_with_max(5);
        for i in 0..5 {
            queue.show(sticky(&format!("t{i}")));
        }
        queue.update_config(|config| config.max_toasts = 2);

        let messages: Vec<_> = queue.snapshot().into_iter().map(|r| r.message).collect();
        assert_eq!(messages, ["t3", "t4"]);
        assert_eq!(queue.config().max_toasts, 2);
    }

    #[test]
    fn update_config_announces_the_new_defaults() {
        let queue = queue_with_max(5);
        for i in 0..3 {
            queue.show(sticky(&format!("t{i}")));
        }
        let sub = queue.subscribe();

        queue.update_config(|config| config.max_toasts = 2);
        queue.update_config(|config| config.max_toasts = 2);

        let events = sub.drain();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0].change,
            QueueChange::Removed {
                reason: RemovalReason::Evicted,
                ..
            }
        ));
        assert_eq!(events[1].change, QueueChange::Reconfigured(queue.config()));
        assert_eq!(events[1].snapshot.len(), 2);
    }

    #[test]
    fn per_toast_progress_overrides_the_default() {
        let queue = ToastQueue::new(ToastConfig {
            show_progress: false,
            ..ToastConfig::default()
        });
        let plain = queue.info("plain");
        let animated = queue.show(ToastOptions::new(ToastKind::Info, "bar").show_progress(true));

        assert!(queue.get(plain).is_some_and(|r| !r.show_progress));
        assert!(queue.get(animated).is_some_and(|r| r.animates()));
    }

    #[test]
    fn lagging_subscriber_keeps_the_newest_events() {
        let queue = queue_with_max(5);
        let sub = queue.subscribe();
        for i in 0..SUBSCRIPTION_BUFFER * 2 {
            queue.show(sticky(&format!("t{i}")));
        }

        let events = sub.drain();
        assert_eq!(events.len(), SUBSCRIPTION_BUFFER);
        let last = events.last().unwrap_or_else(|| panic!("no events buffered"));
        let buffered: Vec<_> = last.snapshot.iter().map(|r| r.id).collect();
        let current: Vec<_> = queue.snapshot().into_iter().map(|r| r.id).collect();
        assert_eq!(buffered, current);
    }

    #[test]
    fn dropped_subscription_is_pruned() {
        let queue = ToastQueue::default();
        drop(queue.subscribe());
        queue.show(sticky("a"));
        assert_eq!(queue.lock().subscribers.len(), 0);
    }

    #[test]
    fn show_outside_runtime_keeps_toast() {
        let queue = ToastQueue::default();
        let id = queue.success("saved");
        assert!(queue.get(id).is_some_and(|r| r.auto_dismisses()));
        assert_eq!(queue.len(), 1);
    }
}
