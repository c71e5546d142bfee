//! Stack layout and signal forwarding for displayed toasts.

use std::time::Duration;

use async_channel::{Receiver, Sender};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::{debug, trace};

use crate::config::ToastConfig;
use crate::queue::{QueueChange, Subscription, ToastQueue};
use crate::types::{Position, ToastId, ToastRecord};

/// Re-render cadence while progress bars are running.
pub const PROGRESS_TICK: Duration = Duration::from_millis(100);

/// Signals a displayed toast sends upward.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ToastEvent {
    Close(ToastId),
    Action { id: ToastId, action_id: String },
}

/// Fixed-height stacking: offsets come from the index, not from measured layout.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct StackLayout {
    pub toast_height: u32,
    pub stack_gap: u32,
}

impl StackLayout {
    pub const fn from_config(config: &ToastConfig) -> Self {
        Self {
            toast_height: config.toast_height,
            stack_gap: config.stack_gap,
        }
    }

    /// `index * (toast_height + stack_gap)`, saturating.
    pub fn offset_for(&self, index: usize) -> u32 {
        let step = self.toast_height.saturating_add(self.stack_gap);
        u32::try_from(index).map_or(u32::MAX, |i| i.saturating_mul(step))
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ToastView {
    pub record: ToastRecord,
    pub index: usize,
    pub offset_px: u32,
    /// Remaining share of the auto-dismiss delay, from 1.0 down to 0.0.
    pub progress: Option<f32>,
}

/// Everything a surface needs to draw the stack once.
#[derive(Clone, Debug, Serialize)]
pub struct Frame {
    pub position: Position,
    pub views: Vec<ToastView>,
}

impl Frame {
    /// Vertical translation from the anchor edge; negative for bottom stacks.
    pub fn translate_y(&self, view: &ToastView) -> i64 {
        let offset = i64::from(view.offset_px);
        if self.position.grows_upward() {
            -offset
        } else {
            offset
        }
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    fn has_running_timers(&self) -> bool {
        self.views.iter().any(|v| v.progress.is_some())
    }
}

/// Drawing backend fed by [`ToastRenderer::attach`].
pub trait Surface: Send + 'static {
    fn render(&mut self, frame: &Frame);
}

impl<F> Surface for F
where
    F: FnMut(&Frame) + Send + 'static,
{
    fn render(&mut self, frame: &Frame) {
        self(frame);
    }
}

#[derive(Clone, Debug)]
pub struct ToastRenderer {
    layout: StackLayout,
    position: Position,
    events: Sender<ToastEvent>,
}

impl ToastRenderer {
    /// Build a renderer and the receiving end of its close/action signals.
    #[must_use]
    pub fn new(config: &ToastConfig) -> (Self, Receiver<ToastEvent>) {
        let (events, rx) = async_channel::unbounded();
        let renderer = Self {
            layout: StackLayout::from_config(config),
            position: config.position,
            events,
        };
        (renderer, rx)
    }

    /// Pick up new anchor and spacing values; used when the queue's config changes.
    pub const fn reconfigure(&mut self, config: &ToastConfig) {
        self.layout = StackLayout::from_config(config);
        self.position = config.position;
    }

    pub const fn stack_layout(&self) -> StackLayout {
        self.layout
    }

    pub fn layout(&self, records: &[ToastRecord], now: Instant) -> Frame {
        let views = records
            .iter()
            .enumerate()
            .map(|(index, record)| ToastView {
                record: record.clone(),
                index,
                offset_px: self.layout.offset_for(index),
                progress: Self::progress_of(record, now),
            })
            .collect();
        Frame {
            position: self.position,
            views,
        }
    }

    fn progress_of(record: &ToastRecord, now: Instant) -> Option<f32> {
        if !record.show_progress {
            return None;
        }
        let remaining = record.remaining(now)?;
        #[allow(clippy::cast_possible_truncation)]
        let share = (remaining.as_secs_f64() / record.duration.as_secs_f64()) as f32;
        Some(share.clamp(0.0, 1.0))
    }

    /// Forward a close request for `id`.
    pub fn close(&self, id: ToastId) {
        self.forward(ToastEvent::Close(id));
    }

    /// Forward a click on the action `action_id` of toast `id`.
    pub fn action(&self, id: ToastId, action_id: impl Into<String>) {
        self.forward(ToastEvent::Action {
            id,
            action_id: action_id.into(),
        });
    }

    fn forward(&self, event: ToastEvent) {
        if let Err(err) = self.events.try_send(event) {
            debug!(event = ?err.into_inner(), "no listener for toast event");
        }
    }

    /// Draw the current queue onto `surface`, then again after every change.
    ///
    /// While a toast with a progress bar is counting down the frame is also
    /// refreshed every [`PROGRESS_TICK`]. A [`QueueChange::Reconfigured`] event
    /// moves the stack to the new anchor and spacing. The task ends once the
    /// queue is gone.
    pub fn attach<S: Surface>(&self, queue: &ToastQueue, surface: S) -> JoinHandle<S> {
        let subscription = queue.subscribe();
        let initial = self.layout(&queue.snapshot(), Instant::now());
        tokio::spawn(self.clone().run(subscription, initial, surface))
    }

    async fn run<S: Surface>(mut self, subscription: Subscription, initial: Frame, mut surface: S) -> S {
        surface.render(&initial);
        let mut records = initial.views.into_iter().map(|v| v.record).collect::<Vec<_>>();
        let mut ticker = interval(PROGRESS_TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let animate = records.iter().any(ToastRecord::animates);
            tokio::select! {
                event = subscription.recv() => {
                    let Some(event) = event else { break };
                    trace!(change = ?event.change, "re-rendering toasts");
                    if let QueueChange::Reconfigured(config) = &event.change {
                        self.reconfigure(config);
                    }
                    records = event.snapshot.to_vec();
                }
                _ = ticker.tick(), if animate => {}
            }
            let frame = self.layout(&records, Instant::now());
            surface.render(&frame);
            if !frame.has_running_timers() {
                ticker.reset();
            }
        }
        debug!("toast queue closed; renderer stopped");
        surface
    }
}
