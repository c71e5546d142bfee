#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::sleep;
use toastq::config::ToastConfig;
use toastq::queue::{SUBSCRIPTION_BUFFER, ToastQueue};
use toastq::render::{Frame, ToastEvent, ToastRenderer};
use toastq::types::{Position, ToastAction, ToastKind, ToastOptions};

type Frames = Arc<Mutex<Vec<Frame>>>;

fn recording() -> (Frames, impl FnMut(&Frame) + Send + 'static) {
    let frames: Frames = Arc::default();
    let sink = Arc::clone(&frames);
    (frames, move |frame: &Frame| sink.lock().unwrap().push(frame.clone()))
}

fn offsets(frame: &Frame) -> Vec<u32> {
    frame.views.iter().map(|v| v.offset_px).collect()
}

fn messages(frame: &Frame) -> Vec<String> {
    frame.views.iter().map(|v| v.record.message.clone()).collect()
}

async fn settle() {
    sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn attached_renderer_redraws_on_every_change() {
    let config = ToastConfig {
        show_progress: false,
        ..ToastConfig::default()
    };
    let queue = ToastQueue::new(config.clone());
    let (renderer, _events) = ToastRenderer::new(&config);
    let (frames, surface) = recording();
    let task = renderer.attach(&queue, surface);

    let ids: Vec<_> = ["A", "B", "C"]
        .into_iter()
        .map(|m| queue.show(ToastOptions::new(ToastKind::Info, m).sticky()))
        .collect();
    settle().await;
    queue.dismiss(ids[1]);
    settle().await;

    {
        let frames = frames.lock().unwrap();
        let all: Vec<_> = frames.iter().map(offsets).collect();
        assert_eq!(
            all,
            [
                vec![],
                vec![0],
                vec![0, 92],
                vec![0, 92, 184],
                vec![0, 92],
            ]
        );
        let last: Vec<_> = frames[4].views.iter().map(|v| v.record.message.as_str()).collect();
        assert_eq!(last, ["A", "C"]);
    }

    drop(queue);
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn progress_frames_stop_once_timers_are_done() {
    let queue = ToastQueue::default();
    let (renderer, _events) = ToastRenderer::new(&queue.config());
    let (frames, surface) = recording();
    let _task = renderer.attach(&queue, surface);

    queue.show(ToastOptions::new(ToastKind::Info, "tick").duration(Duration::from_secs(1)));
    sleep(Duration::from_millis(350)).await;
    {
        let frames = frames.lock().unwrap();
        assert!(frames.len() >= 4, "expected progress redraws, got {}", frames.len());
        let progress = frames
            .last()
            .and_then(|f| f.views.first())
            .and_then(|v| v.progress)
            .unwrap();
        assert!(progress <= 0.71, "progress did not decrease: {progress}");
    }

    sleep(Duration::from_millis(800)).await;
    let settled = frames.lock().unwrap().len();
    assert!(frames.lock().unwrap().last().unwrap().is_empty());

    sleep(Duration::from_secs(5)).await;
    assert_eq!(frames.lock().unwrap().len(), settled);
}

#[tokio::test(start_paused = true)]
async fn forwarded_signals_drive_the_queue() {
    let queue = ToastQueue::default();
    let (renderer, events) = ToastRenderer::new(&queue.config());

    let undo = queue.show(
        ToastOptions::new(ToastKind::Warning, "Item deleted")
            .sticky()
            .action(ToastAction::new("undo", "Undo")),
    );
    let locked = queue.show(
        ToastOptions::new(ToastKind::Error, "Read-only")
            .sticky()
            .dismissible(false),
    );

    renderer.action(undo, "undo");
    renderer.close(locked);

    let forwarded: Vec<ToastEvent> = std::iter::from_fn(|| events.try_recv().ok()).collect();
    assert_eq!(forwarded.len(), 2);
    for event in &forwarded {
        queue.handle_event(event);
    }

    let remaining: Vec<_> = queue.snapshot().into_iter().map(|r| r.id).collect();
    assert_eq!(remaining, [locked]);
}

#[tokio::test(start_paused = true)]
async fn burst_beyond_the_buffer_still_renders_the_latest_stack() {
    let queue = ToastQueue::default();
    let (renderer, _events) = ToastRenderer::new(&queue.config());
    let (frames, surface) = recording();
    let _task = renderer.attach(&queue, surface);

    // every show past the fifth also announces an eviction
    for i in 0..SUBSCRIPTION_BUFFER {
        queue.show(ToastOptions::new(ToastKind::Info, format!("t{i}")).sticky());
    }
    sleep(Duration::from_secs(60)).await;

    let expected: Vec<_> = queue.snapshot().into_iter().map(|r| r.message).collect();
    assert_eq!(expected.len(), 5);
    let last = frames.lock().unwrap().last().map(messages).unwrap();
    assert_eq!(last, expected);
}

#[tokio::test(start_paused = true)]
async fn config_update_redraws_with_new_anchor_and_gap() {
    let queue = ToastQueue::default();
    let (renderer, _events) = ToastRenderer::new(&queue.config());
    let (frames, surface) = recording();
    let _task = renderer.attach(&queue, surface);

    queue.show(ToastOptions::new(ToastKind::Info, "a").sticky());
    queue.show(ToastOptions::new(ToastKind::Info, "b").sticky());
    settle().await;
    queue.update_config(|config| {
        config.position = Position::BottomCenter;
        config.stack_gap = 4;
    });
    settle().await;

    let frames = frames.lock().unwrap();
    let last = frames.last().unwrap();
    assert_eq!(last.position, Position::BottomCenter);
    assert_eq!(offsets(last), [0, 84]);
    assert_eq!(last.translate_y(&last.views[1]), -84);
}

#[tokio::test(start_paused = true)]
async fn only_toasts_asking_for_progress_animate() {
    let queue = ToastQueue::new(ToastConfig {
        show_progress: false,
        ..ToastConfig::default()
    });
    let (renderer, _events) = ToastRenderer::new(&queue.config());
    let (frames, surface) = recording();
    let _task = renderer.attach(&queue, surface);

    queue.show(ToastOptions::new(ToastKind::Info, "quiet").duration(Duration::from_secs(1)));
    queue.show(
        ToastOptions::new(ToastKind::Info, "bar")
            .duration(Duration::from_secs(1))
            .show_progress(true),
    );
    sleep(Duration::from_millis(350)).await;

    let frames = frames.lock().unwrap();
    assert!(frames.len() >= 5, "expected progress redraws, got {}", frames.len());
    let last = frames.last().unwrap();
    assert!(last.views[0].progress.is_none());
    assert!(last.views[1].progress.is_some());
}
