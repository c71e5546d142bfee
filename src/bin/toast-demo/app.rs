use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::time::sleep;
use toastq::Result;
use toastq::config::{MAX_TOASTS_BOUNDS, ToastConfig};
use toastq::error::{ConfigError, Error};
use toastq::queue::ToastQueue;
use toastq::render::ToastRenderer;
use toastq::telemetry::init_tracing;
use toastq::types::{ToastAction, ToastOptions};
use tracing::{info, warn};

use super::cli::Cli;
use super::surface::TerminalSurface;

const ACTION_ID: &str = "demo-action";

pub async fn run(cli: Cli) -> Result<()> {
    init_tracing(cli.log_filter.as_deref(), cli.json_logs)?;

    let mut config = ToastConfig::load(cli.config.as_deref())?;
    if let Some(position) = cli.position {
        config.position = position;
    }
    if let Some(max_toasts) = cli.max_toasts {
        if !MAX_TOASTS_BOUNDS.contains(&max_toasts) {
            return Err(Error::from(ConfigError::InvalidField {
                field: "cli.max_toasts",
                message: format!(
                    "value must be between {} and {}",
                    MAX_TOASTS_BOUNDS.start(),
                    MAX_TOASTS_BOUNDS.end()
                ),
            }));
        }
        config.max_toasts = max_toasts;
    }
    let headless = cli.headless;
    info!(position = %config.position, max_toasts = config.max_toasts, headless, "starting toast demo");

    let queue = ToastQueue::new(config.clone());
    let (renderer, events) = ToastRenderer::new(&config);
    let render_task = (!headless).then(|| renderer.attach(&queue, TerminalSurface::new()));

    let pump_queue = queue.clone();
    let pump = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            pump_queue.handle_event(&event);
        }
    });

    let producer = tokio::spawn(show_all(queue.clone(), cli));
    let changes = queue.subscribe();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("shutdown signal received, clearing toasts");
                queue.clear();
                break;
            }
            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    if !apply_command(&queue, &renderer, line.trim()) {
                        queue.clear();
                        break;
                    }
                }
                Ok(None) => stdin_open = false,
                Err(err) => {
                    warn!(error = %err, "stdin unavailable, commands disabled");
                    stdin_open = false;
                }
            },
            event = changes.recv() => {
                let Some(event) = event else { break };
                if headless {
                    info!(change = ?event.change, visible = event.snapshot.len(), "toast queue changed");
                }
                if producer.is_finished() && queue.is_empty() {
                    break;
                }
            }
        }
    }

    // the render task ends once every queue handle is gone
    producer.abort();
    pump.abort();
    let _ = tokio::join!(producer, pump);
    drop(renderer);
    drop(changes);
    drop(queue);
    if let Some(task) = render_task {
        if let Err(err) = task.await {
            warn!(error = %err, "render task terminated unexpectedly");
        }
    }
    info!("toast demo finished");
    Ok(())
}

async fn show_all(queue: ToastQueue, cli: Cli) {
    let count = cli.toasts.len();
    for (i, arg) in cli.toasts.into_iter().enumerate() {
        let mut options = ToastOptions::new(arg.kind, arg.message);
        if let Some(duration) = cli.duration {
            options = options.duration(duration);
        }
        if let Some(label) = cli.action.as_deref() {
            options = options.action(ToastAction::new(ACTION_ID, label));
        }
        queue.show(options.meta("source", "cli"));
        if i + 1 < count && cli.stagger > Duration::ZERO {
            sleep(cli.stagger).await;
        }
    }
}

/// Handles `close <n>`, `action <n>`, `clear` and `quit`; returns `false` on quit.
fn apply_command(queue: &ToastQueue, renderer: &ToastRenderer, command: &str) -> bool {
    let mut parts = command.split_whitespace();
    let verb = parts.next().unwrap_or_default();
    let target = parts
        .next()
        .and_then(|n| n.parse::<usize>().ok())
        .and_then(|n| queue.snapshot().get(n).map(|r| r.id));

    match (verb, target) {
        ("quit" | "q", _) => return false,
        ("clear", _) => queue.clear(),
        ("close", Some(id)) => renderer.close(id),
        ("action", Some(id)) => renderer.action(id, ACTION_ID),
        ("", _) => {}
        _ => warn!(command, "unknown command; use close <n>, action <n>, clear or quit"),
    }
    true
}
