use std::io::Write;

use toastq::render::{Frame, Surface, ToastView};
use tracing::debug;

const BAR_WIDTH: usize = 10;

/// Prints every frame to stdout, one line per toast.
pub struct TerminalSurface {
    frames: u64,
}

impl TerminalSurface {
    pub const fn new() -> Self {
        Self { frames: 0 }
    }

    fn line(frame: &Frame, view: &ToastView) -> String {
        let record = &view.record;
        let title = record
            .title
            .as_deref()
            .map(|t| format!("{t}: "))
            .unwrap_or_default();
        let action = record
            .action
            .as_ref()
            .map(|a| format!(" [{}]", a.label))
            .unwrap_or_default();
        format!(
            "  #{idx} {y:>+5}px {kind:<7} {title}{message}{action}{bar}",
            idx = view.index,
            y = frame.translate_y(view),
            kind = record.kind,
            message = record.message,
            bar = view.progress.map(progress_bar).unwrap_or_default(),
        )
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn progress_bar(share: f32) -> String {
    let filled = ((share * BAR_WIDTH as f32).round() as usize).min(BAR_WIDTH);
    format!(" |{}{}|", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

impl Surface for TerminalSurface {
    fn render(&mut self, frame: &Frame) {
        self.frames += 1;
        let mut out = std::io::stdout().lock();
        let mut text = format!("-- frame {} ({}) --\n", self.frames, frame.position);
        for view in &frame.views {
            text.push_str(&Self::line(frame, view));
            text.push('\n');
        }
        if let Err(err) = out.write_all(text.as_bytes()).and_then(|()| out.flush()) {
            debug!(error = %err, "failed to write frame");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::progress_bar;

    #[test]
    fn progress_bar_scales_with_share() {
        assert_eq!(progress_bar(1.0), " |##########|");
        assert_eq!(progress_bar(0.5), " |#####-----|");
        assert_eq!(progress_bar(0.0), " |----------|");
    }
}
