use std::time::Duration;

use crate::types::Position;

pub(super) const fn default_position() -> Position {
    Position::TopRight
}

pub(super) const fn default_duration() -> Duration {
    Duration::from_millis(3_000)
}

pub(super) const fn default_max_toasts() -> usize {
    5
}

pub(super) const fn default_show_progress() -> bool {
    true
}

pub(super) const fn default_stack_gap() -> u32 {
    12
}

pub(super) const fn default_toast_height() -> u32 {
    80
}

pub(super) const fn default_dismissible() -> bool {
    true
}
