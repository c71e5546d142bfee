use std::ops::RangeInclusive;
use std::path::Path;
use std::time::Duration;

use ::serde::Serialize;
use serde_with::serde_as;

use crate::Result;
use crate::error::ConfigError;
use crate::types::Position;

mod defaults;
mod env;
mod raw;
mod serde;

use self::env::EnvSource;
pub(crate) use self::serde::HumantimeDuration;

pub const MAX_TOASTS_BOUNDS: RangeInclusive<usize> = 1..=50;
pub const STACK_GAP_MAX: u32 = 256;

/// Process-wide toast defaults, changed at runtime with
/// `ToastQueue::update_config`. `duration`, `show_progress` and `dismissible`
/// can also be overridden per toast through `ToastOptions`.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ToastConfig {
    pub position: Position,
    /// Default auto-dismiss delay; zero keeps toasts until dismissed.
    #[serde_as(as = "HumantimeDuration")]
    pub duration: Duration,
    pub max_toasts: usize,
    pub show_progress: bool,
    /// Pixels between two stacked toasts.
    pub stack_gap: u32,
    /// Approximate height of a rendered toast, used for stack offsets.
    pub toast_height: u32,
    pub dismissible: bool,
}

impl Default for ToastConfig {
    fn default() -> Self {
        Self {
            position: defaults::default_position(),
            duration: defaults::default_duration(),
            max_toasts: defaults::default_max_toasts(),
            show_progress: defaults::default_show_progress(),
            stack_gap: defaults::default_stack_gap(),
            toast_height: defaults::default_toast_height(),
            dismissible: defaults::default_dismissible(),
        }
    }
}

impl ToastConfig {
    /// Load configuration from an optional TOML file and the environment.
    ///
    /// `TOASTQ__TOAST__<FIELD>` variables are merged by the config loader, then
    /// the short `TOAST_*` variables are applied on top.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read or parsed
    /// (a directory counts as unreadable), when environment
    /// overrides are invalid, or when the resulting values fail validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Ok(Self::load_from(path, &EnvSource::process())?)
    }

    fn load_from(path: Option<&Path>, env: &EnvSource) -> std::result::Result<Self, ConfigError> {
        let mut raw = raw::load(path, env)?;
        raw.apply_env_overrides(env)?;
        raw.validate_and_build()
    }

    /// Bring values changed at runtime back inside their accepted ranges.
    #[must_use]
    pub fn clamped(mut self) -> Self {
        self.max_toasts = self
            .max_toasts
            .clamp(*MAX_TOASTS_BOUNDS.start(), *MAX_TOASTS_BOUNDS.end());
        self.stack_gap = self.stack_gap.min(STACK_GAP_MAX);
        self.toast_height = self.toast_height.max(1);
        self
    }
}
