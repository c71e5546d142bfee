use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use ::config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use serde_with::serde_as;
use tracing::debug;

use crate::error::ConfigError;
use crate::types::Position;

use super::defaults::{
    default_dismissible, default_duration, default_max_toasts, default_position,
    default_show_progress, default_stack_gap, default_toast_height,
};
use super::env::EnvSource;
use super::{HumantimeDuration, MAX_TOASTS_BOUNDS, STACK_GAP_MAX, ToastConfig};

/// Merge the TOML file at `path` (a missing file is skipped) with the
/// `TOASTQ__*` variables of `env`.
pub(super) fn load(path: Option<&Path>, env: &EnvSource) -> std::result::Result<RawConfig, ConfigError> {
    let mut builder = Config::builder();
    let mut origin = "environment".to_string();
    if let Some(path) = path {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                builder = builder.add_source(File::from_str(&contents, FileFormat::Toml));
                origin = path.display().to_string();
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "configuration file not found; using defaults");
            }
            Err(source) => {
                return Err(ConfigError::FileRead {
                    path: path.to_path_buf(),
                    source,
                });
            }
        }
    }
    builder = builder.add_source(
        Environment::with_prefix("TOASTQ")
            .separator("__")
            .try_parsing(true)
            .source(env.snapshot()),
    );

    builder
        .build()
        .map_err(|err| ConfigError::parse(origin.as_str(), err))?
        .try_deserialize()
        .map_err(|err| ConfigError::parse(origin, err))
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct RawConfig {
    #[serde(default)]
    pub(super) toast: RawToast,
}

#[serde_as]
#[derive(Debug, Deserialize)]
pub(super) struct RawToast {
    #[serde(default = "default_position")]
    pub(super) position: Position,
    #[serde(default = "default_duration")]
    #[serde_as(as = "HumantimeDuration")]
    pub(super) duration: Duration,
    #[serde(default = "default_max_toasts")]
    pub(super) max_toasts: usize,
    #[serde(default = "default_show_progress")]
    pub(super) show_progress: bool,
    #[serde(default = "default_stack_gap")]
    pub(super) stack_gap: u32,
    #[serde(default = "default_toast_height")]
    pub(super) toast_height: u32,
    #[serde(default = "default_dismissible")]
    pub(super) dismissible: bool,
}

impl Default for RawToast {
    fn default() -> Self {
        Self {
            position: default_position(),
            duration: default_duration(),
            max_toasts: default_max_toasts(),
            show_progress: default_show_progress(),
            stack_gap: default_stack_gap(),
            toast_height: default_toast_height(),
            dismissible: default_dismissible(),
        }
    }
}

impl RawConfig {
    pub(super) fn apply_env_overrides(&mut self, env: &EnvSource) -> std::result::Result<(), ConfigError> {
        if let Some(position) = env.parse::<Position>("TOAST_POSITION")? {
            self.toast.position = position;
        }
        if let Some(duration) = env.duration("TOAST_DURATION")? {
            self.toast.duration = duration;
        }
        if let Some(max_toasts) = env.parse::<usize>("TOAST_MAX")? {
            self.toast.max_toasts = max_toasts;
        }
        if let Some(show_progress) = env.boolean("TOAST_SHOW_PROGRESS")? {
            self.toast.show_progress = show_progress;
        }
        if let Some(stack_gap) = env.parse::<u32>("TOAST_STACK_GAP")? {
            self.toast.stack_gap = stack_gap;
        }
        if let Some(height) = env.parse::<u32>("TOAST_HEIGHT")? {
            self.toast.toast_height = height;
        }
        if let Some(dismissible) = env.boolean("TOAST_DISMISSIBLE")? {
            self.toast.dismissible = dismissible;
        }
        Ok(())
    }

    pub(super) fn validate_and_build(self) -> std::result::Result<ToastConfig, ConfigError> {
        let toast = self.toast;
        if !MAX_TOASTS_BOUNDS.contains(&toast.max_toasts) {
            return Err(ConfigError::invalid(
                "toast.max_toasts",
                format!(
                    "expected between {} and {}, got {}",
                    MAX_TOASTS_BOUNDS.start(),
                    MAX_TOASTS_BOUNDS.end(),
                    toast.max_toasts
                ),
            ));
        }
        if toast.stack_gap > STACK_GAP_MAX {
            return Err(ConfigError::invalid(
                "toast.stack_gap",
                format!("gap must not exceed {STACK_GAP_MAX}px"),
            ));
        }
        if toast.toast_height == 0 {
            return Err(ConfigError::invalid(
                "toast.toast_height",
                "toast height must be greater than zero",
            ));
        }

        Ok(ToastConfig {
            position: toast.position,
            duration: toast.duration,
            max_toasts: toast.max_toasts,
            show_progress: toast.show_progress,
            stack_gap: toast.stack_gap,
            toast_height: toast.toast_height,
            dismissible: toast.dismissible,
        })
    }
}
