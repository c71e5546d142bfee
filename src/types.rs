use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

/// Unique identifier of a toast, generated when the toast is shown.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ToastId(Uuid);

impl ToastId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ToastId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ToastId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
    Warning,
    #[default]
    Info,
}

impl ToastKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl Display for ToastKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToastKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "success" | "ok" => Ok(Self::Success),
            "error" | "err" => Ok(Self::Error),
            "warning" | "warn" => Ok(Self::Warning),
            "info" | "information" => Ok(Self::Info),
            other => Err(format!("unknown toast type: {other}")),
        }
    }
}

/// Screen anchor of the toast stack.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    TopLeft,
    TopCenter,
    #[default]
    TopRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl Position {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TopLeft => "top-left",
            Self::TopCenter => "top-center",
            Self::TopRight => "top-right",
            Self::BottomLeft => "bottom-left",
            Self::BottomCenter => "bottom-center",
            Self::BottomRight => "bottom-right",
        }
    }

    /// Bottom-anchored stacks push later toasts upward, away from the edge.
    pub const fn grows_upward(self) -> bool {
        matches!(
            self,
            Self::BottomLeft | Self::BottomCenter | Self::BottomRight
        )
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Position {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "top-left" => Ok(Self::TopLeft),
            "top-center" | "top" => Ok(Self::TopCenter),
            "top-right" => Ok(Self::TopRight),
            "bottom-left" => Ok(Self::BottomLeft),
            "bottom-center" | "bottom" => Ok(Self::BottomCenter),
            "bottom-right" => Ok(Self::BottomRight),
            other => Err(format!("unknown toast position: {other}")),
        }
    }
}

/// The single button a toast may carry.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ToastAction {
    pub id: String,
    pub label: String,
    #[serde(default = "close_on_click_default")]
    pub close_on_click: bool,
}

const fn close_on_click_default() -> bool {
    true
}

impl ToastAction {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            close_on_click: true,
        }
    }

    #[must_use]
    pub fn keep_open(mut self) -> Self {
        self.close_on_click = false;
        self
    }
}

pub type Metadata = BTreeMap<String, serde_json::Value>;

/// A toast as held by the queue. Never mutated once shown.
#[derive(Clone, Debug, Serialize)]
pub struct ToastRecord {
    pub id: ToastId,
    pub kind: ToastKind,
    pub message: String,
    pub title: Option<String>,
    /// `Duration::ZERO` keeps the toast until it is dismissed.
    #[serde(serialize_with = "serialize_millis")]
    pub duration: Duration,
    pub dismissible: bool,
    /// Whether a renderer draws the remaining-time bar for this toast.
    pub show_progress: bool,
    pub action: Option<ToastAction>,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub shown_at: Instant,
}

impl ToastRecord {
    pub const fn auto_dismisses(&self) -> bool {
        !self.duration.is_zero()
    }

    /// A progress bar is drawn only for timed toasts that asked for one.
    pub const fn animates(&self) -> bool {
        self.show_progress && self.auto_dismisses()
    }

    /// Time left before the auto-dismiss timer fires, `None` for sticky toasts.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.auto_dismisses()
            .then(|| self.duration.saturating_sub(now.saturating_duration_since(self.shown_at)))
    }
}

fn serialize_millis<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
}

/// What a caller may supply when requesting a toast. Unset fields fall back to
/// the queue configuration.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct ToastOptions {
    #[serde(default, rename = "type")]
    pub kind: Option<ToastKind>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "opt_millis::deserialize")]
    pub duration: Option<Duration>,
    #[serde(default)]
    pub dismissible: Option<bool>,
    #[serde(default, rename = "showProgress", alias = "show_progress")]
    pub show_progress: Option<bool>,
    #[serde(default)]
    pub action: Option<ToastAction>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl ToastOptions {
    pub fn new(kind: ToastKind, message: impl Into<String>) -> Self {
        Self {
            kind: Some(kind),
            message: Some(message.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Keep the toast on screen until it is dismissed.
    #[must_use]
    pub fn sticky(self) -> Self {
        self.duration(Duration::ZERO)
    }

    #[must_use]
    pub fn dismissible(mut self, dismissible: bool) -> Self {
        self.dismissible = Some(dismissible);
        self
    }

    #[must_use]
    pub fn show_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = Some(show_progress);
        self
    }

    #[must_use]
    pub fn action(mut self, action: ToastAction) -> Self {
        self.action = Some(action);
        self
    }

    #[must_use]
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata
            .get_or_insert_with(Metadata::new)
            .insert(key.into(), value.into());
        self
    }
}

/// Durations in caller options are plain milliseconds, as a web caller sends them.
mod opt_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        // negative values clamp to zero, i.e. sticky
        let raw = Option::<i64>::deserialize(deserializer)?;
        Ok(raw.map(|ms| Duration::from_millis(u64::try_from(ms).unwrap_or(0))))
    }
}
