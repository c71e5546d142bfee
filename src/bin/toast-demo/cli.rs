use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::{ArgAction, Parser};
use humantime::parse_duration;
use toastq::types::{Position, ToastKind};

#[derive(Parser, Debug)]
#[command(author, version, about = "Shows toasts in the terminal", long_about = None)]
pub struct Cli {
    /// TOML configuration file.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Toast to show, as `kind:message` or a bare message (repeatable).
    #[arg(long = "toast", value_name = "KIND:MESSAGE", required = true)]
    pub toasts: Vec<ToastArg>,

    /// Auto-dismiss delay for every toast (e.g. "4s"); "0s" keeps them.
    #[arg(long, value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// Delay between two consecutive toasts.
    #[arg(long, value_parser = parse_duration, default_value = "300ms")]
    pub stagger: Duration,

    /// Attach an action button with this label to every toast.
    #[arg(long, value_name = "LABEL")]
    pub action: Option<String>,

    #[arg(long, value_parser = Position::from_str)]
    pub position: Option<Position>,

    #[arg(long, value_parser = clap::value_parser!(usize))]
    pub max_toasts: Option<usize>,

    /// Run the queue without drawing frames; changes are only logged.
    #[arg(long, env = "TOAST_HEADLESS", action = ArgAction::SetTrue)]
    pub headless: bool,

    /// Use a JSON tracing layer (`--features json-logs`).
    #[arg(long, action = ArgAction::SetTrue)]
    pub json_logs: bool,

    /// Explicit log filter (e.g. "toastq=debug").
    #[arg(long, value_name = "FILTER")]
    pub log_filter: Option<String>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToastArg {
    pub kind: ToastKind,
    pub message: String,
}

impl FromStr for ToastArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some((prefix, rest)) = s.split_once(':') {
            if let Ok(kind) = ToastKind::from_str(prefix.trim()) {
                return Ok(Self {
                    kind,
                    message: rest.trim().to_string(),
                });
            }
        }
        if s.trim().is_empty() {
            return Err("toast message cannot be empty".to_string());
        }
        Ok(Self {
            kind: ToastKind::Info,
            message: s.trim().to_string(),
        })
    }
}
