#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod error;
pub mod queue;
pub mod render;
pub mod telemetry;
pub mod types;

pub use config::ToastConfig;
pub use queue::{QueueEvent, RemovalReason, Subscription, ToastQueue};
pub use render::{Frame, StackLayout, Surface, ToastEvent, ToastRenderer, ToastView};
pub use types::{Position, ToastAction, ToastId, ToastKind, ToastOptions, ToastRecord};

pub type Result<T> = std::result::Result<T, error::Error>;
