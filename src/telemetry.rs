use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt};

use crate::Result;
use crate::error::Error;

/// Environment variable consulted before `RUST_LOG`.
pub const LOG_ENV: &str = "TOASTQ_LOG";

const FALLBACK_FILTER: &str = "info";

/// Install the global tracing subscriber.
///
/// The filter is the first valid one among `explicit_filter`, `TOASTQ_LOG`,
/// `RUST_LOG` and `info`.
///
/// # Errors
///
/// Fails when JSON output is requested without the `json-logs` feature, or when
/// a global subscriber is already installed.
pub fn init_tracing(explicit_filter: Option<&str>, use_json: bool) -> Result<()> {
    let filter = resolve_filter(explicit_filter)?;

    #[cfg(feature = "json-logs")]
    if use_json {
        let subscriber = Registry::default().with(filter).with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .json()
                .flatten_event(true),
        );
        return tracing::subscriber::set_global_default(subscriber)
            .map_err(|err| Error::Telemetry(err.to_string()));
    }

    #[cfg(not(feature = "json-logs"))]
    if use_json {
        return Err(Error::Telemetry(
            "binary was built without the `json-logs` feature".to_string(),
        ));
    }

    let subscriber = Registry::default()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true).compact());
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| Error::Telemetry(err.to_string()))
}

fn resolve_filter(explicit_filter: Option<&str>) -> Result<EnvFilter> {
    explicit_filter
        .map(str::to_string)
        .into_iter()
        .chain(std::env::var(LOG_ENV).ok())
        .chain(std::env::var("RUST_LOG").ok())
        .chain(std::iter::once(FALLBACK_FILTER.to_string()))
        .find_map(|candidate| EnvFilter::try_new(candidate).ok())
        .ok_or_else(|| Error::Telemetry("invalid log filter".to_string()))
}
