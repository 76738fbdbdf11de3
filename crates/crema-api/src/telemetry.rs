//! Tracing subscriber setup for the relay binary

use tracing_subscriber::fmt::format::Format;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "crema=debug,tower_http=debug";

/// Install the global subscriber; `json` switches to one JSON object per line.
///
/// Calling this twice is harmless; the second call keeps the first subscriber.
pub fn init_telemetry(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    let result = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(false))
            .try_init()
    } else {
        let console_fmt = tracing_subscriber::fmt::layer().event_format(
            Format::default()
                .compact()
                .with_target(false)
                .without_time(),
        );
        tracing_subscriber::registry()
            .with(filter)
            .with(console_fmt)
            .try_init()
    };

    if result.is_ok() {
        tracing::info!(json, "Tracing initialized");
    }
}
