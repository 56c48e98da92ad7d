use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogConfig;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,docchat_client=debug";

/// Install the global `tracing` subscriber.
///
/// Logs go to stderr so they never interleave with shell output on stdout.
/// `RUST_LOG` overrides [`DEFAULT_FILTER`]. Calling this twice is a no-op.
pub fn init(log: &LogConfig) {
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(filter_layer);
    let installed = if log.json() {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
    };

    if installed.is_err() {
        tracing::debug!(name: "telemetry.already_initialized", "Subscriber already installed");
    }
}
