//! Structured logging setup.
//!
//! Filter priority: `RUST_LOG` > the `level` argument > `info`.
//! Debug builds print human-readable output, release builds emit JSON.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. Calling it twice is harmless.
pub fn init(level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directive_for(level)));

    #[cfg(debug_assertions)]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .ok();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .ok();
    }
}

/// `warn` for third-party crates, `level` for ours. Unknown levels fall back to `info`.
fn directive_for(level: &str) -> String {
    let level = level.trim().to_lowercase();
    let level = match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" | "off" => level.as_str(),
        _ => "info",
    };
    format!("warn,troupe={level}")
}
