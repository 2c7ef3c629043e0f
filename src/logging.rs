// ABOUTME: Structured logging setup via tracing + tracing-subscriber (§10.2)
// ABOUTME: Initialized once at process start, before lifecycle init/start dispatch

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;

/// Default filter directive applied when `RUST_LOG` is not set.
const DEFAULT_DIRECTIVE: &str = "info";

/// Install the global tracing subscriber. Call once, before any other
/// component is constructed.
pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    match format {
        LogFormat::Json => {
            let registry = tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_target(true));
            if registry.try_init().is_err() {
                eprintln!("tracing subscriber already initialized");
            }
        }
        LogFormat::Pretty => {
            let registry = tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(false));
            if registry.try_init().is_err() {
                eprintln!("tracing subscriber already initialized");
            }
        }
    }
}
