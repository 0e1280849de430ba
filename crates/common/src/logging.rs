use crate::config::{Environment, LogLevel};
use opentelemetry::global;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the process-wide subscriber: pretty output in development, JSON in
/// production. `RUST_LOG` takes precedence over `log_level` when set.
///
/// Spans are bridged to whatever global tracer provider is installed at call
/// time, so a [`crate::TelemetryGuard`] created first makes them exported.
pub fn setup_logging(service_name: &'static str, log_level: LogLevel, environment: Environment) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| log_level.as_str().into());

    let otel_layer = tracing_opentelemetry::layer().with_tracer(global::tracer(service_name));

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(otel_layer);

    let result = match environment {
        Environment::Production => registry
            .with(tracing_subscriber::fmt::layer().json().with_level(true))
            .try_init(),
        Environment::Development => registry
            .with(tracing_subscriber::fmt::layer().pretty().with_ansi(true))
            .try_init(),
    };

    // try_init tolerates a subscriber that is already installed
    if let Err(e) = result {
        tracing::debug!(error = %e, "Tracing subscriber already installed");
    }
}
