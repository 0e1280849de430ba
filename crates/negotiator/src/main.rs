use anyhow::Context;
use common::TelemetryGuard;
use negotiator::{get_configuration, logging::setup_logging, run_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_configuration().context("failed to load negotiator configuration")?;

    let _telemetry = config
        .otel_endpoint
        .as_ref()
        .map(|endpoint| TelemetryGuard::init("negotiator", endpoint, config.environment))
        .transpose()?;

    setup_logging(&config);

    tracing::info!(config = ?config, "Loaded configuration");

    run_server(config).await
}
