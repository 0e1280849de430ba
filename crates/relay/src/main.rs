use anyhow::Context;
use common::TelemetryGuard;
use relay::{UpstreamProducer, get_configuration, logging::setup_logging, run_relay};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_configuration().context("failed to load relay configuration")?;

    let _telemetry = config
        .otel_endpoint
        .as_ref()
        .map(|endpoint| TelemetryGuard::init("relay", endpoint, config.environment))
        .transpose()?;

    setup_logging(&config);

    tracing::info!(config = ?config, "Loaded configuration");

    let producer = UpstreamProducer::new(
        config.upstream_url.clone(),
        config.camera_address.clone(),
        config.backoff(),
    );

    run_relay(config, producer).await
}
