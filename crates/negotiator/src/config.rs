use common::{Environment, LogLevel};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct NegotiatorConfig {
    pub log_level: LogLevel,
    pub environment: Environment,
    pub bind_addr: String,
    /// Port advertised to viewers for the relay socket.
    pub ws_port: u16,
    #[serde(default)]
    pub otel_endpoint: Option<String>,
}

pub fn get_configuration() -> Result<NegotiatorConfig, config::ConfigError> {
    let config = config::Config::builder()
        .set_default("log_level", "info")?
        .set_default("environment", "development")?
        .set_default("bind_addr", "0.0.0.0:8080")?
        .set_default("ws_port", i64::from(protocol::DEFAULT_WS_PORT))?
        .add_source(
            config::Environment::with_prefix("NEGOTIATOR")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    config.try_deserialize::<NegotiatorConfig>()
}
