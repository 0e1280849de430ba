use common::{Backoff, Environment, LogLevel};
use protocol::CameraAddress;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    pub log_level: LogLevel,
    pub environment: Environment,
    pub bind_addr: String,
    /// Camera this relay serves. Used for diagnostics sent to viewers.
    pub camera_address: CameraAddress,
    /// WebSocket endpoint of the detection producer.
    pub upstream_url: String,
    pub channel_capacity: usize,
    /// Viewer connections with no forwarded frame for this long are closed.
    pub idle_timeout_secs: u64,
    pub reconnect_base_delay_ms: u64,
    pub reconnect_max_delay_ms: u64,
    #[serde(default)]
    pub otel_endpoint: Option<String>,
}

impl RelayConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::from_millis(self.reconnect_base_delay_ms, self.reconnect_max_delay_ms)
    }
}

pub fn get_configuration() -> Result<RelayConfig, config::ConfigError> {
    let config = config::Config::builder()
        .set_default("log_level", "info")?
        .set_default("environment", "development")?
        .set_default("bind_addr", format!("0.0.0.0:{}", protocol::DEFAULT_WS_PORT))?
        .set_default("upstream_url", "ws://127.0.0.1:8766")?
        .set_default("channel_capacity", 16)?
        .set_default("idle_timeout_secs", 30)?
        .set_default("reconnect_base_delay_ms", 500)?
        .set_default("reconnect_max_delay_ms", 10_000)?
        .add_source(
            config::Environment::with_prefix("RELAY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let config = config.try_deserialize::<RelayConfig>()?;

    if config.channel_capacity == 0 {
        return Err(config::ConfigError::Message(
            "channel_capacity must be at least 1".to_string(),
        ));
    }
    if config.idle_timeout_secs == 0 {
        return Err(config::ConfigError::Message(
            "idle_timeout_secs must be at least 1".to_string(),
        ));
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn with_env<T>(vars: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
        // SAFETY: every caller is #[serial]
        unsafe {
            for (key, value) in vars {
                std::env::set_var(key, value);
            }
        }
        let result = f();
        unsafe {
            for (key, _) in vars {
                std::env::remove_var(key);
            }
        }
        result
    }

    #[test]
    #[serial]
    fn camera_address_is_required() {
        assert!(get_configuration().is_err());
    }

    #[test]
    #[serial]
    fn defaults_fill_everything_but_the_camera() {
        let config = with_env(&[("RELAY_CAMERA_ADDRESS", "192.168.1.100")], get_configuration)
            .unwrap();

        assert_eq!(config.camera_address.as_str(), "192.168.1.100");
        assert_eq!(config.bind_addr, "0.0.0.0:8765");
        assert_eq!(config.upstream_url, "ws://127.0.0.1:8766");
        assert_eq!(config.channel_capacity, 16);
        assert_eq!(config.idle_timeout(), Duration::from_secs(30));
        assert_eq!(config.backoff().next_delay(), Duration::from_millis(500));
    }

    #[test]
    #[serial]
    fn malformed_camera_address_is_rejected() {
        let result = with_env(&[("RELAY_CAMERA_ADDRESS", "camera.local")], get_configuration);
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn zero_capacity_is_rejected() {
        let result = with_env(
            &[
                ("RELAY_CAMERA_ADDRESS", "10.0.0.2"),
                ("RELAY_CHANNEL_CAPACITY", "0"),
            ],
            get_configuration,
        );
        assert!(result.is_err());
    }
}
