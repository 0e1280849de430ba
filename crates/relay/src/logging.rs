use crate::config::RelayConfig;

pub fn setup_logging(config: &RelayConfig) {
    common::setup_logging("relay", config.log_level, config.environment);
}
