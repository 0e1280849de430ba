use crate::config::NegotiatorConfig;

pub fn setup_logging(config: &NegotiatorConfig) {
    common::setup_logging("negotiator", config.log_level, config.environment);
}
