pub mod config;
pub mod connection;
pub mod errors;
pub mod logging;
pub mod metrics;
pub mod producer;
pub mod server;

pub use config::{RelayConfig, get_configuration};
pub use connection::{ConnectionLifecycle, ConnectionPhase};
pub use errors::RelayError;
pub use producer::{ChannelProducer, Producer, UpstreamProducer};
pub use server::{AppState, router, run_relay, serve};

/// One complete, already encoded stream message as fanned out to viewers.
pub type Payload = std::sync::Arc<str>;
