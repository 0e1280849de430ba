pub mod config;
pub mod handler;
pub mod logging;
pub mod negotiate;

pub use config::{NegotiatorConfig, get_configuration};
pub use handler::{AppState, router, run_server};
pub use negotiate::{NegotiateError, negotiate};
