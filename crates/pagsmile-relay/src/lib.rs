pub mod auth;
pub mod config;
pub mod cors;
pub mod diagnostics;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod metrics;
pub mod notification;
pub mod orders;
pub mod origin;
pub mod proxy;
pub mod routes;
pub mod state;

pub use config::RelayConfig;
pub use error::RelayError;
pub use state::AppState;
