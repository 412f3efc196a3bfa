use crate::config::RelayConfig;
use crate::gateway::GatewayClient;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub gateway: GatewayClient,
}

impl AppState {
    pub fn new(config: RelayConfig) -> Result<Self, reqwest::Error> {
        let gateway = GatewayClient::new(&config)?;
        Ok(Self {
            config: Arc::new(config),
            gateway,
        })
    }

    /// Client used for fire-and-forget notification fan-out.
    pub fn http_client(&self) -> &reqwest::Client {
        self.gateway.http()
    }
}
