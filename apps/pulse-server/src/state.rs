//! Application state - shared across all handlers.

use std::sync::Arc;
use std::time::Duration;

use pulse_core::ports::EntityGateway;
use pulse_core::{OptimisticStore, StoreConfig};
use pulse_infra::InMemoryGateway;

#[cfg(feature = "live")]
use pulse_infra::{HttpGateway, HttpGatewayConfig};

use crate::config::{AppConfig, GatewayMode};

/// Shared application state. One store per process.
#[derive(Clone)]
pub struct AppState {
    pub store: OptimisticStore,
}

impl AppState {
    /// Build the application state with the configured gateway.
    pub fn new(config: &AppConfig) -> Self {
        let gateway = build_gateway(&config.gateway);
        tracing::info!("Application state initialized");
        Self::with_gateway(gateway, config.store.clone())
    }

    pub fn with_gateway(gateway: Arc<dyn EntityGateway>, store: StoreConfig) -> Self {
        Self {
            store: OptimisticStore::new(gateway, store),
        }
    }
}

fn build_gateway(mode: &GatewayMode) -> Arc<dyn EntityGateway> {
    match mode {
        GatewayMode::Live(backend) => {
            #[cfg(feature = "live")]
            {
                let config = HttpGatewayConfig {
                    base_url: backend.base_url.clone(),
                    project_id: backend.project_id.clone(),
                    public_key: backend.public_key.clone(),
                    timeout: backend.timeout,
                };
                match HttpGateway::new(config) {
                    Ok(gateway) => {
                        tracing::info!(base_url = %backend.base_url, "Using live feed backend");
                        return Arc::new(gateway);
                    }
                    Err(e) => {
                        tracing::error!(
                            "Failed to build live gateway: {}. Using mock dataset.",
                            e
                        );
                    }
                }
            }

            #[cfg(not(feature = "live"))]
            {
                tracing::warn!(
                    base_url = %backend.base_url,
                    "FEED_API_URL set but built without the live feature. Using mock dataset."
                );
            }

            mock_gateway(Duration::ZERO)
        }
        GatewayMode::Mock { latency } => {
            tracing::warn!("FEED_API_URL not set. Running against the mock dataset.");
            mock_gateway(*latency)
        }
    }
}

fn mock_gateway(latency: Duration) -> Arc<dyn EntityGateway> {
    match InMemoryGateway::seeded() {
        Ok(gateway) => Arc::new(gateway.with_latency(latency)),
        Err(e) => {
            tracing::error!("Mock dataset unreadable: {}. Starting empty.", e);
            Arc::new(InMemoryGateway::new().with_latency(latency))
        }
    }
}
