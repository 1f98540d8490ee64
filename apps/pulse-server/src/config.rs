//! Application configuration loaded from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use pulse_core::StoreConfig;

/// Which gateway backs the store.
#[derive(Debug, Clone)]
pub enum GatewayMode {
    /// Bundled mock dataset, optionally with simulated latency.
    Mock { latency: Duration },
    /// Hosted feed backend.
    Live(LiveBackend),
}

#[derive(Debug, Clone)]
pub struct LiveBackend {
    pub base_url: String,
    pub project_id: Option<String>,
    pub public_key: Option<String>,
    pub timeout: Duration,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub gateway: GatewayMode,
    pub store: StoreConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = StoreConfig::default();
        let store = StoreConfig {
            page_size: parse_var("FEED_PAGE_SIZE").unwrap_or(defaults.page_size),
            comment_page_size: parse_var("COMMENT_PAGE_SIZE").unwrap_or(defaults.comment_page_size),
            default_author: env::var("DEFAULT_AUTHOR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.default_author),
        };

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("PORT").unwrap_or(8080),
            gateway: Self::gateway_mode(),
            store,
        }
    }

    /// `FEED_API_URL` selects the live backend unless `GATEWAY_MODE=mock`.
    fn gateway_mode() -> GatewayMode {
        let forced_mock = env::var("GATEWAY_MODE")
            .map(|mode| mode.eq_ignore_ascii_case("mock"))
            .unwrap_or(false);

        match env::var("FEED_API_URL").ok().filter(|url| !url.is_empty()) {
            Some(base_url) if !forced_mock => GatewayMode::Live(LiveBackend {
                base_url,
                project_id: env::var("FEED_PROJECT_ID").ok(),
                public_key: env::var("FEED_PUBLIC_KEY").ok(),
                timeout: Duration::from_millis(parse_var("FEED_API_TIMEOUT_MS").unwrap_or(10_000)),
            }),
            _ => GatewayMode::Mock {
                latency: Duration::from_millis(parse_var("MOCK_LATENCY_MS").unwrap_or(0)),
            },
        }
    }
}

fn parse_var<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}
