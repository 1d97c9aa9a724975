//! Client configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_API_URL: &str = "http://localhost:8080/api/v1";
const DEFAULT_MARKET_DATA_URL: &str = "http://localhost:8080/api";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base of the versioned REST API (`.../api/v1`)
    pub api_base_url: String,
    /// Base of the market-data endpoints (`.../api`)
    pub market_data_base_url: String,
    pub request_timeout: Duration,
    /// Where the session and caches are persisted. `None` keeps them in memory.
    pub storage_path: Option<PathBuf>,
    /// Upper bound of the random delay added to every poll tick
    pub poll_jitter: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            market_data_base_url: DEFAULT_MARKET_DATA_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            storage_path: None,
            poll_jitter: Duration::ZERO,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, String> {
        let api_base_url = env::var("DASHBOARD_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let market_data_base_url =
            env::var("DASHBOARD_MARKET_DATA_URL").unwrap_or_else(|_| DEFAULT_MARKET_DATA_URL.to_string());

        let timeout_secs: u64 = env::var("DASHBOARD_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_TIMEOUT_SECS.to_string())
            .parse()
            .map_err(|_| "DASHBOARD_TIMEOUT_SECS must be a valid number")?;

        let jitter_ms: u64 = env::var("DASHBOARD_POLL_JITTER_MS")
            .unwrap_or_else(|_| "0".to_string())
            .parse()
            .map_err(|_| "DASHBOARD_POLL_JITTER_MS must be a valid number")?;

        let storage_path = env::var("DASHBOARD_STORAGE_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            api_base_url,
            market_data_base_url,
            request_timeout: Duration::from_secs(timeout_secs),
            storage_path,
            poll_jitter: Duration::from_millis(jitter_ms),
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        for (name, url) in [
            ("DASHBOARD_API_URL", &self.api_base_url),
            ("DASHBOARD_MARKET_DATA_URL", &self.market_data_base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(format!("{} must start with http:// or https://", name));
            }
        }

        let timeout = self.request_timeout.as_secs();
        if !(1..=300).contains(&timeout) {
            return Err("DASHBOARD_TIMEOUT_SECS must be between 1 and 300".to_string());
        }

        if self.poll_jitter > Duration::from_secs(10) {
            return Err("DASHBOARD_POLL_JITTER_MS must not exceed 10000".to_string());
        }

        Ok(())
    }
}
