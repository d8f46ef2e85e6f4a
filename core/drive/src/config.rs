//! Drive client configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use adrive_common::{Error, Result};

/// Host serving the refresh-token exchange.
const DEFAULT_AUTH_BASE: &str = "https://websv.aliyundrive.com";
/// Host serving the file API.
const DEFAULT_API_BASE: &str = "https://api.aliyundrive.com";

/// Largest number of bytes sent in a single part PUT (1 GiB).
pub const MAX_PART_SIZE: u64 = 1024 * 1024 * 1024;

const DEFAULT_ROOT_ID: &str = "root";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.77 Safari/537.36";
const DEFAULT_ACCEPT_LANGUAGE: &str = "zh-CN,zh;q=0.9,en;q=0.8,en-US;q=0.7,zh-TW;q=0.6";
const DEFAULT_ORIGIN: &str = "https://www.aliyundrive.com";
const DEFAULT_REFERER: &str = "https://www.aliyundrive.com/";

/// Base URLs of the two services the client talks to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoints {
    /// Base of the token refresh service.
    pub auth_base: String,
    /// Base of the file API.
    pub api_base: String,
}

impl Endpoints {
    /// Point both services at one host (used against mock servers).
    pub fn single(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            auth_base: base.clone(),
            api_base: base,
        }
    }

    pub(crate) fn auth(&self, path: &str) -> String {
        format!("{}{}", self.auth_base.trim_end_matches('/'), path)
    }

    pub(crate) fn api(&self, path: &str) -> String {
        format!("{}{}", self.api_base.trim_end_matches('/'), path)
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            auth_base: DEFAULT_AUTH_BASE.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

/// Configuration for a [`Drive`](crate::Drive).
///
/// Every field has a default, so a JSON config file only needs to name the
/// values it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub endpoints: Endpoints,
    /// File ID used when a listing is asked for an empty parent.
    pub root_id: String,
    /// Bytes per upload part.
    pub part_size: u64,
    /// TCP connect timeout.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout for JSON API calls. Part PUTs and downloads are
    /// not bounded by it.
    pub request_timeout_secs: u64,
    pub pool_idle_timeout_secs: u64,
    pub pool_max_idle_per_host: usize,
    /// Refresh this many seconds before the reported expiry.
    pub refresh_margin_secs: u64,
    pub user_agent: String,
    pub accept_language: String,
    pub origin: String,
    pub referer: String,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            root_id: DEFAULT_ROOT_ID.to_string(),
            part_size: MAX_PART_SIZE,
            connect_timeout_secs: 3,
            request_timeout_secs: 30,
            pool_idle_timeout_secs: 90,
            pool_max_idle_per_host: 100,
            refresh_margin_secs: 0,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            origin: DEFAULT_ORIGIN.to_string(),
            referer: DEFAULT_REFERER.to_string(),
        }
    }
}

impl DriveConfig {
    /// Default configuration aimed at a single host, e.g. a mock server.
    pub fn with_base_url(base: impl Into<String>) -> Self {
        Self {
            endpoints: Endpoints::single(base),
            ..Self::default()
        }
    }

    /// Check the configuration before building a client from it.
    ///
    /// # Errors
    /// - Zero part size
    /// - Unparsable endpoint URLs
    pub fn validate(&self) -> Result<()> {
        if self.part_size == 0 {
            return Err(Error::InvalidInput("part_size must be positive".to_string()));
        }
        for base in [&self.endpoints.auth_base, &self.endpoints.api_base] {
            Url::parse(base)
                .map_err(|e| Error::InvalidInput(format!("Invalid endpoint {}: {}", base, e)))?;
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn pool_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_idle_timeout_secs)
    }

    pub fn refresh_margin(&self) -> Duration {
        Duration::from_secs(self.refresh_margin_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DriveConfig::default();
        assert_eq!(config.part_size, MAX_PART_SIZE);
        assert_eq!(config.root_id, "root");
        assert_eq!(config.refresh_margin_secs, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: DriveConfig =
            serde_json::from_str(r#"{"part_size": 1048576, "endpoints": {"auth_base": "http://a", "api_base": "http://b"}}"#)
                .unwrap();

        assert_eq!(config.part_size, 1024 * 1024);
        assert_eq!(config.endpoints.api("/v2/file/list"), "http://b/v2/file/list");
        assert_eq!(config.connect_timeout_secs, 3);
    }

    #[test]
    fn test_validate_rejects_zero_part_size() {
        let config = DriveConfig {
            part_size: 0,
            ..DriveConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let config = DriveConfig::with_base_url("not a url");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_single_endpoint_trims_slash() {
        let endpoints = Endpoints::single("http://127.0.0.1:9000/");
        assert_eq!(endpoints.auth("/token/refresh"), "http://127.0.0.1:9000/token/refresh");
    }
}
