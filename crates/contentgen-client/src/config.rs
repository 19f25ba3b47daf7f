use std::time::Duration;

use crate::errors::ClientError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

const ENV_BASE_URL: &str = "CONTENTGEN_API_BASE_URL";
const ENV_TIMEOUT_SECS: &str = "CONTENTGEN_TIMEOUT_SECS";
const ENV_STREAMING: &str = "CONTENTGEN_STREAMING";

/// Loads `.env` files into the process environment.
///
/// The crate-local file is read first, then the working directory's. Missing
/// files are ignored.
pub fn load_dotenv() {
    let _ = dotenvy::from_path(std::path::Path::new(
        format!("{}/.env", env!("CARGO_MANIFEST_DIR")).as_str(),
    ));
    dotenvy::dotenv().ok();
}

pub(crate) fn parse_bool_env(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

/// Client configuration for the content generation service.
#[derive(Clone, Debug, PartialEq)]
pub struct ClientConfig {
    /// Service root, without the `/api/v1` prefix.
    pub base_url: String,
    /// Default HTTP timeout for buffered calls and stream setup.
    pub timeout: Duration,
    /// Whether the collaborator prefers streaming when it is available.
    pub streaming: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            streaming: true,
        }
    }
}

impl ClientConfig {
    /// Builds a config from `CONTENTGEN_*` environment variables.
    ///
    /// Unset variables keep their defaults; malformed ones are config errors.
    pub fn from_env() -> Result<Self, ClientError> {
        let mut config = Self::default();
        if let Ok(url) = std::env::var(ENV_BASE_URL)
            && !url.trim().is_empty()
        {
            config.base_url = url.trim().to_string();
        }
        if let Ok(raw) = std::env::var(ENV_TIMEOUT_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                ClientError::Config(format!("{ENV_TIMEOUT_SECS} must be a whole number, got {raw:?}"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Ok(raw) = std::env::var(ENV_STREAMING) {
            config.streaming = parse_bool_env(&raw).ok_or_else(|| {
                ClientError::Config(format!("{ENV_STREAMING} must be a boolean, got {raw:?}"))
            })?;
        }
        Ok(config)
    }

    /// Overrides the service URL (for proxies or test servers).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the default HTTP timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the streaming preference.
    pub fn streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slash() {
        let config = ClientConfig::default().base_url("http://svc:9000/");
        assert_eq!(config.endpoint("ai/stream"), "http://svc:9000/api/v1/ai/stream");
    }

    #[test]
    fn bool_env_vocabulary() {
        assert_eq!(parse_bool_env(" ON "), Some(true));
        assert_eq!(parse_bool_env("disabled"), Some(false));
        assert_eq!(parse_bool_env("maybe"), None);
    }

    #[test]
    fn defaults_prefer_streaming_against_localhost() {
        let config = ClientConfig::default();
        assert!(config.streaming);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(120));
    }
}
