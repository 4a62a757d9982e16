//! Notarization ledger client configuration.
//!
//! The ledger is optional. When `NOTARY_URL` is unset the service runs
//! without a ledger and only logs verifications.

use url::Url;
use zeroize::Zeroizing;

/// Configuration for connecting to the notarization ledger.
///
/// Custom `Debug` implementation redacts the `api_token` field
/// to prevent credential leakage in log output.
#[derive(Clone)]
pub struct NotaryConfig {
    /// Base URL of the ledger API.
    pub base_url: Url,
    /// Optional bearer token.
    pub api_token: Option<Zeroizing<String>>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for NotaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotaryConfig")
            .field("base_url", &self.base_url)
            .field(
                "api_token",
                &self.api_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl NotaryConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `NOTARY_URL` (unset → `Ok(None)`)
    /// - `NOTARY_API_TOKEN` (optional)
    /// - `NOTARY_TIMEOUT_SECS` (default: 10)
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(raw) = std::env::var("NOTARY_URL").ok().filter(|s| !s.trim().is_empty()) else {
            return Ok(None);
        };
        let base_url = parse_url("NOTARY_URL", &raw)?;
        let api_token = std::env::var("NOTARY_API_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .map(Zeroizing::new);
        let timeout_secs = match std::env::var("NOTARY_TIMEOUT_SECS") {
            Ok(s) => s
                .parse()
                .map_err(|_| ConfigError::InvalidNumber("NOTARY_TIMEOUT_SECS".into(), s))?,
            Err(_) => 10,
        };

        Ok(Some(Self {
            base_url,
            api_token,
            timeout_secs,
        }))
    }

    /// Configuration pointing at a local mock ledger.
    pub fn local_mock(uri: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_url("local mock", uri)?,
            api_token: Some(Zeroizing::new("test-token".to_string())),
            timeout_secs: 5,
        })
    }
}

fn parse_url(var: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("{0} must be a whole number of seconds, got {1:?}")]
    InvalidNumber(String, String),
    #[error("API token contains characters not allowed in a header")]
    InvalidToken,
}
