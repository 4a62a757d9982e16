//! # grievance-notary: Notarization Ledger Client
//!
//! Records auto-verified grievances on an external append-only ledger. The
//! ledger sees only the grievance id, the verification instant, and a
//! SHA-256 digest of the record's canonical JSON; record contents never
//! leave the service.
//!
//! ## Endpoint
//!
//! `POST {base_url}/v1/notarizations` with a [`NotarizationRequest`] body.
//! The ledger answers `201` with a [`NotarizationReceipt`]. Transient
//! failures are retried with exponential backoff (see `retry.rs`).

pub mod config;
pub mod error;
pub(crate) mod retry;

pub use config::{ConfigError, NotaryConfig};
pub use error::NotaryError;

use std::time::Duration;

use grievance_core::{ContentDigest, GrievanceId, Timestamp};
use serde::{Deserialize, Serialize};

const NOTARIZATIONS_PATH: &str = "v1/notarizations";

// -- Wire types ---------------------------------------------------------------

/// A verification to be recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotarizationRequest {
    pub grievance_id: GrievanceId,
    pub verified_at: Timestamp,
    /// `sha256:<hex>` over the verified record's canonical JSON.
    pub content_digest: String,
}

impl NotarizationRequest {
    pub fn new(grievance_id: GrievanceId, verified_at: Timestamp, digest: &ContentDigest) -> Self {
        Self {
            grievance_id,
            verified_at,
            content_digest: digest.to_string(),
        }
    }
}

/// The ledger's acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotarizationReceipt {
    /// Ledger-assigned entry identifier.
    pub receipt_id: String,
    #[serde(default)]
    pub recorded_at: Option<Timestamp>,
}

// -- Client -------------------------------------------------------------------

/// Client for the notarization ledger.
#[derive(Debug, Clone)]
pub struct NotaryClient {
    http: reqwest::Client,
    base_url: url::Url,
}

impl NotaryClient {
    /// Create a new client from configuration.
    pub fn new(config: NotaryConfig) -> Result<Self, NotaryError> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = &config.api_token {
            let value = reqwest::header::HeaderValue::from_str(&format!("Bearer {}", token.as_str()))
                .map_err(|_| NotaryError::Config(ConfigError::InvalidToken))?;
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| NotaryError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        Ok(Self {
            http,
            base_url: config.base_url,
        })
    }

    /// Base URL the client talks to.
    pub fn base_url(&self) -> &url::Url {
        &self.base_url
    }

    /// Record a verified grievance on the ledger.
    ///
    /// Calls `POST {base_url}/v1/notarizations`.
    pub async fn record_verification(
        &self,
        req: &NotarizationRequest,
    ) -> Result<NotarizationReceipt, NotaryError> {
        let endpoint = "POST /v1/notarizations";
        let url = self
            .base_url
            .join(NOTARIZATIONS_PATH)
            .map_err(|e| ConfigError::InvalidUrl(self.base_url.to_string(), e.to_string()))?;

        let resp = retry::retry_send(|| self.http.post(url.clone()).json(req).send())
            .await
            .map_err(|e| NotaryError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(NotaryError::Rejected {
                endpoint: endpoint.into(),
                status,
                body,
            });
        }

        resp.json().await.map_err(|e| NotaryError::Deserialization {
            endpoint: endpoint.into(),
            source: e,
        })
    }
}
