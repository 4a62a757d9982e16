//! # Notarization Seam
//!
//! Called by the sweeper once per record it promotes to `Verified`, after
//! the promotion is durable. A failure here is logged by the caller and
//! never rolls the promotion back.

use async_trait::async_trait;
use grievance_core::{sha256_digest, CanonicalBytes, CanonicalizationError};
use grievance_notary::{NotarizationRequest, NotaryClient, NotaryError};
use grievance_state::GrievanceRecord;
use thiserror::Error;

/// Notarization failures.
#[derive(Error, Debug)]
pub enum NotarizeError {
    /// The record could not be digested.
    #[error("failed to digest grievance: {0}")]
    Digest(#[from] CanonicalizationError),

    /// The ledger call failed after retries.
    #[error(transparent)]
    Ledger(#[from] NotaryError),
}

/// Records verified grievances on the external ledger.
#[async_trait]
pub trait Notarizer: Send + Sync + std::fmt::Debug {
    async fn notarize(&self, record: &GrievanceRecord) -> Result<(), NotarizeError>;
}

/// Build the ledger payload for a verified record.
///
/// `verifiedAt` is the record's last update, which for a freshly swept
/// record is the sweep instant.
pub fn notarization_request(
    record: &GrievanceRecord,
) -> Result<NotarizationRequest, CanonicalizationError> {
    let digest = sha256_digest(&CanonicalBytes::new(record)?);
    Ok(NotarizationRequest::new(record.id, record.updated_at, &digest))
}

/// Sends verifications to the ledger over HTTP.
#[derive(Debug, Clone)]
pub struct HttpNotarizer {
    client: NotaryClient,
}

impl HttpNotarizer {
    pub fn new(client: NotaryClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Notarizer for HttpNotarizer {
    async fn notarize(&self, record: &GrievanceRecord) -> Result<(), NotarizeError> {
        let request = notarization_request(record)?;
        let receipt = self.client.record_verification(&request).await?;
        tracing::info!(
            grievance_id = %record.id,
            receipt_id = %receipt.receipt_id,
            digest = %request.content_digest,
            "grievance notarized"
        );
        Ok(())
    }
}

/// Used when no ledger is configured. Logs the payload it would have sent.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotarizer;

#[async_trait]
impl Notarizer for LoggingNotarizer {
    async fn notarize(&self, record: &GrievanceRecord) -> Result<(), NotarizeError> {
        let request = notarization_request(record)?;
        tracing::info!(
            grievance_id = %record.id,
            digest = %request.content_digest,
            "grievance auto-verified; no ledger configured"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grievance_core::Timestamp;
    use grievance_state::{Role, Submission};

    fn record() -> GrievanceRecord {
        GrievanceRecord::submit(
            Submission {
                title: "well".into(),
                description: "contaminated".into(),
                media_url: Some("https://img.example/well.jpg".into()),
            },
            Role::User,
            Timestamp::parse("2026-06-01T08:00:00Z").unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn request_digest_is_stable_for_equal_records() {
        let r = record();
        let a = notarization_request(&r).unwrap();
        let b = notarization_request(&r.clone()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.grievance_id, r.id);
        assert_eq!(a.verified_at, r.updated_at);
    }

    #[test]
    fn request_digest_changes_with_content() {
        let r = record();
        let mut other = r.clone();
        other.description.push('!');
        assert_ne!(
            notarization_request(&r).unwrap().content_digest,
            notarization_request(&other).unwrap().content_digest
        );
    }

    #[tokio::test]
    async fn logging_notarizer_always_succeeds() {
        assert!(LoggingNotarizer.notarize(&record()).await.is_ok());
    }
}
