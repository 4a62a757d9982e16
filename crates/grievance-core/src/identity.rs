//! # Grievance Identifier
//!
//! Newtype wrapper so a grievance id cannot be confused with any other UUID
//! flowing through the service (request ids, notarization receipts).

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Unique identifier for a grievance record. Serializes as a bare UUID string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrievanceId(Uuid);

impl GrievanceId {
    /// Generate a new random grievance identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID (e.g. a row read back from the database).
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for GrievanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for GrievanceId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for GrievanceId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| CoreError::InvalidId(s.to_string()))
    }
}

impl std::fmt::Display for GrievanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ids_are_unique() {
        assert_ne!(GrievanceId::new(), GrievanceId::new());
    }

    #[test]
    fn parse_roundtrips_display() {
        let id = GrievanceId::new();
        let parsed: GrievanceId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = "not-a-uuid".parse::<GrievanceId>().unwrap_err();
        assert!(err.to_string().contains("not-a-uuid"));
    }

    #[test]
    fn serializes_as_bare_uuid_string() {
        let uuid = Uuid::new_v4();
        let id = GrievanceId::from_uuid(uuid);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{uuid}\""));
    }
}
