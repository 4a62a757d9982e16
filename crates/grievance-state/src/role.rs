//! # Actor Roles
//!
//! Identity is established upstream. Every engine action receives the
//! caller's role as an already-authenticated fact and records it in the
//! transition log; the engine never uses it to allow or deny an action.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::grievance::LifecycleError;

/// The party on whose behalf an action is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A citizen filing or following up on a grievance.
    #[default]
    User,
    /// A government official working the acceptance queue.
    Official,
    /// A community member verifying a claimed resolution.
    Community,
    /// An administrator reviewing disputed or overdue records.
    Admin,
    /// The reconciliation sweep.
    System,
}

impl Role {
    /// Wire name, as carried in headers and the audit log.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Official => "official",
            Self::Community => "community",
            Self::Admin => "admin",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = LifecycleError;

    /// Parses a caller-supplied role. `system` is reserved for the sweep and
    /// is not accepted from callers.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "official" => Ok(Self::Official),
            "community" => Ok(Self::Community),
            "admin" => Ok(Self::Admin),
            other => Err(LifecycleError::UnknownRole(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_caller_roles_case_insensitively() {
        assert_eq!("Official".parse::<Role>().unwrap(), Role::Official);
        assert_eq!(" admin ".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("community".parse::<Role>().unwrap(), Role::Community);
    }

    #[test]
    fn system_is_not_a_caller_role() {
        assert!("system".parse::<Role>().is_err());
        assert!("mayor".parse::<Role>().is_err());
    }

    #[test]
    fn default_is_user() {
        assert_eq!(Role::default(), Role::User);
    }

    #[test]
    fn serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Role::System).unwrap(), "\"system\"");
    }
}
