//! # grievance-core: Foundational Types for the Grievance Stack
//!
//! The leaf of the workspace DAG. Every other crate depends on
//! `grievance-core`; it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype identifiers.** A grievance is addressed by [`GrievanceId`],
//!    never by a bare `Uuid` or string.
//!
//! 2. **UTC-only timestamps.** [`Timestamp`] is always UTC and truncated to
//!    seconds, so deadline arithmetic (`acceptBy = createdAt + 24h`) is exact.
//!
//! 3. **Injectable time.** Everything that asks "what time is it" goes through
//!    a [`Clock`]. Production wires [`SystemClock`]; tests wire [`ManualClock`]
//!    and advance it by days without waiting.
//!
//! 4. **Canonical digests.** [`sha256_digest()`] accepts only
//!    [`CanonicalBytes`], so notarization digests are reproducible.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `grievance-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, ContentDigest};
pub use error::{CanonicalizationError, CoreError};
pub use identity::GrievanceId;
pub use temporal::{Clock, ManualClock, SystemClock, Timestamp};
