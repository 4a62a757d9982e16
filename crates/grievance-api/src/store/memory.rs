//! In-memory [`GrievanceStore`].
//!
//! Every operation runs under a single `parking_lot` lock acquisition, so
//! the version check and the write it guards cannot interleave with another
//! writer.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use grievance_core::{GrievanceId, Timestamp};
use grievance_state::{GrievanceRecord, Timer};
use parking_lot::RwLock;

use super::{GrievanceFilter, GrievanceStore, StoreError};

/// Process-local grievance store. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<HashMap<GrievanceId, GrievanceRecord>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Synchronous point read.
    pub fn snapshot(&self, id: GrievanceId) -> Option<GrievanceRecord> {
        self.data.read().get(&id).cloned()
    }

    /// Overwrite a record unconditionally, bypassing version checks.
    ///
    /// Test fixtures use this to plant records in states (for example, an
    /// already-lapsed deadline) that the public actions cannot reach
    /// directly.
    pub fn put(&self, record: GrievanceRecord) {
        self.data.write().insert(record.id, record);
    }
}

#[async_trait]
impl GrievanceStore for MemoryStore {
    async fn insert(&self, record: &GrievanceRecord) -> Result<GrievanceRecord, StoreError> {
        let mut guard = self.data.write();
        if guard.contains_key(&record.id) {
            return Err(StoreError::Duplicate(record.id));
        }
        guard.insert(record.id, record.clone());
        Ok(record.clone())
    }

    async fn get(&self, id: GrievanceId) -> Result<Option<GrievanceRecord>, StoreError> {
        Ok(self.snapshot(id))
    }

    async fn find(&self, filter: &GrievanceFilter) -> Result<Vec<GrievanceRecord>, StoreError> {
        let mut records: Vec<_> = self
            .data
            .read()
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(records)
    }

    async fn update_if_version(
        &self,
        record: &GrievanceRecord,
        expected_version: u64,
    ) -> Result<GrievanceRecord, StoreError> {
        let mut guard = self.data.write();
        let stored = guard
            .get_mut(&record.id)
            .ok_or(StoreError::NotFound(record.id))?;
        if stored.version != expected_version {
            return Err(StoreError::Conflict {
                id: record.id,
                expected: expected_version,
            });
        }
        let mut next = record.clone();
        next.version = expected_version + 1;
        *stored = next.clone();
        Ok(next)
    }

    async fn sweep_lapsed(
        &self,
        timer: Timer,
        now: Timestamp,
    ) -> Result<Vec<GrievanceRecord>, StoreError> {
        let mut guard = self.data.write();
        let mut changed = Vec::new();
        for record in guard.values_mut() {
            if timer.apply(record, now) {
                record.version += 1;
                changed.push(record.clone());
            }
        }
        Ok(changed)
    }

    async fn awaiting_notarization(&self) -> Result<Vec<GrievanceRecord>, StoreError> {
        let mut records: Vec<_> = self
            .data
            .read()
            .values()
            .filter(|r| r.awaits_notarization())
            .cloned()
            .collect();
        records.sort_by(|a, b| a.updated_at.cmp(&b.updated_at).then(a.id.cmp(&b.id)));
        Ok(records)
    }

    async fn mark_notarized(&self, id: GrievanceId, at: Timestamp) -> Result<bool, StoreError> {
        let mut guard = self.data.write();
        let stored = guard.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if stored.notarized_at.is_some() {
            return Ok(false);
        }
        stored.notarized_at = Some(at);
        stored.version += 1;
        Ok(true)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
