// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock state store for deterministic testing.
//!
//! In-memory `StateStore` with failure injection so tests can exercise the
//! tolerate-and-log persistence paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use herald_core::{HeraldError, OwnerId, SessionId, SessionRecord, StateStore, WebhookStats};

/// An in-memory mock of the durable state store.
#[derive(Default)]
pub struct MockStateStore {
    records: Mutex<HashMap<String, SessionRecord>>,
    saved_stats: Mutex<Vec<(SessionId, WebhookStats)>>,
    deleted: Mutex<Vec<SessionId>>,
    fail_saves: AtomicBool,
}

impl MockStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, `save` and `save_stats` fail with a store error.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Seeds a record, as if a REST layer had created the session earlier.
    pub async fn insert_record(&self, record: SessionRecord) {
        self.records
            .lock()
            .await
            .insert(record.session_id.0.clone(), record);
    }

    /// The currently stored record for a session, if any.
    pub async fn record(&self, session_id: &SessionId) -> Option<SessionRecord> {
        self.records.lock().await.get(&session_id.0).cloned()
    }

    /// Every `(session, stats)` pair passed to `save_stats`.
    pub async fn saved_stats(&self) -> Vec<(SessionId, WebhookStats)> {
        self.saved_stats.lock().await.clone()
    }

    /// Sessions whose records were deleted.
    pub async fn deleted(&self) -> Vec<SessionId> {
        self.deleted.lock().await.clone()
    }

    fn injected_failure() -> HeraldError {
        HeraldError::Store {
            source: Box::new(std::io::Error::other("injected save failure")),
        }
    }
}

#[async_trait]
impl StateStore for MockStateStore {
    async fn load(
        &self,
        _owner_id: &OwnerId,
        session_id: &SessionId,
    ) -> Result<Option<SessionRecord>, HeraldError> {
        Ok(self.records.lock().await.get(&session_id.0).cloned())
    }

    async fn save(&self, record: &SessionRecord) -> Result<(), HeraldError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Self::injected_failure());
        }
        self.records
            .lock()
            .await
            .insert(record.session_id.0.clone(), record.clone());
        Ok(())
    }

    async fn delete(
        &self,
        _owner_id: &OwnerId,
        session_id: &SessionId,
    ) -> Result<(), HeraldError> {
        self.records.lock().await.remove(&session_id.0);
        self.deleted.lock().await.push(session_id.clone());
        Ok(())
    }

    async fn save_stats(
        &self,
        session_id: &SessionId,
        stats: &WebhookStats,
    ) -> Result<(), HeraldError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Self::injected_failure());
        }
        self.saved_stats
            .lock()
            .await
            .push((session_id.clone(), stats.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::SessionStatus;

    fn record(id: &str) -> SessionRecord {
        SessionRecord {
            session_id: SessionId(id.into()),
            owner_id: OwnerId("tenant".into()),
            webhook_url: None,
            credentials: None,
            status: SessionStatus::Inactive,
            created_at: chrono::Utc::now().to_rfc3339(),
            updated_at: chrono::Utc::now().to_rfc3339(),
            webhook_stats: WebhookStats::default(),
        }
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let store = MockStateStore::new();
        let owner = OwnerId("tenant".into());
        store.save(&record("s-1")).await.expect("save");

        let loaded = store
            .load(&owner, &SessionId("s-1".into()))
            .await
            .expect("load");
        assert!(loaded.is_some());
    }

    #[tokio::test]
    async fn injected_failure_breaks_saves_only() {
        let store = MockStateStore::new();
        let owner = OwnerId("tenant".into());
        store.save(&record("s-1")).await.expect("save");

        store.set_fail_saves(true);
        assert!(store.save(&record("s-1")).await.is_err());
        assert!(
            store
                .save_stats(&SessionId("s-1".into()), &WebhookStats::default())
                .await
                .is_err()
        );
        // Loads keep working on the last good data.
        assert!(
            store
                .load(&owner, &SessionId("s-1".into()))
                .await
                .expect("load")
                .is_some()
        );
    }

    #[tokio::test]
    async fn delete_records_the_session() {
        let store = MockStateStore::new();
        let owner = OwnerId("tenant".into());
        store.save(&record("s-1")).await.expect("save");
        store
            .delete(&owner, &SessionId("s-1".into()))
            .await
            .expect("delete");

        assert!(store.record(&SessionId("s-1".into())).await.is_none());
        assert_eq!(store.deleted().await.len(), 1);
    }
}
