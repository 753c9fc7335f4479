// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! State store trait for durable session metadata.
//!
//! Save failures are expected to be tolerated by callers: the orchestrator
//! logs them and proceeds in-memory, degrading durability but never the
//! state machine.

use async_trait::async_trait;

use crate::error::HeraldError;
use crate::types::{OwnerId, SessionId, SessionRecord, WebhookStats};

/// Adapter for the durable session metadata store.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Loads the stored record for a session, or None if it was never saved.
    async fn load(
        &self,
        owner_id: &OwnerId,
        session_id: &SessionId,
    ) -> Result<Option<SessionRecord>, HeraldError>;

    /// Persists a session record, replacing any previous version.
    async fn save(&self, record: &SessionRecord) -> Result<(), HeraldError>;

    /// Removes a session record. Deleting a missing record is not an error.
    async fn delete(&self, owner_id: &OwnerId, session_id: &SessionId)
    -> Result<(), HeraldError>;

    /// Persists accumulated webhook statistics for a session.
    async fn save_stats(
        &self,
        session_id: &SessionId,
        stats: &WebhookStats,
    ) -> Result<(), HeraldError>;
}
