// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook job model.

use herald_core::SessionId;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Dispatch priority for a webhook job.
///
/// High-priority jobs are inserted at the front of the main queue, so under
/// sustained high-priority load older Normal/Low jobs can wait. Callers tune
/// this per event type; session status changes use High.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Normal,
    Low,
}

/// A single outbound webhook notification.
///
/// A job lives in exactly one place at a time: the main queue, the retry
/// queue, or terminal (delivered or permanently failed). `attempts` only
/// increases.
#[derive(Debug, Clone)]
pub struct WebhookJob {
    /// Unique id, echoed to the tenant as `webhookId`.
    pub id: String,
    pub session_id: SessionId,
    pub event_type: String,
    pub payload: serde_json::Value,
    /// Target URL snapshotted at enqueue time; later reconfiguration does
    /// not redirect already-queued jobs.
    pub webhook_url: String,
    pub priority: Priority,
    pub attempts: u32,
    pub max_retries: u32,
    pub created_at: String,
    /// Set when the job is waiting in the retry queue.
    pub next_retry_at: Option<Instant>,
}

impl WebhookJob {
    pub fn new(
        session_id: SessionId,
        event_type: impl Into<String>,
        payload: serde_json::Value,
        webhook_url: impl Into<String>,
        priority: Priority,
        max_retries: u32,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id,
            event_type: event_type.into(),
            payload,
            webhook_url: webhook_url.into(),
            priority,
            attempts: 0,
            max_retries,
            created_at: chrono::Utc::now().to_rfc3339(),
            next_retry_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_starts_with_zero_attempts() {
        let job = WebhookJob::new(
            SessionId("s-1".into()),
            "session.status",
            serde_json::json!({"status": "connected"}),
            "https://example.com/hook",
            Priority::High,
            5,
        );
        assert_eq!(job.attempts, 0);
        assert_eq!(job.max_retries, 5);
        assert!(job.next_retry_at.is_none());
        assert!(!job.id.is_empty());
    }

    #[test]
    fn job_ids_are_unique() {
        let a = WebhookJob::new(
            SessionId("s".into()),
            "e",
            serde_json::Value::Null,
            "u",
            Priority::Normal,
            5,
        );
        let b = WebhookJob::new(
            SessionId("s".into()),
            "e",
            serde_json::Value::Null,
            "u",
            Priority::Normal,
            5,
        );
        assert_ne!(a.id, b.id);
    }
}
