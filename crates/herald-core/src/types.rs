// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Herald gateway.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for a messaging session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of the tenant that owns a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(pub String);

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle states of a session connection.
///
/// There is no hard terminal state: a session can always be re-initialized,
/// except that a logged-out close forces `Inactive` and discards credentials.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Inactive,
    Connecting,
    QrPending,
    Connected,
    Disconnected,
    Error,
}

/// Reason reported by the link provider when a connection closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The remote account logged this device out. Credentials are invalid.
    LoggedOut,
    /// The underlying transport dropped.
    ConnectionLost,
    /// The provider-side keepalive timed out.
    TimedOut,
    /// Another device replaced this connection.
    Replaced,
    /// Any other provider-specific reason.
    Other(String),
}

impl CloseReason {
    /// Logged-out closes are terminal for the stored credentials: the
    /// session must be re-paired, never auto-reconnected.
    pub fn is_logged_out(&self) -> bool {
        matches!(self, CloseReason::LoggedOut)
    }
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloseReason::LoggedOut => write!(f, "logged_out"),
            CloseReason::ConnectionLost => write!(f, "connection_lost"),
            CloseReason::TimedOut => write!(f, "timed_out"),
            CloseReason::Replaced => write!(f, "replaced"),
            CloseReason::Other(reason) => write!(f, "other: {reason}"),
        }
    }
}

/// Asynchronous events emitted by a link provider connection.
///
/// Each live connection delivers these over a bounded per-session channel,
/// consumed by a single sequential loop so per-session ordering is preserved.
#[derive(Debug, Clone)]
pub enum LinkEvent {
    /// A pairing QR payload was negotiated and should be surfaced to the user.
    Qr { payload: String },
    /// The connection is fully open. `identity` is the provider-reported
    /// identity of the connected account.
    Open { identity: Option<String> },
    /// The connection closed.
    Close { reason: CloseReason },
    /// The provider rotated or refreshed stored credentials.
    CredentialsChanged { credentials: String },
    /// An inbound protocol message arrived.
    Message { payload: serde_json::Value },
}

/// Durable session metadata persisted through the state store.
///
/// This is the only part of a session that survives process restart; the
/// runtime record (link handle, timers, QR) is rebuilt on initialize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: SessionId,
    pub owner_id: OwnerId,
    /// Tenant endpoint for event notifications; None disables delivery.
    pub webhook_url: Option<String>,
    /// Opaque provider credential blob. None until first successful pairing.
    pub credentials: Option<String>,
    /// Last known lifecycle status, for display after restart.
    pub status: SessionStatus,
    pub created_at: String,
    pub updated_at: String,
    /// Accumulated webhook delivery statistics.
    #[serde(default)]
    pub webhook_stats: WebhookStats,
}

/// Per-session webhook delivery statistics, persisted opportunistically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookStats {
    pub total_sent: u64,
    pub successful: u64,
    pub failed: u64,
    pub permanently_failed: u64,
    pub last_sent: Option<String>,
    pub last_success: Option<String>,
    pub last_failure: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn session_status_wire_form_is_snake_case() {
        assert_eq!(SessionStatus::QrPending.to_string(), "qr_pending");
        assert_eq!(SessionStatus::Inactive.to_string(), "inactive");
        assert_eq!(SessionStatus::Connected.to_string(), "connected");
    }

    #[test]
    fn session_status_round_trips_from_str() {
        for status in [
            SessionStatus::Inactive,
            SessionStatus::Connecting,
            SessionStatus::QrPending,
            SessionStatus::Connected,
            SessionStatus::Disconnected,
            SessionStatus::Error,
        ] {
            let parsed = SessionStatus::from_str(&status.to_string()).expect("should parse back");
            assert_eq!(status, parsed);
        }
    }

    #[test]
    fn close_reason_logged_out_detection() {
        assert!(CloseReason::LoggedOut.is_logged_out());
        assert!(!CloseReason::ConnectionLost.is_logged_out());
        assert!(!CloseReason::Other("conflict".into()).is_logged_out());
    }

    #[test]
    fn session_record_serialization_round_trip() {
        let record = SessionRecord {
            session_id: SessionId("s-1".into()),
            owner_id: OwnerId("tenant-a".into()),
            webhook_url: Some("https://example.com/hook".into()),
            credentials: None,
            status: SessionStatus::Inactive,
            created_at: "2026-01-01T00:00:00Z".into(),
            updated_at: "2026-01-01T00:00:00Z".into(),
            webhook_stats: WebhookStats::default(),
        };
        let json = serde_json::to_string(&record).expect("should serialize");
        let parsed: SessionRecord = serde_json::from_str(&json).expect("should deserialize");
        assert_eq!(parsed.session_id, record.session_id);
        assert_eq!(parsed.status, SessionStatus::Inactive);
    }

    #[test]
    fn webhook_stats_default_is_zeroed() {
        let stats = WebhookStats::default();
        assert_eq!(stats.total_sent, 0);
        assert_eq!(stats.permanently_failed, 0);
        assert!(stats.last_success.is_none());
    }
}
