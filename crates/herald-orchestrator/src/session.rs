// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session runtime record.
//!
//! [`SessionRuntime`] owns everything about one live (or recently live)
//! session: the mutable state behind a per-session mutex, the cancellable
//! reconnect timer slot, and the cancellation token for the event loop.
//!
//! Invariants: at most one link handle per session; at most one outstanding
//! reconnect timer (replacing the slot cancels the previous one);
//! `Connected` implies no pending QR.

use std::collections::VecDeque;

use herald_core::{LinkHandle, OwnerId, SessionId, SessionRecord, SessionStatus};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::qr::PendingQr;

pub(crate) fn now_utc() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Mutable per-session state. All mutation happens behind
/// [`SessionRuntime::state`], serializing transitions in arrival order.
pub struct RuntimeState {
    /// Durable metadata mirror; written through the state store best-effort.
    pub record: SessionRecord,
    pub status: SessionStatus,
    /// Exclusive ownership of the underlying provider connection.
    pub link: Option<Box<dyn LinkHandle>>,
    /// Reset to 0 on successful connect.
    pub reconnect_attempts: u32,
    /// Instants of rapid disconnects, pruned to the trailing window.
    pub rapid_disconnects: VecDeque<Instant>,
    /// While `now < cooldown_until`, reconnection is suppressed.
    pub cooldown_until: Option<Instant>,
    /// Set by stop/delete, cleared by initialize. A buffered provider event
    /// or an already-installed reconnect timer must not act once set.
    pub stopped: bool,
    pub pending_qr: Option<PendingQr>,
    /// Provider-reported identity, captured on open.
    pub identity: Option<String>,
    /// Monotonic connect instant for rapid-disconnect detection; cleared
    /// when the disconnect cycle has been assessed.
    pub connected_at: Option<Instant>,
    pub connected_at_utc: Option<String>,
    pub disconnected_at_utc: Option<String>,
    pub last_activity_utc: Option<String>,
}

impl RuntimeState {
    fn new(record: SessionRecord) -> Self {
        Self {
            record,
            status: SessionStatus::Inactive,
            link: None,
            reconnect_attempts: 0,
            rapid_disconnects: VecDeque::new(),
            cooldown_until: None,
            stopped: false,
            pending_qr: None,
            identity: None,
            connected_at: None,
            connected_at_utc: None,
            disconnected_at_utc: None,
            last_activity_utc: None,
        }
    }
}

/// Runtime record for one session, shared between the orchestrator, its
/// event loop, and any scheduled reconnect task.
pub struct SessionRuntime {
    pub session_id: SessionId,
    pub owner_id: OwnerId,
    pub state: Mutex<RuntimeState>,
    /// Serializes control operations (initialize/stop/delete/restart) so a
    /// slow provider connect never interleaves with another control call.
    pub op_lock: Mutex<()>,
    reconnect_timer: Mutex<Option<CancellationToken>>,
    events_token: Mutex<CancellationToken>,
}

impl SessionRuntime {
    pub fn new(session_id: SessionId, owner_id: OwnerId, record: SessionRecord) -> Self {
        Self {
            session_id,
            owner_id,
            state: Mutex::new(RuntimeState::new(record)),
            op_lock: Mutex::new(()),
            reconnect_timer: Mutex::new(None),
            events_token: Mutex::new(CancellationToken::new()),
        }
    }

    /// Installs a new reconnect timer token, cancelling any previous one.
    /// Guarantees at most one outstanding timer per session.
    pub async fn replace_reconnect_token(&self) -> CancellationToken {
        let mut slot = self.reconnect_timer.lock().await;
        if let Some(previous) = slot.take() {
            previous.cancel();
        }
        let token = CancellationToken::new();
        *slot = Some(token.clone());
        token
    }

    /// Cancels any outstanding reconnect timer.
    pub async fn cancel_reconnect(&self) {
        if let Some(token) = self.reconnect_timer.lock().await.take() {
            token.cancel();
        }
    }

    pub async fn has_reconnect_scheduled(&self) -> bool {
        self.reconnect_timer.lock().await.is_some()
    }

    /// Installs a fresh event-loop token for a new connect cycle,
    /// cancelling the previous loop.
    pub async fn replace_events_token(&self) -> CancellationToken {
        let mut slot = self.events_token.lock().await;
        slot.cancel();
        *slot = CancellationToken::new();
        slot.clone()
    }

    /// Stops the current event loop.
    pub async fn cancel_events(&self) {
        self.events_token.lock().await.cancel();
    }

    /// Produces a point-in-time view for the control surface.
    pub fn snapshot(&self, state: &RuntimeState) -> SessionSnapshot {
        let cooldown_remaining_ms = state.cooldown_until.and_then(|until| {
            let remaining = until.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                None
            } else {
                Some(remaining.as_millis() as u64)
            }
        });

        SessionSnapshot {
            session_id: self.session_id.0.clone(),
            owner_id: self.owner_id.0.clone(),
            status: state.status,
            identity: state.identity.clone(),
            reconnect_attempts: state.reconnect_attempts,
            qr_pending: state.pending_qr.is_some(),
            in_cooldown: cooldown_remaining_ms.is_some(),
            cooldown_remaining_ms,
            webhook_url: state.record.webhook_url.clone(),
            connected_at: state.connected_at_utc.clone(),
            disconnected_at: state.disconnected_at_utc.clone(),
            last_activity_at: state.last_activity_utc.clone(),
        }
    }
}

/// Read-only runtime view returned by `get_session_info`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub owner_id: String,
    pub status: SessionStatus,
    pub identity: Option<String>,
    pub reconnect_attempts: u32,
    pub qr_pending: bool,
    pub in_cooldown: bool,
    pub cooldown_remaining_ms: Option<u64>,
    pub webhook_url: Option<String>,
    pub connected_at: Option<String>,
    pub disconnected_at: Option<String>,
    pub last_activity_at: Option<String>,
}
