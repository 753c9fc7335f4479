// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Link provider trait for the external messaging-protocol component.
//!
//! The provider owns connection establishment, encryption, and multi-device
//! sync. Herald only drives the lifecycle: it asks for a connection, consumes
//! the event stream, and issues send/logout/terminate calls on the handle.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::HeraldError;
use crate::types::{LinkEvent, OwnerId, SessionId};

/// A live connection returned by [`LinkProvider::connect`].
///
/// `events` is a bounded per-session channel; the orchestrator consumes it
/// from a single loop so event ordering within a session is preserved.
pub struct LinkConnection {
    pub handle: Box<dyn LinkHandle>,
    pub events: mpsc::Receiver<LinkEvent>,
}

/// Exclusive handle to one underlying provider connection.
#[async_trait]
pub trait LinkHandle: Send + Sync {
    /// Sends a message to `target`. Fails with [`HeraldError::NotConnected`]
    /// unless the connection is open.
    async fn send(&self, target: &str, content: &str) -> Result<String, HeraldError>;

    /// Logs the device out, invalidating stored credentials provider-side.
    async fn logout(&self) -> Result<(), HeraldError>;

    /// Tears the connection down without logging out. Idempotent.
    async fn terminate(&self) -> Result<(), HeraldError>;
}

/// Factory for provider connections, one per session.
#[async_trait]
pub trait LinkProvider: Send + Sync {
    /// Establishes a connection for `session_id` using previously stored
    /// credentials (None triggers a fresh pairing flow with QR events).
    async fn connect(
        &self,
        owner_id: &OwnerId,
        session_id: &SessionId,
        credentials: Option<&str>,
    ) -> Result<LinkConnection, HeraldError>;
}
