// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock link provider for deterministic testing.
//!
//! `MockLinkProvider` implements `LinkProvider` and hands each connection's
//! event sender back to the test, so provider events (`Qr`, `Open`, `Close`,
//! ...) can be injected on demand. `MockLinkHandle` records logout/terminate
//! calls and captured sends for assertions.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use herald_core::{
    CloseReason, HeraldError, LinkConnection, LinkEvent, LinkHandle, LinkProvider, OwnerId,
    SessionId,
};

/// A mock connection handle with injectable connectivity state.
#[derive(Clone)]
pub struct MockLinkHandle {
    session_id: SessionId,
    connected: Arc<AtomicBool>,
    logged_out: Arc<AtomicBool>,
    terminated: Arc<AtomicBool>,
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockLinkHandle {
    fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            connected: Arc::new(AtomicBool::new(false)),
            logged_out: Arc::new(AtomicBool::new(false)),
            terminated: Arc::new(AtomicBool::new(false)),
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn was_logged_out(&self) -> bool {
        self.logged_out.load(Ordering::SeqCst)
    }

    pub fn was_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    /// All `(target, content)` pairs passed to `send()`.
    pub async fn sent_messages(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl LinkHandle for MockLinkHandle {
    async fn send(&self, target: &str, content: &str) -> Result<String, HeraldError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(HeraldError::NotConnected {
                session_id: self.session_id.0.clone(),
            });
        }
        let mut sent = self.sent.lock().await;
        sent.push((target.to_string(), content.to_string()));
        Ok(format!("mock-msg-{}", sent.len()))
    }

    async fn logout(&self) -> Result<(), HeraldError> {
        self.logged_out.store(true, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn terminate(&self) -> Result<(), HeraldError> {
        self.terminated.store(true, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// A live mock connection: the handle plus the test-side event sender.
#[derive(Clone)]
pub struct MockConnection {
    pub session_id: SessionId,
    pub handle: MockLinkHandle,
    events: mpsc::Sender<LinkEvent>,
}

impl MockConnection {
    /// Injects a provider event, mirroring connectivity onto the handle the
    /// way a real provider would.
    pub async fn emit(&self, event: LinkEvent) {
        match &event {
            LinkEvent::Open { .. } => self.handle.set_connected(true),
            LinkEvent::Close { .. } => self.handle.set_connected(false),
            _ => {}
        }
        // Receiver dropped means the session's event loop already exited.
        let _ = self.events.send(event).await;
    }

    pub async fn emit_qr(&self, payload: &str) {
        self.emit(LinkEvent::Qr {
            payload: payload.to_string(),
        })
        .await;
    }

    pub async fn emit_open(&self, identity: Option<&str>) {
        self.emit(LinkEvent::Open {
            identity: identity.map(str::to_string),
        })
        .await;
    }

    pub async fn emit_close(&self, reason: CloseReason) {
        self.emit(LinkEvent::Close { reason }).await;
    }
}

/// A scripted link provider for testing.
///
/// Each `connect()` call produces a fresh [`MockConnection`] retrievable via
/// [`last_connection`](Self::last_connection). Use
/// [`fail_next_connect`](Self::fail_next_connect) to inject a connect error.
#[derive(Default)]
pub struct MockLinkProvider {
    connect_count: AtomicUsize,
    fail_next: AtomicBool,
    connections: Mutex<Vec<MockConnection>>,
}

impl MockLinkProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `connect()` calls observed.
    pub fn connect_count(&self) -> usize {
        self.connect_count.load(Ordering::SeqCst)
    }

    /// Makes the next `connect()` call fail with a link error.
    pub fn fail_next_connect(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// The most recently established connection, if any.
    pub async fn last_connection(&self) -> Option<MockConnection> {
        self.connections.lock().await.last().cloned()
    }

    /// All connections established so far.
    pub async fn connections(&self) -> Vec<MockConnection> {
        self.connections.lock().await.clone()
    }
}

#[async_trait]
impl LinkProvider for MockLinkProvider {
    async fn connect(
        &self,
        _owner_id: &OwnerId,
        session_id: &SessionId,
        _credentials: Option<&str>,
    ) -> Result<LinkConnection, HeraldError> {
        self.connect_count.fetch_add(1, Ordering::SeqCst);

        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(HeraldError::Link {
                message: "injected connect failure".to_string(),
                source: None,
            });
        }

        let (tx, rx) = mpsc::channel(16);
        let handle = MockLinkHandle::new(session_id.clone());
        self.connections.lock().await.push(MockConnection {
            session_id: session_id.clone(),
            handle: handle.clone(),
            events: tx,
        });

        Ok(LinkConnection {
            handle: Box::new(handle),
            events: rx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_produces_retrievable_connection() {
        let provider = MockLinkProvider::new();
        let owner = OwnerId("tenant".into());
        let sid = SessionId("s-1".into());

        let conn = provider.connect(&owner, &sid, None).await.expect("connect");
        assert_eq!(provider.connect_count(), 1);
        let mock = provider.last_connection().await.expect("recorded");
        assert_eq!(mock.session_id, sid);
        drop(conn);
    }

    #[tokio::test]
    async fn injected_failure_fails_one_connect() {
        let provider = MockLinkProvider::new();
        let owner = OwnerId("tenant".into());
        let sid = SessionId("s-1".into());

        provider.fail_next_connect();
        assert!(provider.connect(&owner, &sid, None).await.is_err());
        assert!(provider.connect(&owner, &sid, None).await.is_ok());
    }

    #[tokio::test]
    async fn send_requires_connected_handle() {
        let provider = MockLinkProvider::new();
        let owner = OwnerId("tenant".into());
        let sid = SessionId("s-1".into());

        let _conn = provider.connect(&owner, &sid, None).await.expect("connect");
        let mock = provider.last_connection().await.expect("recorded");

        let err = mock.handle.send("peer", "hi").await.expect_err("not connected");
        assert!(matches!(err, HeraldError::NotConnected { .. }));

        mock.handle.set_connected(true);
        let id = mock.handle.send("peer", "hi").await.expect("send");
        assert_eq!(id, "mock-msg-1");
        assert_eq!(mock.handle.sent_messages().await.len(), 1);
    }

    #[tokio::test]
    async fn emitted_events_arrive_in_order() {
        let provider = MockLinkProvider::new();
        let owner = OwnerId("tenant".into());
        let sid = SessionId("s-1".into());

        let mut conn = provider.connect(&owner, &sid, None).await.expect("connect");
        let mock = provider.last_connection().await.expect("recorded");

        mock.emit_qr("qr-payload").await;
        mock.emit_open(Some("device-1")).await;

        assert!(matches!(
            conn.events.recv().await,
            Some(LinkEvent::Qr { .. })
        ));
        assert!(matches!(
            conn.events.recv().await,
            Some(LinkEvent::Open { .. })
        ));
        assert!(mock.handle.connected.load(Ordering::SeqCst));
    }
}
