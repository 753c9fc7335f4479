// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session lifecycle orchestration.
//!
//! The [`Orchestrator`] drives every session through its state machine:
//! inactive, connecting, qr_pending, connected, disconnected, error. Each
//! session has one event loop consuming its provider channel, so transitions
//! within a session are serialized in arrival order. Control operations
//! (initialize, stop, restart, delete) take a per-session operation lock so
//! a slow provider connect never interleaves with another control call.
//!
//! The state store is written through best-effort: a save failure is logged
//! and the session continues in memory.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use herald_config::HeraldConfig;
use herald_core::{
    CloseReason, HeraldError, LinkEvent, LinkProvider, OwnerId, SessionId, SessionRecord,
    SessionStatus, StateStore, WebhookStats,
};
use herald_webhook::{Priority, WebhookEngine};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::qr::{PendingQr, QrCodeInfo, render_qr};
use crate::reconnect::{ReconnectDecision, ReconnectPolicy};
use crate::registry::SessionRegistry;
use crate::session::{RuntimeState, SessionRuntime, SessionSnapshot, now_utc};

/// Multiplexes long-lived provider sessions and drives their lifecycle.
pub struct Orchestrator {
    registry: Arc<SessionRegistry>,
    provider: Arc<dyn LinkProvider>,
    store: Arc<dyn StateStore>,
    webhooks: Arc<WebhookEngine>,
    policy: ReconnectPolicy,
    connect_timeout: Duration,
    qr_ttl: Duration,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn LinkProvider>,
        store: Arc<dyn StateStore>,
        webhooks: Arc<WebhookEngine>,
        config: &HeraldConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry: Arc::new(SessionRegistry::new()),
            provider,
            store,
            webhooks,
            policy: ReconnectPolicy::new(config.reconnect.clone()),
            connect_timeout: Duration::from_secs(config.link.connect_timeout_secs),
            qr_ttl: Duration::from_secs(config.qr.expiry_secs),
        })
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Starts (or resumes) a session: loads durable metadata, tears down any
    /// previous connection, and establishes a new one through the provider.
    ///
    /// Fails with [`HeraldError::AlreadyActive`] when the session is
    /// currently connected. A connect that outlives the configured timeout
    /// or fails outright leaves the session in `Error`.
    pub async fn initialize_session(
        self: &Arc<Self>,
        session_id: &SessionId,
        owner_id: &OwnerId,
    ) -> Result<(), HeraldError> {
        let runtime = self.lookup_or_create(session_id, owner_id).await;
        let _op = runtime.op_lock.lock().await;

        let credentials = {
            let mut state = runtime.state.lock().await;
            if state.link.is_some() && state.status == SessionStatus::Connected {
                return Err(HeraldError::AlreadyActive {
                    session_id: session_id.0.clone(),
                });
            }

            runtime.cancel_events().await;
            if let Some(link) = state.link.take() {
                let _ = link.terminate().await;
            }
            state.stopped = false;
            state.pending_qr = None;

            if let Some(url) = state.record.webhook_url.clone() {
                self.webhooks.set_webhook_url(session_id, url);
            }

            self.transition(&runtime, &mut state, SessionStatus::Connecting)
                .await;
            state.record.credentials.clone()
        };

        let connect = self
            .provider
            .connect(&runtime.owner_id, &runtime.session_id, credentials.as_deref());
        let connection = match tokio::time::timeout(self.connect_timeout, connect).await {
            Ok(Ok(connection)) => connection,
            Ok(Err(e)) => {
                let mut state = runtime.state.lock().await;
                self.transition(&runtime, &mut state, SessionStatus::Error)
                    .await;
                return Err(e);
            }
            Err(_) => {
                let mut state = runtime.state.lock().await;
                self.transition(&runtime, &mut state, SessionStatus::Error)
                    .await;
                return Err(HeraldError::Timeout {
                    duration: self.connect_timeout,
                });
            }
        };

        let token = runtime.replace_events_token().await;
        {
            let mut state = runtime.state.lock().await;
            state.link = Some(connection.handle);
        }
        self.spawn_event_loop(Arc::clone(&runtime), connection.events, token);

        info!(session_id = %runtime.session_id, owner_id = %runtime.owner_id, "session initialized");
        Ok(())
    }

    /// Disconnects a session without logging out, keeping credentials so a
    /// later initialize resumes without re-pairing.
    pub async fn stop_session(&self, session_id: &SessionId) -> Result<(), HeraldError> {
        let runtime = self.require(session_id)?;
        let _op = runtime.op_lock.lock().await;

        runtime.cancel_reconnect().await;
        runtime.cancel_events().await;

        let mut state = runtime.state.lock().await;
        state.stopped = true;
        if let Some(link) = state.link.take() {
            let _ = link.terminate().await;
        }
        state.pending_qr = None;
        state.connected_at = None;
        if state.status != SessionStatus::Inactive {
            state.disconnected_at_utc = Some(now_utc());
            self.transition(&runtime, &mut state, SessionStatus::Disconnected)
                .await;
        }
        info!(session_id = %runtime.session_id, "session stopped");
        Ok(())
    }

    /// Stops and immediately re-initializes a session.
    pub async fn restart_session(self: &Arc<Self>, session_id: &SessionId) -> Result<(), HeraldError> {
        let runtime = self.require(session_id)?;
        self.stop_session(session_id).await?;
        self.initialize_session(&runtime.session_id, &runtime.owner_id)
            .await
    }

    /// Removes a session entirely: tears down the connection, purges queued
    /// webhook jobs, drops the runtime, and deletes the durable record.
    pub async fn delete_session(&self, session_id: &SessionId) -> Result<(), HeraldError> {
        let runtime = self.require(session_id)?;
        {
            let _op = runtime.op_lock.lock().await;
            runtime.cancel_reconnect().await;
            runtime.cancel_events().await;

            let mut state = runtime.state.lock().await;
            state.stopped = true;
            if let Some(link) = state.link.take() {
                let _ = link.terminate().await;
            }
            state.pending_qr = None;
        }

        let purged = self.webhooks.clear_session_queue(session_id);
        self.webhooks.clear_webhook_url(session_id);
        self.registry.remove(session_id);

        if let Err(error) = self.store.delete(&runtime.owner_id, session_id).await {
            warn!(session_id = %session_id, %error, "state store delete failed");
        }
        info!(session_id = %session_id, purged_jobs = purged, "session deleted");
        Ok(())
    }

    /// Logs the session out provider-side, wipes stored credentials, and
    /// starts a fresh pairing cycle.
    pub async fn clear_credentials_and_restart(
        self: &Arc<Self>,
        session_id: &SessionId,
    ) -> Result<(), HeraldError> {
        let runtime = self.require(session_id)?;
        {
            let _op = runtime.op_lock.lock().await;
            runtime.cancel_reconnect().await;
            runtime.cancel_events().await;

            let mut state = runtime.state.lock().await;
            state.stopped = true;
            if let Some(link) = state.link.take() {
                let _ = link.logout().await;
                let _ = link.terminate().await;
            }
            state.pending_qr = None;
            state.connected_at = None;
            state.record.credentials = None;
            state.record.updated_at = now_utc();
            if let Err(error) = self.store.save(&state.record).await {
                warn!(session_id = %session_id, %error, "state store save failed, continuing in-memory");
            }
        }
        self.initialize_session(&runtime.session_id, &runtime.owner_id)
            .await
    }

    /// Returns the currently pending QR code.
    ///
    /// Distinguishes "no QR was issued" ([`HeraldError::QrNotAvailable`])
    /// from "the QR lapsed unscanned" ([`HeraldError::QrExpired`]); an
    /// expired QR is cleared on read.
    pub async fn get_qr_code(&self, session_id: &SessionId) -> Result<QrCodeInfo, HeraldError> {
        let runtime = self.require(session_id)?;
        let mut state = runtime.state.lock().await;

        let Some(qr) = state.pending_qr.as_ref() else {
            return Err(HeraldError::QrNotAvailable {
                session_id: session_id.0.clone(),
            });
        };
        if qr.is_expired(self.qr_ttl) {
            state.pending_qr = None;
            return Err(HeraldError::QrExpired {
                session_id: session_id.0.clone(),
            });
        }
        Ok(QrCodeInfo {
            image: qr.image.clone(),
            issued_at: qr.issued_at_utc.clone(),
        })
    }

    /// Point-in-time view of a session, or None when it is unknown.
    pub async fn get_session_info(&self, session_id: &SessionId) -> Option<SessionSnapshot> {
        let runtime = self.registry.get(session_id)?;
        let state = runtime.state.lock().await;
        Some(runtime.snapshot(&state))
    }

    /// Sends a message over a connected session, returning the provider's
    /// message id.
    pub async fn send_message(
        &self,
        session_id: &SessionId,
        target: &str,
        content: &str,
    ) -> Result<String, HeraldError> {
        let runtime = self.require(session_id)?;
        let state = runtime.state.lock().await;
        if state.status != SessionStatus::Connected {
            return Err(HeraldError::NotConnected {
                session_id: session_id.0.clone(),
            });
        }
        let Some(link) = state.link.as_ref() else {
            return Err(HeraldError::NotConnected {
                session_id: session_id.0.clone(),
            });
        };
        let message_id = link.send(target, content).await?;
        drop(state);

        let mut state = runtime.state.lock().await;
        state.last_activity_utc = Some(now_utc());
        Ok(message_id)
    }

    async fn lookup_or_create(
        &self,
        session_id: &SessionId,
        owner_id: &OwnerId,
    ) -> Arc<SessionRuntime> {
        if let Some(runtime) = self.registry.get(session_id) {
            return runtime;
        }

        let record = match self.store.load(owner_id, session_id).await {
            Ok(Some(record)) => record,
            Ok(None) => new_record(session_id, owner_id),
            Err(error) => {
                warn!(session_id = %session_id, %error, "state store load failed, starting fresh");
                new_record(session_id, owner_id)
            }
        };

        self.registry.get_or_insert_with(session_id, || {
            Arc::new(SessionRuntime::new(
                session_id.clone(),
                owner_id.clone(),
                record,
            ))
        })
    }

    fn require(&self, session_id: &SessionId) -> Result<Arc<SessionRuntime>, HeraldError> {
        self.registry
            .get(session_id)
            .ok_or_else(|| HeraldError::SessionNotFound {
                session_id: session_id.0.clone(),
            })
    }

    /// Applies a status transition: updates the record, persists it
    /// best-effort, and emits a high-priority `session.status` webhook.
    async fn transition(
        &self,
        runtime: &SessionRuntime,
        state: &mut RuntimeState,
        status: SessionStatus,
    ) {
        let previous = state.status;
        state.status = status;
        state.record.status = status;
        state.record.updated_at = now_utc();
        state.last_activity_utc = Some(now_utc());

        if let Err(error) = self.store.save(&state.record).await {
            warn!(
                session_id = %runtime.session_id,
                %error,
                "state store save failed, continuing in-memory"
            );
        }
        debug!(
            session_id = %runtime.session_id,
            from = %previous,
            to = %status,
            "session transition"
        );
        self.webhooks.enqueue(
            &runtime.session_id,
            "session.status",
            json!({ "status": status, "previous": previous }),
            Priority::High,
        );
    }

    fn spawn_event_loop(
        self: &Arc<Self>,
        runtime: Arc<SessionRuntime>,
        mut events: mpsc::Receiver<LinkEvent>,
        token: tokio_util::sync::CancellationToken,
    ) {
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    // Cancellation wins over a buffered event.
                    biased;
                    _ = token.cancelled() => {
                        debug!(session_id = %runtime.session_id, "event loop cancelled");
                        break;
                    }
                    event = events.recv() => match event {
                        Some(event) => orchestrator.handle_event(&runtime, event).await,
                        None => {
                            debug!(session_id = %runtime.session_id, "provider event channel closed");
                            break;
                        }
                    }
                }
            }
        });
    }

    async fn handle_event(self: &Arc<Self>, runtime: &Arc<SessionRuntime>, event: LinkEvent) {
        match event {
            LinkEvent::Qr { payload } => {
                let image = match render_qr(&payload) {
                    Ok(image) => image,
                    Err(error) => {
                        warn!(session_id = %runtime.session_id, %error, "failed to render QR payload");
                        return;
                    }
                };
                let mut state = runtime.state.lock().await;
                if state.stopped {
                    return;
                }
                // A new QR replaces the previous one outright.
                state.pending_qr = Some(PendingQr::new(image, payload));
                self.transition(runtime, &mut state, SessionStatus::QrPending)
                    .await;
            }
            LinkEvent::Open { identity } => {
                let mut state = runtime.state.lock().await;
                if state.stopped {
                    return;
                }
                state.pending_qr = None;
                state.reconnect_attempts = 0;
                state.connected_at = Some(Instant::now());
                state.connected_at_utc = Some(now_utc());
                state.identity = identity.clone();
                self.transition(runtime, &mut state, SessionStatus::Connected)
                    .await;
                self.webhooks.enqueue(
                    &runtime.session_id,
                    "connection.status",
                    json!({ "connected": true, "identity": identity }),
                    Priority::High,
                );
                info!(
                    session_id = %runtime.session_id,
                    identity = identity.as_deref().unwrap_or("unknown"),
                    "session connected"
                );
            }
            LinkEvent::Close { reason } => {
                self.handle_close(runtime, reason).await;
            }
            LinkEvent::CredentialsChanged { credentials } => {
                let mut state = runtime.state.lock().await;
                state.record.credentials = Some(credentials);
                state.record.updated_at = now_utc();
                if let Err(error) = self.store.save(&state.record).await {
                    warn!(
                        session_id = %runtime.session_id,
                        %error,
                        "state store save failed, continuing in-memory"
                    );
                }
            }
            LinkEvent::Message { payload } => {
                let mut state = runtime.state.lock().await;
                state.last_activity_utc = Some(now_utc());
                drop(state);
                self.webhooks.enqueue(
                    &runtime.session_id,
                    "message.received",
                    payload,
                    Priority::Normal,
                );
            }
        }
    }

    async fn handle_close(self: &Arc<Self>, runtime: &Arc<SessionRuntime>, reason: CloseReason) {
        let mut state = runtime.state.lock().await;
        // A close that was buffered when stop/delete ran must not
        // resurrect the session through the reconnect policy.
        if state.stopped {
            debug!(session_id = %runtime.session_id, "close after stop, ignoring");
            return;
        }
        if let Some(link) = state.link.take() {
            let _ = link.terminate().await;
        }
        state.pending_qr = None;
        state.disconnected_at_utc = Some(now_utc());

        self.webhooks.enqueue(
            &runtime.session_id,
            "connection.status",
            json!({ "connected": false, "reason": reason.to_string() }),
            Priority::High,
        );

        if reason.is_logged_out() {
            // An intentional logout never reconnects; the device pairing is
            // gone, so stored credentials are void.
            runtime.cancel_reconnect().await;
            state.record.credentials = None;
            state.connected_at = None;
            self.transition(runtime, &mut state, SessionStatus::Inactive)
                .await;
            info!(session_id = %runtime.session_id, "session logged out");
            return;
        }

        self.transition(runtime, &mut state, SessionStatus::Disconnected)
            .await;
        drop(state);
        self.assess_and_schedule(runtime).await;
    }

    /// Runs the reconnect policy for the current disconnect cycle and acts
    /// on its decision. Also used after a failed reconnect attempt, which
    /// produces no close event of its own.
    ///
    /// Boxed because the timer task awaits this and this awaits
    /// `schedule_reconnect`, which would otherwise make the spawned future
    /// type recursive.
    fn assess_and_schedule(
        self: &Arc<Self>,
        runtime: &Arc<SessionRuntime>,
    ) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        let orchestrator = Arc::clone(self);
        let runtime = Arc::clone(runtime);

        Box::pin(async move {
            let mut state = runtime.state.lock().await;
            if state.stopped {
                return;
            }
            let decision = orchestrator.policy.assess(&mut state, Instant::now());
            state.connected_at = None;

            match decision {
                ReconnectDecision::Cooldown { .. } => {
                    runtime.cancel_reconnect().await;
                    orchestrator
                        .transition(&runtime, &mut state, SessionStatus::Inactive)
                        .await;
                    warn!(
                        session_id = %runtime.session_id,
                        "circuit breaker tripped, cooling down"
                    );
                }
                ReconnectDecision::Retry { delay, attempt } => {
                    drop(state);
                    info!(
                        session_id = %runtime.session_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "reconnection scheduled"
                    );
                    orchestrator
                        .schedule_reconnect(Arc::clone(&runtime), delay)
                        .await;
                }
                ReconnectDecision::GiveUp { attempts } => {
                    warn!(
                        session_id = %runtime.session_id,
                        attempts,
                        "reconnection attempts exhausted, leaving session disconnected"
                    );
                }
            }
        })
    }

    /// One-shot reconnect timer. Replacing the token slot cancels any
    /// previously scheduled timer, so at most one is ever pending.
    async fn schedule_reconnect(self: &Arc<Self>, runtime: Arc<SessionRuntime>, delay: Duration) {
        let token = runtime.replace_reconnect_token().await;
        let orchestrator = Arc::clone(self);

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            // Re-verify before reconnecting: the session may have been
            // stopped, deleted, resumed, or forced into cooldown meanwhile.
            {
                let state = runtime.state.lock().await;
                if state.stopped {
                    debug!(session_id = %runtime.session_id, "session stopped, skipping reconnect");
                    return;
                }
                if !matches!(
                    state.status,
                    SessionStatus::Disconnected | SessionStatus::Error
                ) {
                    debug!(
                        session_id = %runtime.session_id,
                        status = %state.status,
                        "stale reconnect timer, skipping"
                    );
                    return;
                }
                if let Some(until) = state.cooldown_until {
                    if until > Instant::now() {
                        debug!(session_id = %runtime.session_id, "in cooldown, skipping reconnect");
                        return;
                    }
                }
            }

            if let Err(error) = orchestrator
                .initialize_session(&runtime.session_id, &runtime.owner_id)
                .await
            {
                warn!(session_id = %runtime.session_id, %error, "reconnection attempt failed");
                orchestrator.assess_and_schedule(&runtime).await;
            }
        });
    }
}

fn new_record(session_id: &SessionId, owner_id: &OwnerId) -> SessionRecord {
    SessionRecord {
        session_id: session_id.clone(),
        owner_id: owner_id.clone(),
        webhook_url: None,
        credentials: None,
        status: SessionStatus::Inactive,
        created_at: now_utc(),
        updated_at: now_utc(),
        webhook_stats: WebhookStats::default(),
    }
}
