// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook delivery engine.
//!
//! Jobs are enqueued per session and delivered by a 1-second tick that first
//! promotes due retries, then drains the main queue sequentially. Dispatch
//! posts a signed JSON envelope to the tenant URL; failures are retried with
//! capped exponential backoff and symmetric jitter, then marked permanently
//! failed once `max_retries` attempts are spent.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use herald_config::WebhookConfig;
use herald_core::{HeraldError, SessionId, StateStore, WebhookStats};
use rand::Rng;
use reqwest::header::CONTENT_TYPE;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::job::{Priority, WebhookJob};
use crate::queue::JobQueues;
use crate::signature;

/// Retrying webhook dispatcher with per-session statistics.
///
/// One engine instance serves all sessions. The registry of webhook URLs is
/// populated by the orchestrator when sessions are initialized; `enqueue` is
/// a no-op for sessions without a URL.
pub struct WebhookEngine {
    queues: JobQueues,
    urls: DashMap<SessionId, String>,
    stats: DashMap<SessionId, WebhookStats>,
    store: Arc<dyn StateStore>,
    client: reqwest::Client,
    config: WebhookConfig,
    secret: String,
}

impl WebhookEngine {
    pub fn new(
        store: Arc<dyn StateStore>,
        config: WebhookConfig,
    ) -> Result<Arc<Self>, HeraldError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| HeraldError::Webhook {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        let secret = config.secret.clone().unwrap_or_default();

        Ok(Arc::new(Self {
            queues: JobQueues::new(),
            urls: DashMap::new(),
            stats: DashMap::new(),
            store,
            client,
            config,
            secret,
        }))
    }

    /// Registers the delivery URL for a session. Already-queued jobs keep
    /// the URL they were enqueued with.
    pub fn set_webhook_url(&self, session_id: &SessionId, url: String) {
        self.urls.insert(session_id.clone(), url);
    }

    /// Unregisters a session's delivery URL.
    pub fn clear_webhook_url(&self, session_id: &SessionId) {
        self.urls.remove(session_id);
    }

    /// Builds and queues a job for a session. No-op when the session has no
    /// configured webhook URL.
    pub fn enqueue(
        &self,
        session_id: &SessionId,
        event_type: &str,
        payload: serde_json::Value,
        priority: Priority,
    ) {
        let Some(url) = self.urls.get(session_id).map(|u| u.clone()) else {
            return;
        };

        let job = WebhookJob::new(
            session_id.clone(),
            event_type,
            payload,
            url,
            priority,
            self.config.max_retries,
        );
        debug!(
            session_id = %session_id,
            event = event_type,
            webhook_id = %job.id,
            "webhook job enqueued"
        );
        self.queues.push(job);
    }

    /// Purges all pending and retry-queued jobs for a session.
    ///
    /// Safe to call while a tick is in flight; a job already handed to
    /// dispatch completes its current attempt but any retry it schedules
    /// afterwards is orphaned only until the next `clear_session_queue`.
    pub fn clear_session_queue(&self, session_id: &SessionId) -> usize {
        let removed = self.queues.clear_session(session_id);
        if removed > 0 {
            info!(session_id = %session_id, removed, "purged webhook jobs");
        }
        removed
    }

    /// Runs the periodic tick until `token` is cancelled.
    ///
    /// The interval skips missed ticks, so a drain that takes longer than
    /// the period never stacks overlapping ticks.
    pub async fn run(self: Arc<Self>, token: CancellationToken) {
        let mut interval =
            tokio::time::interval(Duration::from_millis(self.config.tick_interval_ms));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            tick_ms = self.config.tick_interval_ms,
            "webhook engine started"
        );

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("webhook engine stopped");
                    break;
                }
                _ = interval.tick() => self.tick().await,
            }
        }
    }

    /// One queue pass: promote due retries, then drain the main queue.
    ///
    /// Dispatch is sequential, which preserves first-enqueued-first order
    /// per session and bounds the engine to one open request at a time.
    pub async fn tick(&self) {
        for job in self.queues.due_retries(Instant::now()) {
            self.queues.push(job);
        }

        for job in self.queues.drain_main() {
            self.dispatch(job).await;
        }
    }

    async fn dispatch(&self, mut job: WebhookJob) {
        job.attempts += 1;

        let envelope = serde_json::json!({
            "event": job.event_type,
            "sessionId": job.session_id.0,
            "data": job.payload,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "webhookId": job.id,
        });
        let body = match serde_json::to_vec(&envelope) {
            Ok(body) => body,
            Err(e) => {
                warn!(
                    session_id = %job.session_id,
                    webhook_id = %job.id,
                    error = %e,
                    "envelope serialization failed, dropping job"
                );
                return;
            }
        };
        let sig = signature::compute_signature(&body, &job.session_id.0, &self.secret);

        self.record_attempt(&job.session_id);

        let result = self
            .client
            .post(&job.webhook_url)
            .header(CONTENT_TYPE, "application/json")
            .header("X-Webhook-Signature", sig)
            .header("X-Webhook-Event", job.event_type.clone())
            .header("X-Session-ID", job.session_id.0.clone())
            .body(body)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!(
                    session_id = %job.session_id,
                    webhook_id = %job.id,
                    status = %response.status(),
                    attempt = job.attempts,
                    "webhook delivered"
                );
                self.record_success(&job.session_id).await;
            }
            Ok(response) => {
                warn!(
                    session_id = %job.session_id,
                    webhook_id = %job.id,
                    status = %response.status(),
                    attempt = job.attempts,
                    "webhook delivery rejected"
                );
                self.handle_failure(job).await;
            }
            Err(e) => {
                warn!(
                    session_id = %job.session_id,
                    webhook_id = %job.id,
                    error = %e,
                    attempt = job.attempts,
                    "webhook delivery failed"
                );
                self.handle_failure(job).await;
            }
        }
    }

    /// Records a failed attempt and either schedules a retry or marks the
    /// job permanently failed once its attempts are exhausted.
    pub(crate) async fn handle_failure(&self, mut job: WebhookJob) {
        self.record_failure(&job.session_id).await;

        if job.attempts < job.max_retries {
            let delay = self.retry_delay(job.attempts);
            job.next_retry_at = Some(Instant::now() + delay);
            debug!(
                session_id = %job.session_id,
                webhook_id = %job.id,
                attempt = job.attempts,
                delay_ms = delay.as_millis() as u64,
                "webhook retry scheduled"
            );
            self.queues.push_retry(job);
        } else {
            warn!(
                session_id = %job.session_id,
                webhook_id = %job.id,
                attempts = job.attempts,
                "webhook permanently failed"
            );
            self.record_permanent_failure(&job.session_id).await;
        }
    }

    /// Un-jittered backoff for the given attempt count: doubling from the
    /// base delay, capped at the configured maximum.
    pub(crate) fn base_backoff_ms(&self, attempts: u32) -> f64 {
        let exponent = attempts.saturating_sub(1).min(30) as i32;
        (self.config.retry_base_delay_ms as f64 * 2f64.powi(exponent))
            .min(self.config.retry_max_delay_ms as f64)
    }

    /// Backoff with symmetric jitter, floored at the base delay.
    pub(crate) fn retry_delay(&self, attempts: u32) -> Duration {
        let backoff = self.base_backoff_ms(attempts);
        let jitter = backoff * self.config.retry_jitter * rand::thread_rng().gen_range(-1.0..=1.0);
        let delay = (backoff + jitter).max(self.config.retry_base_delay_ms as f64);
        Duration::from_millis(delay as u64)
    }

    /// Returns accumulated delivery statistics for a session, if any.
    pub fn stats(&self, session_id: &SessionId) -> Option<WebhookStats> {
        self.stats.get(session_id).map(|s| s.clone())
    }

    pub fn main_queue_len(&self) -> usize {
        self.queues.main_len()
    }

    pub fn retry_queue_len(&self) -> usize {
        self.queues.retry_len()
    }

    fn record_attempt(&self, session_id: &SessionId) {
        let mut entry = self.stats.entry(session_id.clone()).or_default();
        entry.total_sent += 1;
        entry.last_sent = Some(chrono::Utc::now().to_rfc3339());
    }

    async fn record_success(&self, session_id: &SessionId) {
        let stats = {
            let mut entry = self.stats.entry(session_id.clone()).or_default();
            entry.successful += 1;
            entry.last_success = Some(chrono::Utc::now().to_rfc3339());
            entry.clone()
        };
        self.persist_stats(session_id, &stats).await;
    }

    async fn record_failure(&self, session_id: &SessionId) {
        let stats = {
            let mut entry = self.stats.entry(session_id.clone()).or_default();
            entry.failed += 1;
            entry.last_failure = Some(chrono::Utc::now().to_rfc3339());
            entry.clone()
        };
        self.persist_stats(session_id, &stats).await;
    }

    async fn record_permanent_failure(&self, session_id: &SessionId) {
        let stats = {
            let mut entry = self.stats.entry(session_id.clone()).or_default();
            entry.permanently_failed += 1;
            entry.clone()
        };
        self.persist_stats(session_id, &stats).await;
    }

    /// Stats persistence is opportunistic; failure degrades durability but
    /// never blocks delivery.
    async fn persist_stats(&self, session_id: &SessionId, stats: &WebhookStats) {
        if let Err(e) = self.store.save_stats(session_id, stats).await {
            debug!(
                session_id = %session_id,
                error = %e,
                "webhook stats persistence failed (non-fatal)"
            );
        }
    }
}
