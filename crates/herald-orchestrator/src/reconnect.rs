// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reconnection policy and circuit breaker.
//!
//! Consulted on every non-logout close. Disconnects after less than the
//! rapid threshold of connected time count toward a trailing window; three
//! rapid disconnects inside the window trip the breaker into a 10-minute
//! cooldown. Otherwise the delay grows exponentially per attempt, on a
//! steeper curve when the last disconnect was rapid.

use std::time::Duration;

use herald_config::ReconnectConfig;
use tokio::time::Instant;

use crate::session::RuntimeState;

/// Outcome of assessing a disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Circuit breaker tripped: suppress reconnection until `until`. The
    /// session is forced inactive; only a fresh initialize after the
    /// cooldown lapses resumes it.
    Cooldown { until: Instant },
    /// Schedule one reconnection task after `delay`. `attempt` is the
    /// 1-based attempt number just consumed.
    Retry { delay: Duration, attempt: u32 },
    /// Attempts exhausted: leave the session disconnected.
    GiveUp { attempts: u32 },
}

pub struct ReconnectPolicy {
    config: ReconnectConfig,
}

impl ReconnectPolicy {
    pub fn new(config: ReconnectConfig) -> Self {
        Self { config }
    }

    /// Assesses a non-logout close, updating the state's rapid-disconnect
    /// window, cooldown, and attempt counter.
    pub fn assess(&self, state: &mut RuntimeState, now: Instant) -> ReconnectDecision {
        // Connected duration is zero when this cycle never reached open.
        let connection_duration = state
            .connected_at
            .map(|at| now.saturating_duration_since(at))
            .unwrap_or(Duration::ZERO);
        let is_rapid =
            connection_duration < Duration::from_secs(self.config.rapid_threshold_secs);

        if is_rapid {
            state.rapid_disconnects.push_back(now);
        }
        let window = Duration::from_secs(self.config.rapid_window_secs);
        while let Some(&front) = state.rapid_disconnects.front() {
            if now.saturating_duration_since(front) > window {
                state.rapid_disconnects.pop_front();
            } else {
                break;
            }
        }

        if state.rapid_disconnects.len() >= self.config.rapid_trip_count {
            let until = now + Duration::from_secs(self.config.cooldown_secs);
            state.cooldown_until = Some(until);
            state.rapid_disconnects.clear();
            return ReconnectDecision::Cooldown { until };
        }

        if state.reconnect_attempts < self.config.max_attempts {
            let delay = self.compute_delay(state.reconnect_attempts, is_rapid);
            state.reconnect_attempts += 1;
            return ReconnectDecision::Retry {
                delay,
                attempt: state.reconnect_attempts,
            };
        }

        ReconnectDecision::GiveUp {
            attempts: state.reconnect_attempts,
        }
    }

    /// Delay for the given prior attempt count: doubling from 30s (capped
    /// at 5min) after a rapid disconnect, growing by 1.5x from 5s (capped
    /// at 60s) otherwise.
    pub fn compute_delay(&self, attempts: u32, rapid: bool) -> Duration {
        let exponent = attempts.min(30) as i32;
        let ms = if rapid {
            (self.config.rapid_base_delay_ms as f64 * 2f64.powi(exponent))
                .min(self.config.rapid_max_delay_ms as f64)
        } else {
            (self.config.normal_base_delay_ms as f64
                * self.config.normal_growth_factor.powi(exponent))
            .min(self.config.normal_max_delay_ms as f64)
        };
        Duration::from_millis(ms as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::{OwnerId, SessionId, SessionRecord, SessionStatus, WebhookStats};
    use crate::session::SessionRuntime;

    fn policy() -> ReconnectPolicy {
        ReconnectPolicy::new(ReconnectConfig::default())
    }

    fn runtime() -> SessionRuntime {
        let record = SessionRecord {
            session_id: SessionId("s-1".into()),
            owner_id: OwnerId("tenant".into()),
            webhook_url: None,
            credentials: None,
            status: SessionStatus::Inactive,
            created_at: chrono::Utc::now().to_rfc3339(),
            updated_at: chrono::Utc::now().to_rfc3339(),
            webhook_stats: WebhookStats::default(),
        };
        SessionRuntime::new(SessionId("s-1".into()), OwnerId("tenant".into()), record)
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_delay_doubles_and_caps_at_five_minutes() {
        let policy = policy();
        let mut previous = Duration::ZERO;
        for attempts in 0..8 {
            let delay = policy.compute_delay(attempts, true);
            assert!(delay >= previous, "delay must be non-decreasing");
            assert!(delay <= Duration::from_secs(300));
            previous = delay;
        }
        assert_eq!(policy.compute_delay(0, true), Duration::from_secs(30));
        assert_eq!(policy.compute_delay(1, true), Duration::from_secs(60));
        assert_eq!(policy.compute_delay(2, true), Duration::from_secs(120));
        assert_eq!(policy.compute_delay(4, true), Duration::from_secs(300));
        assert_eq!(policy.compute_delay(10, true), Duration::from_secs(300));
    }

    #[tokio::test(start_paused = true)]
    async fn normal_delay_grows_and_caps_at_sixty_seconds() {
        let policy = policy();
        let mut previous = Duration::ZERO;
        for attempts in 0..10 {
            let delay = policy.compute_delay(attempts, false);
            assert!(delay >= previous, "delay must be non-decreasing");
            assert!(delay <= Duration::from_secs(60));
            previous = delay;
        }
        assert_eq!(policy.compute_delay(0, false), Duration::from_secs(5));
        assert_eq!(policy.compute_delay(1, false), Duration::from_millis(7_500));
        assert_eq!(policy.compute_delay(9, false), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn close_after_ten_connected_seconds_is_rapid_with_30s_delay() {
        let policy = policy();
        let runtime = runtime();
        let mut state = runtime.state.lock().await;

        tokio::time::advance(Duration::from_secs(10)).await;
        let now = Instant::now();
        state.connected_at = Some(now - Duration::from_secs(10));

        let decision = policy.assess(&mut state, now);
        assert_eq!(
            decision,
            ReconnectDecision::Retry {
                delay: Duration::from_secs(30),
                attempt: 1
            }
        );
        assert_eq!(state.rapid_disconnects.len(), 1);
        assert_eq!(state.reconnect_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_disconnect_uses_normal_curve_and_skips_window() {
        let policy = policy();
        let runtime = runtime();
        let mut state = runtime.state.lock().await;

        tokio::time::advance(Duration::from_secs(3600)).await;
        let now = Instant::now();
        state.connected_at = Some(now - Duration::from_secs(3600));

        let decision = policy.assess(&mut state, now);
        assert_eq!(
            decision,
            ReconnectDecision::Retry {
                delay: Duration::from_secs(5),
                attempt: 1
            }
        );
        assert!(state.rapid_disconnects.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn never_connected_counts_as_rapid() {
        let policy = policy();
        let runtime = runtime();
        let mut state = runtime.state.lock().await;
        state.connected_at = None;

        let decision = policy.assess(&mut state, Instant::now());
        assert!(matches!(decision, ReconnectDecision::Retry { delay, .. }
            if delay == Duration::from_secs(30)));
        assert_eq!(state.rapid_disconnects.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn three_rapid_disconnects_within_window_trip_cooldown() {
        let policy = policy();
        let runtime = runtime();
        let mut state = runtime.state.lock().await;

        // Three disconnects, each after ~10s of connected time, spread over
        // two minutes: all rapid, all inside the five-minute window.
        let start = Instant::now() + Duration::from_secs(30);
        for offset in [0u64, 60] {
            let now = start + Duration::from_secs(offset);
            state.connected_at = Some(now - Duration::from_secs(10));
            assert!(matches!(
                policy.assess(&mut state, now),
                ReconnectDecision::Retry { .. }
            ));
        }

        let now = start + Duration::from_secs(120);
        state.connected_at = Some(now - Duration::from_secs(10));
        let decision = policy.assess(&mut state, now);
        match decision {
            ReconnectDecision::Cooldown { until } => {
                assert_eq!(until, now + Duration::from_secs(600));
            }
            other => panic!("expected cooldown, got {other:?}"),
        }
        assert_eq!(state.cooldown_until, Some(now + Duration::from_secs(600)));
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_disconnects_outside_window_do_not_trip() {
        let policy = policy();
        let runtime = runtime();
        let mut state = runtime.state.lock().await;

        let start = Instant::now();
        // Two rapid disconnects, then a third more than five minutes after
        // the first: the pruned window holds only two entries.
        state.connected_at = Some(start);
        policy.assess(&mut state, start);
        state.connected_at = Some(start + Duration::from_secs(10));
        policy.assess(&mut state, start + Duration::from_secs(15));

        state.connected_at = Some(start + Duration::from_secs(305));
        let decision = policy.assess(&mut state, start + Duration::from_secs(310));
        assert!(matches!(decision, ReconnectDecision::Retry { .. }));
        assert_eq!(state.rapid_disconnects.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_attempts_give_up() {
        let policy = policy();
        let runtime = runtime();
        let mut state = runtime.state.lock().await;
        state.reconnect_attempts = 5;
        // A slow disconnect so the window stays clear.
        tokio::time::advance(Duration::from_secs(3600)).await;
        state.connected_at = Some(Instant::now() - Duration::from_secs(3600));

        let decision = policy.assess(&mut state, Instant::now());
        assert_eq!(decision, ReconnectDecision::GiveUp { attempts: 5 });
        assert_eq!(state.reconnect_attempts, 5);
    }
}
