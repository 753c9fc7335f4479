// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Herald session gateway.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Herald configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HeraldConfig {
    /// Service identity and logging settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Link provider settings.
    #[serde(default)]
    pub link: LinkConfig,

    /// QR pairing lifecycle settings.
    #[serde(default)]
    pub qr: QrConfig,

    /// Reconnection policy and circuit breaker settings.
    #[serde(default)]
    pub reconnect: ReconnectConfig,

    /// Webhook delivery engine settings.
    #[serde(default)]
    pub webhook: WebhookConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the service instance.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "herald".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Link provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LinkConfig {
    /// Upper bound on provider connection establishment, in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

fn default_connect_timeout_secs() -> u64 {
    60
}

/// QR pairing lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QrConfig {
    /// Seconds a negotiated QR code stays retrievable before it expires.
    #[serde(default = "default_qr_expiry_secs")]
    pub expiry_secs: u64,
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            expiry_secs: default_qr_expiry_secs(),
        }
    }
}

fn default_qr_expiry_secs() -> u64 {
    120
}

/// Reconnection policy and circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReconnectConfig {
    /// Reconnection attempts before giving up for this disconnect cycle.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// A disconnect after less than this many connected seconds counts as rapid.
    #[serde(default = "default_rapid_threshold_secs")]
    pub rapid_threshold_secs: u64,

    /// Trailing window over which rapid disconnects are counted, in seconds.
    #[serde(default = "default_rapid_window_secs")]
    pub rapid_window_secs: u64,

    /// Rapid disconnects within the window that trip the circuit breaker.
    #[serde(default = "default_rapid_trip_count")]
    pub rapid_trip_count: usize,

    /// Cooldown duration once the breaker trips, in seconds.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Base reconnect delay after a rapid disconnect, in milliseconds.
    #[serde(default = "default_rapid_base_delay_ms")]
    pub rapid_base_delay_ms: u64,

    /// Cap on the rapid reconnect delay, in milliseconds.
    #[serde(default = "default_rapid_max_delay_ms")]
    pub rapid_max_delay_ms: u64,

    /// Base reconnect delay after a normal disconnect, in milliseconds.
    #[serde(default = "default_normal_base_delay_ms")]
    pub normal_base_delay_ms: u64,

    /// Per-attempt growth factor for the normal delay.
    #[serde(default = "default_normal_growth_factor")]
    pub normal_growth_factor: f64,

    /// Cap on the normal reconnect delay, in milliseconds.
    #[serde(default = "default_normal_max_delay_ms")]
    pub normal_max_delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            rapid_threshold_secs: default_rapid_threshold_secs(),
            rapid_window_secs: default_rapid_window_secs(),
            rapid_trip_count: default_rapid_trip_count(),
            cooldown_secs: default_cooldown_secs(),
            rapid_base_delay_ms: default_rapid_base_delay_ms(),
            rapid_max_delay_ms: default_rapid_max_delay_ms(),
            normal_base_delay_ms: default_normal_base_delay_ms(),
            normal_growth_factor: default_normal_growth_factor(),
            normal_max_delay_ms: default_normal_max_delay_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_rapid_threshold_secs() -> u64 {
    30
}

fn default_rapid_window_secs() -> u64 {
    300
}

fn default_rapid_trip_count() -> usize {
    3
}

fn default_cooldown_secs() -> u64 {
    600
}

fn default_rapid_base_delay_ms() -> u64 {
    30_000
}

fn default_rapid_max_delay_ms() -> u64 {
    300_000
}

fn default_normal_base_delay_ms() -> u64 {
    5_000
}

fn default_normal_growth_factor() -> f64 {
    1.5
}

fn default_normal_max_delay_ms() -> u64 {
    60_000
}

/// Webhook delivery engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    /// Shared secret for HMAC-SHA256 signatures. Required when any session
    /// has a webhook URL configured.
    #[serde(default)]
    pub secret: Option<String>,

    /// User-Agent header sent with every delivery.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request HTTP timeout, in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Delivery attempts before a job is marked permanently failed.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Queue tick period, in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Base retry backoff, in milliseconds.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Cap on the retry backoff, in milliseconds.
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,

    /// Symmetric jitter fraction applied to retry delays (0.0 to 1.0).
    #[serde(default = "default_retry_jitter")]
    pub retry_jitter: f64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            secret: None,
            user_agent: default_user_agent(),
            request_timeout_ms: default_request_timeout_ms(),
            max_retries: default_max_retries(),
            tick_interval_ms: default_tick_interval_ms(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            retry_jitter: default_retry_jitter(),
        }
    }
}

fn default_user_agent() -> String {
    concat!("herald-webhook/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_max_retries() -> u32 {
    5
}

fn default_tick_interval_ms() -> u64 {
    1_000
}

fn default_retry_base_delay_ms() -> u64 {
    1_000
}

fn default_retry_max_delay_ms() -> u64 {
    60_000
}

fn default_retry_jitter() -> f64 {
    0.25
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_policy_constants() {
        let config = HeraldConfig::default();
        assert_eq!(config.link.connect_timeout_secs, 60);
        assert_eq!(config.qr.expiry_secs, 120);
        assert_eq!(config.reconnect.max_attempts, 5);
        assert_eq!(config.reconnect.rapid_threshold_secs, 30);
        assert_eq!(config.reconnect.rapid_window_secs, 300);
        assert_eq!(config.reconnect.rapid_trip_count, 3);
        assert_eq!(config.reconnect.cooldown_secs, 600);
        assert_eq!(config.webhook.request_timeout_ms, 10_000);
        assert_eq!(config.webhook.max_retries, 5);
        assert_eq!(config.webhook.tick_interval_ms, 1_000);
        assert_eq!(config.webhook.retry_jitter, 0.25);
    }

    #[test]
    fn user_agent_carries_crate_version() {
        let config = WebhookConfig::default();
        assert!(config.user_agent.starts_with("herald-webhook/"));
    }
}
