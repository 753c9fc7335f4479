// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as valid log levels and policy bounds.

use thiserror::Error;

use crate::model::HeraldConfig;

/// A single configuration validation failure.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ConfigError {
    pub message: String,
}

impl ConfigError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &HeraldConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.service.log_level.as_str()) {
        errors.push(ConfigError::new(format!(
            "service.log_level `{}` is not one of trace, debug, info, warn, error",
            config.service.log_level
        )));
    }

    if config.link.connect_timeout_secs == 0 {
        errors.push(ConfigError::new("link.connect_timeout_secs must be > 0"));
    }

    if config.qr.expiry_secs == 0 {
        errors.push(ConfigError::new("qr.expiry_secs must be > 0"));
    }

    if config.reconnect.rapid_trip_count == 0 {
        errors.push(ConfigError::new("reconnect.rapid_trip_count must be > 0"));
    }

    if config.reconnect.normal_growth_factor < 1.0 {
        errors.push(ConfigError::new(format!(
            "reconnect.normal_growth_factor must be >= 1.0, got {}",
            config.reconnect.normal_growth_factor
        )));
    }

    if config.reconnect.rapid_max_delay_ms < config.reconnect.rapid_base_delay_ms {
        errors.push(ConfigError::new(
            "reconnect.rapid_max_delay_ms must be >= reconnect.rapid_base_delay_ms",
        ));
    }

    if config.reconnect.normal_max_delay_ms < config.reconnect.normal_base_delay_ms {
        errors.push(ConfigError::new(
            "reconnect.normal_max_delay_ms must be >= reconnect.normal_base_delay_ms",
        ));
    }

    if config.webhook.request_timeout_ms == 0 {
        errors.push(ConfigError::new("webhook.request_timeout_ms must be > 0"));
    }

    if config.webhook.tick_interval_ms == 0 {
        errors.push(ConfigError::new("webhook.tick_interval_ms must be > 0"));
    }

    if !(0.0..=1.0).contains(&config.webhook.retry_jitter) {
        errors.push(ConfigError::new(format!(
            "webhook.retry_jitter must be between 0.0 and 1.0, got {}",
            config.webhook.retry_jitter
        )));
    }

    if let Some(ref secret) = config.webhook.secret
        && secret.trim().is_empty()
    {
        errors.push(ConfigError::new(
            "webhook.secret must not be empty when set",
        ));
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
