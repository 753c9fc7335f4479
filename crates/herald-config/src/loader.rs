// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./herald.toml` > `~/.config/herald/herald.toml` >
//! `/etc/herald/herald.toml` with environment variable overrides via the
//! `HERALD_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::HeraldConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/herald/herald.toml` (system-wide)
/// 3. `~/.config/herald/herald.toml` (user XDG config)
/// 4. `./herald.toml` (local directory)
/// 5. `HERALD_*` environment variables
pub fn load_config() -> Result<HeraldConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(HeraldConfig::default()))
        .merge(Toml::file("/etc/herald/herald.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("herald/herald.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("herald.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<HeraldConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(HeraldConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<HeraldConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(HeraldConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `HERALD_WEBHOOK_REQUEST_TIMEOUT_MS` must
/// map to `webhook.request_timeout_ms`, not `webhook.request.timeout.ms`.
fn env_provider() -> Env {
    Env::prefixed("HERALD_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: HERALD_WEBHOOK_SECRET -> "webhook_secret"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("service_", "service.", 1)
            .replacen("link_", "link.", 1)
            .replacen("qr_", "qr.", 1)
            .replacen("reconnect_", "reconnect.", 1)
            .replacen("webhook_", "webhook.", 1);
        mapped.into()
    })
}
