// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Herald session gateway.

use thiserror::Error;

/// The primary error type used across Herald adapter traits and core operations.
#[derive(Debug, Error)]
pub enum HeraldError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Durable state store errors (load/save/delete failure).
    #[error("store error: {source}")]
    Store {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Link provider errors (connection establishment, send failure).
    #[error("link error: {message}")]
    Link {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A session with a live, connected link already exists.
    #[error("session {session_id} is already active")]
    AlreadyActive { session_id: String },

    /// No runtime record exists for the requested session.
    #[error("session {session_id} not found")]
    SessionNotFound { session_id: String },

    /// Operation requires a connected link and the session is not connected.
    #[error("session {session_id} is not connected")]
    NotConnected { session_id: String },

    /// No QR code has been issued for this session yet.
    #[error("no QR code available for session {session_id}")]
    QrNotAvailable { session_id: String },

    /// A QR code was issued but its validity window has lapsed.
    #[error("QR code for session {session_id} has expired")]
    QrExpired { session_id: String },

    /// Webhook delivery errors surfaced outside the retry loop.
    #[error("webhook error: {message}")]
    Webhook { message: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
