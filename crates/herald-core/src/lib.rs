// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Herald session gateway.
//!
//! This crate provides the foundational trait definitions, error types, and
//! common types used throughout the Herald workspace. The orchestrator and
//! webhook engine consume their external collaborators through the traits
//! defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::HeraldError;
pub use traits::{LinkConnection, LinkHandle, LinkProvider, StateStore};
pub use types::{
    CloseReason, LinkEvent, OwnerId, SessionId, SessionRecord, SessionStatus, WebhookStats,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn herald_error_has_all_variants() {
        let _config = HeraldError::Config("test".into());
        let _store = HeraldError::Store {
            source: Box::new(std::io::Error::other("test")),
        };
        let _link = HeraldError::Link {
            message: "test".into(),
            source: None,
        };
        let _active = HeraldError::AlreadyActive {
            session_id: "s".into(),
        };
        let _missing = HeraldError::SessionNotFound {
            session_id: "s".into(),
        };
        let _not_connected = HeraldError::NotConnected {
            session_id: "s".into(),
        };
        let _qr_missing = HeraldError::QrNotAvailable {
            session_id: "s".into(),
        };
        let _qr_expired = HeraldError::QrExpired {
            session_id: "s".into(),
        };
        let _webhook = HeraldError::Webhook {
            message: "test".into(),
        };
        let _timeout = HeraldError::Timeout {
            duration: std::time::Duration::from_secs(10),
        };
        let _internal = HeraldError::Internal("test".into());
    }

    #[test]
    fn qr_errors_are_distinguishable() {
        // The control surface must report "expired" differently from
        // "not yet available".
        let expired = HeraldError::QrExpired {
            session_id: "s-1".into(),
        };
        let missing = HeraldError::QrNotAvailable {
            session_id: "s-1".into(),
        };
        assert_ne!(expired.to_string(), missing.to_string());
        assert!(expired.to_string().contains("expired"));
    }

    #[test]
    fn error_messages_name_the_session() {
        let err = HeraldError::AlreadyActive {
            session_id: "s-42".into(),
        };
        assert!(err.to_string().contains("s-42"));
    }

    #[test]
    fn trait_objects_are_constructible() {
        // Verifies the traits stay object-safe.
        fn _assert_provider(_: &dyn LinkProvider) {}
        fn _assert_handle(_: &dyn LinkHandle) {}
        fn _assert_store(_: &dyn StateStore) {}
    }
}
