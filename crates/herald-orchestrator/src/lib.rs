// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session connection orchestrator.
//!
//! Multiplexes long-lived provider sessions: one registry entry, one event
//! loop, and one lifecycle state machine per session, with QR pairing,
//! automatic reconnection, and a rapid-disconnect circuit breaker.

pub mod orchestrator;
pub mod qr;
pub mod reconnect;
pub mod registry;
pub mod session;

pub use orchestrator::Orchestrator;
pub use qr::{PendingQr, QrCodeInfo, render_qr};
pub use reconnect::{ReconnectDecision, ReconnectPolicy};
pub use registry::SessionRegistry;
pub use session::{RuntimeState, SessionRuntime, SessionSnapshot};
