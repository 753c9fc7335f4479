// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook delivery engine for the Herald session gateway.
//!
//! Relays session events to tenant-configured HTTP endpoints as signed JSON
//! envelopes, with priority queuing, capped jittered retry backoff, and
//! per-session delivery statistics.

pub mod engine;
pub mod job;
pub mod queue;
pub mod signature;

pub use engine::WebhookEngine;
pub use job::{Priority, WebhookJob};
pub use signature::compute_signature;
