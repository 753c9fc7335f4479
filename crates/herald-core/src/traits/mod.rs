// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! The gateway core consumes two external collaborators through these seams:
//! the [`link::LinkProvider`] (wire-level messaging protocol) and the
//! [`store::StateStore`] (durable session metadata).

pub mod link;
pub mod store;

pub use link::{LinkConnection, LinkHandle, LinkProvider};
pub use store::StateStore;
