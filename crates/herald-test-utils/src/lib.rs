// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for the Herald workspace.
//!
//! Provides deterministic mock implementations of the two external
//! collaborator traits: [`MockLinkProvider`] (scripted connections with
//! test-injectable event streams) and [`MockStateStore`] (in-memory
//! persistence with failure injection).

pub mod mock_link;
pub mod mock_store;

pub use mock_link::{MockConnection, MockLinkHandle, MockLinkProvider};
pub use mock_store::MockStateStore;
