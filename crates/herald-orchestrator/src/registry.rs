// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory session registry.
//!
//! Single source of truth for live connection state: a concurrent map of
//! session id to runtime record, constructed once and passed by handle
//! rather than living as ambient process state.

use std::sync::Arc;

use dashmap::DashMap;
use herald_core::SessionId;

use crate::session::SessionRuntime;

/// Concurrent keyed store of session runtimes.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<SessionId, Arc<SessionRuntime>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, session_id: &SessionId) -> Option<Arc<SessionRuntime>> {
        self.sessions.get(session_id).map(|entry| Arc::clone(&entry))
    }

    /// Returns the existing runtime for `session_id`, or inserts the one
    /// produced by `build`. Losing a racing insert returns the winner.
    pub fn get_or_insert_with(
        &self,
        session_id: &SessionId,
        build: impl FnOnce() -> Arc<SessionRuntime>,
    ) -> Arc<SessionRuntime> {
        Arc::clone(
            &self
                .sessions
                .entry(session_id.clone())
                .or_insert_with(build),
        )
    }

    pub fn remove(&self, session_id: &SessionId) -> Option<Arc<SessionRuntime>> {
        self.sessions.remove(session_id).map(|(_, runtime)| runtime)
    }

    pub fn contains(&self, session_id: &SessionId) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }
}
