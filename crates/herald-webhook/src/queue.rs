// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Internal job queues for the delivery engine.
//!
//! Two collections: a FIFO main queue (High-priority jobs inserted at the
//! front) and a retry set keyed by `next_retry_at`. Both are guarded by
//! short-lived sync locks so `clear_session` is safe to call while a tick
//! is draining.

use std::collections::VecDeque;
use std::sync::Mutex;

use herald_core::SessionId;
use tokio::time::Instant;

use crate::job::{Priority, WebhookJob};

#[derive(Default)]
pub struct JobQueues {
    main: Mutex<VecDeque<WebhookJob>>,
    retry: Mutex<Vec<WebhookJob>>,
}

impl JobQueues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places a job on the main queue per its priority.
    pub fn push(&self, job: WebhookJob) {
        let mut main = self.main.lock().expect("main queue lock poisoned");
        match job.priority {
            Priority::High => main.push_front(job),
            Priority::Normal | Priority::Low => main.push_back(job),
        }
    }

    /// Moves a job into the retry queue. The caller has set `next_retry_at`.
    pub fn push_retry(&self, job: WebhookJob) {
        self.retry.lock().expect("retry queue lock poisoned").push(job);
    }

    /// Takes the entire main queue for dispatch.
    pub fn drain_main(&self) -> Vec<WebhookJob> {
        let mut main = self.main.lock().expect("main queue lock poisoned");
        main.drain(..).collect()
    }

    /// Removes and returns retry jobs whose `next_retry_at` has passed.
    pub fn due_retries(&self, now: Instant) -> Vec<WebhookJob> {
        let mut retry = self.retry.lock().expect("retry queue lock poisoned");
        let mut due = Vec::new();
        let mut i = 0;
        while i < retry.len() {
            let is_due = retry[i].next_retry_at.is_none_or(|at| at <= now);
            if is_due {
                due.push(retry.swap_remove(i));
            } else {
                i += 1;
            }
        }
        due
    }

    /// Purges every pending and retry-queued job for a session.
    ///
    /// Returns the number of jobs removed. Used on session deletion.
    pub fn clear_session(&self, session_id: &SessionId) -> usize {
        let mut removed = 0;
        {
            let mut main = self.main.lock().expect("main queue lock poisoned");
            let before = main.len();
            main.retain(|job| &job.session_id != session_id);
            removed += before - main.len();
        }
        {
            let mut retry = self.retry.lock().expect("retry queue lock poisoned");
            let before = retry.len();
            retry.retain(|job| &job.session_id != session_id);
            removed += before - retry.len();
        }
        removed
    }

    pub fn main_len(&self) -> usize {
        self.main.lock().expect("main queue lock poisoned").len()
    }

    pub fn retry_len(&self) -> usize {
        self.retry.lock().expect("retry queue lock poisoned").len()
    }
}
