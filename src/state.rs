//! Persisted loop state.
//!
//! A single record per workspace describes the in-progress resubmission
//! loop. Absence of the record is the canonical "no active loop" signal;
//! terminal transitions destroy the record rather than flagging it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The persisted resubmission-loop record.
///
/// Field names are camelCase on disk; the record is written pretty-printed.
///
/// # Example
///
/// ```
/// use wiggum::state::LoopState;
///
/// let state = LoopState::new("session-1", "Fix bugs", 0, "DONE");
/// assert_eq!(state.iteration, 0);
/// assert!(state.active);
/// assert!(!state.cap_reached());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopState {
    /// Whether a loop is currently running.
    pub active: bool,
    /// Target session for resubmission.
    pub session_id: String,
    /// Original task text, resent verbatim each iteration.
    pub prompt: String,
    /// Count of resubmissions performed so far.
    pub iteration: u32,
    /// 0 = unlimited, otherwise hard cap.
    pub max_iterations: u32,
    /// Exact token expected inside the completion tag.
    pub completion_promise: String,
    /// Loop creation time, for elapsed-time reporting.
    pub started_at: DateTime<Utc>,
}

impl LoopState {
    /// Create a fresh active record at iteration zero.
    #[must_use]
    pub fn new(session_id: &str, prompt: &str, max_iterations: u32, completion_promise: &str) -> Self {
        Self {
            active: true,
            session_id: session_id.to_string(),
            prompt: prompt.to_string(),
            iteration: 0,
            max_iterations,
            completion_promise: completion_promise.to_string(),
            started_at: Utc::now(),
        }
    }

    /// Whether the iteration cap has been exhausted. Never true when
    /// `max_iterations` is 0 (unlimited).
    #[must_use]
    pub fn cap_reached(&self) -> bool {
        self.max_iterations > 0 && self.iteration >= self.max_iterations
    }

    /// Increment the resubmission counter.
    pub fn next_iteration(&mut self) {
        self.iteration += 1;
    }

    /// Wall-clock time since the loop was started.
    #[must_use]
    pub fn elapsed(&self) -> chrono::Duration {
        Utc::now() - self.started_at
    }
}
