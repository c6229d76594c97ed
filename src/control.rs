//! Control operations: start, cancel, status.
//!
//! These are the externally invokable operations of the controller. Each
//! validates its preconditions against the persisted state and returns a
//! human-readable result string.

use tracing::info;

use crate::controller::LoopController;
use crate::error::{LoopError, Result};
use crate::state::LoopState;

/// Default completion token when the caller does not configure one.
pub const DEFAULT_PROMISE: &str = "DONE";

/// Maximum characters of the prompt shown by `status`.
const PROMPT_PREVIEW_LEN: usize = 60;

/// Optional arguments to [`LoopController::start`].
#[derive(Debug, Clone)]
pub struct StartOptions {
    /// 0 = unlimited.
    pub max_iterations: u32,
    /// Exact token expected inside the completion tag.
    pub completion_promise: String,
}

impl Default for StartOptions {
    fn default() -> Self {
        Self {
            max_iterations: 0,
            completion_promise: DEFAULT_PROMISE.to_string(),
        }
    }
}

impl LoopController {
    /// Starts a new loop for the current session.
    ///
    /// Does not itself submit anything; the first resubmission happens on
    /// the next idle notification.
    ///
    /// # Errors
    ///
    /// [`LoopError::AlreadyActive`] when an active record exists (left
    /// untouched), [`LoopError::NoSession`] when the tracker has not seen a
    /// session yet.
    pub fn start(&mut self, prompt: &str, options: StartOptions) -> Result<String> {
        if let Some(existing) = self.store.load()? {
            if existing.active {
                return Err(LoopError::AlreadyActive {
                    iteration: existing.iteration,
                });
            }
        }

        let Some(session_id) = self.tracker.current_session_id() else {
            return Err(LoopError::NoSession);
        };
        let session_id = session_id.to_string();

        let state = LoopState::new(
            &session_id,
            prompt,
            options.max_iterations,
            &options.completion_promise,
        );
        self.store.save(&state)?;

        info!(
            session_id = %session_id,
            max_iterations = options.max_iterations,
            "Loop started"
        );

        let cap = if options.max_iterations > 0 {
            format!("max {} iterations", options.max_iterations)
        } else {
            "unlimited iterations".to_string()
        };
        Ok(format!(
            "Loop started for session {session_id} ({cap}, completion promise \"{token}\"). \
             The prompt will be resubmitted on the next idle.",
            token = options.completion_promise
        ))
    }

    /// Cancels the active loop, if any. Idempotent: a second call is again
    /// an informational no-op.
    pub fn cancel(&mut self) -> Result<String> {
        let Some(state) = self.store.load()? else {
            return Ok("No active loop to cancel.".to_string());
        };

        self.store.clear()?;
        info!(iterations = state.iteration, "Loop cancelled");
        Ok(format!(
            "Loop cancelled after {} iteration{}.",
            state.iteration,
            plural(state.iteration)
        ))
    }

    /// Reports the current loop status. Read-only.
    pub fn status(&self) -> Result<String> {
        let Some(state) = self.store.load()? else {
            return Ok("No active loop.".to_string());
        };

        let cap = if state.max_iterations > 0 {
            state.max_iterations.to_string()
        } else {
            "unlimited".to_string()
        };
        Ok(format!(
            "Loop active for {elapsed}: iteration {i}/{cap}\n\
             Prompt: {preview}\n\
             Completion promise: \"{token}\"",
            elapsed = format_elapsed(&state),
            i = state.iteration,
            preview = truncate(&state.prompt, PROMPT_PREVIEW_LEN),
            token = state.completion_promise
        ))
    }
}

fn plural(count: u32) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

fn format_elapsed(state: &LoopState) -> String {
    let total_secs = state.elapsed().num_seconds().max(0) as u64;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}
