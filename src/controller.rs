//! Idle-triggered loop controller.
//!
//! The controller reacts to host events and, on each idle notification,
//! decides whether to resubmit the task prompt, finish the loop, or do
//! nothing. All loop-state mutation during the idle cycle happens here;
//! `&mut self` keeps the cycle non-reentrant within a process.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::detect::detect_completion;
use crate::error::{LoopError, Result};
use crate::event::AgentEvent;
use crate::session::SessionTracker;
use crate::state::LoopState;
use crate::store::StateStore;
use crate::submit::PromptSubmitter;

/// Bounded retry for outbound submission.
///
/// The default is a single attempt: a failed submission aborts the loop
/// rather than retrying, fail-closed.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Minimum 1.
    pub max_attempts: u32,
    /// Delay between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::from_secs(2),
        }
    }
}

/// Outcome of one idle cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdleOutcome {
    /// No loop state exists (or the record is inactive); nothing happened.
    NoActiveLoop,
    /// The prompt was resubmitted and the loop continues.
    Continued {
        iteration: u32,
        max_iterations: u32,
    },
    /// The completion promise was found; the loop is finished.
    Completed { iterations: u32, matched: String },
    /// The iteration cap was exhausted without a completion signal.
    CapReached { iterations: u32 },
}

/// Drives the resubmission loop for one workspace.
pub struct LoopController {
    pub(crate) store: StateStore,
    pub(crate) tracker: SessionTracker,
    submitter: Arc<dyn PromptSubmitter>,
    retry: RetryPolicy,
}

impl LoopController {
    /// Creates a controller for the given workspace and submission capability.
    #[must_use]
    pub fn new(workspace: impl AsRef<std::path::Path>, submitter: Arc<dyn PromptSubmitter>) -> Self {
        Self {
            store: StateStore::new(workspace),
            tracker: SessionTracker::new(),
            submitter,
            retry: RetryPolicy::default(),
        }
    }

    /// Overrides the submission retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Read access to the session tracker.
    #[must_use]
    pub fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    /// Read access to the state store.
    #[must_use]
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Applies one host lifecycle event to the tracker.
    ///
    /// Idle events are deliberately not handled here; the host drives the
    /// idle cycle through [`LoopController::on_idle`] so the async boundary
    /// stays explicit.
    pub fn handle_event(&mut self, event: &AgentEvent) {
        self.tracker.apply(event);
    }

    /// Runs one idle cycle and returns the transition taken.
    ///
    /// # Errors
    ///
    /// Returns [`LoopError::Submission`] when the outbound submission fails
    /// after the configured attempts; the loop state is destroyed first, so
    /// the loop is aborted rather than retried on the next idle.
    pub async fn on_idle(&mut self) -> Result<IdleOutcome> {
        let Some(mut state) = self.store.load()? else {
            return Ok(IdleOutcome::NoActiveLoop);
        };
        if !state.active {
            return Ok(IdleOutcome::NoActiveLoop);
        }

        if state.cap_reached() {
            self.store.clear()?;
            info!(
                iterations = state.iteration,
                max_iterations = state.max_iterations,
                "Iteration cap reached - stopping without completion"
            );
            return Ok(IdleOutcome::CapReached {
                iterations: state.iteration,
            });
        }

        if let Some(found) =
            detect_completion(self.tracker.last_assistant_text(), &state.completion_promise)
        {
            self.store.clear()?;
            info!(
                iterations = state.iteration,
                matched = %found.matched,
                "Completion promise detected - loop finished"
            );
            return Ok(IdleOutcome::Completed {
                iterations: state.iteration,
                matched: found.matched,
            });
        }

        state.next_iteration();
        self.store.save(&state)?;

        let message = build_resubmission(&state);
        if let Err(e) = self.submit_with_retry(&state.session_id, &message).await {
            // Fail closed: destroy the state so the loop does not limp on.
            self.store.clear()?;
            warn!(error = %e, "Submission failed - loop aborted");
            return Err(LoopError::Submission {
                message: e.to_string(),
            });
        }

        info!(
            iteration = state.iteration,
            max_iterations = state.max_iterations,
            "Resubmitted prompt"
        );
        Ok(IdleOutcome::Continued {
            iteration: state.iteration,
            max_iterations: state.max_iterations,
        })
    }

    async fn submit_with_retry(&self, session_id: &str, message: &str) -> anyhow::Result<()> {
        let attempts = self.retry.max_attempts.max(1);
        let mut last_err = None;

        for attempt in 1..=attempts {
            match self.submitter.submit(session_id, message).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    if attempt < attempts {
                        warn!(attempt, error = %e, "Submission attempt failed - retrying");
                        tokio::time::sleep(self.retry.backoff).await;
                    }
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("submission failed")))
    }
}

/// Builds the resubmission message: generated header, then the verbatim
/// original prompt.
fn build_resubmission(state: &LoopState) -> String {
    let counter = if state.max_iterations > 0 {
        format!("Iteration {} of {}.", state.iteration, state.max_iterations)
    } else {
        format!("Iteration {} (no iteration cap).", state.iteration)
    };

    format!(
        "{counter}\n\
         The task below is not yet complete. Continue working on it.\n\
         When it is genuinely complete, reply with <promise>{token}</promise>.\n\
         Only report completion truthfully; never emit the promise just to stop the loop.\n\
         \n\
         {prompt}",
        token = state.completion_promise,
        prompt = state.prompt
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockSubmitter;
    use tempfile::TempDir;

    fn test_controller(submitter: MockSubmitter) -> (LoopController, Arc<MockSubmitter>, TempDir) {
        let temp_dir = TempDir::new().expect("temp dir");
        let submitter = Arc::new(submitter);
        let controller = LoopController::new(temp_dir.path(), submitter.clone());
        (controller, submitter, temp_dir)
    }

    fn seed_state(controller: &LoopController, state: &LoopState) {
        controller.store.save(state).expect("seed state");
    }

    #[tokio::test]
    async fn test_idle_without_state_is_noop() {
        let (mut controller, submitter, _temp) = test_controller(MockSubmitter::new());

        let outcome = controller.on_idle().await.expect("on_idle");
        assert_eq!(outcome, IdleOutcome::NoActiveLoop);
        assert!(submitter.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_idle_with_inactive_record_is_noop() {
        let (mut controller, submitter, _temp) = test_controller(MockSubmitter::new());

        let mut state = LoopState::new("s-1", "Fix bugs", 0, "DONE");
        state.active = false;
        seed_state(&controller, &state);

        let outcome = controller.on_idle().await.expect("on_idle");
        assert_eq!(outcome, IdleOutcome::NoActiveLoop);
        assert!(submitter.submissions().is_empty());
        // No side effect: the record is left as-is.
        assert!(controller.store.exists());
    }

    #[tokio::test]
    async fn test_scenario_a_continue_increments_and_resubmits() {
        let (mut controller, submitter, _temp) = test_controller(MockSubmitter::new());

        controller.handle_event(&AgentEvent::SessionStarted {
            session_id: "s-1".to_string(),
        });
        seed_state(&controller, &LoopState::new("s-1", "Fix bugs", 0, "DONE"));

        let outcome = controller.on_idle().await.expect("on_idle");
        assert_eq!(
            outcome,
            IdleOutcome::Continued {
                iteration: 1,
                max_iterations: 0
            }
        );

        let state = controller.store.load().expect("load").unwrap();
        assert!(state.active);
        assert_eq!(state.iteration, 1);

        let submissions = submitter.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].0, "s-1");
        assert!(submissions[0].1.contains("Fix bugs"));
        assert!(submissions[0].1.contains("<promise>DONE</promise>"));
    }

    #[tokio::test]
    async fn test_scenario_b_cap_reached_destroys_state() {
        let (mut controller, submitter, _temp) = test_controller(MockSubmitter::new());

        let mut state = LoopState::new("s-1", "Fix bugs", 5, "DONE");
        state.iteration = 5;
        seed_state(&controller, &state);

        let outcome = controller.on_idle().await.expect("on_idle");
        assert_eq!(outcome, IdleOutcome::CapReached { iterations: 5 });
        assert!(!controller.store.exists());
        assert!(submitter.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_cap_never_fires_before_boundary() {
        let (mut controller, _submitter, _temp) = test_controller(MockSubmitter::new());

        let mut state = LoopState::new("s-1", "Fix bugs", 5, "DONE");
        state.iteration = 4;
        seed_state(&controller, &state);

        let outcome = controller.on_idle().await.expect("on_idle");
        assert_eq!(
            outcome,
            IdleOutcome::Continued {
                iteration: 5,
                max_iterations: 5
            }
        );
    }

    #[tokio::test]
    async fn test_scenario_c_completion_destroys_state() {
        let (mut controller, submitter, _temp) = test_controller(MockSubmitter::new());

        controller.handle_event(&AgentEvent::AssistantOutput {
            text: "All done <promise>DONE</promise>".to_string(),
        });

        let mut state = LoopState::new("s-1", "Fix bugs", 0, "DONE");
        state.iteration = 3;
        seed_state(&controller, &state);

        let outcome = controller.on_idle().await.expect("on_idle");
        assert_eq!(
            outcome,
            IdleOutcome::Completed {
                iterations: 3,
                matched: "DONE".to_string()
            }
        );
        assert!(!controller.store.exists());
        assert!(submitter.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_completion_check_precedes_resubmission_but_follows_cap() {
        // Cap and completion both apply: cap wins, per the cycle ordering.
        let (mut controller, submitter, _temp) = test_controller(MockSubmitter::new());

        controller.handle_event(&AgentEvent::AssistantOutput {
            text: "<promise>DONE</promise>".to_string(),
        });

        let mut state = LoopState::new("s-1", "Fix bugs", 2, "DONE");
        state.iteration = 2;
        seed_state(&controller, &state);

        let outcome = controller.on_idle().await.expect("on_idle");
        assert_eq!(outcome, IdleOutcome::CapReached { iterations: 2 });
        assert!(submitter.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_case_promise_does_not_complete() {
        let (mut controller, submitter, _temp) = test_controller(MockSubmitter::new());

        controller.handle_event(&AgentEvent::AssistantOutput {
            text: "<promise> done </promise>".to_string(),
        });
        seed_state(&controller, &LoopState::new("s-1", "Fix bugs", 0, "DONE"));

        let outcome = controller.on_idle().await.expect("on_idle");
        assert!(matches!(outcome, IdleOutcome::Continued { iteration: 1, .. }));
        assert_eq!(submitter.submissions().len(), 1);
    }

    #[tokio::test]
    async fn test_submission_failure_aborts_loop() {
        let (mut controller, submitter, _temp) =
            test_controller(MockSubmitter::new().with_failure("session gone"));

        seed_state(&controller, &LoopState::new("s-1", "Fix bugs", 0, "DONE"));

        let err = controller.on_idle().await.expect_err("should fail");
        assert!(err.is_submission());
        // Fail closed: the state is destroyed, not retried on the next idle.
        assert!(!controller.store.exists());

        let outcome = controller.on_idle().await.expect("second idle");
        assert_eq!(outcome, IdleOutcome::NoActiveLoop);
        assert_eq!(submitter.submissions().len(), 0);
    }

    #[tokio::test]
    async fn test_retry_policy_retries_then_succeeds() {
        let submitter = MockSubmitter::new().with_failures_before_success(1);
        let temp_dir = TempDir::new().expect("temp dir");
        let submitter = Arc::new(submitter);
        let mut controller = LoopController::new(temp_dir.path(), submitter.clone()).with_retry(
            RetryPolicy {
                max_attempts: 2,
                backoff: Duration::from_millis(1),
            },
        );

        controller
            .store
            .save(&LoopState::new("s-1", "Fix bugs", 0, "DONE"))
            .expect("seed");

        let outcome = controller.on_idle().await.expect("on_idle");
        assert!(matches!(outcome, IdleOutcome::Continued { iteration: 1, .. }));
        assert_eq!(submitter.attempt_count(), 2);
    }

    #[tokio::test]
    async fn test_iterations_are_monotonic_across_idles() {
        let (mut controller, _submitter, _temp) = test_controller(MockSubmitter::new());

        seed_state(&controller, &LoopState::new("s-1", "Fix bugs", 0, "DONE"));

        for expected in 1..=3 {
            let outcome = controller.on_idle().await.expect("on_idle");
            assert_eq!(
                outcome,
                IdleOutcome::Continued {
                    iteration: expected,
                    max_iterations: 0
                }
            );
        }
    }

    #[test]
    fn test_resubmission_header_with_cap() {
        let mut state = LoopState::new("s-1", "Fix bugs", 10, "DONE");
        state.iteration = 3;

        let message = build_resubmission(&state);
        assert!(message.starts_with("Iteration 3 of 10."));
        assert!(message.contains("<promise>DONE</promise>"));
        assert!(message.contains("truthfully"));
        assert!(message.ends_with("Fix bugs"));
    }

    #[test]
    fn test_resubmission_header_unlimited() {
        let mut state = LoopState::new("s-1", "Fix bugs", 0, "SHIP_IT");
        state.iteration = 1;

        let message = build_resubmission(&state);
        assert!(message.starts_with("Iteration 1 (no iteration cap)."));
        assert!(message.contains("<promise>SHIP_IT</promise>"));
    }
}
