//! Test doubles for external dependencies.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::submit::PromptSubmitter;

/// Recording mock for the prompt-submission capability.
///
/// # Example
///
/// ```rust,ignore
/// let submitter = MockSubmitter::new().with_failure("session gone");
/// assert!(submitter.submit("s-1", "msg").await.is_err());
/// ```
#[derive(Debug, Default)]
pub struct MockSubmitter {
    submissions: Mutex<Vec<(String, String)>>,
    attempts: AtomicU32,
    failures_before_success: AtomicU32,
    failure: Option<String>,
}

impl MockSubmitter {
    /// Create a mock that accepts every submission.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure every submission to fail with the given message.
    #[must_use]
    pub fn with_failure(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    /// Configure the first `count` submissions to fail, then succeed.
    #[must_use]
    pub fn with_failures_before_success(self, count: u32) -> Self {
        self.failures_before_success.store(count, Ordering::SeqCst);
        self
    }

    /// Successful submissions as `(session_id, message)` pairs.
    #[must_use]
    pub fn submissions(&self) -> Vec<(String, String)> {
        self.submissions
            .lock()
            .expect("submissions lock")
            .clone()
    }

    /// Total submission attempts, including failed ones.
    #[must_use]
    pub fn attempt_count(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PromptSubmitter for MockSubmitter {
    async fn submit(&self, session_id: &str, message: &str) -> Result<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(ref message) = self.failure {
            bail!("{message}");
        }
        if attempt <= self.failures_before_success.load(Ordering::SeqCst) {
            bail!("transient submission failure (attempt {attempt})");
        }

        self.submissions
            .lock()
            .expect("submissions lock")
            .push((session_id.to_string(), message.to_string()));
        Ok(())
    }
}
