//! Outbound prompt-submission capability.
//!
//! The host runtime owns prompt delivery; this trait is the seam the
//! controller submits through. The real implementation shells out to the
//! `claude` CLI against a resumed session. Tests use
//! [`crate::testing::MockSubmitter`].

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::process::Command as AsyncCommand;
use tracing::debug;

/// Enqueues a new turn in an existing agent session.
#[async_trait]
pub trait PromptSubmitter: Send + Sync {
    /// Submit `message` as a new prompt to the session identified by
    /// `session_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the host rejects or fails the submission. There
    /// is no cancellation or timeout at this seam; a hang stalls the idle
    /// cycle until the host itself errors.
    async fn submit(&self, session_id: &str, message: &str) -> Result<()>;
}

/// Real submitter that resumes a Claude Code session via the CLI.
#[derive(Debug, Clone)]
pub struct ClaudeSubmitter {
    project_dir: PathBuf,
}

impl ClaudeSubmitter {
    /// Create a submitter operating in the given project directory.
    #[must_use]
    pub fn new(project_dir: PathBuf) -> Self {
        Self { project_dir }
    }
}

#[async_trait]
impl PromptSubmitter for ClaudeSubmitter {
    async fn submit(&self, session_id: &str, message: &str) -> Result<()> {
        debug!(session_id, "Submitting prompt to session");

        let mut child = AsyncCommand::new("claude")
            .args(["--resume", session_id, "-p"])
            .current_dir(&self.project_dir)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::inherit())
            .stderr(std::process::Stdio::inherit())
            .spawn()
            .context("Failed to spawn claude")?;

        if let Some(mut stdin) = child.stdin.take() {
            use tokio::io::AsyncWriteExt;
            stdin.write_all(message.as_bytes()).await?;
            stdin.flush().await?;
            drop(stdin);
        }

        let status = child.wait().await?;
        if status.success() {
            Ok(())
        } else {
            bail!("claude exited with code {}", status.code().unwrap_or(1))
        }
    }
}
