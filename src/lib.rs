//! Wiggum - idle-triggered resubmission loop for agent sessions
//!
//! Drives an autonomous "keep retrying until done" loop: every time the
//! agent session goes idle, the original task prompt is resubmitted until
//! the agent emits the configured completion promise or the iteration cap
//! is exhausted.
//!
//! # Architecture
//!
//! - [`store`] - Durable single-record store for the persisted loop state
//! - [`detect`] - Completion-signal extraction and matching
//! - [`session`] - Tracking of the current session id and last assistant output
//! - [`event`] - Typed lifecycle events validated at the host boundary
//! - [`controller`] - The idle-triggered decision cycle
//! - [`control`] - Start / cancel / status operations
//! - [`submit`] - Outbound prompt-submission capability
//! - [`error`] - Custom error types
//! - [`testing`] - Test doubles
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wiggum::controller::LoopController;
//! use wiggum::control::StartOptions;
//! use wiggum::event::AgentEvent;
//! use wiggum::submit::ClaudeSubmitter;
//!
//! # async fn run() -> wiggum::Result<()> {
//! let submitter = Arc::new(ClaudeSubmitter::new(".".into()));
//! let mut controller = LoopController::new(".", submitter);
//!
//! controller.handle_event(&AgentEvent::SessionStarted {
//!     session_id: "abc".to_string(),
//! });
//! controller.start("Fix the failing tests", StartOptions::default())?;
//!
//! // Later, on each idle notification from the host:
//! let outcome = controller.on_idle().await?;
//! # Ok(())
//! # }
//! ```

pub mod control;
pub mod controller;
pub mod detect;
pub mod error;
pub mod event;
pub mod session;
pub mod state;
pub mod store;
pub mod submit;
pub mod testing;

// Re-export commonly used types
pub use control::{StartOptions, DEFAULT_PROMISE};
pub use controller::{IdleOutcome, LoopController, RetryPolicy};
pub use detect::{detect_completion, CompletionMatch};
pub use error::{LoopError, Result};
pub use event::AgentEvent;
pub use session::SessionTracker;
pub use state::LoopState;
pub use store::StateStore;
pub use submit::{ClaudeSubmitter, PromptSubmitter};
