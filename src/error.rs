//! Custom error types for the loop controller.
//!
//! Errors follow the taxonomy of the control surface: configuration errors
//! and conflicts are reported to the caller with state left untouched,
//! submission failures abort the loop. Cancellation and cap exhaustion are
//! normal terminal outcomes, not errors.

use thiserror::Error;

/// Main error type for loop operations
#[derive(Error, Debug)]
pub enum LoopError {
    /// No session id could be resolved when starting a loop
    #[error("No active session found - start a loop from inside an agent session")]
    NoSession,

    /// A loop is already running for this workspace
    #[error("A loop is already active (iteration {iteration}) - cancel it first")]
    AlreadyActive { iteration: u32 },

    /// Outbound prompt submission failed
    #[error("Prompt submission failed: {message}")]
    Submission { message: String },

    /// IO error wrapper
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON error wrapper
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience result type for loop operations
pub type Result<T> = std::result::Result<T, LoopError>;

impl LoopError {
    /// Whether this error came from the outbound submission boundary.
    #[must_use]
    pub fn is_submission(&self) -> bool {
        matches!(self, LoopError::Submission { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_session_message() {
        let err = LoopError::NoSession;
        assert!(err.to_string().contains("No active session"));
    }

    #[test]
    fn test_already_active_reports_iteration() {
        let err = LoopError::AlreadyActive { iteration: 7 };
        assert!(err.to_string().contains("iteration 7"));
    }

    #[test]
    fn test_submission_is_submission() {
        let err = LoopError::Submission {
            message: "session gone".to_string(),
        };
        assert!(err.is_submission());
        assert!(!LoopError::NoSession.is_submission());
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: LoopError = io.into();
        assert!(matches!(err, LoopError::Io(_)));
    }
}
