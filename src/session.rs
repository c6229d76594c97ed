//! Session tracking across host lifecycle events.
//!
//! The tracker remembers the most recently observed session identifier and
//! the most recent assistant output text. It is owned by the controller and
//! mutated only through typed events; the idle cycle and `start` read it
//! without mutating.
//!
//! Known limitation: only the last captured text is inspected for the
//! completion tag. A tag split across multiple incremental updates is not
//! detected.

use crate::event::AgentEvent;

/// Most recent session identity and assistant output.
#[derive(Debug, Clone, Default)]
pub struct SessionTracker {
    current_session_id: Option<String>,
    last_assistant_text: String,
}

impl SessionTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one lifecycle event. Idle carries no payload and is a no-op here.
    pub fn apply(&mut self, event: &AgentEvent) {
        match event {
            AgentEvent::SessionStarted { session_id } | AgentEvent::SessionUpdated { session_id } => {
                self.current_session_id = Some(session_id.clone());
            }
            AgentEvent::AssistantOutput { text } => {
                self.last_assistant_text = text.clone();
            }
            AgentEvent::Idle => {}
        }
    }

    /// The most recently observed session id, if any session has been seen.
    #[must_use]
    pub fn current_session_id(&self) -> Option<&str> {
        self.current_session_id.as_deref()
    }

    /// The most recent assistant output text (empty before any output).
    #[must_use]
    pub fn last_assistant_text(&self) -> &str {
        &self.last_assistant_text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_starts_empty() {
        let tracker = SessionTracker::new();
        assert!(tracker.current_session_id().is_none());
        assert!(tracker.last_assistant_text().is_empty());
    }

    #[test]
    fn test_session_started_sets_id() {
        let mut tracker = SessionTracker::new();
        tracker.apply(&AgentEvent::SessionStarted {
            session_id: "s-1".to_string(),
        });
        assert_eq!(tracker.current_session_id(), Some("s-1"));
    }

    #[test]
    fn test_session_updated_replaces_id() {
        let mut tracker = SessionTracker::new();
        tracker.apply(&AgentEvent::SessionStarted {
            session_id: "s-1".to_string(),
        });
        tracker.apply(&AgentEvent::SessionUpdated {
            session_id: "s-2".to_string(),
        });
        assert_eq!(tracker.current_session_id(), Some("s-2"));
    }

    #[test]
    fn test_assistant_output_last_wins() {
        let mut tracker = SessionTracker::new();
        tracker.apply(&AgentEvent::AssistantOutput {
            text: "first".to_string(),
        });
        tracker.apply(&AgentEvent::AssistantOutput {
            text: "second".to_string(),
        });
        assert_eq!(tracker.last_assistant_text(), "second");
    }

    #[test]
    fn test_idle_leaves_tracker_untouched() {
        let mut tracker = SessionTracker::new();
        tracker.apply(&AgentEvent::SessionStarted {
            session_id: "s-1".to_string(),
        });
        tracker.apply(&AgentEvent::AssistantOutput {
            text: "output".to_string(),
        });
        tracker.apply(&AgentEvent::Idle);
        assert_eq!(tracker.current_session_id(), Some("s-1"));
        assert_eq!(tracker.last_assistant_text(), "output");
    }
}
