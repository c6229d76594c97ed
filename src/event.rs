//! Typed lifecycle events consumed from the host runtime.
//!
//! The host delivers loosely-shaped payloads; this module pins them down to
//! a closed set of tagged variants at the boundary. Anything that fails to
//! parse is rejected before it reaches the controller.

use serde::{Deserialize, Serialize};

/// A validated event from the host session runtime.
///
/// Wire encoding is internally tagged JSON, e.g.
/// `{"type":"assistant_output","text":"..."}`.
///
/// # Example
///
/// ```
/// use wiggum::event::AgentEvent;
///
/// let event: AgentEvent =
///     serde_json::from_str(r#"{"type":"session_started","session_id":"abc"}"#).unwrap();
/// assert!(matches!(event, AgentEvent::SessionStarted { .. }));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// A new session was created; carries the session identifier.
    SessionStarted { session_id: String },
    /// An existing session was updated; carries the session identifier.
    SessionUpdated { session_id: String },
    /// Incremental assistant output; last one wins.
    AssistantOutput { text: String },
    /// The session has no further pending work this turn.
    Idle,
}

impl AgentEvent {
    /// Parses one JSON-encoded event, rejecting unknown shapes.
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line.trim())
    }
}
