use serde::Serialize;
use tokio::sync::broadcast;

/// Session-level events derived from PTY output.
///
/// Each variant is emitted at most once per actual change in value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SemanticEvent {
    /// The assistant was detected starting (`true`) or returning to the shell (`false`)
    SessionActiveChanged {
        /// Originating session
        session_id: String,
        /// New activity state
        active: bool,
    },

    /// A different model identifier appeared in the output
    ModelChanged {
        /// Originating session
        session_id: String,
        /// Model identifier as printed, e.g. `claude-sonnet-4-6`
        model: String,
    },

    /// A different cost figure appeared in the output
    CostChanged {
        /// Originating session
        session_id: String,
        /// Cost as printed, including the dollar sign, e.g. `$0.45`
        cost: String,
    },
}

impl SemanticEvent {
    /// Session this event belongs to
    pub fn session_id(&self) -> &str {
        match self {
            Self::SessionActiveChanged { session_id, .. }
            | Self::ModelChanged { session_id, .. }
            | Self::CostChanged { session_id, .. } => session_id,
        }
    }
}

/// Destination for semantic events.
///
/// Implementations must not block: the scanner runs on the PTY output path.
pub trait EventSink: Send + Sync {
    /// Publish one event
    fn emit(&self, event: SemanticEvent);
}

impl EventSink for broadcast::Sender<SemanticEvent> {
    fn emit(&self, event: SemanticEvent) {
        // No subscribers is fine
        let _ = self.send(event);
    }
}
