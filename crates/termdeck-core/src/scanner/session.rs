//! Per-session scanner state machine (Inactive / Active).

use std::sync::Arc;

use super::events::{EventSink, SemanticEvent};
use super::rules::{ScanRules, BORDER_GLYPHS};
use super::text::{tail_chars, truncate_front};

/// Observable scanner state for one session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScannerState {
    /// Trailing window of recent output
    pub buffer: String,
    /// Assistant detected as running
    pub active: bool,
    /// Last detected model identifier
    pub model: Option<String>,
    /// Last detected cost figure
    pub cost: Option<String>,
}

/// Heuristic scanner over one session's output.
///
/// Every check is a regex over an in-memory buffer; nothing here blocks.
pub struct SessionScanner {
    session_id: String,
    rules: Arc<ScanRules>,
    sink: Arc<dyn EventSink>,
    state: ScannerState,
}

impl SessionScanner {
    /// Create an inactive scanner publishing into `sink`
    pub fn new(session_id: impl Into<String>, rules: Arc<ScanRules>, sink: Arc<dyn EventSink>) -> Self {
        let capacity = rules.buffer_cap;
        Self {
            session_id: session_id.into(),
            rules,
            sink,
            state: ScannerState {
                buffer: String::with_capacity(capacity),
                ..ScannerState::default()
            },
        }
    }

    /// Session this scanner belongs to
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Current state
    pub fn state(&self) -> &ScannerState {
        &self.state
    }

    /// Whether the assistant is currently detected as running
    pub fn is_active(&self) -> bool {
        self.state.active
    }

    /// Feed one output chunk
    pub fn scan(&mut self, chunk: &str) {
        self.state.buffer.push_str(chunk);
        truncate_front(&mut self.state.buffer, self.rules.buffer_cap);

        if !self.state.active && self.rules.detects_banner(&self.state.buffer, chunk) {
            self.state.active = true;
            self.emit(SemanticEvent::SessionActiveChanged {
                session_id: self.session_id.clone(),
                active: true,
            });
            self.check_model();
        }

        if self.state.active {
            self.check_model();
            self.check_cost();
            self.check_exit(chunk);
        }
    }

    /// Back to Inactive with an empty buffer
    pub fn reset(&mut self) {
        self.state.buffer.clear();
        self.state.active = false;
        self.state.model = None;
        self.state.cost = None;
    }

    fn check_model(&mut self) {
        let Some(model) = self.rules.find_model(&self.state.buffer) else {
            return;
        };
        if self.state.model.as_deref() == Some(model) {
            return;
        }
        let model = model.to_string();
        self.state.model = Some(model.clone());
        self.emit(SemanticEvent::ModelChanged {
            session_id: self.session_id.clone(),
            model,
        });
    }

    /// String comparison only: `$1.50` and `$1.500` are different figures here
    fn check_cost(&mut self) {
        let Some(cost) = self.rules.find_latest_cost(&self.state.buffer) else {
            return;
        };
        if self.state.cost.as_deref() == Some(cost) {
            return;
        }
        let cost = cost.to_string();
        self.state.cost = Some(cost.clone());
        self.emit(SemanticEvent::CostChanged {
            session_id: self.session_id.clone(),
            cost,
        });
    }

    /// Shell prompt came back: prompt-like chunk, no borders in the recent
    /// tail and no product mention in the innermost tail.
    ///
    /// Can fire on prompt-like text printed by the assistant itself.
    fn check_exit(&mut self, chunk: &str) {
        if !self.rules.looks_like_prompt(chunk) {
            return;
        }

        let recent = tail_chars(&self.state.buffer, self.rules.exit_tail_chars);
        if recent.contains(BORDER_GLYPHS) {
            return;
        }
        if self
            .rules
            .product
            .is_match(tail_chars(recent, self.rules.exit_name_tail_chars))
        {
            return;
        }

        self.state.active = false;
        self.state.model = None;
        self.state.cost = None;
        self.emit(SemanticEvent::SessionActiveChanged {
            session_id: self.session_id.clone(),
            active: false,
        });
    }

    fn emit(&self, event: SemanticEvent) {
        tracing::debug!(session = %self.session_id, ?event, "scanner event");
        self.sink.emit(event);
    }
}
