//! Side-channel scanner for PTY output.
//!
//! Detects assistant session start/stop, the active model and the running
//! cost from the raw terminal stream using cheap pattern heuristics. The
//! scanner only ever reads a copy of the stream; it never blocks or alters
//! what the display receives.

mod events;
mod rules;
mod session;
mod text;
mod utf8;

pub use events::{EventSink, SemanticEvent};
pub use rules::ScanRules;
pub use session::{ScannerState, SessionScanner};
pub use utf8::Utf8Decoder;

pub(crate) use text::tail_chars;
