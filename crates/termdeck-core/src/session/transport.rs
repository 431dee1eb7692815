use bytes::Bytes;
use tokio::sync::mpsc;

/// Raw stream delivered to the display side
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    /// Verbatim output chunk
    Output { session_id: String, data: Bytes },
    /// The session's process exited
    Exit { session_id: String, exit_code: i32 },
}

impl DisplayEvent {
    /// Session this event belongs to
    pub fn session_id(&self) -> &str {
        match self {
            Self::Output { session_id, .. } | Self::Exit { session_id, .. } => session_id,
        }
    }
}

/// Consumer of raw PTY output (terminal view, websocket, stdout, ...).
///
/// Called synchronously on the PTY read path; must not block.
pub trait DisplayTransport: Send + Sync {
    /// Deliver one output chunk, unmodified
    fn send_output(&self, session_id: &str, data: &[u8]);

    /// Deliver the exit notification
    fn send_exit(&self, session_id: &str, exit_code: i32);
}

/// Transport that forwards into an unbounded channel
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<DisplayEvent>,
}

impl ChannelTransport {
    /// Create a transport and the receiver the display side reads from
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DisplayEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl DisplayTransport for ChannelTransport {
    fn send_output(&self, session_id: &str, data: &[u8]) {
        // Receiver gone means the display was torn down first
        let _ = self.tx.send(DisplayEvent::Output {
            session_id: session_id.to_string(),
            data: Bytes::copy_from_slice(data),
        });
    }

    fn send_exit(&self, session_id: &str, exit_code: i32) {
        let _ = self.tx.send(DisplayEvent::Exit {
            session_id: session_id.to_string(),
            exit_code,
        });
    }
}

/// Transport that discards everything (headless use)
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTransport;

impl DisplayTransport for NullTransport {
    fn send_output(&self, _session_id: &str, _data: &[u8]) {}
    fn send_exit(&self, _session_id: &str, _exit_code: i32) {}
}
