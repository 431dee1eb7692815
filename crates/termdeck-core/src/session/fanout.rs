//! Per-session output fan-out.
//!
//! Display first, verbatim; scanner second, on a decoded copy. A scanner
//! failure is contained here and never reaches the display path.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;

use super::transport::DisplayTransport;
use crate::pty::{PtyEventHandler, PtyRegistry};
use crate::scanner::{SessionScanner, Utf8Decoder};

/// Scanner state for one session generation
pub(crate) struct ScannerSlot {
    pub(crate) generation: u64,
    pub(crate) scanner: SessionScanner,
    decoder: Utf8Decoder,
}

impl ScannerSlot {
    pub(crate) fn new(generation: u64, scanner: SessionScanner) -> Self {
        Self {
            generation,
            scanner,
            decoder: Utf8Decoder::new(),
        }
    }
}

/// Session id -> scanner state
pub(crate) type ScannerMap = Arc<Mutex<HashMap<String, ScannerSlot>>>;

/// Routes one process's events to the display and to its scanner
pub(crate) struct SessionRouter {
    pub(crate) session_id: String,
    pub(crate) generation: u64,
    pub(crate) transport: Arc<dyn DisplayTransport>,
    pub(crate) scanners: ScannerMap,
    pub(crate) registry: Arc<PtyRegistry>,
    pub(crate) surface_scanner_panics: bool,
}

impl SessionRouter {
    fn scan(&self, data: &[u8]) {
        let mut scanners = self.scanners.lock();
        // A replaced or killed session has no slot for this generation
        let Some(slot) = scanners
            .get_mut(&self.session_id)
            .filter(|slot| slot.generation == self.generation)
        else {
            return;
        };
        let text = slot.decoder.decode(data);
        if !text.is_empty() {
            slot.scanner.scan(&text);
        }
    }

    fn dispose(&self) {
        {
            let mut scanners = self.scanners.lock();
            if scanners
                .get(&self.session_id)
                .is_some_and(|slot| slot.generation == self.generation)
            {
                scanners.remove(&self.session_id);
            }
        }
        self.registry
            .remove_exited(&self.session_id, self.generation);
    }
}

impl PtyEventHandler for SessionRouter {
    fn on_data(&self, data: &[u8]) {
        self.transport.send_output(&self.session_id, data);
        contain_scanner_failure(&self.session_id, self.surface_scanner_panics, || {
            self.scan(data)
        });
    }

    fn on_exit(&self, exit_code: i32) {
        tracing::info!("Session {} exited with code {}", self.session_id, exit_code);
        self.transport.send_exit(&self.session_id, exit_code);
        self.dispose();
    }
}

/// Run `scan`, logging and swallowing a panic unless `surface` is set
pub(crate) fn contain_scanner_failure(session_id: &str, surface: bool, scan: impl FnOnce()) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(scan)) {
        tracing::warn!(
            "Scanner for session {} failed: {}",
            session_id,
            panic_message(payload.as_ref())
        );
        if surface {
            panic::resume_unwind(payload);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
