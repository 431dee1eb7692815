//! Builder for constructing a [`SessionManager`] instance.
//!
//! ```ignore
//! let manager = SessionManagerBuilder::new(settings)
//!     .with_transport(transport)
//!     .with_spawner(spawner)
//!     .build()?;
//! ```

use std::sync::Arc;

use crate::config::Settings;
use crate::pty::{NativePtySpawner, PlatformShellResolver, PtySpawner, SessionError, ShellResolver};
use crate::scanner::ScanRules;

use super::manager::SessionManager;
use super::transport::{DisplayTransport, NullTransport};

/// Default broadcast channel capacity for semantic events
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Builder for a [`SessionManager`]
pub struct SessionManagerBuilder {
    settings: Settings,
    spawner: Option<Arc<dyn PtySpawner>>,
    transport: Option<Arc<dyn DisplayTransport>>,
    shell_resolver: Option<Arc<dyn ShellResolver>>,
    event_capacity: usize,
    surface_scanner_panics: bool,
}

impl SessionManagerBuilder {
    /// Create a new builder with the given settings
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            spawner: None,
            transport: None,
            shell_resolver: None,
            event_capacity: EVENT_CHANNEL_CAPACITY,
            surface_scanner_panics: cfg!(test),
        }
    }

    /// Spawn through `spawner` instead of the native PTY system
    pub fn with_spawner(mut self, spawner: Arc<dyn PtySpawner>) -> Self {
        self.spawner = Some(spawner);
        self
    }

    /// Deliver raw output to `transport`
    pub fn with_transport(mut self, transport: Arc<dyn DisplayTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Choose default shells with `resolver`
    pub fn with_shell_resolver(mut self, resolver: Arc<dyn ShellResolver>) -> Self {
        self.shell_resolver = Some(resolver);
        self
    }

    /// Capacity of the semantic event broadcast channel
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// Re-raise scanner panics instead of swallowing them (test harnesses)
    pub fn surface_scanner_panics(mut self, surface: bool) -> Self {
        self.surface_scanner_panics = surface;
        self
    }

    /// Build the `SessionManager`
    ///
    /// Unset collaborators default to the native PTY spawner, a transport
    /// that discards output, and the platform shell resolver.
    pub fn build(self) -> Result<SessionManager, SessionError> {
        let rules = Arc::new(ScanRules::new(&self.settings.scanner)?);
        let spawner = self
            .spawner
            .unwrap_or_else(|| Arc::new(NativePtySpawner));
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(NullTransport));
        let shell_resolver = self
            .shell_resolver
            .unwrap_or_else(|| Arc::new(PlatformShellResolver::default()));

        Ok(SessionManager::new(
            self.settings.session,
            rules,
            spawner,
            transport,
            shell_resolver,
            self.event_capacity,
            self.surface_scanner_panics,
        ))
    }
}
