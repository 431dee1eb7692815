//! Session id -> live PTY process map

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use super::spawner::{PtyEventHandler, PtyProcess, PtySpawner, SpawnSpec};

/// Error type for session creation
#[derive(Debug, Error)]
pub enum SessionError {
    /// Session ids are opaque but must not be empty
    #[error("session id must not be empty")]
    EmptyId,

    /// The scanner patterns could not be compiled
    #[error("invalid scanner pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// The PTY process could not be started
    #[error("failed to spawn {program} for session {session_id}: {source}")]
    Spawn {
        session_id: String,
        program: String,
        #[source]
        source: anyhow::Error,
    },
}

struct RegistryEntry {
    process: Box<dyn PtyProcess>,
    generation: u64,
}

/// Owns every live PTY process, keyed by session id.
///
/// All operations on unknown ids are silent no-ops: callers may
/// legitimately race with teardown.
pub struct PtyRegistry {
    spawner: Arc<dyn PtySpawner>,
    sessions: Mutex<HashMap<String, RegistryEntry>>,
}

impl PtyRegistry {
    /// Create an empty registry spawning through `spawner`
    pub fn new(spawner: Arc<dyn PtySpawner>) -> Self {
        Self {
            spawner,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Spawn a process under `id`, terminating any process already there.
    ///
    /// `generation` tags the entry so that a late exit from a replaced
    /// process can be told apart from the live one.
    pub fn create(
        &self,
        id: &str,
        generation: u64,
        spec: &SpawnSpec,
        handler: Box<dyn PtyEventHandler>,
    ) -> Result<(), SessionError> {
        let mut sessions = self.sessions.lock();
        if let Some(mut old) = sessions.remove(id) {
            tracing::debug!("Replacing live PTY for session {}", id);
            terminate(id, old.process.as_mut());
        }

        let process = self
            .spawner
            .spawn(id, spec, handler)
            .map_err(|source| SessionError::Spawn {
                session_id: id.to_string(),
                program: spec.program.clone(),
                source,
            })?;

        tracing::info!(
            "Session {} started: {} (pid {:?}, {}x{})",
            id,
            spec.program,
            process.pid(),
            spec.cols,
            spec.rows
        );
        sessions.insert(
            id.to_string(),
            RegistryEntry {
                process,
                generation,
            },
        );
        Ok(())
    }

    /// Forward input bytes; no-op if `id` has no live process
    pub fn write(&self, id: &str, data: &[u8]) {
        let mut sessions = self.sessions.lock();
        if let Some(entry) = sessions.get_mut(id) {
            if let Err(e) = entry.process.write(data) {
                tracing::debug!("Write to session {} failed: {}", id, e);
            }
        }
    }

    /// Forward a geometry change; failures (e.g. process exiting) are ignored
    pub fn resize(&self, id: &str, cols: u16, rows: u16) {
        let sessions = self.sessions.lock();
        if let Some(entry) = sessions.get(id) {
            if let Err(e) = entry.process.resize(cols.max(1), rows.max(1)) {
                tracing::debug!("Resize of session {} ignored: {}", id, e);
            }
        }
    }

    /// Terminate and remove; no-op if absent
    pub fn kill(&self, id: &str) {
        let removed = self.sessions.lock().remove(id);
        if let Some(mut entry) = removed {
            terminate(id, entry.process.as_mut());
        }
    }

    /// Terminate every live process. Safe to call repeatedly.
    pub fn kill_all(&self) {
        let drained: Vec<(String, RegistryEntry)> = self.sessions.lock().drain().collect();
        for (id, mut entry) in drained {
            terminate(&id, entry.process.as_mut());
        }
    }

    /// Drop the entry for a process that already exited, unless `id` has
    /// been reused by a newer generation since. Returns whether it was removed.
    pub fn remove_exited(&self, id: &str, generation: u64) -> bool {
        let mut sessions = self.sessions.lock();
        match sessions.get(id) {
            Some(entry) if entry.generation == generation => {
                sessions.remove(id);
                true
            }
            _ => false,
        }
    }

    /// Whether `id` has a live process
    pub fn contains(&self, id: &str) -> bool {
        self.sessions.lock().contains_key(id)
    }

    /// Generation of the live process under `id`
    pub fn generation(&self, id: &str) -> Option<u64> {
        self.sessions.lock().get(id).map(|e| e.generation)
    }

    /// OS pid of the live process under `id`
    pub fn pid(&self, id: &str) -> Option<u32> {
        self.sessions.lock().get(id).and_then(|e| e.process.pid())
    }

    /// Ids of all live sessions, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Whether no session is live
    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

fn terminate(id: &str, process: &mut dyn PtyProcess) {
    if let Err(e) = process.kill() {
        tracing::debug!("Kill of session {} failed: {}", id, e);
    } else {
        tracing::info!("Session {} killed", id);
    }
}
