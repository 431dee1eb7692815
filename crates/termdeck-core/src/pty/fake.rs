//! In-memory spawner for registry and manager tests

use std::sync::Arc;

use parking_lot::Mutex;

use super::spawner::{PtyEventHandler, PtyProcess, PtySpawner, SpawnSpec};

/// Handler that ignores everything
pub(crate) struct NullHandler;

impl PtyEventHandler for NullHandler {
    fn on_data(&self, _data: &[u8]) {}
    fn on_exit(&self, _exit_code: i32) {}
}

#[derive(Default)]
struct ProcessLog {
    written: Vec<u8>,
    sizes: Vec<(u16, u16)>,
    kills: usize,
    fail_resize: bool,
}

/// Test-side view of one spawned fake process
#[derive(Clone)]
pub(crate) struct FakeHandle {
    pub(crate) spec: SpawnSpec,
    handler: Arc<Mutex<Option<Box<dyn PtyEventHandler>>>>,
    log: Arc<Mutex<ProcessLog>>,
}

impl FakeHandle {
    /// Deliver output as if the process printed it
    pub(crate) fn emit_data(&self, data: &[u8]) {
        if let Some(handler) = self.handler.lock().as_ref() {
            handler.on_data(data);
        }
    }

    /// Deliver the exit notification; later events are dropped
    pub(crate) fn emit_exit(&self, exit_code: i32) {
        if let Some(handler) = self.handler.lock().take() {
            handler.on_exit(exit_code);
        }
    }

    pub(crate) fn written(&self) -> Vec<u8> {
        self.log.lock().written.clone()
    }

    pub(crate) fn sizes(&self) -> Vec<(u16, u16)> {
        self.log.lock().sizes.clone()
    }

    pub(crate) fn is_killed(&self) -> bool {
        self.log.lock().kills > 0
    }

    pub(crate) fn kill_count(&self) -> usize {
        self.log.lock().kills
    }

    pub(crate) fn fail_resize(&self) {
        self.log.lock().fail_resize = true;
    }
}

struct FakeProcess {
    pid: u32,
    log: Arc<Mutex<ProcessLog>>,
}

impl PtyProcess for FakeProcess {
    fn write(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.log.lock().written.extend_from_slice(data);
        Ok(())
    }

    fn resize(&self, cols: u16, rows: u16) -> anyhow::Result<()> {
        let mut log = self.log.lock();
        if log.fail_resize {
            anyhow::bail!("process is exiting");
        }
        log.sizes.push((cols, rows));
        Ok(())
    }

    fn kill(&mut self) -> std::io::Result<()> {
        self.log.lock().kills += 1;
        Ok(())
    }

    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }
}

/// Spawner that records every spawn and never touches the OS
#[derive(Default)]
pub(crate) struct FakeSpawner {
    spawned: Mutex<Vec<FakeHandle>>,
    fail_next: Mutex<bool>,
}

impl FakeSpawner {
    pub(crate) fn spawned(&self) -> Vec<FakeHandle> {
        self.spawned.lock().clone()
    }

    pub(crate) fn last(&self) -> FakeHandle {
        self.spawned
            .lock()
            .last()
            .cloned()
            .expect("nothing spawned yet")
    }

    pub(crate) fn fail_next_spawn(&self) {
        *self.fail_next.lock() = true;
    }
}

impl PtySpawner for FakeSpawner {
    fn spawn(
        &self,
        _session_id: &str,
        spec: &SpawnSpec,
        handler: Box<dyn PtyEventHandler>,
    ) -> anyhow::Result<Box<dyn PtyProcess>> {
        if std::mem::take(&mut *self.fail_next.lock()) {
            anyhow::bail!("No such file or directory");
        }

        let log = Arc::new(Mutex::new(ProcessLog::default()));
        let mut spawned = self.spawned.lock();
        spawned.push(FakeHandle {
            spec: spec.clone(),
            handler: Arc::new(Mutex::new(Some(handler))),
            log: log.clone(),
        });
        Ok(Box::new(FakeProcess {
            pid: 1000 + spawned.len() as u32,
            log,
        }))
    }
}
