//! `portable-pty` backed spawner

use anyhow::{Context, Result};
use portable_pty::{native_pty_system, Child, ChildKiller, CommandBuilder, MasterPty, PtySize};
use std::io::{Read, Write};
use std::thread;

use super::spawner::{PtyEventHandler, PtyProcess, PtySpawner, SpawnSpec};

const READ_CHUNK_SIZE: usize = 4096;

/// Spawns processes on the platform's native PTY implementation
#[derive(Debug, Default, Clone, Copy)]
pub struct NativePtySpawner;

impl PtySpawner for NativePtySpawner {
    fn spawn(
        &self,
        session_id: &str,
        spec: &SpawnSpec,
        handler: Box<dyn PtyEventHandler>,
    ) -> Result<Box<dyn PtyProcess>> {
        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(pty_size(spec.cols, spec.rows))
            .context("Failed to open PTY")?;

        let mut cmd = CommandBuilder::new(&spec.program);
        cmd.args(&spec.args);
        cmd.cwd(&spec.cwd);
        cmd.env_clear();
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .with_context(|| format!("Failed to spawn {}", spec.program))?;
        // Only the child keeps the slave side open, so EOF follows its exit
        drop(pair.slave);

        let pid = child.process_id();
        let mut killer = child.clone_killer();

        let reader = pair
            .master
            .try_clone_reader()
            .context("Failed to clone PTY reader")?;
        let writer = pair
            .master
            .take_writer()
            .context("Failed to take PTY writer")?;

        let spawned = thread::Builder::new()
            .name(format!("pty-{session_id}"))
            .spawn(move || read_loop(reader, child, handler));
        if let Err(e) = spawned {
            let _ = killer.kill();
            return Err(e).context("Failed to start PTY reader thread");
        }

        tracing::debug!("Spawned {} with PID {:?}", spec.program, pid);

        Ok(Box::new(NativePtyProcess {
            master: pair.master,
            writer,
            killer,
            pid,
        }))
    }
}

/// Live native PTY process
struct NativePtyProcess {
    master: Box<dyn MasterPty + Send>,
    writer: Box<dyn Write + Send>,
    killer: Box<dyn ChildKiller + Send + Sync>,
    pid: Option<u32>,
}

impl PtyProcess for NativePtyProcess {
    fn write(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.writer.write_all(data)?;
        self.writer.flush()
    }

    fn resize(&self, cols: u16, rows: u16) -> Result<()> {
        self.master
            .resize(pty_size(cols, rows))
            .map_err(|e| anyhow::anyhow!("PTY resize failed: {e}"))
    }

    fn kill(&mut self) -> std::io::Result<()> {
        self.killer.kill()
    }

    fn pid(&self) -> Option<u32> {
        self.pid
    }
}

/// Pump output to the handler until EOF, then report the exit code
fn read_loop(
    mut reader: Box<dyn Read + Send>,
    mut child: Box<dyn Child + Send + Sync>,
    handler: Box<dyn PtyEventHandler>,
) {
    let mut buf = [0u8; READ_CHUNK_SIZE];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break, // EOF
            Ok(n) => handler.on_data(&buf[..n]),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                // EIO after the child exits on Linux
                tracing::debug!("PTY read ended: {}", e);
                break;
            }
        }
    }

    let exit_code = match child.wait() {
        Ok(status) => status.exit_code() as i32,
        Err(e) => {
            tracing::debug!("Failed to wait for PTY child: {}", e);
            -1
        }
    };
    handler.on_exit(exit_code);
}

fn pty_size(cols: u16, rows: u16) -> PtySize {
    PtySize {
        rows,
        cols,
        pixel_width: 0,
        pixel_height: 0,
    }
}
