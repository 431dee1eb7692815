use std::path::PathBuf;

/// Everything needed to start one PTY process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnSpec {
    /// Program to run (usually a shell)
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
    /// Working directory
    pub cwd: PathBuf,
    /// Complete environment; nothing else is inherited
    pub env: Vec<(String, String)>,
    /// Terminal columns
    pub cols: u16,
    /// Terminal rows
    pub rows: u16,
}

/// Receives a process's output and exit notifications.
///
/// All calls for one process come from the same thread, data before exit.
pub trait PtyEventHandler: Send + Sync {
    /// A chunk of raw output
    fn on_data(&self, data: &[u8]);

    /// The process exited; no more data follows
    fn on_exit(&self, exit_code: i32);
}

/// Handle to a running PTY process
pub trait PtyProcess: Send {
    /// Write raw bytes to the process's input
    fn write(&mut self, data: &[u8]) -> std::io::Result<()>;

    /// Change the terminal geometry
    fn resize(&self, cols: u16, rows: u16) -> anyhow::Result<()>;

    /// Send a terminate signal; does not wait for the process to exit
    fn kill(&mut self) -> std::io::Result<()>;

    /// OS process id, if known
    fn pid(&self) -> Option<u32>;
}

/// Starts PTY processes
pub trait PtySpawner: Send + Sync {
    /// Spawn `spec` and route its events to `handler`
    fn spawn(
        &self,
        session_id: &str,
        spec: &SpawnSpec,
        handler: Box<dyn PtyEventHandler>,
    ) -> anyhow::Result<Box<dyn PtyProcess>>;
}
