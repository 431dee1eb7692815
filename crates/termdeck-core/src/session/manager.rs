use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::broadcast;

use super::fanout::{ScannerMap, ScannerSlot, SessionRouter};
use super::transport::DisplayTransport;
use crate::config::SessionSettings;
use crate::files::{DirWatchers, FsChange, WatchError};
use crate::pty::env::{build_env, inherited_env};
use crate::pty::{PtyRegistry, PtySpawner, SessionError, ShellResolver, SpawnSpec};
use crate::scanner::{EventSink, ScanRules, ScannerState, SemanticEvent, SessionScanner};

/// Caller-supplied options for a new session; unset fields use defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// Shell program (default: settings, then platform default)
    pub shell: Option<String>,
    /// Working directory (default: home directory)
    pub cwd: Option<PathBuf>,
    /// Arguments passed to the shell
    pub args: Vec<String>,
    /// Terminal columns
    pub cols: Option<u16>,
    /// Terminal rows
    pub rows: Option<u16>,
    /// Variables added on top of the inherited environment
    pub env: Vec<(String, String)>,
}

/// Owns the PTY registry and the per-session scanner map.
///
/// Constructed via [`SessionManagerBuilder`](super::SessionManagerBuilder).
/// Both maps are mutex-protected: output arrives on PTY reader threads while
/// create/kill come from the caller.
pub struct SessionManager {
    settings: SessionSettings,
    rules: Arc<ScanRules>,
    registry: Arc<PtyRegistry>,
    scanners: ScannerMap,
    transport: Arc<dyn DisplayTransport>,
    event_tx: broadcast::Sender<SemanticEvent>,
    sink: Arc<dyn EventSink>,
    shell_resolver: Arc<dyn ShellResolver>,
    next_generation: AtomicU64,
    /// Serializes create/kill so the registry and scanner map change together
    lifecycle: Mutex<()>,
    watchers: DirWatchers,
    shut_down: AtomicBool,
    surface_scanner_panics: bool,
}

impl SessionManager {
    pub(crate) fn new(
        settings: SessionSettings,
        rules: Arc<ScanRules>,
        spawner: Arc<dyn PtySpawner>,
        transport: Arc<dyn DisplayTransport>,
        shell_resolver: Arc<dyn ShellResolver>,
        event_capacity: usize,
        surface_scanner_panics: bool,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(event_capacity);
        Self {
            settings,
            rules,
            registry: Arc::new(PtyRegistry::new(spawner)),
            scanners: Arc::new(Mutex::new(HashMap::new())),
            transport,
            sink: Arc::new(event_tx.clone()),
            event_tx,
            shell_resolver,
            next_generation: AtomicU64::new(0),
            lifecycle: Mutex::new(()),
            watchers: DirWatchers::new(event_capacity),
            shut_down: AtomicBool::new(false),
            surface_scanner_panics,
        }
    }

    /// Subscribe to semantic events from every session.
    ///
    /// A receiver that falls behind loses the oldest events (lagged).
    pub fn subscribe(&self) -> broadcast::Receiver<SemanticEvent> {
        self.event_tx.subscribe()
    }

    /// Session defaults in effect
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Start a session under `id`.
    ///
    /// A live session with the same id is killed first, scanner included,
    /// so the new session always starts with a fresh, inactive scanner.
    pub fn create(&self, id: &str, options: SessionOptions) -> Result<(), SessionError> {
        if id.is_empty() {
            return Err(SessionError::EmptyId);
        }

        let spec = self.spawn_spec(options);

        let _lifecycle = self.lifecycle.lock();
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        self.discard(id);

        let scanner = SessionScanner::new(id, self.rules.clone(), self.sink.clone());
        self.scanners
            .lock()
            .insert(id.to_string(), ScannerSlot::new(generation, scanner));

        let router = SessionRouter {
            session_id: id.to_string(),
            generation,
            transport: self.transport.clone(),
            scanners: self.scanners.clone(),
            registry: self.registry.clone(),
            surface_scanner_panics: self.surface_scanner_panics,
        };

        if let Err(e) = self.registry.create(id, generation, &spec, Box::new(router)) {
            let mut scanners = self.scanners.lock();
            if scanners.get(id).is_some_and(|s| s.generation == generation) {
                scanners.remove(id);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Forward input; no-op for unknown ids
    pub fn write(&self, id: &str, data: &[u8]) {
        self.registry.write(id, data);
    }

    /// Forward a geometry change; best-effort
    pub fn resize(&self, id: &str, cols: u16, rows: u16) {
        self.registry.resize(id, cols, rows);
    }

    /// Terminate a session and drop its scanner; no-op if absent
    pub fn kill(&self, id: &str) {
        let _lifecycle = self.lifecycle.lock();
        self.discard(id);
    }

    /// Terminate every session
    pub fn kill_all(&self) {
        let _lifecycle = self.lifecycle.lock();
        self.scanners.lock().clear();
        self.registry.kill_all();
    }

    /// Caller holds `lifecycle`
    fn discard(&self, id: &str) {
        self.scanners.lock().remove(id);
        self.registry.kill(id);
    }

    /// Watch `dir` recursively under `id`, replacing any watcher for `id`
    pub fn watch_dir(&self, id: &str, dir: &Path) -> Result<(), WatchError> {
        self.watchers.watch(id, dir)
    }

    /// Close the watcher for `id`; no-op if absent
    pub fn unwatch_dir(&self, id: &str) {
        self.watchers.unwatch(id);
    }

    /// Subscribe to changes under every watched directory
    pub fn subscribe_fs(&self) -> broadcast::Receiver<FsChange> {
        self.watchers.subscribe()
    }

    /// Number of open directory watchers
    pub fn watcher_count(&self) -> usize {
        self.watchers.len()
    }

    /// Tear down everything at application exit. Safe to call repeatedly.
    pub fn shutdown(&self) {
        if !self.shut_down.swap(true, Ordering::SeqCst) {
            tracing::info!(
                "Shutting down {} session(s) and {} watcher(s)",
                self.registry.len(),
                self.watchers.len()
            );
        }
        self.kill_all();
        self.watchers.close_all();
    }

    /// Return a session's scanner to Inactive with an empty buffer
    pub fn reset_scanner(&self, id: &str) {
        if let Some(slot) = self.scanners.lock().get_mut(id) {
            slot.scanner.reset();
        }
    }

    /// Snapshot of a session's scanner state
    pub fn scanner_state(&self, id: &str) -> Option<ScannerState> {
        self.scanners
            .lock()
            .get(id)
            .map(|slot| slot.scanner.state().clone())
    }

    /// Whether `id` has a live process
    pub fn is_live(&self, id: &str) -> bool {
        self.registry.contains(id)
    }

    /// Ids of all live sessions, sorted
    pub fn sessions(&self) -> Vec<String> {
        self.registry.ids()
    }

    /// Number of live sessions
    pub fn session_count(&self) -> usize {
        self.registry.len()
    }

    /// OS pid of a session's process
    pub fn pid(&self, id: &str) -> Option<u32> {
        self.registry.pid(id)
    }

    fn spawn_spec(&self, options: SessionOptions) -> SpawnSpec {
        let program = options
            .shell
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.settings.default_shell.clone())
            .unwrap_or_else(|| self.shell_resolver.default_shell());
        let cwd = options
            .cwd
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        let env = build_env(
            inherited_env(),
            &options.env,
            &self.settings.term,
            &self.settings.strip_env,
        );

        SpawnSpec {
            program,
            args: options.args,
            cwd,
            env,
            cols: options.cols.unwrap_or(self.settings.cols).max(1),
            rows: options.rows.unwrap_or(self.settings.rows).max(1),
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.registry.kill_all();
        self.watchers.close_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::pty::fake::{FakeHandle, FakeSpawner};
    use crate::session::builder::SessionManagerBuilder;
    use crate::session::transport::DisplayEvent;
    use bytes::Bytes;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct RecordingTransport {
        events: Mutex<Vec<DisplayEvent>>,
    }

    impl RecordingTransport {
        fn events(&self) -> Vec<DisplayEvent> {
            self.events.lock().clone()
        }
    }

    impl DisplayTransport for RecordingTransport {
        fn send_output(&self, session_id: &str, data: &[u8]) {
            self.events.lock().push(DisplayEvent::Output {
                session_id: session_id.to_string(),
                data: Bytes::copy_from_slice(data),
            });
        }

        fn send_exit(&self, session_id: &str, exit_code: i32) {
            self.events.lock().push(DisplayEvent::Exit {
                session_id: session_id.to_string(),
                exit_code,
            });
        }
    }

    struct FixedShell;

    impl ShellResolver for FixedShell {
        fn default_shell(&self) -> String {
            "/usr/bin/fake-sh".to_string()
        }
    }

    struct Harness {
        manager: SessionManager,
        spawner: Arc<FakeSpawner>,
        transport: Arc<RecordingTransport>,
    }

    fn harness_with(settings: Settings) -> Harness {
        let spawner = Arc::new(FakeSpawner::default());
        let transport = Arc::new(RecordingTransport::default());
        let manager = SessionManagerBuilder::new(settings)
            .with_spawner(spawner.clone())
            .with_transport(transport.clone())
            .with_shell_resolver(Arc::new(FixedShell))
            .build()
            .unwrap();
        Harness {
            manager,
            spawner,
            transport,
        }
    }

    fn harness() -> Harness {
        harness_with(Settings::default())
    }

    fn drain(rx: &mut broadcast::Receiver<SemanticEvent>) -> Vec<SemanticEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn output(id: &str, data: &[u8]) -> DisplayEvent {
        DisplayEvent::Output {
            session_id: id.to_string(),
            data: Bytes::copy_from_slice(data),
        }
    }

    #[test]
    fn test_create_twice_leaves_one_live_process() {
        let h = harness();
        h.manager.create("a", SessionOptions::default()).unwrap();
        h.manager.create("a", SessionOptions::default()).unwrap();

        assert_eq!(h.manager.session_count(), 1);
        let spawned = h.spawner.spawned();
        assert_eq!(spawned.len(), 2);
        assert!(spawned[0].is_killed());
        assert!(!spawned[1].is_killed());
        assert_eq!(h.manager.pid("a"), Some(1002));
    }

    #[test]
    fn test_kill_then_recreate_has_fresh_scanner() {
        let h = harness();
        h.manager.create("a", SessionOptions::default()).unwrap();
        h.spawner
            .last()
            .emit_data("Claude Code v2\nclaude-opus-4-6 $0.10\n".as_bytes());
        assert!(h.manager.scanner_state("a").unwrap().active);

        h.manager.kill("a");
        assert!(h.manager.scanner_state("a").is_none());
        assert!(!h.manager.is_live("a"));

        h.manager.create("a", SessionOptions::default()).unwrap();
        assert_eq!(h.manager.sessions(), vec!["a"]);
        assert_eq!(h.manager.scanner_state("a"), Some(ScannerState::default()));
    }

    #[test]
    fn test_display_and_scanner_see_same_order() {
        let h = harness();
        h.manager.create("a", SessionOptions::default()).unwrap();
        let process = h.spawner.last();

        for chunk in ["c1 ", "c2 ", "c3"] {
            process.emit_data(chunk.as_bytes());
        }

        assert_eq!(
            h.transport.events(),
            vec![output("a", b"c1 "), output("a", b"c2 "), output("a", b"c3")]
        );
        assert_eq!(h.manager.scanner_state("a").unwrap().buffer, "c1 c2 c3");
    }

    #[test]
    fn test_semantic_events_are_broadcast() {
        let h = harness();
        let mut rx = h.manager.subscribe();
        h.manager.create("tab", SessionOptions::default()).unwrap();
        let process = h.spawner.last();

        process.emit_data("╭──────╮\n│ Claude Code v2 │\n╰──────╯\n".as_bytes());
        process.emit_data(b"Using model: claude-sonnet-4-6\n");
        process.emit_data(b"Total cost: $0.12\n");

        assert_eq!(
            drain(&mut rx),
            vec![
                SemanticEvent::SessionActiveChanged {
                    session_id: "tab".to_string(),
                    active: true,
                },
                SemanticEvent::ModelChanged {
                    session_id: "tab".to_string(),
                    model: "claude-sonnet-4-6".to_string(),
                },
                SemanticEvent::CostChanged {
                    session_id: "tab".to_string(),
                    cost: "$0.12".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_split_utf8_reaches_scanner_whole() {
        let h = harness();
        let mut rx = h.manager.subscribe();
        h.manager.create("a", SessionOptions::default()).unwrap();
        let process = h.spawner.last();

        process.emit_data(b"starting claude\n");
        let corner = "╭──╮\n".as_bytes();
        process.emit_data(&corner[..1]);
        process.emit_data(&corner[1..]);

        assert_eq!(
            drain(&mut rx),
            vec![SemanticEvent::SessionActiveChanged {
                session_id: "a".to_string(),
                active: true,
            }]
        );
        // The display still received the raw split bytes
        assert_eq!(h.transport.events()[1], output("a", &corner[..1]));
    }

    #[test]
    fn test_exit_notifies_display_and_disposes_session() {
        let h = harness();
        h.manager.create("a", SessionOptions::default()).unwrap();
        let process = h.spawner.last();

        process.emit_data(b"bye\n");
        process.emit_exit(0);

        assert_eq!(
            h.transport.events(),
            vec![
                output("a", b"bye\n"),
                DisplayEvent::Exit {
                    session_id: "a".to_string(),
                    exit_code: 0,
                },
            ]
        );
        assert!(!h.manager.is_live("a"));
        assert!(h.manager.scanner_state("a").is_none());
    }

    #[test]
    fn test_late_exit_of_replaced_process_keeps_new_session() {
        let h = harness();
        h.manager.create("a", SessionOptions::default()).unwrap();
        let old: FakeHandle = h.spawner.last();
        h.manager.create("a", SessionOptions::default()).unwrap();

        old.emit_data(b"stale output");
        old.emit_exit(137);

        assert!(h.manager.is_live("a"));
        // Stale output is still shown but never scanned
        assert_eq!(h.manager.scanner_state("a"), Some(ScannerState::default()));
        assert!(h.transport.events().contains(&DisplayEvent::Exit {
            session_id: "a".to_string(),
            exit_code: 137,
        }));
    }

    #[test]
    fn test_output_after_kill_is_not_scanned() {
        let h = harness();
        h.manager.create("a", SessionOptions::default()).unwrap();
        let process = h.spawner.last();
        h.manager.kill("a");

        process.emit_data(b"Claude Code 2.0\n");
        process.emit_exit(0);

        assert!(h.manager.scanner_state("a").is_none());
        assert_eq!(h.manager.session_count(), 0);
    }

    #[test]
    fn test_write_resize_and_unknown_ids() {
        let h = harness();
        h.manager.create("a", SessionOptions::default()).unwrap();

        h.manager.write("a", b"claude\r");
        h.manager.resize("a", 100, 40);
        h.manager.write("nope", b"x");
        h.manager.resize("nope", 1, 1);
        h.manager.kill("nope");

        let process = h.spawner.last();
        assert_eq!(process.written(), b"claude\r");
        assert_eq!(process.sizes(), vec![(100, 40)]);
    }

    #[test]
    fn test_spawn_spec_defaults() {
        let h = harness();
        temp_env::with_vars(
            [("CLAUDECODE", Some("1")), ("TERM", Some("screen"))],
            || {
                h.manager.create("a", SessionOptions::default()).unwrap();
            },
        );

        let spec = h.spawner.last().spec;
        assert_eq!(spec.program, "/usr/bin/fake-sh");
        assert_eq!((spec.cols, spec.rows), (120, 30));
        assert!(spec.args.is_empty());
        assert!(spec
            .env
            .contains(&("TERM".to_string(), "xterm-256color".to_string())));
        assert!(!spec.env.iter().any(|(k, _)| k == "CLAUDECODE"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(spec.cwd, home);
        }
    }

    #[test]
    fn test_spawn_spec_honours_options_and_settings() {
        let mut settings = Settings::default();
        settings.session.default_shell = Some("/bin/zsh".to_string());
        let h = harness_with(settings);

        h.manager.create("a", SessionOptions::default()).unwrap();
        assert_eq!(h.spawner.last().spec.program, "/bin/zsh");

        let options = SessionOptions {
            shell: Some("/bin/sh".to_string()),
            cwd: Some(PathBuf::from("/tmp")),
            args: vec!["-l".to_string()],
            cols: Some(0),
            rows: Some(50),
            env: vec![("EDITOR".to_string(), "vim".to_string())],
        };
        h.manager.create("b", options).unwrap();
        let spec = h.spawner.last().spec;
        assert_eq!(spec.program, "/bin/sh");
        assert_eq!(spec.cwd, PathBuf::from("/tmp"));
        assert_eq!(spec.args, vec!["-l"]);
        assert_eq!((spec.cols, spec.rows), (1, 50));
        assert!(spec
            .env
            .contains(&("EDITOR".to_string(), "vim".to_string())));
    }

    #[test]
    fn test_empty_id_rejected() {
        let h = harness();
        let err = h.manager.create("", SessionOptions::default()).unwrap_err();
        assert!(matches!(err, SessionError::EmptyId));
        assert!(h.spawner.spawned().is_empty());
    }

    #[test]
    fn test_spawn_failure_leaves_no_scanner() {
        let h = harness();
        h.spawner.fail_next_spawn();

        assert!(h.manager.create("a", SessionOptions::default()).is_err());
        assert!(h.manager.scanner_state("a").is_none());
        assert!(!h.manager.is_live("a"));
    }

    #[test]
    fn test_reset_scanner() {
        let h = harness();
        h.manager.create("a", SessionOptions::default()).unwrap();
        h.spawner.last().emit_data(b"Claude Code\n");
        assert!(h.manager.scanner_state("a").unwrap().active);

        h.manager.reset_scanner("a");
        assert_eq!(h.manager.scanner_state("a"), Some(ScannerState::default()));
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let h = harness();
        h.manager.create("a", SessionOptions::default()).unwrap();
        h.manager.create("b", SessionOptions::default()).unwrap();

        h.manager.shutdown();
        h.manager.shutdown();

        assert_eq!(h.manager.session_count(), 0);
        assert!(h.manager.scanner_state("a").is_none());
        assert!(h.spawner.spawned().iter().all(|p| p.kill_count() == 1));
    }

    #[test]
    fn test_shutdown_on_empty_manager() {
        let h = harness();
        h.manager.shutdown();
        assert_eq!(h.manager.session_count(), 0);
    }

    #[test]
    fn test_concurrent_create_keeps_registry_and_scanner_in_step() {
        use std::sync::Barrier;

        for _ in 0..200 {
            let h = Arc::new(harness());
            let barrier = Arc::new(Barrier::new(2));
            let threads: Vec<_> = (0..2)
                .map(|_| {
                    let h = h.clone();
                    let barrier = barrier.clone();
                    std::thread::spawn(move || {
                        barrier.wait();
                        h.manager.create("a", SessionOptions::default()).unwrap();
                    })
                })
                .collect();
            for t in threads {
                t.join().unwrap();
            }

            let registered = h.manager.registry.generation("a");
            let scanned = h.manager.scanners.lock().get("a").map(|s| s.generation);
            assert!(registered.is_some());
            assert_eq!(registered, scanned);
            assert_eq!(h.manager.session_count(), 1);
        }
    }

    struct PanickingSink;

    impl EventSink for PanickingSink {
        fn emit(&self, _event: SemanticEvent) {
            panic!("sink failure");
        }
    }

    #[test]
    fn test_sink_panic_does_not_break_display_or_scanning() {
        let spawner = Arc::new(FakeSpawner::default());
        let transport = Arc::new(RecordingTransport::default());
        let mut manager = SessionManagerBuilder::new(Settings::default())
            .with_spawner(spawner.clone())
            .with_transport(transport.clone())
            .with_shell_resolver(Arc::new(FixedShell))
            .surface_scanner_panics(false)
            .build()
            .unwrap();
        manager.sink = Arc::new(PanickingSink);

        manager.create("a", SessionOptions::default()).unwrap();
        let process = spawner.last();
        process.emit_data(b"Claude Code v2\n");
        process.emit_data(b"claude-opus-4-6 thinking\n");

        assert_eq!(
            transport.events(),
            vec![
                output("a", b"Claude Code v2\n"),
                output("a", b"claude-opus-4-6 thinking\n"),
            ]
        );
        let state = manager.scanner_state("a").unwrap();
        assert!(state.active);
        assert_eq!(state.model.as_deref(), Some("claude-opus-4-6"));
        assert!(state.buffer.ends_with("thinking\n"));
    }

    #[test]
    fn test_shutdown_closes_directory_watchers() {
        let h = harness();
        let dir = tempfile::tempdir().unwrap();
        h.manager.watch_dir("tree", dir.path()).unwrap();
        h.manager.watch_dir("tree", dir.path()).unwrap();
        h.manager.watch_dir("docs", dir.path()).unwrap();
        assert_eq!(h.manager.watcher_count(), 2);

        h.manager.unwatch_dir("docs");
        assert_eq!(h.manager.watcher_count(), 1);

        h.manager.shutdown();
        assert_eq!(h.manager.watcher_count(), 0);
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: SessionOptions =
            serde_json::from_str(r#"{"shell": "/bin/sh", "cols": 90}"#).unwrap();
        assert_eq!(options.shell.as_deref(), Some("/bin/sh"));
        assert_eq!(options.cols, Some(90));
        assert!(options.args.is_empty());
        assert_eq!(options.rows, None);
    }
}
