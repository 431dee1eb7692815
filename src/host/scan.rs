use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

use termdeck_core::scanner::{EventSink, ScanRules, Utf8Decoder};
use termdeck_core::{SemanticEvent, SessionScanner, Settings};

/// Session id used for replayed streams
const REPLAY_SESSION_ID: &str = "replay";

struct ChannelSink(mpsc::UnboundedSender<SemanticEvent>);

impl EventSink for ChannelSink {
    fn emit(&self, event: SemanticEvent) {
        let _ = self.0.send(event);
    }
}

/// Feed `data` to a fresh scanner in `chunk_size` pieces, as a PTY would
pub fn replay(rules: ScanRules, data: &[u8], chunk_size: usize) -> Vec<SemanticEvent> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut scanner = SessionScanner::new(REPLAY_SESSION_ID, Arc::new(rules), Arc::new(ChannelSink(tx)));
    let mut decoder = Utf8Decoder::new();

    for chunk in data.chunks(chunk_size.max(1)) {
        let text = decoder.decode(chunk);
        if !text.is_empty() {
            scanner.scan(&text);
        }
    }

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// `termdeck scan <file>`: print one JSON event per line
pub async fn scan_file(settings: &Settings, file: &Path, chunk_size: usize) -> Result<()> {
    let data = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let rules = ScanRules::new(&settings.scanner).context("Invalid scanner product name")?;

    let events = replay(rules, &data, chunk_size);
    tracing::debug!("{} event(s) from {} bytes", events.len(), data.len());
    for event in &events {
        println!("{}", serde_json::to_string(event)?);
    }
    Ok(())
}
