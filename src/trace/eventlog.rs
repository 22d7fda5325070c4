//! Append-only JSONL synthesis event log.
//!
//! One log per region under the state directory. The external deployment
//! engine reads the log to correlate plans with the outputs it later hands
//! back.

use crate::core::error::{SynthError, SynthResult};
use crate::core::version::civil_from_unix;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Synthesis provenance event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SynthEvent {
    SynthStarted {
        region: String,
        spec_name: String,
        tramar_version: String,
    },
    GraphSynthesized {
        region: String,
        nodes: usize,
        edges: usize,
        fingerprint: String,
    },
    OutputsRecorded {
        region: String,
        nodes: usize,
    },
    ReferencePublished {
        region: String,
        name: String,
        value: String,
    },
}

/// Timestamped event wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampedEvent {
    pub ts: String,
    #[serde(flatten)]
    pub event: SynthEvent,
}

/// Generate an ISO 8601 timestamp.
pub fn now_iso8601() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let (y, m, d, hh, mm, ss) = civil_from_unix(secs);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        y, m, d, hh, mm, ss
    )
}

/// Derive the event log path for a region.
pub fn event_log_path(state_dir: &Path, region: &str) -> PathBuf {
    state_dir.join(region).join("events.jsonl")
}

/// Append an event to the region's event log.
pub fn append_event(state_dir: &Path, region: &str, event: SynthEvent) -> SynthResult<()> {
    let path = event_log_path(state_dir, region);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| SynthError::store(format!("cannot create state dir: {}", e)))?;
    }

    let te = TimestampedEvent {
        ts: now_iso8601(),
        event,
    };
    let json = serde_json::to_string(&te)
        .map_err(|e| SynthError::store(format!("JSON serialize error: {}", e)))?;

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| SynthError::store(format!("cannot open event log {}: {}", path.display(), e)))?;

    writeln!(file, "{}", json).map_err(|e| SynthError::store(format!("write error: {}", e)))?;

    Ok(())
}
