#![warn(missing_docs)]
//! Test surfaces for worldgen worldtests: JSONL event logs and metrics reports.

mod metrics;

use anyhow::Result;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use worldgen_core::ChunkPos;

pub use metrics::*;

/// One event captured by a worldtest.
#[derive(Debug, Serialize)]
pub struct EventRecord<'a> {
    /// Position of the event in the log.
    pub sequence: u64,
    /// Human-readable kind label.
    pub kind: &'a str,
    /// Chunk coordinates [x, z].
    pub chunk: [i32; 2],
    /// Free-form payload, usually a content hash.
    pub payload: &'a str,
}

impl<'a> EventRecord<'a> {
    /// Event about `pos`.
    pub fn chunk(sequence: u64, kind: &'a str, pos: ChunkPos, payload: &'a str) -> Self {
        Self {
            sequence,
            kind,
            chunk: [pos.x, pos.z],
            payload,
        }
    }
}

/// A sink that writes newline-delimited JSON to disk.
pub struct JsonlSink {
    file: File,
    written: u64,
}

impl JsonlSink {
    /// Create a new sink at `path`, creating parent dirs if needed.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(Self { file, written: 0 })
    }

    /// Append an event to the log.
    pub fn write(&mut self, event: &EventRecord<'_>) -> Result<()> {
        let line = serde_json::to_string(event)?;
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    /// Number of events written so far.
    pub fn written(&self) -> u64 {
        self.written
    }
}

/// Unique path under the system temp dir for a test artifact.
pub fn temp_artifact_path(stem: &str, extension: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();
    std::env::temp_dir()
        .join("worldgen-tests")
        .join(format!("{stem}-{}-{nanos}.{extension}", std::process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jsonl_sink_writes_one_line_per_event() {
        let path = temp_artifact_path("events", "jsonl");
        let mut sink = JsonlSink::create(&path).expect("sink create");
        sink.write(&EventRecord::chunk(0, "generated", ChunkPos::new(1, -2), "abc"))
            .expect("write succeeds");
        sink.write(&EventRecord::chunk(1, "evicted", ChunkPos::new(0, 0), ""))
            .expect("write succeeds");
        assert_eq!(sink.written(), 2);
        drop(sink);

        let contents = fs::read_to_string(&path).expect("file readable");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"chunk\":[1,-2]"));
        assert!(lines[1].contains("evicted"));
        fs::remove_file(&path).ok();
    }

    #[test]
    fn artifact_paths_are_unique() {
        let a = temp_artifact_path("x", "json");
        std::thread::sleep(std::time::Duration::from_millis(1));
        let b = temp_artifact_path("x", "json");
        assert_ne!(a, b);
    }
}
