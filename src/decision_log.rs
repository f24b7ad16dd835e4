// src/decision_log.rs

use crate::types::Decision;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

#[derive(Debug, Serialize)]
struct LogEntry<'a> {
    source: &'a str,
    frame_index: u64,
    video_ms: f64,
    #[serde(flatten)]
    decision: Decision,
}

/// Appends one JSON line per processed frame
pub struct DecisionLog {
    writer: BufWriter<File>,
    entries: u64,
}

impl DecisionLog {
    pub fn create(path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open decision log {}", path))?;

        info!("Writing decisions to {}", path);
        Ok(Self {
            writer: BufWriter::new(file),
            entries: 0,
        })
    }

    pub fn record(
        &mut self,
        source: &str,
        frame_index: u64,
        video_ms: f64,
        decision: Decision,
    ) -> Result<()> {
        let entry = LogEntry {
            source,
            frame_index,
            video_ms,
            decision,
        };
        serde_json::to_writer(&mut self.writer, &entry)?;
        self.writer.write_all(b"\n")?;
        self.entries += 1;
        Ok(())
    }

    pub fn entries(&self) -> u64 {
        self.entries
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush decision log")
    }
}

impl Drop for DecisionLog {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_writes_json_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs/decisions.jsonl");
        let path = path.to_str().unwrap();

        {
            let mut log = DecisionLog::create(path).unwrap();
            log.record("clip.mp4", 0, 0.0, Decision::no_face()).unwrap();
            log.record("clip.mp4", 1, 40.0, Decision::face(false)).unwrap();
            assert_eq!(log.entries(), 2);
        }

        let contents = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(
            lines,
            vec![
                r#"{"source":"clip.mp4","frame_index":0,"video_ms":0.0,"face_present":false}"#,
                r#"{"source":"clip.mp4","frame_index":1,"video_ms":40.0,"face_present":true,"looking":false}"#,
            ]
        );
    }

    #[test]
    fn test_appends_to_existing_log() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("decisions.jsonl");
        let path = path.to_str().unwrap();

        for i in 0..2 {
            let mut log = DecisionLog::create(path).unwrap();
            log.record("camera:0", i, i as f64 * 33.3, Decision::face(true)).unwrap();
            log.flush().unwrap();
        }

        let contents = fs::read_to_string(path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
