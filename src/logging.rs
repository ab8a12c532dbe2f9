//! Request journal: a bounded in-memory log mirrored to a JSONL file.
//!
//! Each entry records one pipeline stage of one request. Diagnostics that are
//! deliberately invisible to callers, such as token-cap clamping, land here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

const MAX_JOURNAL_ENTRIES: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Startup,
    Validate,
    Translate,
    Upstream,
    Respond,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub stage: Stage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

impl JournalEntry {
    pub fn new(level: LogLevel, stage: Stage, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            stage,
            request_id: None,
            message: message.into(),
            context: None,
        }
    }

    pub fn for_request(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_context(mut self, ctx: serde_json::Value) -> Self {
        self.context = Some(ctx);
        self
    }
}

struct Journal {
    entries: VecDeque<JournalEntry>,
    writer: Option<BufWriter<File>>,
}

impl Journal {
    fn open(file_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = file_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut entries = VecDeque::with_capacity(MAX_JOURNAL_ENTRIES);

        if file_path.exists() {
            let reader = BufReader::new(File::open(file_path)?);
            for line in reader.lines().map_while(std::result::Result::ok) {
                if let Ok(entry) = serde_json::from_str::<JournalEntry>(&line) {
                    push_bounded(&mut entries, entry);
                }
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(file_path)?;

        Ok(Self {
            entries,
            writer: Some(BufWriter::new(file)),
        })
    }

    fn in_memory() -> Self {
        Self {
            entries: VecDeque::new(),
            writer: None,
        }
    }

    fn record(&mut self, entry: JournalEntry) {
        if let Some(ref mut writer) = self.writer {
            if let Ok(json) = serde_json::to_string(&entry) {
                let _ = writeln!(writer, "{json}");
                let _ = writer.flush();
            }
        }
        push_bounded(&mut self.entries, entry);
    }
}

fn push_bounded(entries: &mut VecDeque<JournalEntry>, entry: JournalEntry) {
    if entries.len() >= MAX_JOURNAL_ENTRIES {
        entries.pop_front();
    }
    entries.push_back(entry);
}

#[derive(Clone)]
pub struct SharedLogger(Arc<Mutex<Journal>>);

impl SharedLogger {
    /// Journal persisted to `file_path`, reloading entries already there.
    pub fn new(file_path: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self(Arc::new(Mutex::new(Journal::open(file_path.as_ref())?))))
    }

    /// Journal kept only in memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self(Arc::new(Mutex::new(Journal::in_memory())))
    }

    pub fn record(&self, entry: JournalEntry) {
        if let Ok(mut journal) = self.0.lock() {
            journal.record(entry);
        }
    }

    pub fn info(&self, stage: Stage, request_id: &str, message: impl Into<String>) {
        self.record(JournalEntry::new(LogLevel::Info, stage, message).for_request(request_id));
    }

    pub fn warn(&self, stage: Stage, request_id: &str, message: impl Into<String>) {
        self.record(JournalEntry::new(LogLevel::Warn, stage, message).for_request(request_id));
    }

    pub fn error(&self, stage: Stage, request_id: &str, message: impl Into<String>) {
        self.record(JournalEntry::new(LogLevel::Error, stage, message).for_request(request_id));
    }

    pub fn debug(&self, stage: Stage, request_id: &str, message: impl Into<String>) {
        self.record(JournalEntry::new(LogLevel::Debug, stage, message).for_request(request_id));
    }

    /// Most recent entries first.
    pub fn recent(&self, limit: usize) -> Vec<JournalEntry> {
        self.0
            .lock()
            .map(|j| j.entries.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    pub fn for_request(&self, request_id: &str) -> Vec<JournalEntry> {
        self.0
            .lock()
            .map(|j| {
                j.entries
                    .iter()
                    .filter(|e| e.request_id.as_deref() == Some(request_id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_persist_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");

        let logger = SharedLogger::new(&path).unwrap();
        logger.info(Stage::Validate, "msg_1", "validated");
        logger.warn(Stage::Translate, "msg_1", "clamped");
        drop(logger);

        let reloaded = SharedLogger::new(&path).unwrap();
        let recent = reloaded.recent(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message, "clamped");
        assert_eq!(recent[0].level, LogLevel::Warn);
        assert_eq!(recent[1].stage, Stage::Validate);
    }

    #[test]
    fn test_filter_by_request() {
        let logger = SharedLogger::in_memory();
        logger.info(Stage::Upstream, "msg_a", "a");
        logger.info(Stage::Upstream, "msg_b", "b");
        logger.error(Stage::Respond, "msg_a", "failed");

        let entries = logger.for_request("msg_a");
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.request_id.as_deref() == Some("msg_a")));
    }

    #[test]
    fn test_bounded() {
        let logger = SharedLogger::in_memory();
        for i in 0..(MAX_JOURNAL_ENTRIES + 5) {
            logger.debug(Stage::Translate, "msg_x", format!("entry {i}"));
        }
        assert_eq!(logger.recent(usize::MAX).len(), MAX_JOURNAL_ENTRIES);
        assert_eq!(
            logger.recent(1)[0].message,
            format!("entry {}", MAX_JOURNAL_ENTRIES + 4)
        );
    }
}
