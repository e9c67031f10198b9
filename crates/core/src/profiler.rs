// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Environment-gated latency profiler.
//!
//! A bounded ring of timestamped records, enabled by `PROFILER_ENABLED`.
//! When disabled every operation is a cheap no-op returning failure, so call
//! sites never need their own gating. Overflow refuses new records and never
//! overwrites old ones.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

use crate::constants::{MAX_RECORDS, PROFILER_ENV};

/// Identifier of one recorded event, unique within a profiler instance.
pub type RecordId = u64;

#[derive(Debug, Clone)]
struct Record {
    id: RecordId,
    stage: String,
    info: String,
    time: Instant,
}

#[derive(Debug, Default)]
struct Ring {
    records: Vec<Record>,
    next_id: RecordId,
}

/// Bounded timestamped-record ring for one module.
#[derive(Debug)]
pub struct Profiler {
    module: String,
    enabled: bool,
    /// Steady-clock epoch all record timestamps are relative to.
    epoch: Instant,
    ring: Mutex<Ring>,
}

impl Profiler {
    /// Creates a profiler for `module`, reading the enable gate from the
    /// environment.
    pub fn new(module: impl Into<String>) -> Self {
        let enabled = parse_env(std::env::var(PROFILER_ENV).ok().as_deref(), false);
        Self::with_enabled(module, enabled)
    }

    /// Creates a profiler with an explicit gate (used by tests; the
    /// environment read in [`Profiler::new`] is process-global).
    pub fn with_enabled(module: impl Into<String>, enabled: bool) -> Self {
        Self { module: module.into(), enabled, epoch: Instant::now(), ring: Mutex::default() }
    }

    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    /// Appends a record, returning its id, or `None` when disabled or full.
    pub fn record(&self, stage: impl Into<String>) -> Option<RecordId> {
        self.record_with_info(stage, String::new())
    }

    /// Appends a record carrying free-form info.
    pub fn record_with_info(
        &self,
        stage: impl Into<String>,
        info: impl Into<String>,
    ) -> Option<RecordId> {
        if !self.enabled {
            return None;
        }
        let now = Instant::now();
        let mut ring = self.ring.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if ring.records.len() >= MAX_RECORDS {
            return None;
        }
        let id = ring.next_id;
        ring.next_id += 1;
        ring.records.push(Record { id, stage: stage.into(), info: info.into(), time: now });
        Some(id)
    }

    /// First record whose stage matches.
    pub fn find(&self, stage: &str) -> Option<RecordId> {
        if !self.enabled {
            return None;
        }
        let ring = self.ring.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        ring.records.iter().find(|r| r.stage == stage).map(|r| r.id)
    }

    /// First record whose stage and info both match.
    pub fn find_with_info(&self, stage: &str, info: &str) -> Option<RecordId> {
        if !self.enabled {
            return None;
        }
        let ring = self.ring.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        ring.records.iter().find(|r| r.stage == stage && r.info == info).map(|r| r.id)
    }

    /// Emits one formatted line for a record to the logger.
    pub fn log(&self, id: RecordId) {
        if !self.enabled {
            return;
        }
        let ring = self.ring.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(record) = ring.records.iter().find(|r| r.id == id) {
            let ts = record.time.duration_since(self.epoch).as_micros();
            tracing::info!(
                module = %self.module,
                id = record.id,
                stage = %record.stage,
                info = %record.info,
                timestamp_us = ts as u64,
                "profiler record"
            );
        }
    }

    /// Atomically snapshots the ring and writes one line per record.
    /// Returns `false` when disabled or when the file cannot be written.
    pub fn dump(&self, path: &Path) -> bool {
        if !self.enabled {
            return false;
        }
        let snapshot: Vec<Record> = {
            let ring = self.ring.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            ring.records.clone()
        };
        let mut out = String::new();
        for record in &snapshot {
            let ts = record.time.duration_since(self.epoch).as_micros();
            let _ = writeln!(
                out,
                "MODULE[{}] ID[{}] STAGE[{}] INFO[{}] TIMESTAMP[{ts}]",
                self.module, record.id, record.stage, record.info
            );
        }
        std::fs::write(path, out).is_ok()
    }
}

/// Parses the gate value: `1|true|yes|on` enables, `0|false|no|off`
/// disables, anything else keeps the default. Case-insensitive.
fn parse_env(value: Option<&str>, default: bool) -> bool {
    let Some(value) = value else { return default };
    if value.is_empty() {
        return default;
    }
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_profiler_refuses_everything() {
        let profiler = Profiler::with_enabled("test", false);
        assert!(profiler.record("load").is_none());
        assert!(profiler.find("load").is_none());
        let dir = tempfile::tempdir().unwrap();
        assert!(!profiler.dump(&dir.path().join("dump.txt")));
    }

    #[test]
    fn test_record_find_and_dump() {
        let profiler = Profiler::with_enabled("pipeline", true);
        let a = profiler.record("load").unwrap();
        let b = profiler.record_with_info("attach", "audio").unwrap();
        assert_ne!(a, b);
        assert_eq!(profiler.find("load"), Some(a));
        assert_eq!(profiler.find_with_info("attach", "audio"), Some(b));
        assert_eq!(profiler.find("missing"), None);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.txt");
        assert!(profiler.dump(&path));
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.contains("MODULE[pipeline]"));
        assert!(contents.contains("STAGE[attach] INFO[audio]"));
    }

    #[test]
    fn test_overflow_never_overwrites() {
        let profiler = Profiler::with_enabled("ring", true);
        for i in 0..MAX_RECORDS {
            assert!(profiler.record(format!("stage-{i}")).is_some());
        }
        assert!(profiler.record("one-too-many").is_none());
        // The first record is still present.
        assert_eq!(profiler.find("stage-0"), Some(0));
        assert!(profiler.find("one-too-many").is_none());
    }

    #[test]
    fn test_env_parse_table() {
        for v in ["1", "true", "YES", "On"] {
            assert!(parse_env(Some(v), false));
        }
        for v in ["0", "false", "NO", "Off"] {
            assert!(!parse_env(Some(v), true));
        }
        assert!(parse_env(Some("maybe"), true));
        assert!(!parse_env(Some(""), false));
        assert!(!parse_env(None, false));
    }
}
