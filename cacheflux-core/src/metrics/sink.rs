//! JSON metrics log
//!
//! Snapshots accumulate in a single JSON array file. Every append reads the
//! whole array back, pushes one element and rewrites the file in full; there
//! is no rotation or size bound, so the file grows for as long as the process
//! samples. Corrupt or non-array content is treated as empty and silently
//! reset on the next append.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::Result;
use crate::metrics::MetricsSnapshot;

/// Append-only metrics log backed by one JSON array file
#[derive(Debug, Clone)]
pub struct MetricsSink {
    path: PathBuf,
}

impl MetricsSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one snapshot, rewriting the whole array
    pub fn append(&self, snapshot: &MetricsSnapshot) -> Result<()> {
        let mut entries = self.read_entries();
        entries.push(serde_json::to_value(snapshot)?);
        debug!("Appending metrics sample #{} to {:?}", entries.len(), self.path);
        fs::write(&self.path, serde_json::to_string_pretty(&entries)?)?;
        Ok(())
    }

    /// Current log contents; anything unreadable counts as empty
    pub fn read_entries(&self) -> Vec<Value> {
        let Ok(content) = fs::read_to_string(&self.path) else {
            return Vec::new();
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Array(entries)) => entries,
            _ => Vec::new(),
        }
    }
}
