//! Operation journal
//!
//! One JSON line per protocol operation, successful or not. Disabled
//! journals only keep entries in memory.

use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};
use eyre::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::ProtocolError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub timestamp: DateTime<Utc>,
    pub operation: String,
    pub caller: Address,
    pub amount: Option<U256>,
    /// Amount the operation produced (shares, want received, swept)
    pub result: Option<U256>,
    /// Error kind when the operation was rejected
    pub error: Option<String>,
}

impl JournalEntry {
    pub fn new(operation: impl Into<String>, caller: Address, amount: Option<U256>) -> Self {
        Self {
            timestamp: Utc::now(),
            operation: operation.into(),
            caller,
            amount,
            result: None,
            error: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    /// Append this entry to a file
    pub fn append_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;

        let json = serde_json::to_string(self)?;
        writeln!(file, "{}", json)?;

        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Journal {
    path: Option<PathBuf>,
    entries: Vec<JournalEntry>,
}

impl Journal {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            entries: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    /// Record the outcome of an operation. File errors are logged, never
    /// propagated into the operation's result.
    pub fn record<T>(
        &mut self,
        mut entry: JournalEntry,
        outcome: &std::result::Result<T, ProtocolError>,
        produced: impl FnOnce(&T) -> Option<U256>,
    ) {
        match outcome {
            Ok(value) => entry.result = produced(value),
            Err(e) => entry.error = Some(e.kind().to_string()),
        }

        if let Some(path) = &self.path {
            if let Err(e) = entry.append_to_file(path) {
                warn!("Journal: failed to append to {}: {}", path.display(), e);
            }
        }
        self.entries.push(entry);
    }
}
