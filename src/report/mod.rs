//! Run bookkeeping: repair counters and change log, upgrade report.

mod upgrade;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::Path;

use serde::Serialize;

pub use upgrade::UpgradeReport;

use crate::error::Result;
use crate::rules::Mode;

/// One change-log entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change {
    pub file: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Accumulates counters and per-file changes during one repair run.
#[derive(Debug, Default)]
pub struct Reporter {
    counters: BTreeMap<String, u64>,
    changes: Vec<Change>,
    current_file: Option<String>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `n` to `category`. The key is created even when `n` is zero.
    pub fn increment(&mut self, category: &str, n: u64) {
        *self.counters.entry(category.to_string()).or_insert(0) += n;
    }

    pub fn log_change(&mut self, file: impl Into<String>, description: impl Into<String>) {
        self.push(file.into(), description.into(), None);
    }

    pub fn log_change_with_details(
        &mut self,
        file: impl Into<String>,
        description: impl Into<String>,
        details: serde_json::Value,
    ) {
        self.push(file.into(), description.into(), Some(details));
    }

    fn push(&mut self, file: String, description: String, details: Option<serde_json::Value>) {
        tracing::debug!(file = %file, "{description}");
        self.changes.push(Change {
            file,
            description,
            details,
        });
    }

    /// File currently being processed, used to attribute rule failures.
    pub fn set_current_file(&mut self, file: Option<String>) {
        self.current_file = file;
    }

    pub fn current_file(&self) -> Option<&str> {
        self.current_file.as_deref()
    }

    pub fn counter(&self, category: &str) -> Option<u64> {
        self.counters.get(category).copied()
    }

    pub fn counters(&self) -> &BTreeMap<String, u64> {
        &self.counters
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Number of distinct files in the change log.
    pub fn total_files_modified(&self) -> usize {
        self.changes
            .iter()
            .map(|c| c.file.as_str())
            .collect::<BTreeSet<_>>()
            .len()
    }

    pub fn summary(&self, mode: Mode) -> RepairSummary {
        RepairSummary {
            counters: self.counters.clone(),
            changes: self.changes.clone(),
            total_files_modified: self.total_files_modified(),
            mode,
        }
    }
}

/// Snapshot of a finished repair run.
#[derive(Debug, Clone, Serialize)]
pub struct RepairSummary {
    pub counters: BTreeMap<String, u64>,
    pub changes: Vec<Change>,
    pub total_files_modified: usize,
    pub mode: Mode,
}

impl RepairSummary {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report, as JSON when `path` ends in `.json`, text otherwise.
    pub fn write(&self, path: &Path) -> Result<()> {
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let body = if is_json {
            self.to_json()?
        } else {
            self.to_string()
        };
        fs::write(path, body)?;
        tracing::info!("report written to {}", path.display());
        Ok(())
    }
}

impl fmt::Display for RepairSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "EPUB Repair Report")?;
        writeln!(f, "{}", "=".repeat(50))?;
        writeln!(f)?;
        writeln!(f, "Summary:")?;
        if self.counters.is_empty() {
            writeln!(f, "  (No changes recorded)")?;
        }
        for (category, count) in &self.counters {
            writeln!(f, "  - {category}: {count}")?;
        }
        writeln!(f)?;
        writeln!(f, "Total files modified: {}", self.total_files_modified)?;

        if !self.changes.is_empty() {
            let mut by_file: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
            for change in &self.changes {
                by_file
                    .entry(change.file.as_str())
                    .or_default()
                    .push(change.description.as_str());
            }
            writeln!(f)?;
            writeln!(f, "Changes by file:")?;
            for (file, descriptions) in by_file {
                writeln!(f)?;
                writeln!(f, "{file}:")?;
                for description in descriptions {
                    writeln!(f, "  - {description}")?;
                }
            }
        }
        Ok(())
    }
}
