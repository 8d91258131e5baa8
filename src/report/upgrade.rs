use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::error::Result;

/// Outcome of an EPUB 2 to EPUB 3 upgrade.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpgradeReport {
    /// Normalized major version: `"2"`, `"3"` or the raw major component.
    pub original_version: Option<String>,
    pub raw_original_version: Option<String>,
    pub new_version: Option<String>,
    pub nav_converted: bool,
    pub ncx_source: Option<String>,
    pub warnings: Vec<String>,
    pub notes: Vec<String>,
}

impl UpgradeReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the detected version. `new` defaults to `original`.
    pub fn set_versions(&mut self, original: &str, raw: &str, new: Option<&str>) {
        self.original_version = Some(original.to_string());
        self.raw_original_version = Some(raw.to_string());
        self.new_version = Some(new.unwrap_or(original).to_string());
    }

    pub fn mark_nav_converted(&mut self, source: impl Into<String>) {
        self.nav_converted = true;
        self.ncx_source = Some(source.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{message}");
        self.warnings.push(message);
    }

    pub fn note(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("{message}");
        self.notes.push(message);
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Console summary lines.
    pub fn summary_lines(&self) -> Vec<String> {
        let unknown = "unknown";
        let mut lines = vec![
            "EPUB Upgrade Report".to_string(),
            "=".repeat(50),
            format!(
                "Original version: {} ({})",
                self.raw_original_version.as_deref().unwrap_or(unknown),
                self.original_version.as_deref().unwrap_or(unknown)
            ),
            format!(
                "New version: {}",
                self.new_version.as_deref().unwrap_or(unknown)
            ),
        ];
        match (&self.nav_converted, &self.ncx_source) {
            (true, Some(source)) => lines.push(format!("Navigation: converted from {source}")),
            (true, None) => lines.push("Navigation: converted".to_string()),
            (false, _) => lines.push("Navigation: not converted".to_string()),
        }
        if !self.warnings.is_empty() {
            lines.push(String::new());
            lines.push(format!("Warnings ({}):", self.warnings.len()));
            lines.extend(self.warnings.iter().map(|w| format!("  - {w}")));
        }
        if !self.notes.is_empty() {
            lines.push(String::new());
            lines.push(format!("Notes ({}):", self.notes.len()));
            lines.extend(self.notes.iter().map(|n| format!("  - {n}")));
        }
        lines
    }

    pub fn print_summary(&self) {
        for line in self.summary_lines() {
            println!("{line}");
        }
    }
}
