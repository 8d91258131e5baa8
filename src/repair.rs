//! One repair run: extract, repair, repackage.

use std::path::PathBuf;

use crate::epub;
use crate::error::Result;
use crate::report::{RepairSummary, Reporter};
use crate::rules::{Mode, Pipeline};

/// Options for [`run_repair`].
#[derive(Debug, Clone)]
pub struct RepairOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub mode: Mode,
    /// Report destination; `.json` selects JSON, anything else text.
    pub report: Option<PathBuf>,
}

impl RepairOptions {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            mode: Mode::Safe,
            report: None,
        }
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn report(mut self, path: impl Into<PathBuf>) -> Self {
        self.report = Some(path.into());
        self
    }
}

/// Repair `options.input` into `options.output`.
///
/// The package is extracted into a scratch directory that is removed when
/// the run ends, successful or not.
pub fn run_repair(options: &RepairOptions) -> Result<RepairSummary> {
    epub::verify(&options.input)?;

    let scratch = tempfile::Builder::new().prefix("epubfix-").tempdir()?;
    let root = scratch.path();
    epub::extract(&options.input, root)?;

    let book = epub::open_book(root)?;
    tracing::info!(
        documents = book.content_documents().len(),
        stylesheets = book.stylesheets().len(),
        "loaded {}",
        options.input.display()
    );

    let mut reporter = Reporter::new();
    Pipeline::new(options.mode).run(&book, &mut reporter);

    epub::repackage(root, &options.output)?;

    let summary = reporter.summary(options.mode);
    if let Some(path) = &options.report {
        summary.write(path)?;
    }
    Ok(summary)
}
