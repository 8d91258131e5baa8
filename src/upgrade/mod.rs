//! EPUB version detection and EPUB 2 to EPUB 3 upgrade.

mod nav;
mod orchestrator;
mod version;

use std::path::PathBuf;

pub use nav::{MAX_NAV_DEPTH, NavEntry, NavMap, NcxConversion, build_nav_document, convert_ncx, read_ncx};
pub use orchestrator::upgrade;
pub use version::{EpubVersion, detect, detect_file};

use crate::epub;
use crate::error::Result;
use crate::report::UpgradeReport;

pub const DEFAULT_TARGET_VERSION: &str = "3.0";

/// Options for [`run_upgrade`].
#[derive(Debug, Clone)]
pub struct UpgradeOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub target_version: String,
    /// JSON report destination.
    pub report: Option<PathBuf>,
    /// Upgrade even when the package already declares version 3.
    pub force_rewrite: bool,
    /// Detect and report only; nothing is written except the report.
    pub dry_run: bool,
}

impl UpgradeOptions {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            target_version: DEFAULT_TARGET_VERSION.to_string(),
            report: None,
            force_rewrite: false,
            dry_run: false,
        }
    }

    pub fn target_version(mut self, version: impl Into<String>) -> Self {
        self.target_version = version.into();
        self
    }

    pub fn report(mut self, path: impl Into<PathBuf>) -> Self {
        self.report = Some(path.into());
        self
    }

    pub fn force_rewrite(mut self, force: bool) -> Self {
        self.force_rewrite = force;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// What [`run_upgrade`] did with the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeStatus {
    /// Version detected and reported, nothing written.
    DryRun,
    /// Already version 3: the input was copied byte for byte.
    CopiedUnchanged,
    Upgraded,
}

/// Result of one upgrade run.
#[derive(Debug, Clone)]
pub struct UpgradeOutcome {
    pub version: EpubVersion,
    pub status: UpgradeStatus,
    pub report: UpgradeReport,
}

/// Detect the version of `options.input` and, unless this is a dry run,
/// write an upgraded (or unchanged) copy to `options.output`.
pub fn run_upgrade(options: &UpgradeOptions) -> Result<UpgradeOutcome> {
    epub::verify(&options.input)?;

    let scratch = tempfile::Builder::new().prefix("epubfix-").tempdir()?;
    let root = scratch.path();
    epub::extract(&options.input, root)?;

    let version = detect_file(&epub::locate_descriptor(root)?)?;
    tracing::info!("detected version {version} in {}", options.input.display());

    let mut report = UpgradeReport::new();
    report.set_versions(&version.normalized, &version.raw, None);

    let status = if options.dry_run {
        UpgradeStatus::DryRun
    } else if version.is_epub3() && !options.force_rewrite {
        epub::copy_unchanged(&options.input, &options.output)?;
        report.note("File already EPUB 3, copied unchanged");
        UpgradeStatus::CopiedUnchanged
    } else {
        upgrade(
            root,
            &options.target_version,
            options.force_rewrite,
            &mut report,
        )?;
        report.set_versions(
            &version.normalized,
            &version.raw,
            Some(&options.target_version),
        );
        epub::repackage(root, &options.output)?;
        UpgradeStatus::Upgraded
    };

    if let Some(path) = &options.report {
        report.write_json(path)?;
    }

    Ok(UpgradeOutcome {
        version,
        status,
        report,
    })
}
