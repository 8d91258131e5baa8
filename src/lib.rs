//! # epubfix
//!
//! Repair the markup of reflowable EPUB books and upgrade EPUB 2 packages to
//! EPUB 3.
//!
//! ## Repair
//!
//! The repair pipeline rewrites content documents and stylesheets in place:
//! class-styled headings become real headings, inline-only divs become
//! paragraphs, marker-prefixed paragraphs become lists, blank-paragraph runs
//! become scene breaks, images gain `alt` text, and layout-hostile CSS is
//! dropped.
//!
//! ```no_run
//! use epubfix::{Mode, RepairOptions, run_repair};
//!
//! let options = RepairOptions::new("in.epub", "out.epub")
//!     .mode(Mode::Aggressive)
//!     .report("report.json");
//! let summary = run_repair(&options).unwrap();
//! println!("{} files modified", summary.total_files_modified);
//! ```
//!
//! ## Upgrade
//!
//! ```no_run
//! use epubfix::{UpgradeOptions, run_upgrade};
//!
//! let outcome = run_upgrade(&UpgradeOptions::new("old.epub", "new.epub")).unwrap();
//! outcome.report.print_summary();
//! ```
//!
//! Both entry points work on a scratch extraction of the input; the input file
//! itself is never modified.

pub mod book;
#[cfg(feature = "cli")]
pub mod cli;
pub mod css;
pub mod dom;
pub mod epub;
pub mod error;
pub mod repair;
pub mod report;
pub mod rules;
pub mod upgrade;
pub(crate) mod util;

pub use book::{Book, ManifestItem, SpineItem};
pub use error::{Error, Result};
pub use repair::{RepairOptions, run_repair};
pub use report::{Change, RepairSummary, Reporter, UpgradeReport};
pub use rules::{Mode, Pipeline, Rule, RuleOutcome};
pub use upgrade::{EpubVersion, UpgradeOptions, UpgradeOutcome, UpgradeStatus, run_upgrade};
