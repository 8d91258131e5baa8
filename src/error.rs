//! Error types for epubfix operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a repair or upgrade run.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not a valid EPUB (ZIP) file: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML escape error: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),

    #[error("Invalid EPUB: {0}")]
    InvalidEpub(String),

    #[error("Missing required element: {0}")]
    MissingElement(String),

    #[error("No version attribute found in package element")]
    MissingVersion,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error belongs to the known failure taxonomy (bad input,
    /// broken package structure) rather than an unexpected runtime failure.
    ///
    /// The CLIs print a single line for expected errors and the full cause
    /// chain otherwise.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Error::InputNotFound(_)
                | Error::Zip(_)
                | Error::Xml(_)
                | Error::Escape(_)
                | Error::InvalidEpub(_)
                | Error::MissingElement(_)
                | Error::MissingVersion
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
