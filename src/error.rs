use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by package parsing, translation and reconstruction.
#[derive(Error, Debug)]
pub enum ReviewError {
    /// The input file does not exist.
    #[error("input not found: {}", .0.display())]
    NoInput(PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The zip container could not be listed or an entry could not be read.
    #[error("corrupt archive: {0}")]
    CorruptArchive(String),

    /// The package has no main document part.
    #[error("missing main document part: {0}")]
    MissingDocumentPart(String),

    /// An XML part could not be parsed or is structurally unusable.
    #[error("malformed xml in {part}: {message}")]
    Xml { part: String, message: String },

    /// The translator ran but returned nothing that could be interpreted.
    #[error("translator returned nothing usable: {0}")]
    TranslatorUnusable(String),

    /// The translator itself failed (could not start, exited non-zero, ...).
    #[error("translator failed: {0}")]
    Translator(String),
}

impl ReviewError {
    pub fn xml(part: &str, message: impl std::fmt::Display) -> Self {
        Self::Xml {
            part: part.to_string(),
            message: message.to_string(),
        }
    }
}

impl From<zip::result::ZipError> for ReviewError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => ReviewError::Io(e),
            other => ReviewError::CorruptArchive(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReviewError>;
