//! Error types for QBR deck merging.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading, merging or writing a presentation.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to read or write the underlying bytes.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The payload is not a presentation we can open.
    #[error("Unsupported or unrecognized file format: {0}")]
    UnsupportedFormat(String),

    /// The package is a ZIP archive but not a usable PPTX.
    #[error("Invalid PPTX package: {0}")]
    InvalidPackage(String),

    /// A part referenced by the package is not present in the archive.
    #[error("Missing package part: {0}")]
    MissingPart(String),

    /// A single shape could not be read or rewritten.
    #[error("Malformed shape: {0}")]
    MalformedShape(String),

    /// ZIP archive error.
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML parsing or serialization error.
    #[error("XML error: {0}")]
    XmlError(String),
}
