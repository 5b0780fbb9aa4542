//! Fatal error types surfaced to callers.
//!
//! Everything else that can go wrong while extracting (bad FIB, malformed
//! piece table, native bridge timeout) is absorbed by the fallback chain and
//! never reaches this type.
use thiserror::Error;

/// Label used for in-memory inputs in error messages
pub const MEMORY_LABEL: &str = "<memory>";

/// Advice appended to every fatal message
const REMEDY: &str = "convert it to .docx or configure a native bridge such as antiword";

/// Main error type for extraction.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Input is not an OLE2 compound file
    #[error("{path}: not an OLE2 compound file; {}", REMEDY)]
    NotACompoundFile { path: String },

    /// Signature is present but the container structure is unreadable
    #[error("{path}: damaged OLE2 compound file ({reason}); {}", REMEDY)]
    CorruptContainer { path: String, reason: String },

    /// Compound file without a WordDocument stream
    #[error("{path}: no WordDocument stream, not a Word binary document; {}", REMEDY)]
    NotAWordBinary { path: String },

    /// Input path could not be read
    #[error("{path}: IO error: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ExtractError {
    /// Path (or `<memory>`) the error refers to.
    pub fn path(&self) -> &str {
        match self {
            ExtractError::NotACompoundFile { path }
            | ExtractError::CorruptContainer { path, .. }
            | ExtractError::NotAWordBinary { path }
            | ExtractError::Io { path, .. } => path,
        }
    }
}

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractError>;
