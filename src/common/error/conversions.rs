//! Error conversion implementations.
//!
//! Fatal container errors gain the input path on their way to
//! [`ExtractError`]; recoverable layer errors become fallback reasons.

use super::types::ExtractError;
use crate::extract::strategy::FallbackReason;
use crate::ole::OleError;
use crate::ole::doc::{DocError, StructuredError};

impl ExtractError {
    /// Attach `path` to a package-open failure.
    pub fn from_doc_error(err: DocError, path: &str) -> Self {
        let path = path.to_string();
        match err {
            DocError::Ole(OleError::NotCompoundFile) => ExtractError::NotACompoundFile { path },
            DocError::Ole(err) => ExtractError::CorruptContainer {
                path,
                reason: err.to_string(),
            },
            DocError::MissingWordDocument => ExtractError::NotAWordBinary { path },
        }
    }

    pub fn io(path: &str, source: std::io::Error) -> Self {
        ExtractError::Io {
            path: path.to_string(),
            source,
        }
    }
}

impl From<StructuredError> for FallbackReason {
    fn from(err: StructuredError) -> Self {
        FallbackReason::Structured(err.to_string())
    }
}

impl From<crate::extract::native::NativeError> for FallbackReason {
    fn from(err: crate::extract::native::NativeError) -> Self {
        FallbackReason::Native(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_messages_name_path_and_remedy() {
        let err = ExtractError::from_doc_error(DocError::Ole(OleError::NotCompoundFile), "/tmp/a.doc");
        assert!(matches!(err, ExtractError::NotACompoundFile { .. }));
        let message = err.to_string();
        assert!(message.contains("/tmp/a.doc"));
        assert!(message.contains(".docx"));
        assert!(message.contains("antiword"));

        let err = ExtractError::from_doc_error(
            DocError::Ole(OleError::Corrupted("FAT chain loops".to_string())),
            "/tmp/b.doc",
        );
        assert!(matches!(err, ExtractError::CorruptContainer { .. }));
        let message = err.to_string();
        assert!(!message.contains("not an OLE2"));
        assert!(message.contains("FAT chain loops"));
        assert!(message.contains("antiword"));
        assert_eq!(err.path(), "/tmp/b.doc");

        let err = ExtractError::from_doc_error(DocError::MissingWordDocument, "<memory>");
        assert!(matches!(err, ExtractError::NotAWordBinary { .. }));
        assert_eq!(err.path(), "<memory>");
    }

    #[test]
    fn test_structured_error_becomes_reason() {
        let reason = FallbackReason::from(StructuredError::Encrypted);
        assert_eq!(reason, FallbackReason::Structured("Document is encrypted".to_string()));
    }
}
