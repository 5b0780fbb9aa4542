/// Constants for OLE file format
pub mod consts;

/// Main OLE file parsing implementation
mod file;

/// Metadata extraction from OLE property streams
mod metadata;

/// Compound file writer used to produce fixtures
#[cfg(any(test, feature = "writer"))]
pub mod writer;

/// Property List with Character Positions parser
pub mod plcf;

/// Legacy Word document (.doc) reader
///
/// This module provides functionality to parse Microsoft Word documents
/// in the legacy binary format (.doc files), which are OLE2-based files.
pub mod doc;

// Re-export public types for convenient access
pub use file::{CompoundFile, OleError, is_ole_file};
pub use metadata::{OleMetadata, PropertyValue};
#[cfg(any(test, feature = "writer"))]
pub use writer::CompoundFileBuilder;
