//! docsift - best-effort text recovery from legacy Word binary documents
//!
//! This library reads pre-XML Word documents (.doc, Word 97 and later) without
//! the authoring application and recovers their text and basic metadata.
//!
//! # Features
//!
//! - **OLE2 Parser**: Read compound files (FAT, MiniFAT, directory tree)
//! - **FIB and piece table**: Reassemble the main text of simple and complex documents
//! - **Encoding heuristics**: Pick between the declared codepage, UTF-16LE and
//!   generic fallbacks, preferring decodings that contain CJK ideographs
//! - **Stream scanning**: Recover text from damaged documents by scanning every stream
//! - **Metadata extraction**: SummaryInformation and DocumentSummaryInformation properties
//! - **Native bridge**: Optionally try `antiword` first, with a timeout
//!
//! # Example - Extracting text
//!
//! ```no_run
//! use docsift::{ExtractOptions, ExtractionPipeline};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = ExtractionPipeline::new(ExtractOptions::default());
//! let doc = pipeline.extract_path("document.doc")?;
//!
//! println!("strategy: {}, codepage: {}", doc.strategy, doc.codepage);
//! if let Some(author) = &doc.metadata.author {
//!     println!("author: {author}");
//! }
//! println!("{}", doc.text);
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Low-level OLE access
//!
//! ```no_run
//! use docsift::ole::CompoundFile;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cf = CompoundFile::open(std::fs::read("document.doc")?)?;
//!
//! // List all streams
//! for path in cf.stream_paths() {
//!     println!("Stream: {path}");
//! }
//!
//! // Open a specific stream
//! let data = cf.open_stream("WordDocument")?;
//! println!("Stream size: {} bytes", data.len());
//! # Ok(())
//! # }
//! ```

/// Shared binary readers, codepage table, metadata and error types
pub mod common;

/// OLE2 (Object Linking and Embedding) file format parser
///
/// The `ole` module also contains the `doc` submodule for the Word binary
/// structures, since .doc files are OLE2-based.
pub mod ole;

/// Decoding, encoding selection and cleanup of recovered text
pub mod text;

/// The strategy chain that turns a .doc into an [`ExtractedDocument`]
pub mod extract;

// Re-export commonly used types for convenience
pub use common::{ExtractError, Metadata, Result};
pub use extract::{
    Confidence, ExtractOptions, ExtractedDocument, ExtractionPipeline, NativeBridge, StrategyKind,
};
pub use ole::doc;
