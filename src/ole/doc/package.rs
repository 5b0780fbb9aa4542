/// Package implementation for legacy Word documents (.doc).
use super::parts::fib::FileInformationBlock;
use super::parts::piece_table::PieceTable;
use super::parts::text::{StructuredError, StructuredText, TextExtractor};
use crate::common::encoding::encoding_for_codepage;
use crate::ole::{CompoundFile, OleError, OleMetadata};
use bytes::Bytes;
use thiserror::Error;
use tracing::debug;

/// Name of the stream holding the FIB and the document text
pub const WORD_DOCUMENT_STREAM: &str = "WordDocument";

/// Error types for opening a DOC package.
#[derive(Debug, Error)]
pub enum DocError {
    /// The container itself could not be parsed
    #[error("OLE error: {0}")]
    Ole(#[from] OleError),
    /// A valid container without a WordDocument stream
    #[error("Not a valid Word document: WordDocument stream not found")]
    MissingWordDocument,
}

/// A Word (.doc) package.
///
/// Wraps a [`CompoundFile`] that is known to carry a `WordDocument` stream.
///
/// # Examples
///
/// ```rust,no_run
/// use docsift::ole::doc::Package;
///
/// let pkg = Package::open(std::fs::read("document.doc")?)?;
/// let text = pkg.structured_text(None)?;
/// println!("{}", text.text);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct Package {
    cf: CompoundFile,
}

impl Package {
    /// Parse a package from raw bytes.
    pub fn open(data: impl Into<Bytes>) -> Result<Self, DocError> {
        Self::from_compound_file(CompoundFile::open(data)?)
    }

    /// Wrap an already-parsed compound file.
    pub fn from_compound_file(cf: CompoundFile) -> Result<Self, DocError> {
        if !cf.stream_exists(WORD_DOCUMENT_STREAM) {
            return Err(DocError::MissingWordDocument);
        }
        Ok(Self { cf })
    }

    #[inline]
    pub fn compound_file(&self) -> &CompoundFile {
        &self.cf
    }

    /// Summary and document-summary properties.
    pub fn metadata(&self) -> OleMetadata {
        self.cf.metadata()
    }

    /// Read and parse the FIB at the start of the WordDocument stream.
    pub fn fib(&self) -> Result<FileInformationBlock, StructuredError> {
        let word_document = self.cf.open_stream(WORD_DOCUMENT_STREAM)?;
        Ok(FileInformationBlock::parse(&word_document)?)
    }

    /// Decode the main document text through the FIB.
    ///
    /// Non-complex documents take the contiguous `fcMin` block; complex ones
    /// are reassembled from the piece table. `codepage` drives 8-bit text and
    /// defaults to GBK when absent or unknown.
    pub fn structured_text(&self, codepage: Option<u32>) -> Result<StructuredText, StructuredError> {
        let word_document = self.cf.open_stream(WORD_DOCUMENT_STREAM)?;
        let fib = FileInformationBlock::parse(&word_document)?;
        debug!(
            nfib = fib.nfib,
            complex = fib.is_complex(),
            table = fib.table_stream_name(),
            "parsed FIB"
        );

        if fib.is_encrypted() {
            return Err(StructuredError::Encrypted);
        }

        let encoding = encoding_for_codepage(codepage);
        let extractor = TextExtractor::new(&fib, &word_document);

        if !fib.is_complex() {
            return extractor.simple_text(encoding);
        }

        let table_name = fib.table_stream_name();
        let table_stream = match self.cf.open_stream(table_name) {
            Ok(data) => data,
            Err(OleError::StreamNotFound(_)) => {
                return Err(StructuredError::MissingTableStream(table_name));
            }
            Err(e) => return Err(e.into()),
        };

        let pieces = PieceTable::extract(&table_stream, &fib)?;
        debug!(pieces = pieces.pieces().len(), "parsed piece table");
        extractor.piece_text(&pieces, encoding)
    }
}
