/// Text reconstruction from DOC binary structures.
///
/// Text lives in the WordDocument stream. A non-complex document stores it as
/// one contiguous block at `fcMin`; a complex (fast-saved) document scatters
/// it over pieces listed in the table stream's piece table, each piece with
/// its own offset and encoding.
use super::fib::{FibError, FileInformationBlock};
use super::piece_table::{PieceEncoding, PieceTable, PieceTableError};
use crate::ole::OleError;
use crate::text::charclass::has_meaningful_chars;
use crate::text::decoder::{UTF16LE_LABEL, decode_utf16, decode_with};
use encoding_rs::Encoding;
use thiserror::Error;

/// Reasons the structured path could not produce text.
#[derive(Debug, Error)]
pub enum StructuredError {
    #[error("Invalid FIB: {0}")]
    Fib(#[from] FibError),
    #[error(transparent)]
    PieceTable(#[from] PieceTableError),
    #[error("Document is encrypted")]
    Encrypted,
    #[error("Table stream {0} not found")]
    MissingTableStream(&'static str),
    #[error("Text range {start}..{end} lies outside WordDocument ({len} bytes)")]
    TextOutOfRange { start: usize, end: usize, len: usize },
    #[error("Reconstructed text holds no meaningful characters")]
    NoMeaningfulText,
    #[error("OLE error: {0}")]
    Ole(#[from] OleError),
}

/// How the text was located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSource {
    /// Contiguous block at `fcMin`
    Simple,
    /// Reassembled from this many pieces
    Pieces(usize),
}

/// Decoded main-document text before cleaning.
#[derive(Debug, Clone)]
pub struct StructuredText {
    pub text: String,
    /// Label of the encoding used for the bulk of the text
    pub encoding: &'static str,
    pub source: TextSource,
}

/// Decodes the main document text out of the WordDocument stream.
pub struct TextExtractor<'a> {
    fib: &'a FileInformationBlock,
    word_document: &'a [u8],
}

impl<'a> TextExtractor<'a> {
    pub fn new(fib: &'a FileInformationBlock, word_document: &'a [u8]) -> Self {
        Self { fib, word_document }
    }

    /// Decode bytes `[fcMin, fcMin + ccpText)` with the declared encoding.
    pub fn simple_text(&self, encoding: &'static Encoding) -> Result<StructuredText, StructuredError> {
        let len = self.word_document.len();
        let range = self.fib.simple_text_range(len).ok_or(StructuredError::TextOutOfRange {
            start: self.fib.fc_min as usize,
            end: self.fib.fc_min as usize + self.fib.ccp_text as usize,
            len,
        })?;

        Ok(StructuredText {
            text: decode_with(&self.word_document[range], encoding),
            encoding: encoding.name(),
            source: TextSource::Simple,
        })
    }

    /// Decode every piece in table order and concatenate.
    ///
    /// Compressed pieces use `encoding`; the rest are UTF-16LE. The main
    /// document is clipped to `ccpText` characters when that count is set.
    pub fn piece_text(
        &self,
        table: &PieceTable,
        encoding: &'static Encoding,
    ) -> Result<StructuredText, StructuredError> {
        let limit = self.fib.ccp_text;
        let mut text = String::new();
        let mut decoded = 0;
        let mut utf16_only = true;

        for piece in table.pieces() {
            if limit > 0 && piece.cp_start >= limit {
                break;
            }
            let start = piece.offset;
            let end = start.saturating_add(piece.clipped_byte_len(limit));
            let bytes = self
                .word_document
                .get(start..end)
                .ok_or(StructuredError::TextOutOfRange {
                    start,
                    end,
                    len: self.word_document.len(),
                })?;

            match piece.encoding {
                PieceEncoding::Compressed => {
                    utf16_only = false;
                    text.push_str(&decode_with(bytes, encoding));
                }
                PieceEncoding::Utf16 => text.push_str(&decode_utf16(bytes)),
            }
            decoded += 1;
        }

        if !has_meaningful_chars(&text) {
            return Err(StructuredError::NoMeaningfulText);
        }

        Ok(StructuredText {
            text,
            encoding: if utf16_only { UTF16LE_LABEL } else { encoding.name() },
            source: TextSource::Pieces(decoded),
        })
    }
}
