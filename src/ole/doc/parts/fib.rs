/// File Information Block (FIB) parser for DOC files.
///
/// The FIB sits at offset 0 of the `WordDocument` stream. Only the fields the
/// text path needs are decoded eagerly; the rest of the FibRgFcLcb pointer
/// array is reachable through [`FileInformationBlock::table_pointer`].
use crate::common::binary::{read_u16_le, read_u32_le};
use bitflags::bitflags;
use std::ops::Range;
use thiserror::Error;

/// Smallest `WordDocument` stream that can hold a Word 97 FIB
pub const FIB_MIN_SIZE: usize = 0x200;

/// `wIdent` of Word 97 and later
pub const WORD_BINARY_IDENT: u16 = 0xA5EC;

/// Start of the FibRgFcLcb97 (fc, lcb) pair array
const FIB_RG_FC_LCB_OFFSET: usize = 154;

/// Index of the `fcClx`/`lcbClx` pair in the FibRgFcLcb array
pub const CLX_POINTER_INDEX: usize = 33;

/// Bytes of the stream kept for pointer lookups
const FIB_RETAINED_SIZE: usize = 0x800;

bitflags! {
    /// Flags word at offset 0x0A.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FibFlags: u16 {
        /// fComplex: the document was fast-saved
        const COMPLEX = 0x0004;
        /// fEncrypted
        const ENCRYPTED = 0x0100;
        /// fWhichTblStm: table stream is `1Table` instead of `0Table`
        const ALTERNATE_TABLE = 0x0200;
    }
}

/// Reasons a `WordDocument` stream is not a usable FIB.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FibError {
    #[error("WordDocument stream too short for FIB: {len} bytes")]
    TooShort { len: usize },
    #[error("Invalid FIB magic number: 0x{0:04X}")]
    BadIdent(u16),
}

/// File Information Block.
#[derive(Debug, Clone)]
pub struct FileInformationBlock {
    /// File format version
    pub nfib: u16,
    /// Language ID
    pub lid: u16,
    pub flags: FibFlags,
    /// Byte offset of the first text character
    pub fc_min: u32,
    /// Main-document character count
    pub ccp_text: u32,
    /// CLX offset in the table stream
    pub fc_clx: u32,
    /// CLX length in bytes
    pub lcb_clx: u32,
    /// FIB prefix retained for generic pointer lookups
    raw: Vec<u8>,
}

impl FileInformationBlock {
    /// Parse a FIB from the WordDocument stream.
    pub fn parse(word_document: &[u8]) -> Result<Self, FibError> {
        if word_document.len() < FIB_MIN_SIZE {
            return Err(FibError::TooShort {
                len: word_document.len(),
            });
        }

        let field = |offset| read_u32_le(word_document, offset).unwrap_or(0);
        let half = |offset| read_u16_le(word_document, offset).unwrap_or(0);

        let ident = half(0x00);
        if ident != WORD_BINARY_IDENT {
            return Err(FibError::BadIdent(ident));
        }

        let raw = word_document[..word_document.len().min(FIB_RETAINED_SIZE)].to_vec();
        let mut fib = Self {
            nfib: half(0x02),
            lid: half(0x06),
            flags: FibFlags::from_bits_retain(half(0x0A)),
            fc_min: field(0x18),
            ccp_text: field(0x4C),
            fc_clx: 0,
            lcb_clx: 0,
            raw,
        };
        if let Some((fc, lcb)) = fib.table_pointer(CLX_POINTER_INDEX) {
            fib.fc_clx = fc;
            fib.lcb_clx = lcb;
        }

        Ok(fib)
    }

    /// Read an `(fc, lcb)` pair from the FibRgFcLcb array.
    ///
    /// Returns `None` when the entry lies beyond the retained FIB bytes.
    pub fn table_pointer(&self, index: usize) -> Option<(u32, u32)> {
        let entry = FIB_RG_FC_LCB_OFFSET.checked_add(index.checked_mul(8)?)?;
        let fc = read_u32_le(&self.raw, entry).ok()?;
        let lcb = read_u32_le(&self.raw, entry + 4).ok()?;
        Some((fc, lcb))
    }

    /// Name of the table stream the FIB points at.
    #[inline]
    pub fn table_stream_name(&self) -> &'static str {
        if self.flags.contains(FibFlags::ALTERNATE_TABLE) {
            "1Table"
        } else {
            "0Table"
        }
    }

    #[inline]
    pub fn is_complex(&self) -> bool {
        self.flags.contains(FibFlags::COMPLEX)
    }

    #[inline]
    pub fn is_encrypted(&self) -> bool {
        self.flags.contains(FibFlags::ENCRYPTED)
    }

    /// Byte range `[fcMin, fcMin + ccpText)` of contiguous text.
    ///
    /// `None` when the range does not fit inside a stream of `stream_len`
    /// bytes.
    pub fn simple_text_range(&self, stream_len: usize) -> Option<Range<usize>> {
        let start = self.fc_min as usize;
        let end = start.checked_add(self.ccp_text as usize)?;
        (end <= stream_len).then_some(start..end)
    }
}

#[cfg(test)]
pub(crate) fn fib_bytes(len: usize, flags: u16, fc_min: u32, ccp_text: u32) -> Vec<u8> {
    let mut data = vec![0u8; len.max(FIB_MIN_SIZE)];
    data[0..2].copy_from_slice(&WORD_BINARY_IDENT.to_le_bytes());
    data[2..4].copy_from_slice(&0x00C1u16.to_le_bytes());
    data[6..8].copy_from_slice(&0x0804u16.to_le_bytes());
    data[0x0A..0x0C].copy_from_slice(&flags.to_le_bytes());
    data[0x18..0x1C].copy_from_slice(&fc_min.to_le_bytes());
    data[0x4C..0x50].copy_from_slice(&ccp_text.to_le_bytes());
    data
}
