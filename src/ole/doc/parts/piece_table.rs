/// Piece table parser for DOC files.
///
/// The piece table maps character positions (CP) to byte offsets in the
/// WordDocument stream. It lives inside the CLX structure of the table
/// stream, after any number of Prc (property modifier) blocks.
///
/// References:
/// - [MS-DOC] 2.9.38 Clx
/// - [MS-DOC] 2.9.178 PlcPcd
/// - [MS-DOC] 2.9.177 Pcd
use super::fib::FileInformationBlock;
use crate::common::binary::{read_u16_le, read_u32_le};
use crate::ole::plcf::PlcfParser;
use thiserror::Error;

/// Size of a piece descriptor (Pcd) in bytes
pub const PIECE_DESCRIPTOR_SIZE: usize = 8;

const CLX_TAG_PRC: u8 = 0x01;
const CLX_TAG_PCDT: u8 = 0x02;

/// Bit 30 of `fc`: the piece holds 8-bit text at `(fc & !bit30) / 2`
const FC_COMPRESSED: u32 = 0x4000_0000;
const FC_MASK: u32 = 0x3FFF_FFFF;

/// Errors while locating or walking the CLX.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PieceTableError {
    #[error("Malformed piece table: CLX range {offset}+{len} outside table stream of {stream_len} bytes")]
    ClxOutOfRange {
        offset: u32,
        len: u32,
        stream_len: usize,
    },
    #[error("Malformed piece table: unknown CLX tag 0x{tag:02X} at byte {offset}")]
    UnknownTag { tag: u8, offset: usize },
    #[error("Malformed piece table: CLX truncated at byte {offset}")]
    Truncated { offset: usize },
    #[error("Malformed piece table: character positions decrease")]
    DecreasingPositions,
    #[error("Malformed piece table: no pieces")]
    Empty,
}

/// How the bytes of a piece are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PieceEncoding {
    /// 8-bit text in the document codepage
    Compressed,
    /// UTF-16LE
    Utf16,
}

impl PieceEncoding {
    #[inline]
    pub fn bytes_per_char(self) -> usize {
        match self {
            PieceEncoding::Compressed => 1,
            PieceEncoding::Utf16 => 2,
        }
    }
}

/// One run of text: `[cp_start, cp_end)` stored at `offset` in WordDocument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PieceDescriptor {
    pub cp_start: u32,
    pub cp_end: u32,
    /// Byte offset in the WordDocument stream
    pub offset: usize,
    pub encoding: PieceEncoding,
}

impl PieceDescriptor {
    /// Decode a Pcd. `fc` is at byte 2; bytes 0-1 and 6-7 are flags and prm.
    fn from_pcd(cp_start: u32, cp_end: u32, pcd: &[u8]) -> Option<Self> {
        let fc = read_u32_le(pcd, 2).ok()?;
        let (offset, encoding) = if fc & FC_COMPRESSED != 0 {
            ((fc & FC_MASK) / 2, PieceEncoding::Compressed)
        } else {
            (fc, PieceEncoding::Utf16)
        };
        Some(Self {
            cp_start,
            cp_end,
            offset: offset as usize,
            encoding,
        })
    }

    /// Length in characters.
    #[inline]
    pub fn char_len(&self) -> u32 {
        self.cp_end - self.cp_start
    }

    /// Length in bytes.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.clipped_byte_len(0)
    }

    /// Bytes of this piece that fall before character position `limit`.
    ///
    /// A `limit` of zero means no limit.
    #[inline]
    pub fn clipped_byte_len(&self, limit: u32) -> usize {
        let cp_end = if limit > 0 { self.cp_end.min(limit) } else { self.cp_end };
        cp_end.saturating_sub(self.cp_start) as usize * self.encoding.bytes_per_char()
    }

    #[inline]
    pub fn is_compressed(&self) -> bool {
        self.encoding == PieceEncoding::Compressed
    }
}

/// Piece descriptors in table order.
#[derive(Debug, Clone)]
pub struct PieceTable {
    pieces: Vec<PieceDescriptor>,
}

impl PieceTable {
    /// Locate the CLX through the FIB and parse it.
    pub fn extract(table_stream: &[u8], fib: &FileInformationBlock) -> Result<Self, PieceTableError> {
        let out_of_range = || PieceTableError::ClxOutOfRange {
            offset: fib.fc_clx,
            len: fib.lcb_clx,
            stream_len: table_stream.len(),
        };

        let start = fib.fc_clx as usize;
        let end = start.checked_add(fib.lcb_clx as usize).ok_or_else(out_of_range)?;
        if fib.lcb_clx == 0 {
            return Err(out_of_range());
        }
        let clx = table_stream.get(start..end).ok_or_else(out_of_range)?;

        Self::parse_clx(clx)
    }

    /// Walk the CLX tags: skip every Prc and parse the terminal Pcdt.
    pub fn parse_clx(clx: &[u8]) -> Result<Self, PieceTableError> {
        let mut offset = 0;

        loop {
            let Some(&tag) = clx.get(offset) else {
                return Err(PieceTableError::Truncated { offset });
            };

            match tag {
                CLX_TAG_PRC => {
                    let size = read_u16_le(clx, offset + 1)
                        .map_err(|_| PieceTableError::Truncated { offset })?
                        as usize;
                    offset += 3 + size;
                    if offset > clx.len() {
                        return Err(PieceTableError::Truncated { offset: clx.len() });
                    }
                }
                CLX_TAG_PCDT => {
                    let lcb = read_u32_le(clx, offset + 1)
                        .map_err(|_| PieceTableError::Truncated { offset })?
                        as usize;
                    let body = offset + 5;
                    let plc = body
                        .checked_add(lcb)
                        .and_then(|end| clx.get(body..end))
                        .ok_or(PieceTableError::Truncated { offset: clx.len() })?;
                    return Self::parse_plc_pcd(plc);
                }
                other => return Err(PieceTableError::UnknownTag { tag: other, offset }),
            }
        }
    }

    fn parse_plc_pcd(plc: &[u8]) -> Result<Self, PieceTableError> {
        let plcf = PlcfParser::parse(plc, PIECE_DESCRIPTOR_SIZE).ok_or(PieceTableError::Empty)?;
        if plcf.count() == 0 {
            return Err(PieceTableError::Empty);
        }
        if !plcf.is_monotonic() {
            return Err(PieceTableError::DecreasingPositions);
        }

        let pieces = (0..plcf.count())
            .filter_map(|i| {
                let (cp_start, cp_end) = plcf.range(i)?;
                PieceDescriptor::from_pcd(cp_start, cp_end, plcf.element(i)?)
            })
            .collect();

        Ok(Self { pieces })
    }

    #[inline]
    pub fn pieces(&self) -> &[PieceDescriptor] {
        &self.pieces
    }

    /// Last CP covered by the table.
    pub fn total_cps(&self) -> u32 {
        self.pieces.last().map(|p| p.cp_end).unwrap_or(0)
    }
}

/// Build a CLX holding an optional Prc block and a Pcdt.
///
/// `pieces` are `(cp_start, cp_end, fc)` with `fc` in raw Pcd form.
#[cfg(test)]
pub(crate) fn clx_bytes(prc: Option<&[u8]>, pieces: &[(u32, u32, u32)]) -> Vec<u8> {
    let mut clx = Vec::new();
    if let Some(prc) = prc {
        clx.push(CLX_TAG_PRC);
        clx.extend_from_slice(&(prc.len() as u16).to_le_bytes());
        clx.extend_from_slice(prc);
    }

    let mut plc = Vec::new();
    for (cp_start, _, _) in pieces {
        plc.extend_from_slice(&cp_start.to_le_bytes());
    }
    if let Some((_, cp_end, _)) = pieces.last() {
        plc.extend_from_slice(&cp_end.to_le_bytes());
    }
    for (_, _, fc) in pieces {
        plc.extend_from_slice(&[0, 0]);
        plc.extend_from_slice(&fc.to_le_bytes());
        plc.extend_from_slice(&[0, 0]);
    }

    clx.push(CLX_TAG_PCDT);
    clx.extend_from_slice(&(plc.len() as u32).to_le_bytes());
    clx.extend_from_slice(&plc);
    clx
}
