//! Candidate decodings of raw bytes.
//!
//! A byte buffer with no trustworthy encoding declaration is decoded several
//! ways: with the declared codepage, as whitelisted UTF-16LE, and with the
//! generic UTF-8 and windows-1252 fallbacks. [`crate::text::scorer`] picks
//! the winner.

use super::charclass::{cjk_count, is_cjk, is_cjk_punctuation, map_decoded_control};
use crate::common::encoding::encoding_for_codepage;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use smallvec::SmallVec;

/// Label reported for the whitelisted UTF-16LE candidate
pub const UTF16LE_LABEL: &str = "UTF-16LE";

/// One decoding of a byte buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeCandidate {
    /// Encoding label, e.g. `GBK` or `UTF-16LE`
    pub encoding: &'static str,
    pub text: String,
    pub char_count: usize,
    pub cjk_count: usize,
    pub cjk_density: f64,
}

impl DecodeCandidate {
    pub fn new(encoding: &'static str, text: String) -> Self {
        let char_count = text.chars().count();
        let cjk = cjk_count(&text);
        let cjk_density = if char_count == 0 {
            0.0
        } else {
            cjk as f64 / char_count as f64
        };
        Self {
            encoding,
            text,
            char_count,
            cjk_count: cjk,
            cjk_density,
        }
    }

    #[inline]
    pub fn has_cjk(&self) -> bool {
        self.cjk_count > 0
    }
}

/// Decode with an 8-bit or UTF-8 encoding and normalize controls.
pub fn decode_with(bytes: &[u8], encoding: &'static Encoding) -> String {
    let (text, _) = encoding.decode_without_bom_handling(bytes);
    text.chars().filter_map(map_decoded_control).collect()
}

#[inline]
fn utf16_units(bytes: &[u8]) -> impl Iterator<Item = u16> + '_ {
    bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
}

/// Decode UTF-16LE keeping only printable ASCII, CJK ideographs, CJK
/// punctuation and fullwidth forms. Paragraph and cell controls are mapped.
pub fn decode_utf16_whitelisted(bytes: &[u8]) -> String {
    utf16_units(bytes)
        .filter_map(|unit| {
            let c = char::from_u32(unit as u32)?;
            match c {
                ' '..='~' => Some(c),
                c if is_cjk(c) || is_cjk_punctuation(c) => Some(c),
                c if c.is_control() => map_decoded_control(c),
                _ => None,
            }
        })
        .collect()
}

/// Decode UTF-16LE text runs, keeping everything except controls.
pub fn decode_utf16(bytes: &[u8]) -> String {
    char::decode_utf16(utf16_units(bytes))
        .filter_map(Result::ok)
        .filter_map(map_decoded_control)
        .collect()
}

/// Produce every candidate decoding of `bytes`, in fixed order.
///
/// The declared codepage (GBK when absent or unknown) comes first, then
/// whitelisted UTF-16LE, then UTF-8 and windows-1252 unless one of them is
/// the declared encoding.
pub fn decode_candidates(bytes: &[u8], declared: Option<u32>) -> SmallVec<[DecodeCandidate; 4]> {
    let primary = encoding_for_codepage(declared);
    let mut candidates = SmallVec::new();

    candidates.push(DecodeCandidate::new(primary.name(), decode_with(bytes, primary)));
    candidates.push(DecodeCandidate::new(UTF16LE_LABEL, decode_utf16_whitelisted(bytes)));

    for fallback in [UTF_8, WINDOWS_1252] {
        if fallback != primary {
            candidates.push(DecodeCandidate::new(fallback.name(), decode_with(bytes, fallback)));
        }
    }

    candidates
}
