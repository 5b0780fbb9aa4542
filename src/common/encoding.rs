//! Codepage table and codepage-driven decoding.
//!
//! Legacy Word binaries rarely declare their 8-bit encoding in a way that can be
//! trusted, and the documents this crate targets are overwhelmingly Chinese,
//! Japanese or Korean. The table below is therefore deliberately small and any
//! codepage it does not know resolves to GBK.

use encoding_rs::Encoding;
use phf::phf_map;

/// Codepage used when nothing is declared or the declared value is unknown.
pub const DEFAULT_CODEPAGE: u32 = 936;

/// Fixed mapping from Windows codepage identifiers to WHATWG encoding labels.
///
/// Shared immutably by every extraction running in the process.
static CODEPAGE_LABELS: phf::Map<u32, &'static str> = phf_map! {
    936u32 => "gbk",
    950u32 => "big5",
    932u32 => "shift_jis",
    949u32 => "euc-kr",
    1252u32 => "windows-1252",
    1251u32 => "windows-1251",
    65001u32 => "utf-8",
};

/// Map a Windows codepage identifier to an `encoding_rs` encoding.
///
/// Returns `None` for codepages outside the fixed table.
///
/// # Examples
/// ```
/// use docsift::common::encoding::codepage_to_encoding;
///
/// let encoding = codepage_to_encoding(936).unwrap();
/// assert_eq!(encoding.name(), "GBK");
/// assert!(codepage_to_encoding(437).is_none());
/// ```
#[inline]
pub fn codepage_to_encoding(codepage: u32) -> Option<&'static Encoding> {
    CODEPAGE_LABELS
        .get(&codepage)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
}

/// Resolve a possibly-absent declared codepage, defaulting to GBK.
///
/// # Examples
/// ```
/// use docsift::common::encoding::encoding_for_codepage;
///
/// assert_eq!(encoding_for_codepage(Some(950)).name(), "Big5");
/// assert_eq!(encoding_for_codepage(Some(12345)).name(), "GBK");
/// assert_eq!(encoding_for_codepage(None).name(), "GBK");
/// ```
#[inline]
pub fn encoding_for_codepage(codepage: Option<u32>) -> &'static Encoding {
    codepage
        .and_then(codepage_to_encoding)
        .unwrap_or(encoding_rs::GBK)
}

/// Strip everything from the first NUL byte onwards.
///
/// This is a zero-copy operation that returns a slice view.
#[inline]
pub fn strip_null_terminators(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    &bytes[..end]
}

/// Decode a NUL-terminated 8-bit string with the given codepage.
///
/// Used for property-set strings, whose codepage is stored alongside them.
pub fn decode_codepage_string(bytes: &[u8], codepage: Option<u32>) -> String {
    let bytes = strip_null_terminators(bytes);
    if bytes.is_empty() {
        return String::new();
    }
    let (text, _) = encoding_for_codepage(codepage).decode_without_bom_handling(bytes);
    text.into_owned()
}
