use super::consts::*;
use super::file::{CompoundFile, OleError};
use crate::common::binary::{BinaryResult, parse_utf16le_string, read_u16_le, read_u32_le, read_u64_le};
use crate::common::encoding::decode_codepage_string;
use std::collections::HashMap;
use tracing::debug;

/// Upper bound on properties read from one section
const MAX_PROPERTIES: u32 = 1000;

/// Metadata extracted from OLE property streams
///
/// This struct contains standard properties from SummaryInformation
/// and DocumentSummaryInformation streams. Times are raw FILETIME values
/// (100ns ticks since 1601-01-01).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OleMetadata {
    // SummaryInformation properties
    pub codepage: Option<u32>,
    pub title: Option<String>,
    pub subject: Option<String>,
    pub author: Option<String>,
    pub keywords: Option<String>,
    pub comments: Option<String>,
    pub template: Option<String>,
    pub last_saved_by: Option<String>,
    pub revision_number: Option<String>,
    pub create_time: Option<u64>,
    pub last_saved_time: Option<u64>,
    pub num_pages: Option<u32>,
    pub num_words: Option<u32>,
    pub num_chars: Option<u32>,
    pub creating_application: Option<String>,
    pub security: Option<u32>,

    // DocumentSummaryInformation properties
    pub category: Option<String>,
    pub manager: Option<String>,
    pub company: Option<String>,
}

/// Property value types
///
/// 8-bit strings stay undecoded until the section codepage is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    I2(i16),
    I4(i32),
    UI2(u16),
    UI4(u32),
    Bool(bool),
    Lpstr(Vec<u8>),
    Lpwstr(String),
    Filetime(u64),
    Blob(Vec<u8>),
    Empty,
}

/// Decoded property section: PID to value, plus the section codepage (PID 1)
#[derive(Debug, Default)]
struct PropertySection {
    properties: HashMap<u32, PropertyValue>,
    codepage: Option<u32>,
}

impl PropertySection {
    fn string(&self, pid: u32) -> Option<String> {
        let text = match self.properties.get(&pid)? {
            PropertyValue::Lpstr(bytes) => decode_codepage_string(bytes, self.codepage),
            PropertyValue::Lpwstr(s) => s.clone(),
            _ => return None,
        };
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }

    fn filetime(&self, pid: u32) -> Option<u64> {
        match self.properties.get(&pid)? {
            PropertyValue::Filetime(v) if *v != 0 => Some(*v),
            _ => None,
        }
    }

    fn count(&self, pid: u32) -> Option<u32> {
        match self.properties.get(&pid)? {
            PropertyValue::I4(v) => u32::try_from(*v).ok(),
            PropertyValue::UI4(v) => Some(*v),
            _ => None,
        }
    }
}

impl CompoundFile {
    /// Parse metadata from the standard property streams.
    ///
    /// Missing or malformed streams leave the corresponding fields empty.
    pub fn metadata(&self) -> OleMetadata {
        let mut metadata = OleMetadata::default();

        match self.open_stream(SUMMARY_INFORMATION).and_then(|d| parse_property_stream(&d)) {
            Ok(section) => extract_summary_info(&mut metadata, &section),
            Err(e) => debug!("SummaryInformation unavailable: {e}"),
        }

        match self
            .open_stream(DOCUMENT_SUMMARY_INFORMATION)
            .and_then(|d| parse_property_stream(&d))
        {
            Ok(section) => extract_document_summary_info(&mut metadata, &section),
            Err(e) => debug!("DocumentSummaryInformation unavailable: {e}"),
        }

        metadata
    }
}

/// Parse the first section of a property stream ([MS-OLEPS] 2.20)
fn parse_property_stream(data: &[u8]) -> Result<PropertySection, OleError> {
    if data.len() < 48 {
        return Err(OleError::InvalidFormat("Property stream too short".to_string()));
    }

    // 28-byte header, then FMTID (16 bytes) and the section offset
    let section_offset = read_u32_le(data, 44)? as usize;
    let num_props = read_u32_le(data, section_offset.saturating_add(4))
        .map_err(|_| OleError::InvalidFormat("Invalid section offset".to_string()))?
        .min(MAX_PROPERTIES);

    let mut section = PropertySection::default();
    for i in 0..num_props as usize {
        let entry = section_offset + 8 + i * 8;
        let (Ok(prop_id), Ok(relative)) = (read_u32_le(data, entry), read_u32_le(data, entry + 4))
        else {
            break;
        };

        let value_offset = section_offset + relative as usize;
        let Ok(prop_type) = read_u16_le(data, value_offset) else {
            continue;
        };

        if let Ok(value) = parse_property_value(data, value_offset + 4, prop_type) {
            section.properties.insert(prop_id, value);
        }
    }

    section.codepage = match section.properties.get(&1) {
        // Codepages above 32767 (e.g. 65001) are commonly stored as VT_I2
        Some(PropertyValue::I2(v)) => Some(*v as u16 as u32),
        Some(PropertyValue::UI2(v)) => Some(*v as u32),
        _ => None,
    };

    Ok(section)
}

/// Borrow a length-prefixed byte run starting at `offset`
fn counted_bytes(data: &[u8], offset: usize, unit: usize) -> BinaryResult<&[u8]> {
    let count = read_u32_le(data, offset)? as usize;
    let start = offset + 4;
    let end = start.saturating_add(count.saturating_mul(unit));
    data.get(start..end).ok_or(crate::common::binary::BinaryError::InsufficientData {
        expected: end,
        available: data.len(),
    })
}

/// Parse a single property value based on its type
fn parse_property_value(data: &[u8], offset: usize, prop_type: u16) -> BinaryResult<PropertyValue> {
    let value = match prop_type {
        VT_I2 => PropertyValue::I2(read_u16_le(data, offset)? as i16),
        VT_I4 | VT_INT | VT_ERROR => PropertyValue::I4(read_u32_le(data, offset)? as i32),
        VT_UI2 => PropertyValue::UI2(read_u16_le(data, offset)?),
        VT_UI4 | VT_UINT => PropertyValue::UI4(read_u32_le(data, offset)?),
        VT_BOOL => PropertyValue::Bool(read_u16_le(data, offset)? != 0),
        VT_LPSTR | VT_BSTR => PropertyValue::Lpstr(counted_bytes(data, offset, 1)?.to_vec()),
        VT_LPWSTR => PropertyValue::Lpwstr(parse_utf16le_string(counted_bytes(data, offset, 2)?)),
        VT_FILETIME => PropertyValue::Filetime(read_u64_le(data, offset)?),
        VT_BLOB => PropertyValue::Blob(counted_bytes(data, offset, 1)?.to_vec()),
        VT_EMPTY | VT_NULL => PropertyValue::Empty,
        _ => PropertyValue::Empty,
    };
    Ok(value)
}

/// Extract SummaryInformation properties into metadata
fn extract_summary_info(metadata: &mut OleMetadata, section: &PropertySection) {
    metadata.codepage = section.codepage;
    metadata.title = section.string(2);
    metadata.subject = section.string(3);
    metadata.author = section.string(4);
    metadata.keywords = section.string(5);
    metadata.comments = section.string(6);
    metadata.template = section.string(7);
    metadata.last_saved_by = section.string(8);
    metadata.revision_number = section.string(9);
    metadata.create_time = section.filetime(12);
    metadata.last_saved_time = section.filetime(13);
    metadata.num_pages = section.count(14);
    metadata.num_words = section.count(15);
    metadata.num_chars = section.count(16);
    metadata.creating_application = section.string(18);
    metadata.security = section.count(19);
}

/// Extract DocumentSummaryInformation properties into metadata
fn extract_document_summary_info(metadata: &mut OleMetadata, section: &PropertySection) {
    metadata.category = section.string(2);
    metadata.manager = section.string(14);
    metadata.company = section.string(15);
}

/// Test helper that lays out a single-section property stream
#[cfg(test)]
pub(crate) fn build_property_stream(properties: &[(u32, u16, Vec<u8>)]) -> Vec<u8> {
    let mut out = vec![0u8; 48];
    out[0..2].copy_from_slice(&0xFFFEu16.to_le_bytes());
    out[24..28].copy_from_slice(&1u32.to_le_bytes()); // one section
    out[44..48].copy_from_slice(&48u32.to_le_bytes());

    let header_len = 8 + properties.len() * 8;
    let mut values = Vec::new();
    let mut index = Vec::new();
    for (pid, vt, payload) in properties {
        index.extend_from_slice(&pid.to_le_bytes());
        index.extend_from_slice(&((header_len + values.len()) as u32).to_le_bytes());
        values.extend_from_slice(&(*vt as u32).to_le_bytes());
        values.extend_from_slice(payload);
        while values.len() % 4 != 0 {
            values.push(0);
        }
    }

    let section_len = header_len + values.len();
    out.extend_from_slice(&(section_len as u32).to_le_bytes());
    out.extend_from_slice(&(properties.len() as u32).to_le_bytes());
    out.extend_from_slice(&index);
    out.extend_from_slice(&values);
    out
}

/// Payload for a counted 8-bit string property
#[cfg(test)]
pub(crate) fn lpstr(bytes: &[u8]) -> Vec<u8> {
    let mut payload = ((bytes.len() + 1) as u32).to_le_bytes().to_vec();
    payload.extend_from_slice(bytes);
    payload.push(0);
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ole::CompoundFileBuilder;

    #[test]
    fn test_lpstr_uses_section_codepage() {
        // "张三" in GBK
        let stream = build_property_stream(&[
            (1, VT_I2, 936u16.to_le_bytes().to_vec()),
            (2, VT_LPSTR, lpstr(b"Quarterly report")),
            (4, VT_LPSTR, lpstr(&[0xD5, 0xC5, 0xC8, 0xFD])),
            (12, VT_FILETIME, 132_000_000_000_000_000u64.to_le_bytes().to_vec()),
            (14, VT_I4, 3i32.to_le_bytes().to_vec()),
        ]);
        let section = parse_property_stream(&stream).unwrap();
        let mut metadata = OleMetadata::default();
        extract_summary_info(&mut metadata, &section);

        assert_eq!(metadata.codepage, Some(936));
        assert_eq!(metadata.title.as_deref(), Some("Quarterly report"));
        assert_eq!(metadata.author.as_deref(), Some("张三"));
        assert_eq!(metadata.create_time, Some(132_000_000_000_000_000));
        assert_eq!(metadata.num_pages, Some(3));
        assert_eq!(metadata.subject, None);
    }

    #[test]
    fn test_utf8_codepage_stored_as_signed() {
        let stream = build_property_stream(&[
            (1, VT_I2, (65001u16).to_le_bytes().to_vec()),
            (8, VT_LPSTR, lpstr("Zoë".as_bytes())),
        ]);
        let section = parse_property_stream(&stream).unwrap();
        assert_eq!(section.codepage, Some(65001));
        assert_eq!(section.string(8).as_deref(), Some("Zoë"));
    }

    #[test]
    fn test_truncated_stream_is_error() {
        assert!(parse_property_stream(&[0u8; 20]).is_err());
        let mut stream = build_property_stream(&[(2, VT_LPSTR, lpstr(b"title"))]);
        stream[44..48].copy_from_slice(&5000u32.to_le_bytes());
        assert!(parse_property_stream(&stream).is_err());
    }

    #[test]
    fn test_metadata_from_compound_file() {
        let summary = build_property_stream(&[
            (1, VT_I2, 1252u16.to_le_bytes().to_vec()),
            (4, VT_LPSTR, lpstr(b"Alice")),
            (18, VT_LPSTR, lpstr(b"Microsoft Office Word")),
        ]);
        let doc_summary = build_property_stream(&[(15, VT_LPSTR, lpstr(b"Acme"))]);

        let mut builder = CompoundFileBuilder::new();
        builder.create_stream("WordDocument", &[0u8; 16]).unwrap();
        builder.create_stream(SUMMARY_INFORMATION, &summary).unwrap();
        builder.create_stream(DOCUMENT_SUMMARY_INFORMATION, &doc_summary).unwrap();
        let cf = CompoundFile::open(builder.build().unwrap()).unwrap();

        let metadata = cf.metadata();
        assert_eq!(metadata.author.as_deref(), Some("Alice"));
        assert_eq!(metadata.creating_application.as_deref(), Some("Microsoft Office Word"));
        assert_eq!(metadata.company.as_deref(), Some("Acme"));
        assert_eq!(metadata.codepage, Some(1252));
    }

    #[test]
    fn test_missing_streams_yield_empty_metadata() {
        let mut builder = CompoundFileBuilder::new();
        builder.create_stream("WordDocument", &[0u8; 16]).unwrap();
        let cf = CompoundFile::open(builder.build().unwrap()).unwrap();
        assert_eq!(cf.metadata(), OleMetadata::default());
    }
}
