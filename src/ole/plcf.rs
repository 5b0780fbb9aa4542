//! Property List with Character Positions (PLCF) parser.
//!
//! A PLCF stores `n + 1` character positions followed by `n` fixed-size
//! elements. The Word piece table (PlcPcd) is one of them.

use crate::common::binary;
use bytes::Bytes;

/// Parsed PLCF with its elements kept in one shared buffer.
///
/// # Examples
///
/// ```
/// use docsift::ole::plcf::PlcfParser;
///
/// // CPs: 0, 10, 20; elements: [1, 2], [3, 4]
/// let data = [
///     0x00, 0x00, 0x00, 0x00,
///     0x0A, 0x00, 0x00, 0x00,
///     0x14, 0x00, 0x00, 0x00,
///     0x01, 0x02,
///     0x03, 0x04,
/// ];
///
/// let plcf = PlcfParser::parse(&data, 2).unwrap();
/// assert_eq!(plcf.count(), 2);
/// assert_eq!(plcf.range(1), Some((10, 20)));
/// assert_eq!(plcf.element(0), Some(&[0x01, 0x02][..]));
/// ```
#[derive(Debug, Clone)]
pub struct PlcfParser {
    /// Character positions (CP array)
    positions: Vec<u32>,
    /// Element bytes, `element_size` each
    elements: Bytes,
    element_size: usize,
}

impl PlcfParser {
    /// Parse a PLCF from `data` with elements of `element_size` bytes.
    ///
    /// Returns `None` when the buffer cannot hold even one CP or the element
    /// size is zero. Trailing bytes beyond the last element are ignored.
    pub fn parse(data: &[u8], element_size: usize) -> Option<Self> {
        if data.len() < 4 || element_size == 0 {
            return None;
        }

        // n+1 CPs (4 bytes each) + n elements
        let n = (data.len() - 4) / (4 + element_size);

        let positions = (0..=n)
            .map(|i| binary::read_u32_le(data, i * 4).ok())
            .collect::<Option<Vec<u32>>>()?;

        let start = (n + 1) * 4;
        let elements = Bytes::copy_from_slice(data.get(start..start + n * element_size)?);

        Some(Self {
            positions,
            elements,
            element_size,
        })
    }

    /// Number of elements.
    #[inline]
    pub fn count(&self) -> usize {
        self.positions.len().saturating_sub(1)
    }

    #[inline]
    pub fn position(&self, index: usize) -> Option<u32> {
        self.positions.get(index).copied()
    }

    /// Element bytes at `index`.
    #[inline]
    pub fn element(&self, index: usize) -> Option<&[u8]> {
        let start = index.checked_mul(self.element_size)?;
        self.elements.get(start..start + self.element_size)
    }

    /// `(start_cp, end_cp)` covered by the element at `index`.
    pub fn range(&self, index: usize) -> Option<(u32, u32)> {
        if index >= self.count() {
            return None;
        }
        Some((self.positions[index], self.positions[index + 1]))
    }

    /// True when CPs never decrease.
    pub fn is_monotonic(&self) -> bool {
        self.positions.windows(2).all(|w| w[0] <= w[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plcf_parser() {
        let data = vec![
            0x00, 0x00, 0x00, 0x00, // CP 0
            0x0A, 0x00, 0x00, 0x00, // CP 10
            0x14, 0x00, 0x00, 0x00, // CP 20
            0x01, 0x02, // element 0
            0x03, 0x04, // element 1
        ];

        let plcf = PlcfParser::parse(&data, 2).unwrap();
        assert_eq!(plcf.count(), 2);
        assert_eq!(plcf.position(2), Some(20));
        assert_eq!(plcf.range(0), Some((0, 10)));
        assert_eq!(plcf.range(2), None);
        assert_eq!(plcf.element(1), Some(&[0x03, 0x04][..]));
        assert!(plcf.is_monotonic());
    }

    #[test]
    fn test_single_cp_has_no_elements() {
        let plcf = PlcfParser::parse(&[5, 0, 0, 0], 8).unwrap();
        assert_eq!(plcf.count(), 0);
        assert_eq!(plcf.range(0), None);
        assert!(PlcfParser::parse(&[1, 2], 8).is_none());
        assert!(PlcfParser::parse(&[0; 16], 0).is_none());
    }

    #[test]
    fn test_decreasing_positions_detected() {
        let data = [10, 0, 0, 0, 5, 0, 0, 0, 0xAA];
        let plcf = PlcfParser::parse(&data, 1).unwrap();
        assert!(!plcf.is_monotonic());
    }
}
