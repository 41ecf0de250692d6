//! Page framing for the multiplexed container.
//!
//! ## Page layout
//!
//! | bytes | field |
//! |-------|-------|
//! | 4     | capture pattern `OggS` |
//! | 1     | version (always written as 0) |
//! | 1     | header type flags |
//! | 8     | granule position |
//! | 4     | stream serial |
//! | 4     | page sequence number |
//! | 4     | CRC-32 checksum |
//! | 1     | segment count |
//! | n     | segment table |
//! | ...   | payload |
//!
//! All multi-byte fields are little-endian. Every page carries exactly one
//! packet: the segment table is a run of 255s closed by one entry below 255.

use oggtimeline_macros::ToBytes;

pub mod read;
pub mod write;

pub use read::PageReader;
pub use write::PageWriter;

/// Capture pattern opening every page.
pub const CAPTURE_PATTERN: [u8; 4] = *b"OggS";

/// Header bytes before the segment count.
pub const HEADER_LEN: usize = 26;

/// Offset of the checksum field inside the serialized header.
pub const CHECKSUM_OFFSET: usize = 22;

/// Largest payload a single page can frame (255 segments).
pub const MAX_PAYLOAD_LEN: usize = 255 * 255 - 1;

/// Decoded fixed-size part of a page header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ToBytes)]
pub struct PageHeader {
    pub capture_pattern: [u8; 4],
    pub version: u8,
    pub header_type: u8,
    pub granule_position: u64,
    pub serial: u32,
    pub sequence: u32,
    pub checksum: u32,
}

impl Default for PageHeader {
    fn default() -> Self {
        Self {
            capture_pattern: CAPTURE_PATTERN,
            version: 0,
            header_type: 0,
            granule_position: 0,
            serial: 0,
            sequence: 0,
            checksum: 0,
        }
    }
}

impl PageHeader {
    /// A plain page header for `serial` at `granule_position`.
    pub fn new(serial: u32, granule_position: u64, sequence: u32) -> Self {
        Self {
            granule_position,
            serial,
            sequence,
            ..Default::default()
        }
    }

    pub(crate) fn from_le_bytes(raw: &[u8; HEADER_LEN]) -> Self {
        Self {
            capture_pattern: le_array(raw, 0),
            version: raw[4],
            header_type: raw[5],
            granule_position: u64::from_le_bytes(le_array(raw, 6)),
            serial: u32::from_le_bytes(le_array(raw, 14)),
            sequence: u32::from_le_bytes(le_array(raw, 18)),
            checksum: u32::from_le_bytes(le_array(raw, CHECKSUM_OFFSET)),
        }
    }

    /// Header-region pages carry granule position zero.
    pub fn is_header(&self) -> bool {
        self.granule_position == 0
    }
}

#[inline]
fn le_array<const N: usize>(raw: &[u8; HEADER_LEN], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&raw[offset..offset + N]);
    out
}

/// Writes the segment table for a `len`-byte single-packet payload into
/// `dst`: the segment count, then `len / 255` entries of 255 and a closing
/// entry with the remainder (zero when `len` is a multiple of 255).
pub fn push_segment_table(dst: &mut Vec<u8>, len: usize) {
    let full = len / 255;
    dst.push((full + 1) as u8);
    dst.extend(std::iter::repeat_n(255u8, full));
    dst.push((len % 255) as u8);
}

/// Number of segment-table entries (excluding the count byte) for `len`.
pub const fn segment_count(len: usize) -> usize {
    len / 255 + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::byteorder::WriteBytesLe;

    #[test]
    fn header_round_trip_le() {
        let header = PageHeader {
            header_type: 0x02,
            granule_position: 0x0102_0304_0506_0708,
            serial: 0xAABB_CCDD,
            sequence: 7,
            checksum: 0x1122_3344,
            ..Default::default()
        };

        let mut bytes = Vec::new();
        header.write_le(&mut bytes);
        assert_eq!(bytes.len(), HEADER_LEN);
        assert_eq!(&bytes[..4], b"OggS");
        assert_eq!(bytes[6], 0x08);
        assert_eq!(bytes[CHECKSUM_OFFSET], 0x44);

        let raw: [u8; HEADER_LEN] = bytes.as_slice().try_into().unwrap();
        assert_eq!(PageHeader::from_le_bytes(&raw), header);
    }

    #[test]
    fn segment_table_lengths() {
        for (len, entries) in [(0, 1), (1, 1), (254, 1), (255, 2), (256, 2), (510, 3), (65_024, 255)] {
            let mut table = Vec::new();
            push_segment_table(&mut table, len);
            assert_eq!(segment_count(len), entries);
            assert_eq!(table[0] as usize, entries, "count byte for {len}");
            assert_eq!(table.len(), entries + 1);
            let sum: usize = table[1..].iter().map(|&s| s as usize).sum();
            assert_eq!(sum, len);
            assert!(table[1..].iter().rev().skip(1).all(|&s| s == 255));
            assert!(*table.last().unwrap() < 255);
        }
    }
}
