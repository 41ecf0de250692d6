//! Little-endian serialization for fixed-layout headers.
//!
//! The container stores every multi-byte field little-endian. That byte
//! order is fixed here and nowhere else; there is no big-endian counterpart.

pub trait WriteBytesLe {
    fn write_le(&self, dst: &mut Vec<u8>);
}

macro_rules! impl_num_le {
    ($($t:ty),+) => { $(
        impl WriteBytesLe for $t { #[inline] fn write_le(&self, dst: &mut Vec<u8>) { dst.extend_from_slice(&self.to_le_bytes()); }}
    )+ }
}

impl_num_le!(u8, u16, u32, u64);

impl<T: WriteBytesLe, const N: usize> WriteBytesLe for [T; N] {
    #[inline]
    fn write_le(&self, dst: &mut Vec<u8>) {
        self.iter().for_each(|item| item.write_le(dst));
    }
}

/// Reads a little-endian `u16` at `offset`, if the slice is long enough.
#[inline]
pub fn read_u16_le(bytes: &[u8], offset: usize) -> Option<u16> {
    let b = bytes.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_le_bytes([b[0], b[1]]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use oggtimeline_macros::ToBytes;

    #[derive(ToBytes)]
    struct Mini {
        a: u16,
        b: u32,
        tag: [u8; 4],
    }

    #[test]
    fn to_bytes_le() {
        let s = Mini {
            a: 0x1234,
            b: 0xABCDEF01,
            tag: *b"OggS",
        };

        let mut vec = Vec::new();
        s.write_le(&mut vec);

        let expected = [0x34, 0x12, 0x01, 0xEF, 0xCD, 0xAB, b'O', b'g', b'g', b'S'];
        assert_eq!(&vec[..], &expected);
    }

    #[test]
    fn read_helpers_bounds() {
        let bytes = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        assert_eq!(read_u16_le(&bytes, 0), Some(0x0201));
        assert_eq!(read_u16_le(&bytes, 6), Some(0x0807));
        assert_eq!(read_u16_le(&bytes, 7), None);
        assert_eq!(read_u16_le(&bytes, usize::MAX - 1), None);
    }
}
