//! Bit-level reading for codec identification headers.

use std::io;
use std::io::SeekFrom;

use bitstream_io::{BigEndian, BitRead, BitReader, UnsignedInteger};

#[derive(Debug)]
pub struct BitstreamIoReader<R: io::Read + io::Seek> {
    bs: BitReader<R, BigEndian>,
    len: u64,
}

pub type BsIoSliceReader<'a> = BitstreamIoReader<io::Cursor<&'a [u8]>>;

impl<R> BitstreamIoReader<R>
where
    R: io::Read + io::Seek,
{
    pub fn new(read: R, len_bytes: u64) -> Self {
        Self {
            bs: BitReader::new(read),
            len: len_bytes << 3,
        }
    }

    #[inline(always)]
    pub fn get(&mut self) -> io::Result<bool> {
        self.bs.read_bit()
    }

    #[inline(always)]
    pub fn get_n<I: UnsignedInteger>(&mut self, n: u32) -> io::Result<I> {
        if n as u64 > self.available()? {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "get_n({}): out of bounds bits at {}",
                    n,
                    self.bs.position_in_bits().unwrap_or(0)
                ),
            ));
        }

        self.bs.read_unsigned_var(n)
    }

    /// Moves to an absolute byte offset.
    #[inline(always)]
    pub fn seek_to_byte(&mut self, offset: u64) -> io::Result<u64> {
        if offset << 3 > self.len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("seek_to_byte({offset}): beyond {} bits", self.len),
            ));
        }

        self.bs.seek_bits(SeekFrom::Start(offset << 3))
    }

    #[inline(always)]
    pub fn skip_n(&mut self, n: u32) -> io::Result<()> {
        if n as u64 > self.available()? {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "skip_n: out of bounds bits",
            ));
        }

        self.bs.skip(n)
    }

    #[inline(always)]
    pub fn available(&mut self) -> io::Result<u64> {
        self.bs
            .position_in_bits()
            .map(|pos| self.len.saturating_sub(pos))
    }

    #[inline(always)]
    pub fn position(&mut self) -> io::Result<u64> {
        self.bs.position_in_bits()
    }
}

impl<'a> BsIoSliceReader<'a> {
    pub fn from_slice(buf: &'a [u8]) -> Self {
        let len = buf.len() as u64;
        let read = io::Cursor::new(buf);

        Self::new(read, len)
    }
}

impl Default for BsIoSliceReader<'_> {
    fn default() -> Self {
        Self::from_slice(&[])
    }
}

#[test]
fn bounded_reads() -> io::Result<()> {
    let data = [0b1010_0000, 0xFF];
    let mut reader = BsIoSliceReader::from_slice(&data);

    assert!(reader.get()?);
    assert!(!reader.get()?);
    assert_eq!(reader.get_n::<u8>(2)?, 0b10);
    reader.skip_n(4)?;
    assert_eq!(reader.position()?, 8);
    assert_eq!(reader.get_n::<u8>(8)?, 0xFF);
    assert!(reader.get_n::<u8>(1).is_err());

    reader.seek_to_byte(0)?;
    assert_eq!(reader.get_n::<u16>(16)?, 0xA0FF);
    assert!(reader.seek_to_byte(3).is_err());
    Ok(())
}
