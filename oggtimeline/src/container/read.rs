use std::io::{self, Read};

use log::{debug, trace};

use crate::container::{CAPTURE_PATTERN, CHECKSUM_OFFSET, HEADER_LEN, PageHeader};
use crate::utils::crc::OGG_PAGE_CRC;
use crate::utils::errors::ContainerError;

/// Reads pages one at a time from a byte stream.
///
/// The reader is a cursor: [`next_page`](Self::next_page) replaces the
/// current page, and [`header`](Self::header) / [`payload`](Self::payload)
/// expose it until the next call. The payload buffer is reused and only ever
/// grows.
///
/// A bad capture pattern or a short read anywhere in a page ends the stream.
/// Nothing of the partial page is kept.
///
/// # Example
///
/// ```rust
/// use oggtimeline::container::{PageHeader, PageReader, PageWriter};
///
/// let mut writer = PageWriter::new(Vec::new());
/// writer.write_page(&PageHeader::new(5, 960, 0), b"payload")?;
///
/// let bytes = writer.into_inner();
/// let mut reader = PageReader::new(bytes.as_slice());
/// assert!(reader.next_page()?);
/// assert_eq!(reader.header().granule_position, 960);
/// assert_eq!(reader.payload(), b"payload");
/// assert!(!reader.next_page()?);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct PageReader<R: Read> {
    inner: R,
    header: PageHeader,
    raw_header: [u8; HEADER_LEN],
    segments: [u8; 255],
    segment_count: usize,
    payload: Vec<u8>,
    payload_len: usize,
    pages_read: u64,
    bytes_read: u64,
    exhausted: bool,
}

impl<R: Read> PageReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            header: PageHeader::default(),
            raw_header: [0; HEADER_LEN],
            segments: [0; 255],
            segment_count: 0,
            payload: Vec::new(),
            payload_len: 0,
            pages_read: 0,
            bytes_read: 0,
            exhausted: false,
        }
    }

    /// Advances to the next page.
    ///
    /// Returns `Ok(false)` at end of input, which includes framing errors and
    /// truncated pages. Only a failure to grow the payload buffer is an error.
    pub fn next_page(&mut self) -> Result<bool, ContainerError> {
        if self.exhausted {
            return Ok(false);
        }

        match self.read_page() {
            Ok(true) => {
                self.pages_read += 1;
                Ok(true)
            }
            Ok(false) => {
                self.end_of_input();
                Ok(false)
            }
            Err(e) => {
                self.end_of_input();
                Err(e)
            }
        }
    }

    fn read_page(&mut self) -> Result<bool, ContainerError> {
        let mut raw = [0u8; HEADER_LEN];

        if !self.fill(&mut raw[..5]) {
            return Ok(false);
        }
        if raw[..4] != CAPTURE_PATTERN {
            debug!(
                "No capture pattern after {} pages ({:02X?}), treating as end of input",
                self.pages_read,
                &raw[..4]
            );
            return Ok(false);
        }

        if !self.fill(&mut raw[5..]) {
            return Ok(false);
        }

        let mut count = [0u8; 1];
        if !self.fill(&mut count) {
            return Ok(false);
        }

        let segment_count = count[0] as usize;
        let mut segments = [0u8; 255];
        if !self.fill(&mut segments[..segment_count]) {
            return Ok(false);
        }

        let len = segments[..segment_count]
            .iter()
            .map(|&s| s as usize)
            .sum::<usize>();
        self.reserve_payload(len)?;

        if !read_fully(&mut self.inner, &mut self.bytes_read, &mut self.payload[..len]) {
            return Ok(false);
        }

        self.header = PageHeader::from_le_bytes(&raw);
        self.raw_header = raw;
        self.segments = segments;
        self.segment_count = segment_count;
        self.payload_len = len;

        trace!(
            "page serial={} granule={} seq={} len={}",
            self.header.serial, self.header.granule_position, self.header.sequence, len
        );

        Ok(true)
    }

    fn reserve_payload(&mut self, len: usize) -> Result<(), ContainerError> {
        if len > self.payload.len() {
            self.payload
                .try_reserve_exact(len - self.payload.len())
                .map_err(|_| ContainerError::Allocation(len))?;
            self.payload.resize(len, 0);
        }

        Ok(())
    }

    fn fill(&mut self, buf: &mut [u8]) -> bool {
        read_fully(&mut self.inner, &mut self.bytes_read, buf)
    }

    fn end_of_input(&mut self) {
        self.exhausted = true;
        self.payload_len = 0;
        self.segment_count = 0;
    }

    /// Header of the current page.
    pub fn header(&self) -> &PageHeader {
        &self.header
    }

    /// Mutable header of the current page, for re-stamping before a write.
    pub fn header_mut(&mut self) -> &mut PageHeader {
        &mut self.header
    }

    /// Payload of the current page.
    pub fn payload(&self) -> &[u8] {
        &self.payload[..self.payload_len]
    }

    /// Mutable payload of the current page, for in-place header patches.
    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.payload[..self.payload_len]
    }

    /// Whether the input has ended.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn pages_read(&self) -> u64 {
        self.pages_read
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Capacity of the reusable payload buffer.
    pub fn buffer_capacity(&self) -> usize {
        self.payload.len()
    }

    /// Recomputes the checksum of the current page as it was read and
    /// compares it with the transmitted one.
    pub fn checksum_matches(&self) -> bool {
        let mut raw = self.raw_header;
        raw[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 4].fill(0);

        let count = [self.segment_count as u8];
        let crc = OGG_PAGE_CRC.update(OGG_PAGE_CRC.init, &raw);
        let crc = OGG_PAGE_CRC.update(crc, &count);
        let crc = OGG_PAGE_CRC.update(crc, &self.segments[..self.segment_count]);
        let crc = OGG_PAGE_CRC.update(crc, self.payload());

        crc == self.header.checksum
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

fn read_fully<R: Read>(inner: &mut R, bytes_read: &mut u64, buf: &mut [u8]) -> bool {
    match inner.read_exact(buf) {
        Ok(()) => {
            *bytes_read += buf.len() as u64;
            true
        }
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => false,
        Err(e) => {
            debug!("Read failed, treating as end of input: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{PageWriter, segment_count};
    use anyhow::Result;

    fn pages(payloads: &[&[u8]]) -> Result<Vec<u8>> {
        let mut writer = PageWriter::new(Vec::new());
        for (i, payload) in payloads.iter().enumerate() {
            writer.write_page(&PageHeader::new(1, 960 * i as u64, i as u32), payload)?;
        }
        Ok(writer.into_inner())
    }

    #[test]
    fn bad_capture_pattern_ends_input() -> Result<()> {
        let mut bytes = pages(&[b"first", b"second"])?;
        let second = HEADER_LEN + 1 + segment_count(5) + 5;
        bytes[second] = b'X';

        let mut reader = PageReader::new(bytes.as_slice());
        assert!(reader.next_page()?);
        assert!(!reader.next_page()?);
        assert!(reader.is_exhausted());
        assert!(reader.payload().is_empty());
        assert!(!reader.next_page()?);
        assert_eq!(reader.pages_read(), 1);
        Ok(())
    }

    #[test]
    fn short_reads_end_input() -> Result<()> {
        let bytes = pages(&[b"0123456789"])?;

        // Cut inside the header, inside the segment table and inside the payload.
        for cut in [3, 10, HEADER_LEN + 1, bytes.len() - 1] {
            let mut reader = PageReader::new(&bytes[..cut]);
            assert!(!reader.next_page()?, "cut at {cut}");
            assert_eq!(reader.pages_read(), 0);
        }
        Ok(())
    }

    #[test]
    fn payload_buffer_only_grows() -> Result<()> {
        let big = vec![7u8; 600];
        let bytes = pages(&[&big, b"tiny", b""])?;

        let mut reader = PageReader::new(bytes.as_slice());
        assert!(reader.next_page()?);
        assert_eq!(reader.payload().len(), 600);
        assert!(reader.next_page()?);
        assert_eq!(reader.payload(), b"tiny");
        assert_eq!(reader.buffer_capacity(), 600);
        assert!(reader.next_page()?);
        assert!(reader.payload().is_empty());
        assert_eq!(reader.buffer_capacity(), 600);
        Ok(())
    }

    #[test]
    fn payload_can_be_patched_in_place() -> Result<()> {
        let bytes = pages(&[b"OpusHead\x01\x01"])?;
        let mut reader = PageReader::new(bytes.as_slice());
        assert!(reader.next_page()?);
        reader.payload_mut()[9] = 2;
        assert_eq!(reader.payload(), b"OpusHead\x01\x02");
        assert!(!reader.checksum_matches());
        Ok(())
    }
}
