use std::io::{self, Write};
use std::time::Duration;

use log::trace;

use crate::byteorder::WriteBytesLe;
use crate::container::{
    CAPTURE_PATTERN, CHECKSUM_OFFSET, HEADER_LEN, MAX_PAYLOAD_LEN, PageHeader, push_segment_table,
    segment_count,
};
use crate::utils::crc::{OGG_CAPTURE_SEED, OGG_PAGE_CRC};
use crate::utils::errors::ContainerError;

/// Default pause between retries when the output reports `WouldBlock`.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(2);

/// Serializes pages to a byte sink.
///
/// Each page is assembled in a reusable scratch buffer with a fresh segment
/// table and checksum, then handed to the sink in order. A sink that is not
/// ready (`WouldBlock`) is polled at the retry interval, an interrupted
/// write is retried at once, and any other write failure is returned and
/// should end the run.
#[derive(Debug)]
pub struct PageWriter<W: Write> {
    inner: W,
    scratch: Vec<u8>,
    retry_interval: Duration,
    pages_written: u64,
    bytes_written: u64,
    blocked_waits: u64,
}

impl<W: Write> PageWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            scratch: Vec::with_capacity(HEADER_LEN + 256),
            retry_interval: DEFAULT_RETRY_INTERVAL,
            pages_written: 0,
            bytes_written: 0,
            blocked_waits: 0,
        }
    }

    pub fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }

    /// Writes one page carrying `payload`.
    ///
    /// The capture pattern and version of `header` are ignored (always
    /// `OggS`, version 0) and its checksum is recomputed.
    pub fn write_page(&mut self, header: &PageHeader, payload: &[u8]) -> Result<(), ContainerError> {
        self.assemble(header, payload)?;
        self.write_scratch()?;

        self.pages_written += 1;
        self.bytes_written += self.scratch.len() as u64;

        trace!(
            "wrote page serial={} granule={} seq={} len={}",
            header.serial,
            header.granule_position,
            header.sequence,
            payload.len()
        );

        Ok(())
    }

    fn assemble(&mut self, header: &PageHeader, payload: &[u8]) -> Result<(), ContainerError> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(ContainerError::PayloadTooLarge(payload.len()));
        }

        let total = HEADER_LEN + 1 + segment_count(payload.len()) + payload.len();
        self.scratch.clear();
        self.scratch
            .try_reserve(total)
            .map_err(|_| ContainerError::Allocation(total))?;

        let header = PageHeader {
            capture_pattern: CAPTURE_PATTERN,
            version: 0,
            checksum: 0,
            ..*header
        };
        header.write_le(&mut self.scratch);
        push_segment_table(&mut self.scratch, payload.len());
        self.scratch.extend_from_slice(payload);

        let crc = page_checksum(&self.scratch);
        self.scratch[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 4].copy_from_slice(&crc.to_le_bytes());

        Ok(())
    }

    fn write_scratch(&mut self) -> Result<(), ContainerError> {
        let mut written = 0;

        while written < self.scratch.len() {
            match self.inner.write(&self.scratch[written..]) {
                Ok(0) => return Err(ContainerError::WriteZero),
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => self.wait_writable(),
                Err(e) => return Err(ContainerError::Write(e)),
            }
        }

        Ok(())
    }

    /// Flushes the sink, waiting out `WouldBlock` the same way writes do.
    pub fn flush(&mut self) -> Result<(), ContainerError> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => self.wait_writable(),
                Err(e) => return Err(ContainerError::Write(e)),
            }
        }
    }

    /// Polls: sleeps for the retry interval rather than waiting for the sink
    /// to report it is writable, so a retry may find it still blocked.
    fn wait_writable(&mut self) {
        self.blocked_waits += 1;
        std::thread::sleep(self.retry_interval);
    }

    pub fn pages_written(&self) -> u64 {
        self.pages_written
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// How many times the sink reported it was not ready.
    pub fn blocked_waits(&self) -> u64 {
        self.blocked_waits
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Checksum of a serialized page whose checksum field is zero.
///
/// The `OggS\0` prefix is folded in through its precomputed seed, so the
/// first five bytes of `page` are not re-read.
pub fn page_checksum(page: &[u8]) -> u32 {
    OGG_PAGE_CRC.update(OGG_CAPTURE_SEED, &page[5..])
}
