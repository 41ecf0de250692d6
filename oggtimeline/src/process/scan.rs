use std::io::Read;

use anyhow::{Result, bail};
use log::Level::Warn;
use log::{debug, trace};

use crate::codec::{CodecFamily, HeaderPacket};
use crate::container::PageReader;
use crate::log_or_err;
use crate::protocol::{VadPreamble, is_meta_header};
use crate::utils::errors::ScanError;
use crate::utils::timing::RateFamily;

/// What the header region says about the kept track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamParams {
    pub serial: u32,
    pub codec: CodecFamily,
    /// STREAMINFO sample rate; `None` for Opus.
    pub sample_rate: Option<u32>,
    /// Channel count declared by the identification packet.
    pub declared_channels: Option<u8>,
    pub vad_threshold: Option<u8>,
    /// Serial of the meta track, when the stream has one.
    pub meta_serial: Option<u32>,
    /// Granule position of the first data page, on any track.
    pub initial_offset: u64,
    /// Header-region pages seen on the kept track.
    pub header_pages: u32,
}

impl StreamParams {
    pub fn new(serial: u32) -> Self {
        Self {
            serial,
            codec: CodecFamily::Opus,
            sample_rate: None,
            declared_channels: None,
            vad_threshold: None,
            meta_serial: None,
            initial_offset: 0,
            header_pages: 0,
        }
    }

    pub fn rate_family(&self) -> RateFamily {
        RateFamily::from_sample_rate(self.sample_rate)
    }

    /// Offset of the codec payload inside a data packet: data packets carry
    /// a leading voice-activity byte when the track has a threshold.
    pub fn data_offset(&self) -> usize {
        usize::from(self.vad_threshold.is_some())
    }
}

/// Reads the header region of the first copy.
///
/// Stops on the first page with a nonzero granule position and leaves it as
/// the reader's current page.
#[derive(Debug)]
pub struct HeaderScanner {
    pub serial: u32,
    pub fail_level: log::Level,
}

impl HeaderScanner {
    pub fn new(serial: u32, fail_level: log::Level) -> Self {
        Self { serial, fail_level }
    }

    pub fn scan<R: Read>(&self, reader: &mut PageReader<R>) -> Result<StreamParams> {
        let mut params = StreamParams::new(self.serial);
        let mut identified = false;

        while reader.next_page()? {
            let header = *reader.header();

            if !header.is_header() {
                params.initial_offset = header.granule_position;
                if !identified {
                    log_or_err!(self, Warn, ScanError::MissingIdentification(self.serial));
                }

                debug!(
                    "Header region done: codec {} rate {:?} vad {:?} meta {:?} offset {}",
                    params.codec,
                    params.sample_rate,
                    params.vad_threshold,
                    params.meta_serial,
                    params.initial_offset
                );
                return Ok(params);
            }

            let payload = reader.payload();

            if params.meta_serial.is_none() && is_meta_header(payload) {
                debug!("Meta track found on serial {}", header.serial);
                params.meta_serial = Some(header.serial);
            }

            if header.serial != self.serial {
                continue;
            }
            params.header_pages += 1;

            let mut skip = 0;
            if let Some(vad) = VadPreamble::parse(payload) {
                skip = vad.skip;
                if vad.threshold.is_some() {
                    params.vad_threshold = vad.threshold;
                }
            }

            let Some(packet) = payload.get(skip..) else {
                log_or_err!(
                    self,
                    Warn,
                    ScanError::PreambleTooLong {
                        serial: header.serial,
                        skip,
                        len: payload.len(),
                    }
                );
                continue;
            };

            match HeaderPacket::recognise(packet) {
                Some(HeaderPacket::FlacIdent {
                    sample_rate,
                    channels,
                }) => {
                    params.codec = CodecFamily::Flac;
                    params.sample_rate = Some(sample_rate);
                    params.declared_channels = Some(channels);
                    identified = true;
                }
                Some(HeaderPacket::OpusHead { channels }) => {
                    params.codec = CodecFamily::Opus;
                    params.declared_channels = Some(channels);
                    identified = true;
                }
                Some(other) => trace!("Header packet {other:?} on serial {}", header.serial),
                None => trace!(
                    "Skipping unrecognised header page (seq {}) on serial {}",
                    header.sequence, header.serial
                ),
            }
        }

        bail!(ScanError::NoDataPages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::flac::tests::ident_packet;
    use crate::container::{PageHeader, PageWriter};

    fn stream(pages: &[(u32, u64, &[u8])]) -> Result<Vec<u8>> {
        let mut writer = PageWriter::new(Vec::new());
        for (i, (serial, granule, payload)) in pages.iter().enumerate() {
            writer.write_page(&PageHeader::new(*serial, *granule, i as u32), payload)?;
        }
        Ok(writer.into_inner())
    }

    #[test]
    fn opus_with_vad_and_meta() -> Result<()> {
        let bytes = stream(&[
            (1, 0, b"ECMETA\x01\x00{}"),
            (5, 0, b"ECVADD\x03\x00\x01\x02\x30OpusHead\x01\x01\x38\x01"),
            (5, 0, b"OpusTags\x00\x00\x00\x00"),
            (7, 0, b"OpusHead\x01\x02\x38\x01"),
            (5, 4_800, b"\x40\xFC data"),
        ])?;

        let mut reader = PageReader::new(bytes.as_slice());
        let params = HeaderScanner::new(5, log::Level::Error).scan(&mut reader)?;

        assert_eq!(params.codec, CodecFamily::Opus);
        assert_eq!(params.declared_channels, Some(1));
        assert_eq!(params.vad_threshold, Some(0x30));
        assert_eq!(params.meta_serial, Some(1));
        assert_eq!(params.initial_offset, 4_800);
        assert_eq!(params.header_pages, 2);
        assert_eq!(params.data_offset(), 1);

        // The first data page stays current.
        assert_eq!(reader.header().granule_position, 4_800);
        Ok(())
    }

    #[test]
    fn flac_sample_rate() -> Result<()> {
        let ident = ident_packet(44_100, 1);
        let bytes = stream(&[
            (3, 0, &ident),
            (3, 0, b"\x04\x00\x00\x41vendor"),
            (3, 960, &[0xFF, 0xF8, 0x79, 0x0C, 0, 0, 0, 0]),
        ])?;

        let mut reader = PageReader::new(bytes.as_slice());
        let params = HeaderScanner::new(3, log::Level::Error).scan(&mut reader)?;
        assert_eq!(params.codec, CodecFamily::Flac);
        assert_eq!(params.sample_rate, Some(44_100));
        assert_eq!(params.rate_family(), RateFamily::Hz44100);
        assert_eq!(params.data_offset(), 0);
        assert_eq!(params.meta_serial, None);
        Ok(())
    }

    #[test]
    fn unrelated_header_pages_are_skipped() -> Result<()> {
        let bytes = stream(&[
            (5, 0, b"something else entirely"),
            (5, 0, b"ECVADD\x40\x00\x01"),
            (5, 0, b"OpusHead\x01\x01\x38\x01"),
            (5, 960, b"\x78 data"),
        ])?;

        let mut reader = PageReader::new(bytes.as_slice());
        let params = HeaderScanner::new(5, log::Level::Error).scan(&mut reader)?;
        assert_eq!(params.declared_channels, Some(1));

        // In strict mode the oversized preamble is fatal.
        let mut reader = PageReader::new(bytes.as_slice());
        assert!(HeaderScanner::new(5, log::Level::Warn).scan(&mut reader).is_err());
        Ok(())
    }

    #[test]
    fn missing_identification() -> Result<()> {
        let bytes = stream(&[(9, 0, b"OpusHead\x01\x01\x38\x01"), (9, 960, b"x")])?;

        let mut reader = PageReader::new(bytes.as_slice());
        let params = HeaderScanner::new(5, log::Level::Error).scan(&mut reader)?;
        assert_eq!(params.codec, CodecFamily::Opus);
        assert_eq!(params.header_pages, 0);

        let mut reader = PageReader::new(bytes.as_slice());
        assert!(HeaderScanner::new(5, log::Level::Warn).scan(&mut reader).is_err());
        Ok(())
    }

    #[test]
    fn header_only_input_is_an_error() -> Result<()> {
        let bytes = stream(&[(5, 0, b"OpusHead\x01\x01\x38\x01")])?;
        let mut reader = PageReader::new(bytes.as_slice());
        let err = HeaderScanner::new(5, log::Level::Error)
            .scan(&mut reader)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ScanError>(),
            Some(ScanError::NoDataPages)
        ));
        Ok(())
    }
}
