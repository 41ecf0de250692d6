use std::io::Read;

use anyhow::Result;
use log::{debug, trace};

use crate::container::PageReader;
use crate::process::record::PacketRecord;
use crate::process::scan::StreamParams;
use crate::protocol::{ControlMessage, PauseClock};

/// Records of the first copy and what was learned while collecting them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PacketList {
    pub records: Vec<PacketRecord>,
    /// Widest channel layout any kept data packet signalled; at least 1.
    pub max_channels: u8,
    /// Completed pause/resume pairs on the meta track.
    pub pauses: u32,
    /// Data pages of other tracks passed over.
    pub foreign_pages: u64,
}

/// Turns the data pages of the first copy into [`PacketRecord`]s.
///
/// Starts on the reader's current page (the first data page) and stops on
/// the first page with granule position zero, which opens the second copy.
/// That page stays current.
#[derive(Debug)]
pub struct Classifier {
    params: StreamParams,
    clock: PauseClock,
}

impl Classifier {
    pub fn new(params: StreamParams) -> Self {
        Self {
            params,
            clock: PauseClock::starting_at(params.initial_offset),
        }
    }

    pub fn classify<R: Read>(mut self, reader: &mut PageReader<R>) -> Result<PacketList> {
        let mut list = PacketList {
            max_channels: 1,
            ..Default::default()
        };

        if reader.is_exhausted() {
            return Ok(list);
        }

        loop {
            let header = *reader.header();
            if header.is_header() {
                debug!(
                    "Second copy starts at page {} (serial {})",
                    reader.pages_read(),
                    header.serial
                );
                break;
            }

            if Some(header.serial) == self.params.meta_serial {
                if let Some(message) = ControlMessage::parse(reader.payload()) {
                    debug!("{message:?} at granule {}", header.granule_position);
                    self.clock.observe(message, header.granule_position);
                }
            }

            if header.serial == self.params.serial {
                let record = self.record(header.granule_position, reader.payload());
                let packet = reader
                    .payload()
                    .get(self.params.data_offset()..)
                    .unwrap_or_default();
                list.max_channels = list
                    .max_channels
                    .max(self.params.codec.packet_channels(packet));

                trace!(
                    "Record {}: granule {} -> {} {}",
                    list.records.len(),
                    header.granule_position,
                    record.input_granule,
                    if record.silent { "silent" } else { "active" }
                );
                list.records.push(record);
            } else {
                list.foreign_pages += 1;
            }

            if !reader.next_page()? {
                debug!("Input ended inside the first copy");
                break;
            }
        }

        list.pauses = self.clock.pauses();
        Ok(list)
    }

    fn record(&self, granule: u64, payload: &[u8]) -> PacketRecord {
        let silent = match self.params.vad_threshold {
            // An empty packet has no activity byte to read.
            Some(threshold) => payload.first().is_none_or(|&level| level < threshold),
            None => payload.len() < self.params.codec.silence_size_threshold(),
        };
        PacketRecord::new(self.clock.adjust(granule), silent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CodecFamily;
    use crate::container::{PageHeader, PageWriter};
    use crate::protocol::{PAUSE_MESSAGE, RESUME_MESSAGE};

    fn reader_over(pages: &[(u32, u64, &[u8])]) -> Result<PageReader<std::io::Cursor<Vec<u8>>>> {
        let mut writer = PageWriter::new(Vec::new());
        for (i, (serial, granule, payload)) in pages.iter().enumerate() {
            writer.write_page(&PageHeader::new(*serial, *granule, i as u32), payload)?;
        }
        let mut reader = PageReader::new(std::io::Cursor::new(writer.into_inner()));
        reader.next_page()?;
        Ok(reader)
    }

    fn params(offset: u64) -> StreamParams {
        StreamParams {
            initial_offset: offset,
            ..StreamParams::new(5)
        }
    }

    #[test]
    fn size_heuristic_without_threshold() -> Result<()> {
        let mut reader = reader_over(&[
            (5, 1_000, b"\xFC long opus frame"),
            (5, 1_960, b"\xFC"),
            (6, 2_000, b"other track"),
            (5, 2_920, b"\x78 mono frame"),
            (5, 0, b"OpusHead\x01\x02"),
        ])?;

        let list = Classifier::new(params(1_000)).classify(&mut reader)?;
        let inputs: Vec<_> = list.records.iter().map(|r| r.input_granule).collect();
        let silent: Vec<_> = list.records.iter().map(|r| r.silent).collect();
        assert_eq!(inputs, [0, 960, 1_920]);
        assert_eq!(silent, [false, true, false]);
        assert_eq!(list.max_channels, 2);
        assert_eq!(list.foreign_pages, 1);

        // The second copy's first page is left for the emitter.
        assert!(reader.header().is_header());
        assert!(!reader.is_exhausted());
        Ok(())
    }

    #[test]
    fn threshold_classification() -> Result<()> {
        let mut reader = reader_over(&[
            (5, 960, b"\x54\x78 frame"),
            (5, 1_920, b"\x10\x78 frame"),
            (5, 2_880, b""),
            (5, 3_840, b"\x30"),
        ])?;

        let p = StreamParams {
            vad_threshold: Some(0x30),
            ..params(960)
        };
        let list = Classifier::new(p).classify(&mut reader)?;
        let silent: Vec<_> = list.records.iter().map(|r| r.silent).collect();
        assert_eq!(silent, [false, true, true, false]);
        // The activity byte is not mistaken for a TOC byte.
        assert_eq!(list.max_channels, 1);
        assert!(reader.is_exhausted());
        Ok(())
    }

    #[test]
    fn flac_size_heuristic() -> Result<()> {
        let mut reader = reader_over(&[
            (5, 960, &[0xFF, 0xF8, 0x69, 0x18, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]),
            (5, 1_920, &[0xFF, 0xF8, 0x69, 0x08, 0, 0, 0, 0]),
        ])?;

        let p = StreamParams {
            codec: CodecFamily::Flac,
            ..params(960)
        };
        let list = Classifier::new(p).classify(&mut reader)?;
        let silent: Vec<_> = list.records.iter().map(|r| r.silent).collect();
        assert_eq!(silent, [false, true]);
        assert_eq!(list.max_channels, 2);
        Ok(())
    }

    #[test]
    fn pauses_are_removed() -> Result<()> {
        let mut reader = reader_over(&[
            (5, 48_000, b"\xFC active frame"),
            (1, 48_960, PAUSE_MESSAGE),
            (1, 96_960, RESUME_MESSAGE),
            (5, 97_920, b"\xFC active frame"),
            (1, 98_000, br#"{"c":"pause","x":1}"#),
            (5, 98_880, b"\xFC active frame"),
        ])?;

        let p = StreamParams {
            meta_serial: Some(1),
            ..params(48_000)
        };
        let list = Classifier::new(p).classify(&mut reader)?;
        let inputs: Vec<_> = list.records.iter().map(|r| r.input_granule).collect();
        assert_eq!(inputs, [0, 1_920, 2_880]);
        assert_eq!(list.pauses, 1);
        assert_eq!(list.foreign_pages, 3);
        Ok(())
    }

    #[test]
    fn granules_before_offset_floor_at_zero() -> Result<()> {
        let mut reader = reader_over(&[(5, 500, b"\xFC active frame")])?;
        let list = Classifier::new(params(4_800)).classify(&mut reader)?;
        assert_eq!(list.records[0].input_granule, 0);
        Ok(())
    }
}
