use std::io::{Read, Write};

use anyhow::Result;
use log::Level::{Error, Warn};
use log::{debug, trace};

use crate::codec::silence::SilenceKind;
use crate::container::{PageHeader, PageReader, PageWriter};
use crate::log_or_err;
use crate::process::record::PacketRecord;
use crate::process::scan::StreamParams;
use crate::protocol::VadPreamble;
use crate::utils::errors::EmitError;

/// Pages written, by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitStats {
    pub header_pages: u64,
    pub silence_pages: u64,
    pub data_pages: u64,
    /// Kept pages of the second copy with no record to time them.
    pub unmatched_pages: u64,
    /// The track had no audio and a lone silence page was added.
    pub fallback: bool,
}

/// Writes the corrected kept track while reading the second copy.
///
/// Header pages pass through with any preamble stripped, then one forced
/// silence packet, then data pages re-stamped from their records with
/// scheduled silence in front. Output sequence numbers count from zero
/// without gaps.
pub struct Emitter<W: Write> {
    writer: PageWriter<W>,
    params: StreamParams,
    channels: u8,
    silence: SilenceKind,
    sequence: u32,
    pub fail_level: log::Level,
    stats: EmitStats,
}

impl<W: Write> Emitter<W> {
    pub fn new(writer: PageWriter<W>, params: StreamParams, channels: u8) -> Self {
        let silence = SilenceKind::select(params.codec, params.rate_family(), channels);
        debug!("Silence packet: {silence:?}");

        Self {
            writer,
            params,
            channels,
            silence,
            sequence: 0,
            fail_level: Error,
            stats: EmitStats::default(),
        }
    }

    pub fn with_fail_level(mut self, fail_level: log::Level) -> Self {
        self.fail_level = fail_level;
        self
    }

    /// Runs the emission pass. The reader's current page must be the first
    /// page of the second copy.
    pub fn emit<R: Read>(
        mut self,
        reader: &mut PageReader<R>,
        records: &[PacketRecord],
    ) -> Result<(EmitStats, PageWriter<W>)> {
        if reader.is_exhausted() {
            log_or_err!(self, Error, EmitError::MissingSecondCopy);
        } else {
            self.headers(reader)?;
        }

        let time = self.params.rate_family().frame_duration();
        self.write_silence(time)?;

        if !reader.is_exhausted() {
            self.data(reader, records)?;
        }

        if self.sequence <= 2 {
            debug!("No audio on track {}, adding a silence page", self.params.serial);
            self.write_silence(0)?;
            self.stats.fallback = true;
        }

        self.writer.flush()?;
        Ok((self.stats, self.writer))
    }

    fn headers<R: Read>(&mut self, reader: &mut PageReader<R>) -> Result<()> {
        loop {
            let header = *reader.header();
            if !header.is_header() {
                return Ok(());
            }

            if header.serial == self.params.serial {
                let skip = VadPreamble::skip_of(reader.payload());
                let len = reader.payload().len();

                match reader.payload_mut().get_mut(skip..) {
                    Some(packet) => {
                        if self.channels > 1
                            && self.params.codec.patch_channel_count(packet, self.channels)
                        {
                            debug!("Declared channel count set to {}", self.channels);
                        }
                        let out = PageHeader {
                            sequence: self.next_sequence(),
                            ..header
                        };
                        self.writer.write_page(&out, packet)?;
                        self.stats.header_pages += 1;
                    }
                    None => log_or_err!(
                        self,
                        Warn,
                        EmitError::PacketTooShort {
                            serial: header.serial,
                            len,
                            skip,
                        }
                    ),
                }
            }

            if !reader.next_page()? {
                return Ok(());
            }
        }
    }

    fn data<R: Read>(&mut self, reader: &mut PageReader<R>, records: &[PacketRecord]) -> Result<()> {
        let time = self.params.rate_family().frame_duration();
        let skip = self.params.data_offset();
        let mut next = records.iter();

        loop {
            let header = *reader.header();

            if header.serial == self.params.serial {
                match next.next() {
                    Some(record) => {
                        let mut granule = record
                            .output_granule
                            .saturating_sub(time * u64::from(record.pre_skip));
                        for _ in 0..record.pre_skip {
                            self.write_silence(granule)?;
                            granule = granule.saturating_add(time);
                        }

                        if !record.dropped {
                            self.write_packet(header, reader.payload(), record, skip)?;
                        }
                    }
                    None => {
                        if self.stats.unmatched_pages == 0 {
                            log_or_err!(
                                self,
                                Warn,
                                EmitError::RecordsExhausted {
                                    serial: header.serial,
                                    records: records.len(),
                                }
                            );
                        }
                        self.stats.unmatched_pages += 1;
                    }
                }
            }

            if !reader.next_page()? {
                return Ok(());
            }
        }
    }

    fn write_packet(
        &mut self,
        header: PageHeader,
        payload: &[u8],
        record: &PacketRecord,
        skip: usize,
    ) -> Result<()> {
        let Some(packet) = payload.get(skip..) else {
            log_or_err!(
                self,
                Warn,
                EmitError::PacketTooShort {
                    serial: header.serial,
                    len: payload.len(),
                    skip,
                }
            );
            return Ok(());
        };

        let out = PageHeader {
            granule_position: record.output_granule,
            sequence: self.next_sequence(),
            ..header
        };
        trace!("Data page {} at granule {}", out.sequence, out.granule_position);
        self.writer.write_page(&out, packet)?;
        self.stats.data_pages += 1;
        Ok(())
    }

    fn write_silence(&mut self, granule: u64) -> Result<()> {
        let header = PageHeader::new(self.params.serial, granule, self.next_sequence());
        self.writer.write_page(&header, self.silence.payload())?;
        self.stats.silence_pages += 1;
        Ok(())
    }

    fn next_sequence(&mut self) -> u32 {
        let sequence = self.sequence;
        self.sequence += 1;
        sequence
    }
}
