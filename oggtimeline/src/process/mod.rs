//! Timeline correction of one track.
//!
//! The input is the whole stream twice, back to back. The first copy is
//! read to learn the timing of every kept packet; the second is re-emitted
//! with corrected granule positions. Stages, in order:
//!
//! 1. [`scan`]: codec, rate, voice-activity threshold, meta track and the
//!    initial granule offset from the header region.
//! 2. [`classify`]: one [`PacketRecord`] per kept data page, pauses removed.
//! 3. [`segment`]: records grouped into silent and active blocks.
//! 4. [`correct`]: output granule positions, gaps and drops.
//! 5. [`emit`]: the corrected track, written from the second copy.

pub mod classify;
pub mod correct;
pub mod emit;
pub mod record;
pub mod scan;
pub mod segment;

use std::io::{Read, Write};

use anyhow::Result;
use log::info;

use crate::codec::CodecFamily;
use crate::container::{PageReader, PageWriter};

pub use classify::{Classifier, PacketList};
pub use correct::{CorrectionStats, TimingCorrector};
pub use emit::{EmitStats, Emitter};
pub use record::{Block, PacketRecord};
pub use scan::{HeaderScanner, StreamParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrectOptions {
    /// Serial number of the track to keep.
    pub serial: u32,
    /// Recoverable problems at or above this level abort the run.
    pub fail_level: log::Level,
}

impl Default for CorrectOptions {
    fn default() -> Self {
        Self {
            serial: 0,
            fail_level: log::Level::Error,
        }
    }
}

/// Everything learned from the first copy.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub params: StreamParams,
    pub packets: PacketList,
    pub blocks: Vec<Block>,
    pub stats: CorrectionStats,
}

impl Analysis {
    pub fn silent_blocks(&self) -> usize {
        self.blocks.iter().filter(|b| b.silent).count()
    }

    pub fn silent_records(&self) -> usize {
        self.packets.records.iter().filter(|r| r.silent).count()
    }
}

/// Runs stages 1 to 4 over the first copy. The reader is left on the first
/// page of the second copy, if there is one.
pub fn analyze<R: Read>(reader: &mut PageReader<R>, options: &CorrectOptions) -> Result<Analysis> {
    let params = HeaderScanner::new(options.serial, options.fail_level).scan(reader)?;
    let mut packets = Classifier::new(params).classify(reader)?;
    let blocks = segment::segment(&packets.records);
    let stats = TimingCorrector::new(params.rate_family()).correct(&mut packets.records, &blocks);

    Ok(Analysis {
        params,
        packets,
        blocks,
        stats,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrectionSummary {
    pub serial: u32,
    pub codec: CodecFamily,
    pub sample_rate: Option<u32>,
    pub channels: u8,
    pub records: usize,
    pub blocks: usize,
    pub silent_blocks: usize,
    pub pauses: u32,
    pub pages_read: u64,
    pub pages_written: u64,
    pub bytes_written: u64,
    pub blocked_waits: u64,
    pub correction: CorrectionStats,
    pub emit: EmitStats,
}

/// Corrects the track `options.serial` of the doubled stream `input` and
/// writes it to `output`.
pub fn correct_track<R: Read, W: Write>(
    input: R,
    output: W,
    options: &CorrectOptions,
) -> Result<CorrectionSummary> {
    let mut reader = PageReader::new(input);
    let analysis = analyze(&mut reader, options)?;

    let emitter = Emitter::new(
        PageWriter::new(output),
        analysis.params,
        analysis.packets.max_channels,
    )
    .with_fail_level(options.fail_level);
    let (emit, writer) = emitter.emit(&mut reader, &analysis.packets.records)?;

    let summary = CorrectionSummary {
        serial: options.serial,
        codec: analysis.params.codec,
        sample_rate: analysis.params.sample_rate,
        channels: analysis.packets.max_channels,
        records: analysis.packets.records.len(),
        blocks: analysis.blocks.len(),
        silent_blocks: analysis.silent_blocks(),
        pauses: analysis.packets.pauses,
        pages_read: reader.pages_read(),
        pages_written: writer.pages_written(),
        bytes_written: writer.bytes_written(),
        blocked_waits: writer.blocked_waits(),
        correction: analysis.stats,
        emit,
    };

    info!(
        "Track {}: {} packets in, {} pages out, {} dropped, {} silence frames added",
        summary.serial,
        summary.records,
        summary.pages_written,
        summary.correction.dropped,
        summary.correction.synthesized
    );
    Ok(summary)
}
