//! Per-packet bookkeeping shared by the correction stages.

use std::ops::Range;

/// One kept data packet of the first copy.
///
/// The classifier creates records in arrival order, the segmenter and the
/// timing corrector fill in timing decisions, and the emitter only reads
/// them. A record's ordinal is its index in the record list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketRecord {
    /// Observed granule position with pauses removed, in 48 kHz units.
    pub input_granule: u64,
    /// Assigned output granule position in output units; 0 until assigned.
    pub output_granule: u64,
    /// Synthetic silence frames to emit immediately before this packet.
    pub pre_skip: u32,
    pub silent: bool,
    /// The packet is not emitted (its pre-skip still is).
    pub dropped: bool,
}

impl PacketRecord {
    pub fn new(input_granule: u64, silent: bool) -> Self {
        Self {
            input_granule,
            silent,
            ..Default::default()
        }
    }
}

/// A run of consecutive records timed as a unit.
///
/// Silent blocks hold only silent records. Any other block holds active
/// records, possibly behind one silent opening record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Record indices covered by this block.
    pub range: Range<usize>,
    /// Whether the first record is silent; only such blocks get trimmed.
    pub silent: bool,
}

impl Block {
    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// Index of the block's first record.
    pub fn begin(&self) -> usize {
        self.range.start
    }

    /// Index of the block's last record.
    pub fn end(&self) -> usize {
        self.range.end - 1
    }
}
