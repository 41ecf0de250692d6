use crate::process::record::{Block, PacketRecord};
use crate::utils::timing::GAP_THRESHOLD;

/// Partitions `records` into blocks.
///
/// A block opens at a record and runs on while the next record is active and
/// no more than [`GAP_THRESHOLD`] after it, whatever the opening record's
/// class. When the record after a block is silent, the silent run that
/// follows forms a block of its own. A block counts as silent when its first
/// record is, so a silent record followed by a burst of active ones yields a
/// single silent block.
pub fn segment(records: &[PacketRecord]) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut start = 0;

    while start < records.len() {
        let end = run_end(records, start, |prev, next| {
            !next.silent && next.input_granule <= prev.input_granule.saturating_add(GAP_THRESHOLD)
        });
        blocks.push(Block {
            range: start..end,
            silent: records[start].silent,
        });
        start = end;

        if records.get(start).is_some_and(|r| r.silent) {
            let end = run_end(records, start, |_, next| next.silent);
            blocks.push(Block {
                range: start..end,
                silent: true,
            });
            start = end;
        }
    }

    blocks
}

/// End (exclusive) of the run opened at `start` while `joins(prev, next)`.
fn run_end(
    records: &[PacketRecord],
    start: usize,
    joins: impl Fn(&PacketRecord, &PacketRecord) -> bool,
) -> usize {
    let mut end = start + 1;
    while let Some(next) = records.get(end) {
        if !joins(&records[end - 1], next) {
            break;
        }
        end += 1;
    }
    end
}
