use log::{debug, trace};

use crate::process::record::{Block, PacketRecord};
use crate::utils::timing::{FRAME_DURATION, GAP_THRESHOLD, RateFamily};

/// What the corrector changed, in frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorrectionStats {
    /// Packets marked as not to be emitted.
    pub dropped: u64,
    /// Silence frames scheduled in front of packets.
    pub synthesized: u64,
    /// Scheduled silence frames taken back while trimming silent blocks.
    pub trimmed: u64,
    /// Output granule position of the last emitted packet.
    pub final_granule: u64,
}

/// Assigns output granule positions.
///
/// Output time starts one frame in (the first frame is the forced silence
/// packet) and advances one frame per emitted packet. Where the input ran
/// ahead by more than the gap threshold, silence frames are scheduled;
/// where it fell behind by more than the threshold, packets are dropped.
/// Silent blocks that ended up longer than the time they covered are
/// trimmed from their start.
#[derive(Debug)]
pub struct TimingCorrector {
    rate: RateFamily,
    clock: u64,
    stats: CorrectionStats,
}

impl TimingCorrector {
    pub fn new(rate: RateFamily) -> Self {
        Self {
            rate,
            clock: FRAME_DURATION,
            stats: CorrectionStats::default(),
        }
    }

    pub fn correct(mut self, records: &mut [PacketRecord], blocks: &[Block]) -> CorrectionStats {
        if let Some(first) = records.first_mut() {
            self.pre_skip(first);
        }

        for block in blocks {
            let begin = self.trim(records, block);

            for record in &mut records[begin..block.range.end] {
                self.place(record);
            }

            if let Some(next) = records.get_mut(block.range.end) {
                self.pre_skip(next);
            }
        }

        self.stats.synthesized = records.iter().map(|r| u64::from(r.pre_skip)).sum();
        for record in records.iter_mut() {
            record.output_granule = self.rate.to_output(record.output_granule);
        }
        self.stats.final_granule = records
            .iter()
            .rev()
            .find(|r| !r.dropped)
            .map_or(0, |r| r.output_granule);

        debug!(
            "Timing corrected: {} dropped, {} frames synthesized, {} trimmed",
            self.stats.dropped, self.stats.synthesized, self.stats.trimmed
        );
        self.stats
    }

    /// Schedules silence ahead of `record` if it starts after the clock.
    fn pre_skip(&mut self, record: &mut PacketRecord) {
        if record.input_granule > self.clock {
            record.pre_skip = 0;
            self.schedule(record);
        }
    }

    /// Adds silence frames in front of `record` until the clock is within a
    /// frame of its input time. The count saturates at `u32::MAX`, and the
    /// clock only advances by the frames actually scheduled.
    fn schedule(&mut self, record: &mut PacketRecord) -> u32 {
        let wanted = record.input_granule.saturating_sub(self.clock) / FRAME_DURATION;
        let room = u32::MAX - record.pre_skip;
        let frames = u32::try_from(wanted).unwrap_or(u32::MAX).min(room);

        record.pre_skip += frames;
        self.clock = self
            .clock
            .saturating_add(u64::from(frames) * FRAME_DURATION);
        frames
    }

    /// Shortens a silent block that would overrun the input time it covers.
    /// Returns the index of the first record that survives.
    fn trim(&mut self, records: &mut [PacketRecord], block: &Block) -> usize {
        let mut begin = block.begin();
        if !block.silent {
            return begin;
        }

        let end = block.end();
        let mut expected = self
            .clock
            .saturating_add(block.len() as u64 * FRAME_DURATION);
        // One frame for the packet itself, one for the gap in front of it.
        let actual = records[end]
            .input_granule
            .saturating_add(2 * FRAME_DURATION);

        while actual < expected {
            let record = &mut records[begin];
            if record.pre_skip > 0 {
                record.pre_skip -= 1;
                self.clock = self.clock.saturating_sub(FRAME_DURATION);
                self.stats.trimmed += 1;
            } else if begin != end {
                record.dropped = true;
                self.stats.dropped += 1;
                begin += 1;
            } else {
                break;
            }
            expected -= FRAME_DURATION;
        }

        if begin != block.begin() {
            trace!(
                "Trimmed {} packets from silent block at {}",
                begin - block.begin(),
                block.begin()
            );
        }
        begin
    }

    fn place(&mut self, record: &mut PacketRecord) {
        let input = record.input_granule;

        if self.clock.saturating_add(GAP_THRESHOLD) < input {
            let frames = self.schedule(record);
            trace!("Gap of {frames} frames before granule {input}");
        } else if self.clock > input.saturating_add(GAP_THRESHOLD) {
            record.dropped = true;
            self.stats.dropped += 1;
            trace!("Dropping packet at granule {input}, clock at {}", self.clock);
            return;
        }

        record.output_granule = self.clock;
        self.clock = self.clock.saturating_add(FRAME_DURATION);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::segment::segment;

    const F: u64 = FRAME_DURATION;

    fn run(input: &[(u64, bool)], rate: RateFamily) -> (Vec<PacketRecord>, CorrectionStats) {
        let mut records: Vec<_> = input
            .iter()
            .map(|&(input, silent)| PacketRecord::new(input, silent))
            .collect();
        let blocks = segment(&records);
        let stats = TimingCorrector::new(rate).correct(&mut records, &blocks);
        (records, stats)
    }

    fn emitted(records: &[PacketRecord]) -> Vec<u64> {
        records
            .iter()
            .filter(|r| !r.dropped)
            .map(|r| r.output_granule)
            .collect()
    }

    #[test]
    fn steady_stream_is_contiguous() {
        let input: Vec<_> = (0..10).map(|i| (i * F, false)).collect();
        let (records, stats) = run(&input, RateFamily::Hz48000);

        let expected: Vec<_> = (1..=10).map(|i| i * F).collect();
        assert_eq!(emitted(&records), expected);
        assert!(records.iter().all(|r| r.pre_skip == 0));
        assert_eq!(stats, CorrectionStats {
            final_granule: 10 * F,
            ..Default::default()
        });
    }

    #[test]
    fn late_start_is_padded() {
        let (records, stats) = run(&[(10 * F, false), (11 * F, false)], RateFamily::Hz48000);
        assert_eq!(records[0].pre_skip, 9);
        assert_eq!(emitted(&records), [10 * F, 11 * F]);
        assert_eq!(stats.synthesized, 9);
    }

    #[test]
    fn long_gap_is_filled() {
        let (records, _) = run(
            &[(0, false), (F, false), (2 * F, false), (102 * F, false)],
            RateFamily::Hz48000,
        );
        // 102 frames in, the clock stands at frame 4.
        assert_eq!(records[3].pre_skip, 98);
        assert_eq!(records[3].output_granule, 102 * F);
    }

    #[test]
    fn short_gap_is_absorbed() {
        let (records, stats) = run(&[(0, false), (20 * F, false)], RateFamily::Hz48000);
        assert_eq!(emitted(&records), [F, 2 * F]);
        assert_eq!(stats.synthesized, 0);
    }

    #[test]
    fn burst_is_dropped() {
        // Forty packets stamped with the same time: the clock runs ahead
        // until it exceeds the threshold, then packets are dropped.
        let input: Vec<_> = (0..40).map(|_| (F, false)).collect();
        let (records, stats) = run(&input, RateFamily::Hz48000);

        assert_eq!(stats.dropped, 14);
        let out = emitted(&records);
        assert_eq!(out.len(), 26);
        assert!(out.windows(2).all(|w| w[1] == w[0] + F));
        assert!(records[26..].iter().all(|r| r.dropped));
    }

    #[test]
    fn overlong_silent_block_is_trimmed() {
        // Ten silent packets covering only four frames of input.
        let mut input = vec![(0, false)];
        input.extend((0..10).map(|i| (F + i * F / 4, true)));
        input.push((4 * F, false));
        let (records, stats) = run(&input, RateFamily::Hz48000);

        // Block ends at input 3.25 frames (3120): actual 5040, start clock
        // 1920 plus 10 frames expected. Seven are dropped from the front.
        assert_eq!(stats.dropped, 7);
        assert!(records[1..8].iter().all(|r| r.dropped));
        assert!(records[8..].iter().all(|r| !r.dropped));

        let out = emitted(&records);
        assert!(out.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn trimming_takes_pre_skip_first() {
        // The silent block starts late, so its first packet carries a
        // pre-skip; the block's own packets then overrun its end.
        let mut input = vec![(0, false)];
        input.extend((0..6).map(|i| (5 * F + i * F / 6, true)));
        let (records, stats) = run(&input, RateFamily::Hz48000);

        // Clock 1920 against input 4800 schedules three frames. Block end
        // is at 5600: actual 7520, expected 4800 + 5760. Taking back the
        // three frames is not enough, so one packet goes as well.
        assert_eq!(stats.trimmed, 3);
        assert_eq!(records[1].pre_skip, 0);
        assert_eq!(stats.dropped, 1);
        assert!(records[1].dropped);
        assert_eq!(emitted(&records), (1..=6).map(|i| i * F).collect::<Vec<_>>());
    }

    #[test]
    fn silent_record_heads_active_burst() {
        // The silent opening record makes the whole burst one silent block,
        // so it is trimmed from the front like any overlong silence.
        let mut input = vec![(0, true)];
        input.extend([(F, false); 3]);
        input.push((2 * F, false));
        let (records, stats) = run(&input, RateFamily::Hz48000);

        assert_eq!(stats.dropped, 2);
        assert!(records[0].dropped && records[1].dropped);
        assert_eq!(emitted(&records), [F, 2 * F, 3 * F]);
    }

    #[test]
    fn unset_granule_saturates() {
        let (records, stats) = run(&[(0, false), (u64::MAX, false), (F, false)], RateFamily::Hz48000);

        // Silence is capped, and the clock moves only by what is scheduled.
        let capped = u64::from(u32::MAX);
        assert_eq!(records[1].pre_skip, u32::MAX);
        assert_eq!(records[1].output_granule, 2 * F + capped * F);
        assert_eq!(
            records[1].output_granule - u64::from(records[1].pre_skip) * F,
            2 * F
        );
        assert!(records[2].dropped);
        assert_eq!(stats.synthesized, capped);

        let out = emitted(&records);
        assert!(out.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn rescaled_for_44100() {
        let input: Vec<_> = (0..4).map(|i| (i * F, false)).collect();
        let (records, stats) = run(&input, RateFamily::Hz44100);
        assert_eq!(emitted(&records), [882, 1_764, 2_646, 3_528]);
        assert_eq!(stats.final_granule, 3_528);
    }

    #[test]
    fn monotonic_over_mixed_input() {
        let mut input = Vec::new();
        let mut t = 0;
        for i in 0..200u64 {
            t += match i % 7 {
                0 => 0,
                3 => 40 * F,
                _ => F,
            };
            input.push((t, i % 5 == 1 || i % 5 == 2));
        }
        let (records, _) = run(&input, RateFamily::Hz48000);
        let out = emitted(&records);
        assert!(out[0] >= F);
        assert!(out.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn empty_input() {
        let (records, stats) = run(&[], RateFamily::Hz48000);
        assert!(records.is_empty());
        assert_eq!(stats, CorrectionStats::default());
    }
}
