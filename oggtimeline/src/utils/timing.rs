//! Timebase arithmetic for the correction stages.
//!
//! All internal timing is carried in 48 kHz units. Output positions for the
//! 44.1 kHz family are rescaled by exactly 147/160 on the way out.

/// Nominal duration of one packet: 20 ms at 48 kHz.
pub const FRAME_DURATION: u64 = 960;

/// Largest drift, in frame durations, tolerated before inserting silence or
/// dropping a packet. Also the timestamp jump that forces a block boundary.
pub const GAP_THRESHOLD_FRAMES: u64 = 25;

/// [`GAP_THRESHOLD_FRAMES`] expressed in 48 kHz units.
pub const GAP_THRESHOLD: u64 = FRAME_DURATION * GAP_THRESHOLD_FRAMES;

const RATE_44K_NUM: u64 = 147;
const RATE_44K_DEN: u64 = 160;

/// Sample-rate family of the kept track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RateFamily {
    /// 48 kHz and everything treated like it (Opus is always here).
    #[default]
    Hz48000,
    /// 44.1 kHz.
    Hz44100,
}

impl RateFamily {
    /// Only an exact 44100 Hz rate selects the 44.1 kHz family.
    pub fn from_sample_rate(sample_rate: Option<u32>) -> Self {
        match sample_rate {
            Some(44_100) => RateFamily::Hz44100,
            _ => RateFamily::Hz48000,
        }
    }

    /// Converts a position in 48 kHz units to this family's output units.
    #[inline]
    pub fn to_output(self, granule: u64) -> u64 {
        match self {
            RateFamily::Hz48000 => granule,
            RateFamily::Hz44100 => scale(granule, RATE_44K_NUM, RATE_44K_DEN),
        }
    }

    /// Inverse of [`to_output`](Self::to_output), up to integer rounding.
    #[inline]
    pub fn from_output(self, granule: u64) -> u64 {
        match self {
            RateFamily::Hz48000 => granule,
            RateFamily::Hz44100 => scale(granule, RATE_44K_DEN, RATE_44K_NUM),
        }
    }

    /// One frame duration in output units.
    #[inline]
    pub fn frame_duration(self) -> u64 {
        self.to_output(FRAME_DURATION)
    }

    pub fn nominal_rate(self) -> u32 {
        match self {
            RateFamily::Hz48000 => 48_000,
            RateFamily::Hz44100 => 44_100,
        }
    }
}

/// `granule * num / den` without intermediate overflow, saturating.
#[inline]
fn scale(granule: u64, num: u64, den: u64) -> u64 {
    let scaled = u128::from(granule) * u128::from(num) / u128::from(den);
    u64::try_from(scaled).unwrap_or(u64::MAX)
}

/// Seconds represented by a granule position in 48 kHz units.
pub fn granule_to_secs(granule: u64) -> f64 {
    granule as f64 / 48_000f64
}
