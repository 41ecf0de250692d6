use oggtimeline::utils::timing::{RateFamily, granule_to_secs};

/// `HH:MM:SS.mmm` for a duration in seconds.
pub fn time_str(sec: f64) -> String {
    let ms = sec * 1000f64;
    let hours = (ms / 3600000f64) as u64;
    let minutes = ((ms % 3600000f64) / 60000f64) as u64;
    let seconds = ((ms % 60000f64) / 1000f64) as u64;
    let milliseconds = (ms % 1000f64) as u64;

    format!(
        "{hours:0width$}:{minutes:02}:{seconds:02}.{milliseconds:03}",
        width = if hours >= 100 { 0 } else { 2 }
    )
}

/// Play time of an output granule position of the given rate family.
pub fn granule_str(granule: u64, rate: RateFamily) -> String {
    time_str(granule_to_secs(rate.from_output(granule)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatting() {
        assert_eq!(time_str(0.0), "00:00:00.000");
        assert_eq!(time_str(3725.5), "01:02:05.500");
        assert_eq!(granule_str(48_000 * 90, RateFamily::Hz48000), "00:01:30.000");
        assert_eq!(granule_str(44_100, RateFamily::Hz44100), "00:00:01.000");
    }
}
