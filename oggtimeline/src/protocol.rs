//! Side protocols layered on the container by the recording pipeline.
//!
//! ## Voice-activity preamble
//!
//! A track's identification packet may be prefixed by
//!
//! | bytes   | field |
//! |---------|-------|
//! | 0..6    | `ECVADD` |
//! | 6..8    | body length, little-endian |
//! | 8..     | body; byte 10 of the packet is the detection threshold |
//!
//! When a threshold is present, every data packet of the track starts with
//! one voice-activity byte ahead of the codec payload.
//!
//! ## Meta track
//!
//! A track whose first (header) page starts with `ECMETA` carries JSON
//! control messages. Two exact payloads matter here: pause and resume.

use crate::byteorder::read_u16_le;

pub const VAD_MAGIC: &[u8; 6] = b"ECVADD";
pub const META_MAGIC: &[u8; 6] = b"ECMETA";

const VAD_BODY_OFFSET: usize = 8;
const VAD_THRESHOLD_OFFSET: usize = 10;
const META_MIN_LEN: usize = 8;

pub const PAUSE_MESSAGE: &[u8] = br#"{"c":"pause"}"#;
pub const RESUME_MESSAGE: &[u8] = br#"{"c":"resume"}"#;

/// Parsed voice-activity preamble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VadPreamble {
    /// Bytes to skip to reach the codec identification packet.
    pub skip: usize,
    /// Detection threshold. A zero threshold counts as absent.
    pub threshold: Option<u8>,
}

impl VadPreamble {
    /// Parses the preamble at the start of `packet`, if any.
    pub fn parse(packet: &[u8]) -> Option<Self> {
        if packet.len() <= VAD_BODY_OFFSET || !packet.starts_with(VAD_MAGIC) {
            return None;
        }

        let body_len = read_u16_le(packet, 6)? as usize;
        let threshold = packet
            .get(VAD_THRESHOLD_OFFSET)
            .copied()
            .filter(|&t| t != 0);

        Some(Self {
            skip: VAD_BODY_OFFSET + body_len,
            threshold,
        })
    }

    /// Preamble length of `packet`, or 0 when it has none.
    pub fn skip_of(packet: &[u8]) -> usize {
        Self::parse(packet).map_or(0, |p| p.skip)
    }
}

/// Whether `packet` opens a meta track.
pub fn is_meta_header(packet: &[u8]) -> bool {
    packet.len() >= META_MIN_LEN && packet.starts_with(META_MAGIC)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    Pause,
    Resume,
}

impl ControlMessage {
    /// Recognises a meta-track payload; only exact matches count.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        match payload {
            PAUSE_MESSAGE => Some(ControlMessage::Pause),
            RESUME_MESSAGE => Some(ControlMessage::Resume),
            _ => None,
        }
    }
}

/// Running granule offset that hides pauses from the kept track.
///
/// The offset starts at the first data granule position of the stream; each
/// pause/resume pair adds the paused span.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PauseClock {
    offset: u64,
    paused_at: u64,
    pauses: u32,
}

impl PauseClock {
    pub fn starting_at(offset: u64) -> Self {
        Self {
            offset,
            ..Default::default()
        }
    }

    /// Applies a control message observed at `granule` (meta-track time).
    pub fn observe(&mut self, message: ControlMessage, granule: u64) {
        match message {
            ControlMessage::Pause => self.paused_at = granule,
            ControlMessage::Resume => {
                self.offset = self
                    .offset
                    .saturating_add(granule.saturating_sub(self.paused_at));
                self.pauses += 1;
            }
        }
    }

    /// Maps a raw granule position onto the pause-free timeline, floored at
    /// zero.
    pub fn adjust(&self, granule: u64) -> u64 {
        granule.saturating_sub(self.offset)
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn pauses(&self) -> u32 {
        self.pauses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vad_preamble() {
        let packet = b"ECVADD\x03\x00\x01\x02\x40OpusHead";
        let vad = VadPreamble::parse(packet).unwrap();
        assert_eq!(vad.skip, 11);
        assert_eq!(vad.threshold, Some(0x40));
        assert!(packet[vad.skip..].starts_with(b"OpusHead"));

        // Too short for a threshold byte.
        let vad = VadPreamble::parse(b"ECVADD\x01\x00\x07").unwrap();
        assert_eq!(vad.skip, 9);
        assert_eq!(vad.threshold, None);

        // Zero threshold counts as none.
        let vad = VadPreamble::parse(b"ECVADD\x03\x00\x00\x00\x00Opus").unwrap();
        assert_eq!(vad.threshold, None);

        assert_eq!(VadPreamble::parse(b"ECVADD\x03\x00"), None);
        assert_eq!(VadPreamble::skip_of(b"OpusHead\x01\x01"), 0);
    }

    #[test]
    fn meta_header_and_messages() {
        assert!(is_meta_header(b"ECMETA\x01\x00"));
        assert!(!is_meta_header(b"ECMETA\x01"));
        assert!(!is_meta_header(b"OpusHead"));

        assert_eq!(ControlMessage::parse(br#"{"c":"pause"}"#), Some(ControlMessage::Pause));
        assert_eq!(ControlMessage::parse(br#"{"c":"resume"}"#), Some(ControlMessage::Resume));
        assert_eq!(ControlMessage::parse(br#"{"c":"pause"} "#), None);
        assert_eq!(ControlMessage::parse(br#"{"c":"paus"#), None);
        assert_eq!(ControlMessage::parse(br#"{"c":"text","text":"hi"}"#), None);
    }

    #[test]
    fn pause_accounting() {
        let mut clock = PauseClock::starting_at(1_000);
        assert_eq!(clock.adjust(5_000), 4_000);
        assert_eq!(clock.adjust(500), 0);

        clock.observe(ControlMessage::Pause, 10_000);
        clock.observe(ControlMessage::Resume, 58_000);
        assert_eq!(clock.offset(), 49_000);
        assert_eq!(clock.adjust(60_000), 60_000 - 1_000 - 48_000);
        assert_eq!(clock.pauses(), 1);
    }
}
