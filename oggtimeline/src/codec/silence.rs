//! Literal packets encoding one frame of digital silence.

use crate::codec::CodecFamily;
use crate::utils::timing::RateFamily;

/// Opus: a single code-3 packet of zero-length frames, valid for any
/// channel layout.
pub const SILENCE_OPUS: &[u8] = &[0xF8, 0xFF, 0xFE];

pub const SILENCE_FLAC_48K_MONO: &[u8] = &[
    0xFF, 0xF8, 0x7A, 0x0C, 0x00, 0x03, 0xBF, 0x94, 0x00, 0x00, 0x00, 0x00, 0xB1, 0xCA,
];

pub const SILENCE_FLAC_48K_STEREO: &[u8] = &[
    0xFF, 0xF8, 0x7A, 0x1C, 0x32, 0x03, 0xBF, 0xC4, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0xD5, 0x5D,
];

pub const SILENCE_FLAC_44K_MONO: &[u8] = &[
    0xFF, 0xF8, 0x79, 0x0C, 0x00, 0x03, 0x71, 0x56, 0x00, 0x00, 0x00, 0x00, 0x63, 0xC5,
];

pub const SILENCE_FLAC_44K_STEREO: &[u8] = &[
    0xFF, 0xF8, 0x79, 0x1C, 0x32, 0x03, 0x71, 0x06, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x3D, 0xB6,
];

/// Key into the silence catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SilenceKind {
    Opus,
    Flac48kMono,
    Flac48kStereo,
    Flac44kMono,
    Flac44kStereo,
}

impl SilenceKind {
    /// Picks the payload for a track once codec, rate family and the
    /// maximum observed channel count are known.
    pub fn select(codec: CodecFamily, rate: RateFamily, channels: u8) -> Self {
        let stereo = channels > 1;
        match (codec, rate, stereo) {
            (CodecFamily::Opus, _, _) => SilenceKind::Opus,
            (CodecFamily::Flac, RateFamily::Hz48000, false) => SilenceKind::Flac48kMono,
            (CodecFamily::Flac, RateFamily::Hz48000, true) => SilenceKind::Flac48kStereo,
            (CodecFamily::Flac, RateFamily::Hz44100, false) => SilenceKind::Flac44kMono,
            (CodecFamily::Flac, RateFamily::Hz44100, true) => SilenceKind::Flac44kStereo,
        }
    }

    pub fn payload(self) -> &'static [u8] {
        match self {
            SilenceKind::Opus => SILENCE_OPUS,
            SilenceKind::Flac48kMono => SILENCE_FLAC_48K_MONO,
            SilenceKind::Flac48kStereo => SILENCE_FLAC_48K_STEREO,
            SilenceKind::Flac44kMono => SILENCE_FLAC_44K_MONO,
            SilenceKind::Flac44kStereo => SILENCE_FLAC_44K_STEREO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{flac, opus};

    #[test]
    fn selection() {
        use CodecFamily::*;
        use RateFamily::*;

        assert_eq!(SilenceKind::select(Opus, Hz48000, 1), SilenceKind::Opus);
        assert_eq!(SilenceKind::select(Opus, Hz48000, 2), SilenceKind::Opus);
        assert_eq!(SilenceKind::select(Flac, Hz48000, 1), SilenceKind::Flac48kMono);
        assert_eq!(SilenceKind::select(Flac, Hz48000, 2), SilenceKind::Flac48kStereo);
        assert_eq!(SilenceKind::select(Flac, Hz44100, 1), SilenceKind::Flac44kMono);
        assert_eq!(SilenceKind::select(Flac, Hz44100, 2), SilenceKind::Flac44kStereo);
    }

    #[test]
    fn payloads_agree_with_frame_parsers() {
        assert_eq!(opus::toc_channels(SilenceKind::Opus.payload()), Some(1));
        for (kind, channels) in [
            (SilenceKind::Flac48kMono, 1),
            (SilenceKind::Flac48kStereo, 2),
            (SilenceKind::Flac44kMono, 1),
            (SilenceKind::Flac44kStereo, 2),
        ] {
            assert_eq!(flac::frame_channels(kind.payload()), Some(channels), "{kind:?}");
        }
        // Sample-rate code in the frame header: 0xA = 48 kHz, 0x9 = 44.1 kHz.
        assert_eq!(SILENCE_FLAC_48K_MONO[2] & 0x0F, 0x0A);
        assert_eq!(SILENCE_FLAC_44K_STEREO[2] & 0x0F, 0x09);
    }
}
