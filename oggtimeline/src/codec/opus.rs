//! Opus identification header and packet TOC.

use oggtimeline_macros::codec_magic;

/// Prefix shared by the Opus header-region packets (`OpusHead`, `OpusTags`).
pub const OPUS_FAMILY_MAGIC: &[u8; 4] = b"Opus";

const CHANNEL_COUNT_OFFSET: usize = 9;
const TOC_STEREO: u8 = 0x04;

/// View over an `OpusHead` packet.
///
/// | bytes | field |
/// |-------|-------|
/// | 0..8  | `OpusHead` |
/// | 8     | version |
/// | 9     | output channel count |
#[codec_magic(b"OpusHead")]
#[derive(Debug)]
pub struct OpusHead<B> {
    bytes: B,
}

impl<B: AsRef<[u8]>> OpusHead<B> {
    /// Wraps `bytes` if it is an `OpusHead` long enough to hold the
    /// channel count.
    pub fn new(bytes: B) -> Option<Self> {
        let b = bytes.as_ref();
        (Self::matches(b) && b.len() > CHANNEL_COUNT_OFFSET).then_some(Self { bytes })
    }

    pub fn channel_count(&self) -> u8 {
        self.bytes.as_ref()[CHANNEL_COUNT_OFFSET]
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> OpusHead<B> {
    pub fn set_channel_count(&mut self, channels: u8) {
        self.bytes.as_mut()[CHANNEL_COUNT_OFFSET] = channels;
    }
}

/// Channel count signalled by a packet's TOC byte (the stereo flag).
pub fn toc_channels(packet: &[u8]) -> Option<u8> {
    packet
        .first()
        .map(|&toc| if toc & TOC_STEREO != 0 { 2 } else { 1 })
}
