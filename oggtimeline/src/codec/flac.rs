//! FLAC-in-Ogg identification header and frame header fields.
//!
//! ## Identification packet
//!
//! | bytes  | field |
//! |--------|-------|
//! | 0..5   | `\x7FFLAC` |
//! | 5..7   | mapping version |
//! | 7..9   | header packet count |
//! | 9..13  | `fLaC` |
//! | 13     | metadata block type (low 7 bits, 0 = STREAMINFO) |
//! | 14..17 | block length |
//! | 17..   | STREAMINFO |
//!
//! STREAMINFO places the 20-bit sample rate at byte 27, followed by 3 bits of
//! `channels - 1` and 5 bits of `bits_per_sample - 1`, all MSB-first.

use oggtimeline_macros::codec_magic;

use crate::utils::bitstream_io::BsIoSliceReader;

/// Header of the FLAC Vorbis-comment block that may follow the
/// identification packet in the header region.
pub const FLAC_COMMENT_MAGIC: &[u8; 4] = b"\x04\x00\x00\x41";

const NATIVE_MAGIC: &[u8; 4] = b"fLaC";
const NATIVE_MAGIC_OFFSET: usize = 9;
const BLOCK_TYPE_OFFSET: usize = 13;
const SAMPLE_RATE_OFFSET: u64 = 27;
const CHANNELS_BYTE: usize = 29;
const CHANNELS_MASK: u8 = 0x0E;

/// View over an Ogg FLAC identification packet.
#[codec_magic(b"\x7FFLAC")]
#[derive(Debug)]
pub struct FlacIdent<B> {
    bytes: B,
}

impl<B: AsRef<[u8]>> FlacIdent<B> {
    /// Wraps `bytes` if it carries the FLAC magic and reaches the channel
    /// field.
    pub fn new(bytes: B) -> Option<Self> {
        let b = bytes.as_ref();
        (Self::matches(b) && b.len() > CHANNELS_BYTE).then_some(Self { bytes })
    }

    fn reader(&self) -> BsIoSliceReader<'_> {
        BsIoSliceReader::from_slice(self.bytes.as_ref())
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        let mut reader = self.reader();
        reader
            .seek_to_byte(SAMPLE_RATE_OFFSET)
            .and_then(|_| reader.get_n::<u32>(20))
            .unwrap_or(0)
    }

    /// Channel count declared by STREAMINFO.
    pub fn channels(&self) -> u8 {
        let mut reader = self.reader();
        reader
            .seek_to_byte(SAMPLE_RATE_OFFSET)
            .and_then(|_| reader.skip_n(20))
            .and_then(|_| reader.get_n::<u8>(3))
            .map(|c| c + 1)
            .unwrap_or(1)
    }

    /// Whether the packet embeds a native STREAMINFO block, which is the
    /// only layout whose channel field may be patched.
    pub fn has_streaminfo(&self) -> bool {
        let b = self.bytes.as_ref();
        &b[NATIVE_MAGIC_OFFSET..NATIVE_MAGIC_OFFSET + 4] == NATIVE_MAGIC
            && b[BLOCK_TYPE_OFFSET] & 0x7F == 0
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> FlacIdent<B> {
    /// Rewrites the STREAMINFO channel field. Returns `false` (and leaves
    /// the packet alone) when there is no STREAMINFO block.
    pub fn set_channel_count(&mut self, channels: u8) -> bool {
        if !self.has_streaminfo() || channels == 0 {
            return false;
        }

        let b = &mut self.bytes.as_mut()[CHANNELS_BYTE];
        *b = (*b & !CHANNELS_MASK) | (((channels - 1) << 1) & CHANNELS_MASK);
        true
    }
}

/// Channel count of a FLAC frame, from the channel-assignment nibble of its
/// frame header.
///
/// Assignment 0 (mono) gives one channel. Every other independent
/// assignment `1..8` gives two, as do the joint-stereo assignments `8..`.
/// Older capture tooling counted assignment 1 (two independent channels) as
/// mono; here it counts as stereo, so such a track gets a stereo header and
/// stereo silence.
pub fn frame_channels(packet: &[u8]) -> Option<u8> {
    if packet.len() <= 3 || packet[0] != 0xFF || packet[1] & 0xFC != 0xF8 {
        return None;
    }

    let assignment = packet[3] >> 4;
    Some(if assignment == 0 { 1 } else { 2 })
}
