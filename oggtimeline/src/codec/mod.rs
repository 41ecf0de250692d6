//! Codec families carried by the kept track.
//!
//! Only the fields the timeline repair needs are exposed: the sample rate of
//! FLAC streams, the channel count of identification packets (readable and
//! patchable) and the channel count signalled by individual data packets.

pub mod flac;
pub mod opus;
pub mod silence;

use std::fmt::Display;

use flac::{FLAC_COMMENT_MAGIC, FlacIdent};
use opus::{OPUS_FAMILY_MAGIC, OpusHead};

/// Minimum length of any recognised header-region packet.
const MIN_HEADER_PACKET_LEN: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CodecFamily {
    #[default]
    Opus,
    Flac,
}

impl CodecFamily {
    /// Data packets shorter than this are taken as silence when the track
    /// has no voice-activity threshold.
    pub fn silence_size_threshold(self) -> usize {
        match self {
            CodecFamily::Opus => 8,
            CodecFamily::Flac => 16,
        }
    }

    /// Channel count signalled by one data packet; 1 when the packet does
    /// not say.
    pub fn packet_channels(self, packet: &[u8]) -> u8 {
        match self {
            CodecFamily::Opus => opus::toc_channels(packet),
            CodecFamily::Flac => flac::frame_channels(packet),
        }
        .unwrap_or(1)
    }

    /// Rewrites the declared channel count of an identification packet in
    /// place. Returns whether the packet was recognised and patched.
    pub fn patch_channel_count(self, ident: &mut [u8], channels: u8) -> bool {
        match self {
            CodecFamily::Opus => match OpusHead::new(ident) {
                Some(mut head) => {
                    head.set_channel_count(channels);
                    true
                }
                None => false,
            },
            CodecFamily::Flac => match FlacIdent::new(ident) {
                Some(mut ident) => ident.set_channel_count(channels),
                None => false,
            },
        }
    }
}

impl Display for CodecFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecFamily::Opus => write!(f, "Opus"),
            CodecFamily::Flac => write!(f, "FLAC"),
        }
    }
}

/// What a header-region packet turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderPacket {
    /// `OpusHead`, with its declared channel count.
    OpusHead { channels: u8 },
    /// Another `Opus`-prefixed packet, e.g. `OpusTags`.
    OpusOther,
    /// FLAC identification packet with its STREAMINFO sample rate.
    FlacIdent { sample_rate: u32, channels: u8 },
    /// FLAC magic, but too short to carry STREAMINFO.
    FlacTruncated,
    /// FLAC Vorbis-comment block.
    FlacComment,
}

impl HeaderPacket {
    /// Recognises a header-region packet (after any preamble is skipped).
    /// Anything else is not an identification-region packet and yields
    /// `None`.
    pub fn recognise(packet: &[u8]) -> Option<Self> {
        if packet.len() < MIN_HEADER_PACKET_LEN {
            return None;
        }

        if let Some(head) = OpusHead::new(packet) {
            return Some(HeaderPacket::OpusHead {
                channels: head.channel_count(),
            });
        }
        if packet.starts_with(OPUS_FAMILY_MAGIC) {
            return Some(HeaderPacket::OpusOther);
        }
        if let Some(ident) = FlacIdent::new(packet) {
            return Some(HeaderPacket::FlacIdent {
                sample_rate: ident.sample_rate(),
                channels: ident.channels(),
            });
        }
        if FlacIdent::<&[u8]>::matches(packet) {
            return Some(HeaderPacket::FlacTruncated);
        }
        if packet.starts_with(FLAC_COMMENT_MAGIC) {
            return Some(HeaderPacket::FlacComment);
        }

        None
    }
}
