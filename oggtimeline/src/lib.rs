//! Timeline repair for one track of a multi-track Ogg recording.
//!
//! ## Technical Overview
//!
//! Recordings are captured live: packets arrive late, in bursts, or not at
//! all while a speaker is silent or the recording is paused. Their granule
//! positions therefore do not describe a contiguous track. This crate
//! extracts one logical stream (the *kept track*) and re-stamps it so that
//! it plays back in sync with the other tracks.
//!
//! ### Input
//!
//! The whole recording twice, concatenated. The first copy is analysed, the
//! second is rewritten. The kept track carries Opus or FLAC, optionally
//! wrapped with a voice-activity preamble; a separate meta track may carry
//! pause and resume messages.
//!
//! ### Output
//!
//! A single-track Ogg stream: the kept track's header packets, one forced
//! silence packet, then the data packets at output granule positions spaced
//! exactly one frame apart, with silence packets filling gaps.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use oggtimeline::process::{CorrectOptions, correct_track};
//!
//! let input = std::fs::read("recording.ogg")?;
//! let doubled = [input.as_slice(), input.as_slice()].concat();
//!
//! let options = CorrectOptions { serial: 5, ..Default::default() };
//! let mut output = Vec::new();
//! let summary = correct_track(doubled.as_slice(), &mut output, &options)?;
//! println!("{} packets, {} dropped", summary.records, summary.correction.dropped);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Little-endian serialization of fixed-layout headers.
pub mod byteorder;

/// Codec-specific views of the kept track's packets.
///
/// - **Opus** ([`codec::opus`]): `OpusHead` and the packet TOC
/// - **FLAC** ([`codec::flac`]): Ogg FLAC identification and frame headers
/// - **Silence** ([`codec::silence`]): prebuilt one-frame silence packets
pub mod codec;

/// Ogg page framing: reading, writing and checksums.
pub mod container;

/// The correction pipeline.
///
/// 1. **Header scan** ([`process::scan`])
/// 2. **Classification** ([`process::classify`])
/// 3. **Segmentation** ([`process::segment`])
/// 4. **Timing correction** ([`process::correct`])
/// 5. **Emission** ([`process::emit`])
pub mod process;

/// Voice-activity preamble and meta-track control messages.
pub mod protocol;

/// Utility functions and supporting infrastructure.
///
/// - **Bitstream I/O** ([`utils::bitstream_io`]): Bit-level reading
/// - **CRC** ([`utils::crc`]): Ogg page checksums
/// - **Error Handling** ([`utils::errors`]): Error types
/// - **Timing** ([`utils::timing`]): Frame durations and rate families
pub mod utils;
