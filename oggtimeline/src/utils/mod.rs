//! Utility functions and supporting infrastructure.
//!
//! Provides CRC computation, bit-level header reading, error types and the
//! timebase arithmetic shared by the correction stages.

pub mod bitstream_io;
pub mod crc;
pub mod errors;
pub mod timing;
