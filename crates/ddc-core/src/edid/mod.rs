//! EDID (Extended Display Identification Data) decoder.
//!
//! The base block is exactly 128 bytes at fixed offsets:
//!
//! ```text
//! 0..8     header 00 FF FF FF FF FF FF 00
//! 8..10    manufacturer ID (three 5-bit letters, big-endian)
//! 10..12   product code (little-endian)
//! 12..16   serial number (little-endian)
//! 16, 17   week, year - 1990
//! 18, 19   version, revision
//! 20..25   video input, width cm, height cm, gamma, features
//! 25..35   chromaticity (packed 10-bit coordinates)
//! 35..38   established timings bitmap
//! 38..54   eight standard timings
//! 54..126  four 18-byte descriptors
//! 126      extension block count
//! 127      checksum (all 128 bytes sum to 0 mod 256)
//! ```
//!
//! Only the header and checksum are validated.  Every other field is a pure
//! function over the immutable raw bytes.

pub mod block;
pub mod descriptor;
pub mod timing;

pub use block::{Chromaticity, ChromaticityPoint, Edid, EdidError, EDID_BLOCK_LEN, EDID_HEADER};
pub use descriptor::{Descriptor, DetailedTiming, DESCRIPTOR_LEN};
pub use timing::{EstablishedMode, EstablishedTimings, StandardAspect, StandardTiming};
