//! The validated EDID block and its fixed-offset fields.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::edid::descriptor::{Descriptor, DESCRIPTOR_LEN};
use crate::edid::timing::{EstablishedTimings, StandardTiming};

/// Size of the base block and of every extension block.
pub const EDID_BLOCK_LEN: usize = 128;

/// Fixed 8-byte magic at the start of every base block.
pub const EDID_HEADER: [u8; 8] = [0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00];

const DESCRIPTOR_OFFSET: usize = 54;
const STANDARD_TIMING_OFFSET: usize = 38;
const EXTENSION_COUNT_OFFSET: usize = 126;

/// Reasons a buffer is not accepted as an EDID block.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EdidError {
    #[error("EDID needs at least {EDID_BLOCK_LEN} bytes, got {0}")]
    TooShort(usize),

    #[error("EDID header magic is missing")]
    BadHeader,

    /// The base block bytes do not sum to zero; `sum` is the actual remainder.
    #[error("EDID checksum failed: base block sums to 0x{sum:02X}")]
    ChecksumMismatch { sum: u8 },
}

/// A 10-bit CIE coordinate pair as stored in the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChromaticityPoint {
    pub x: u16,
    pub y: u16,
}

impl ChromaticityPoint {
    /// The coordinates as fractions in `0.0..1.0`.
    pub fn as_f32(&self) -> (f32, f32) {
        (f32::from(self.x) / 1024.0, f32::from(self.y) / 1024.0)
    }
}

/// Primaries and white point of the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chromaticity {
    pub red: ChromaticityPoint,
    pub green: ChromaticityPoint,
    pub blue: ChromaticityPoint,
    pub white: ChromaticityPoint,
}

/// A validated EDID: base block plus whatever extension bytes were supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edid {
    raw: Vec<u8>,
}

impl Edid {
    /// Validates `data` and wraps it.
    ///
    /// # Errors
    ///
    /// - [`EdidError::TooShort`] if fewer than 128 bytes are given.
    /// - [`EdidError::BadHeader`] if the first 8 bytes are not [`EDID_HEADER`].
    /// - [`EdidError::ChecksumMismatch`] if the base block does not sum to zero.
    pub fn parse(data: &[u8]) -> Result<Self, EdidError> {
        if data.len() < EDID_BLOCK_LEN {
            return Err(EdidError::TooShort(data.len()));
        }
        if data[..EDID_HEADER.len()] != EDID_HEADER {
            return Err(EdidError::BadHeader);
        }

        let sum = data[..EDID_BLOCK_LEN]
            .iter()
            .fold(0u8, |acc, &b| acc.wrapping_add(b));
        if sum != 0 {
            return Err(EdidError::ChecksumMismatch { sum });
        }

        Ok(Self { raw: data.to_vec() })
    }

    /// The bytes this value was parsed from.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// The header as a big-endian integer (`0x00FFFFFFFFFFFF00`).
    pub fn header(&self) -> u64 {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.raw[..8]);
        u64::from_be_bytes(bytes)
    }

    pub fn manufacturer_id(&self) -> u16 {
        u16::from_be_bytes([self.raw[8], self.raw[9]])
    }

    /// The three-letter PNP vendor code, e.g. `"DEL"`.
    pub fn manufacturer(&self) -> String {
        let id = self.manufacturer_id();
        [10u16, 5, 0]
            .iter()
            .map(|shift| {
                let letter = ((id >> shift) & 0b1_1111) as u8;
                char::from(b'A' - 1 + letter)
            })
            .collect()
    }

    pub fn product_code(&self) -> u16 {
        u16::from_le_bytes([self.raw[10], self.raw[11]])
    }

    pub fn serial_number(&self) -> u32 {
        u32::from_le_bytes([self.raw[12], self.raw[13], self.raw[14], self.raw[15]])
    }

    /// Week of manufacture (0 when unspecified).
    pub fn week(&self) -> u8 {
        self.raw[16]
    }

    pub fn year(&self) -> u16 {
        1990 + u16::from(self.raw[17])
    }

    pub fn version(&self) -> u8 {
        self.raw[18]
    }

    pub fn revision(&self) -> u8 {
        self.raw[19]
    }

    /// `"version.revision"`, e.g. `"1.4"`.
    pub fn version_string(&self) -> String {
        format!("{}.{}", self.version(), self.revision())
    }

    /// Raw video input definition byte.
    pub fn video_input(&self) -> u8 {
        self.raw[20]
    }

    pub fn is_digital(&self) -> bool {
        self.video_input() & 0x80 != 0
    }

    pub fn screen_width_cm(&self) -> Option<u8> {
        non_zero(self.raw[21])
    }

    pub fn screen_height_cm(&self) -> Option<u8> {
        non_zero(self.raw[22])
    }

    /// Width-to-height ratio, when the block stores an aspect ratio instead
    /// of a physical size (exactly one of bytes 21/22 is zero).
    pub fn aspect_ratio(&self) -> Option<f32> {
        match (self.screen_width_cm(), self.screen_height_cm()) {
            (Some(landscape), None) => Some((f32::from(landscape) + 99.0) / 100.0),
            (None, Some(portrait)) => Some(100.0 / (f32::from(portrait) + 99.0)),
            _ => None,
        }
    }

    /// Display gamma, or `None` when it is defined in an extension (`0xFF`).
    pub fn gamma(&self) -> Option<f32> {
        match self.raw[23] {
            0xFF => None,
            g => Some((f32::from(g) + 100.0) / 100.0),
        }
    }

    /// Raw feature support byte (DPMS, color type, preferred timing).
    pub fn features(&self) -> u8 {
        self.raw[24]
    }

    pub fn chromaticity(&self) -> Chromaticity {
        let lo_rg = self.raw[25];
        let lo_bw = self.raw[26];
        let point = |msb_x: usize, msb_y: usize, lsb: u8, shift: u8| ChromaticityPoint {
            x: (u16::from(self.raw[msb_x]) << 2) | u16::from((lsb >> (shift + 2)) & 0b11),
            y: (u16::from(self.raw[msb_y]) << 2) | u16::from((lsb >> shift) & 0b11),
        };

        Chromaticity {
            red: point(27, 28, lo_rg, 4),
            green: point(29, 30, lo_rg, 0),
            blue: point(31, 32, lo_bw, 4),
            white: point(33, 34, lo_bw, 0),
        }
    }

    pub fn established_timings(&self) -> EstablishedTimings {
        EstablishedTimings::from_bytes([self.raw[35], self.raw[36], self.raw[37]])
    }

    /// The eight standard timing slots; unused slots are `None`.
    pub fn standard_timings(&self) -> [Option<StandardTiming>; 8] {
        std::array::from_fn(|i| {
            let at = STANDARD_TIMING_OFFSET + i * 2;
            StandardTiming::decode([self.raw[at], self.raw[at + 1]])
        })
    }

    /// The four 18-byte descriptor slots, decoded.
    pub fn descriptors(&self) -> [Descriptor; 4] {
        std::array::from_fn(|i| {
            let at = DESCRIPTOR_OFFSET + i * DESCRIPTOR_LEN;
            let mut slot = [0u8; DESCRIPTOR_LEN];
            slot.copy_from_slice(&self.raw[at..at + DESCRIPTOR_LEN]);
            Descriptor::decode(&slot)
        })
    }

    /// The display name descriptor, if any slot carries one.
    pub fn display_name(&self) -> Option<String> {
        self.descriptors().into_iter().find_map(|d| match d {
            Descriptor::DisplayName(name) => Some(name),
            _ => None,
        })
    }

    pub fn extension_count(&self) -> u8 {
        self.raw[EXTENSION_COUNT_OFFSET]
    }

    /// The extension blocks that were actually supplied, at most
    /// [`Edid::extension_count`] of them.
    pub fn extensions(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.raw[EDID_BLOCK_LEN..]
            .chunks_exact(EDID_BLOCK_LEN)
            .take(usize::from(self.extension_count()))
    }

    /// Stored checksum byte of the base block.
    pub fn checksum(&self) -> u8 {
        self.raw[EDID_BLOCK_LEN - 1]
    }
}

impl TryFrom<&[u8]> for Edid {
    type Error = EdidError;

    fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
        Edid::parse(data)
    }
}

fn non_zero(value: u8) -> Option<u8> {
    (value != 0).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edid::timing::StandardAspect;

    /// 1024x768 panel from "AER", with a name and a range limits descriptor.
    fn sample() -> Vec<u8> {
        let mut edid = vec![0u8; EDID_BLOCK_LEN];
        edid[0..8].copy_from_slice(&EDID_HEADER);
        edid[8..10].copy_from_slice(&0x04B2u16.to_be_bytes());
        edid[10..12].copy_from_slice(&0x1234u16.to_le_bytes());
        edid[12..16].copy_from_slice(&0xDEADBEEFu32.to_le_bytes());
        edid[16] = 12;
        edid[17] = 34;
        edid[18] = 1;
        edid[19] = 4;
        edid[20] = 0x80;
        edid[21] = 34;
        edid[22] = 27;
        edid[23] = 120;
        edid[24] = 0x06;
        edid[25..35].copy_from_slice(&[0xEE, 0x91, 0xA3, 0x54, 0x4C, 0x99, 0x26, 0x0F, 0x50, 0x54]);
        edid[35] = 0x21;
        edid[36] = 0x08;
        edid[38..54].copy_from_slice(&[
            0x61, 0x40, 0x45, 0x40, 0x31, 0x40, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01,
            0x01, 0x01,
        ]);
        edid[54..72].copy_from_slice(&[
            0x64, 0x19, 0x00, 0x40, 0x41, 0x00, 0x26, 0x30, 0x18, 0x88, 0x36, 0x00, 0x54, 0x0E,
            0x11, 0x00, 0x00, 0x18,
        ]);
        edid[72..90].copy_from_slice(&[
            0x00, 0x00, 0x00, 0xFC, 0x00, b'A', b'E', b'R', b'O', b' ', b'V', b'G', b'A', 0x0A,
            0x20, 0x20, 0x20, 0x20,
        ]);
        edid[90..108].copy_from_slice(&[
            0x00, 0x00, 0x00, 0xFD, 0x00, 50, 75, 30, 80, 8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00,
        ]);
        edid[108..126].copy_from_slice(&[
            0x00, 0x00, 0x00, 0xFF, 0x00, b'S', b'N', b'1', b'2', b'3', 0x0A, 0x20, 0x20, 0x20,
            0x20, 0x20, 0x20, 0x20,
        ]);
        fix_checksum(&mut edid);
        edid
    }

    fn fix_checksum(edid: &mut [u8]) {
        let sum = edid[..EDID_BLOCK_LEN - 1]
            .iter()
            .fold(0u8, |acc, &b| acc.wrapping_add(b));
        edid[EDID_BLOCK_LEN - 1] = 0u8.wrapping_sub(sum);
    }

    #[test]
    fn test_parse_accepts_valid_block() {
        // Arrange
        let data = sample();

        // Act
        let edid = Edid::parse(&data).expect("valid EDID");

        // Assert
        assert_eq!(edid.header(), 0x00FF_FFFF_FFFF_FF00);
        assert_eq!(edid.raw().len(), EDID_BLOCK_LEN);
    }

    #[test]
    fn test_parse_rejects_short_buffer() {
        let data = sample();
        assert_eq!(Edid::parse(&data[..127]), Err(EdidError::TooShort(127)));
        assert_eq!(Edid::parse(&[]), Err(EdidError::TooShort(0)));
    }

    #[test]
    fn test_parse_rejects_bad_header() {
        let mut data = sample();
        data[0] = 0x01;
        data[127] = data[127].wrapping_sub(1);
        assert_eq!(Edid::parse(&data), Err(EdidError::BadHeader));
    }

    #[test]
    fn test_parse_rejects_bad_checksum() {
        let mut data = sample();
        data[60] ^= 0x01;
        assert!(matches!(Edid::parse(&data), Err(EdidError::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_identification_fields() {
        let edid = Edid::parse(&sample()).expect("valid");
        assert_eq!(edid.manufacturer(), "AER");
        assert_eq!(edid.product_code(), 0x1234);
        assert_eq!(edid.serial_number(), 0xDEAD_BEEF);
        assert_eq!(edid.week(), 12);
        assert_eq!(edid.year(), 2024);
        assert_eq!(edid.version_string(), "1.4");
        assert!(edid.is_digital());
    }

    #[test]
    fn test_physical_size_and_gamma() {
        let edid = Edid::parse(&sample()).expect("valid");
        assert_eq!(edid.screen_width_cm(), Some(34));
        assert_eq!(edid.screen_height_cm(), Some(27));
        assert_eq!(edid.aspect_ratio(), None);
        assert_eq!(edid.gamma(), Some(2.2));
    }

    #[test]
    fn test_aspect_ratio_when_height_is_zero() {
        let mut data = sample();
        data[21] = 79;
        data[22] = 0;
        fix_checksum(&mut data);
        let edid = Edid::parse(&data).expect("valid");
        let ratio = edid.aspect_ratio().expect("aspect ratio");
        assert!((ratio - 1.78).abs() < 0.001);
    }

    #[test]
    fn test_gamma_defined_elsewhere() {
        let mut data = sample();
        data[23] = 0xFF;
        fix_checksum(&mut data);
        assert_eq!(Edid::parse(&data).expect("valid").gamma(), None);
    }

    #[test]
    fn test_chromaticity_unpacks_ten_bit_values() {
        let edid = Edid::parse(&sample()).expect("valid");
        let c = edid.chromaticity();
        // red x: msb 0xA3, lsb bits 7..6 of 0xEE = 0b11
        assert_eq!(c.red.x, (0xA3 << 2) | 0b11);
        // red y: msb 0x54, lsb bits 5..4 of 0xEE = 0b10
        assert_eq!(c.red.y, (0x54 << 2) | 0b10);
        // white y: msb 0x54, lsb bits 1..0 of 0x91 = 0b01
        assert_eq!(c.white.y, (0x54 << 2) | 0b01);
        let (x, _) = c.red.as_f32();
        assert!((x - 0.6396).abs() < 0.001);
    }

    #[test]
    fn test_established_and_standard_timings() {
        let edid = Edid::parse(&sample()).expect("valid");
        let established = edid.established_timings();
        assert!(established.contains(640, 480, 60));
        assert!(established.contains(800, 600, 60));
        assert!(established.contains(1024, 768, 60));
        assert!(!established.contains(720, 400, 70));

        let standard = edid.standard_timings();
        let first = standard[0].expect("first slot used");
        assert_eq!(first.horizontal_pixels(), 1024);
        assert_eq!(first.aspect(), StandardAspect::R4x3);
        assert_eq!(first.vertical_pixels(), 768);
        assert_eq!(first.refresh_hz(), 60);
        assert!(standard[3..].iter().all(Option::is_none));
    }

    #[test]
    fn test_descriptors_decode_in_slot_order() {
        let edid = Edid::parse(&sample()).expect("valid");
        let [timing, name, range, serial] = edid.descriptors();
        match timing {
            Descriptor::Timing(t) => {
                assert_eq!(t.horizontal_active, 1024);
                assert_eq!(t.vertical_active, 768);
            }
            other => panic!("expected timing, got {other:?}"),
        }
        assert_eq!(name, Descriptor::DisplayName("AERO VGA".to_string()));
        assert_eq!(range, Descriptor::RangeLimits);
        assert_eq!(serial, Descriptor::SerialNumber("SN123".to_string()));
        assert_eq!(edid.display_name().as_deref(), Some("AERO VGA"));
    }

    #[test]
    fn test_extensions_limited_to_supplied_blocks() {
        let mut data = sample();
        data[126] = 2;
        fix_checksum(&mut data);
        data.extend_from_slice(&[0x02; EDID_BLOCK_LEN]);

        let edid = Edid::parse(&data).expect("valid");
        assert_eq!(edid.extension_count(), 2);
        let blocks: Vec<&[u8]> = edid.extensions().collect();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0][0], 0x02);
    }
}
