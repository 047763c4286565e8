//! 18-byte EDID descriptors.
//!
//! A slot whose first two bytes (the pixel clock) are non-zero is a detailed
//! timing.  Otherwise byte 3 is a tag:
//!
//! | Tag  | Meaning                     |
//! |------|-----------------------------|
//! | 0xFF | display serial number text  |
//! | 0xFE | unspecified text            |
//! | 0xFD | display range limits        |
//! | 0xFC | display name                |
//!
//! Any other tag is decoded as a detailed timing anyway.

use serde::{Deserialize, Serialize};

/// Size of one descriptor slot.
pub const DESCRIPTOR_LEN: usize = 18;

const TAG_SERIAL_NUMBER: u8 = 0xFF;
const TAG_TEXT: u8 = 0xFE;
const TAG_RANGE_LIMITS: u8 = 0xFD;
const TAG_DISPLAY_NAME: u8 = 0xFC;

/// Text payload occupies bytes 5..18 of the slot.
const TEXT_RANGE: std::ops::Range<usize> = 5..DESCRIPTOR_LEN;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Descriptor {
    Timing(DetailedTiming),
    SerialNumber(String),
    Text(String),
    /// Range limits are recognised but their fields are not decoded.
    RangeLimits,
    DisplayName(String),
}

/// A detailed timing descriptor.
///
/// Every 12-bit (or 10-/6-bit) field is assembled from a low byte and the
/// upper bits packed into a shared nibble byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedTiming {
    /// Pixel clock in units of 10 kHz.
    pub pixel_clock: u16,
    pub horizontal_active: u16,
    pub horizontal_blanking: u16,
    pub vertical_active: u16,
    pub vertical_blanking: u16,
    pub horizontal_sync_offset: u16,
    pub horizontal_sync_width: u16,
    pub vertical_sync_offset: u16,
    pub vertical_sync_width: u16,
    pub horizontal_image_mm: u16,
    pub vertical_image_mm: u16,
    pub horizontal_border: u8,
    pub vertical_border: u8,
    /// Raw flags byte (interlace, stereo, sync type).
    pub flags: u8,
}

impl DetailedTiming {
    fn decode(d: &[u8; DESCRIPTOR_LEN]) -> Self {
        let hi = |byte: u8, shift: u8, mask: u8| u16::from((byte >> shift) & mask);

        Self {
            pixel_clock: u16::from_le_bytes([d[0], d[1]]),
            horizontal_active: (hi(d[4], 4, 0x0F) << 8) | u16::from(d[2]),
            horizontal_blanking: (hi(d[4], 0, 0x0F) << 8) | u16::from(d[3]),
            vertical_active: (hi(d[7], 4, 0x0F) << 8) | u16::from(d[5]),
            vertical_blanking: (hi(d[7], 0, 0x0F) << 8) | u16::from(d[6]),
            horizontal_sync_offset: (hi(d[11], 6, 0b11) << 8) | u16::from(d[8]),
            horizontal_sync_width: (hi(d[11], 4, 0b11) << 8) | u16::from(d[9]),
            vertical_sync_offset: (hi(d[11], 2, 0b11) << 4) | hi(d[10], 4, 0x0F),
            vertical_sync_width: (hi(d[11], 0, 0b11) << 4) | hi(d[10], 0, 0x0F),
            horizontal_image_mm: (hi(d[14], 4, 0x0F) << 8) | u16::from(d[12]),
            vertical_image_mm: (hi(d[14], 0, 0x0F) << 8) | u16::from(d[13]),
            horizontal_border: d[15],
            vertical_border: d[16],
            flags: d[17],
        }
    }

    pub fn pixel_clock_khz(&self) -> u32 {
        u32::from(self.pixel_clock) * 10
    }

    pub fn is_interlaced(&self) -> bool {
        self.flags & 0x80 != 0
    }

    /// Vertical refresh rate in Hz, or `None` for an empty timing.
    pub fn refresh_hz(&self) -> Option<f32> {
        let h_total = u32::from(self.horizontal_active) + u32::from(self.horizontal_blanking);
        let v_total = u32::from(self.vertical_active) + u32::from(self.vertical_blanking);
        let pixels = h_total * v_total;
        if pixels == 0 {
            return None;
        }
        Some(self.pixel_clock_khz() as f32 * 1000.0 / pixels as f32)
    }
}

impl Descriptor {
    /// Classifies and decodes one slot.
    pub fn decode(slot: &[u8; DESCRIPTOR_LEN]) -> Self {
        if slot[0] != 0 || slot[1] != 0 {
            return Descriptor::Timing(DetailedTiming::decode(slot));
        }

        match slot[3] {
            TAG_SERIAL_NUMBER => Descriptor::SerialNumber(decode_text(slot)),
            TAG_TEXT => Descriptor::Text(decode_text(slot)),
            TAG_RANGE_LIMITS => Descriptor::RangeLimits,
            TAG_DISPLAY_NAME => Descriptor::DisplayName(decode_text(slot)),
            _ => Descriptor::Timing(DetailedTiming::decode(slot)),
        }
    }
}

/// Text stops at the first newline; bytes are treated as Latin-1.
fn decode_text(slot: &[u8; DESCRIPTOR_LEN]) -> String {
    slot[TEXT_RANGE]
        .iter()
        .take_while(|&&b| b != b'\n')
        .map(|&b| char::from(b))
        .collect()
}
