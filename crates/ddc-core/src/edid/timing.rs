//! Established and standard timings.

use serde::{Deserialize, Serialize};

/// A video mode named by the established timings bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstablishedMode {
    pub width: u16,
    pub height: u16,
    pub refresh_hz: u8,
}

const fn mode(width: u16, height: u16, refresh_hz: u8) -> EstablishedMode {
    EstablishedMode {
        width,
        height,
        refresh_hz,
    }
}

/// Bit 23 is byte 35 bit 7; bit 7 is byte 37 bit 7.
///
/// Bit 10 is 1024x768 at 70 Hz as VESA assigns it, not 72 Hz.
const ESTABLISHED_MODES: [(u32, EstablishedMode); 17] = [
    (1 << 23, mode(720, 400, 70)),
    (1 << 22, mode(720, 400, 88)),
    (1 << 21, mode(640, 480, 60)),
    (1 << 20, mode(640, 480, 67)),
    (1 << 19, mode(640, 480, 72)),
    (1 << 18, mode(640, 480, 75)),
    (1 << 17, mode(800, 600, 56)),
    (1 << 16, mode(800, 600, 60)),
    (1 << 15, mode(800, 600, 72)),
    (1 << 14, mode(800, 600, 75)),
    (1 << 13, mode(832, 624, 75)),
    (1 << 12, mode(1024, 768, 87)),
    (1 << 11, mode(1024, 768, 60)),
    (1 << 10, mode(1024, 768, 70)),
    (1 << 9, mode(1024, 768, 75)),
    (1 << 8, mode(1280, 1024, 75)),
    (1 << 7, mode(1152, 870, 75)),
];

/// The 24-bit established timings bitmap (bytes 35..38).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstablishedTimings(u32);

impl EstablishedTimings {
    pub fn from_bytes(bytes: [u8; 3]) -> Self {
        Self(u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]))
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Every standard mode whose bit is set, in table order.
    pub fn modes(&self) -> Vec<EstablishedMode> {
        ESTABLISHED_MODES
            .iter()
            .filter(|(bit, _)| self.0 & bit != 0)
            .map(|&(_, m)| m)
            .collect()
    }

    pub fn contains(&self, width: u16, height: u16, refresh_hz: u8) -> bool {
        self.modes()
            .iter()
            .any(|m| m.width == width && m.height == height && m.refresh_hz == refresh_hz)
    }

    /// The seven manufacturer-reserved bits of byte 37.
    pub fn manufacturer_bits(&self) -> u8 {
        (self.0 & 0x7F) as u8
    }
}

/// Image aspect ratio encoded in bits 7..6 of a standard timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StandardAspect {
    R16x10,
    R4x3,
    R5x4,
    R16x9,
}

/// One 2-byte standard timing slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardTiming {
    resolution: u8,
    aspect_and_rate: u8,
}

impl StandardTiming {
    /// `None` for an unused slot (`01 01`, or a zero resolution byte).
    pub fn decode(bytes: [u8; 2]) -> Option<Self> {
        if bytes == [0x01, 0x01] || bytes[0] == 0x00 {
            return None;
        }
        Some(Self {
            resolution: bytes[0],
            aspect_and_rate: bytes[1],
        })
    }

    pub fn horizontal_pixels(&self) -> u16 {
        (u16::from(self.resolution) + 31) * 8
    }

    pub fn aspect(&self) -> StandardAspect {
        match self.aspect_and_rate >> 6 {
            0 => StandardAspect::R16x10,
            1 => StandardAspect::R4x3,
            2 => StandardAspect::R5x4,
            _ => StandardAspect::R16x9,
        }
    }

    pub fn vertical_pixels(&self) -> u16 {
        let h = u32::from(self.horizontal_pixels());
        let v = match self.aspect() {
            StandardAspect::R16x10 => h * 10 / 16,
            StandardAspect::R4x3 => h * 3 / 4,
            StandardAspect::R5x4 => h * 4 / 5,
            StandardAspect::R16x9 => h * 9 / 16,
        };
        v as u16
    }

    pub fn refresh_hz(&self) -> u8 {
        (self.aspect_and_rate & 0x3F) + 60
    }
}
