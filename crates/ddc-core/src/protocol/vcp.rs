//! VCP (Virtual Control Panel) command table.
//!
//! Each command is identified on the wire by a single opcode byte.  The table
//! below names the codes this crate knows about; any other opcode can still
//! be sent through [`VcpCode::Raw`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Generates the [`VcpCode`] enum together with its opcode and name lookups.
macro_rules! vcp_codes {
    ($($(#[$doc:meta])* $variant:ident = $code:literal, $name:literal;)+) => {
        /// A VCP command code.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum VcpCode {
            $($(#[$doc])* $variant,)+
            /// Any opcode not covered by the table.
            Raw(u8),
        }

        impl VcpCode {
            /// Every named entry of the table, in declaration order.
            pub const ALL: &'static [VcpCode] = &[$(VcpCode::$variant,)+];

            /// The opcode byte sent on the wire.
            pub fn code(self) -> u8 {
                match self {
                    $(VcpCode::$variant => $code,)+
                    VcpCode::Raw(code) => code,
                }
            }

            /// Human-readable name, or `None` for [`VcpCode::Raw`].
            pub fn name(self) -> Option<&'static str> {
                match self {
                    $(VcpCode::$variant => Some($name),)+
                    VcpCode::Raw(_) => None,
                }
            }
        }

        impl From<u8> for VcpCode {
            fn from(code: u8) -> Self {
                match code {
                    $($code => VcpCode::$variant,)+
                    other => VcpCode::Raw(other),
                }
            }
        }
    };
}

vcp_codes! {
    /// Restore factory defaults.
    Reset = 0x04, "reset";
    ResetBrightnessAndContrast = 0x05, "reset brightness and contrast";
    ResetGeometry = 0x06, "reset geometry";
    ResetColor = 0x08, "reset color";
    /// Luminance of the image.
    Brightness = 0x10, "brightness";
    Contrast = 0x12, "contrast";
    /// Color temperature preset selection.
    ColorPresetA = 0x14, "color preset A";
    RedGain = 0x16, "red gain";
    GreenGain = 0x18, "green gain";
    BlueGain = 0x1A, "blue gain";
    AutoSizeCenter = 0x1E, "auto size and center";
    HorizontalPosition = 0x20, "horizontal position";
    Width = 0x22, "width";
    PincushionAmp = 0x24, "pincushion amplitude";
    PincushionBalance = 0x26, "pincushion balance";
    HorizontalStaticConvergence = 0x28, "horizontal static convergence";
    VerticalPosition = 0x30, "vertical position";
    Height = 0x32, "height";
    VerticalStaticConvergence = 0x38, "vertical static convergence";
    VerticalLinearity = 0x3A, "vertical linearity";
    VerticalLinearityBalance = 0x3C, "vertical linearity balance";
    KeystoneBalance = 0x40, "keystone balance";
    PincushionPhase = 0x42, "pincushion phase";
    TopPincushionAmp = 0x46, "top pincushion amplitude";
    TopPincushionBalance = 0x48, "top pincushion balance";
    BottomPincushionAmp = 0x4A, "bottom pincushion amplitude";
    BottomPincushionBalance = 0x4C, "bottom pincushion balance";
    MoireCancel = 0x56, "moire cancel";
    /// Active video input.
    InputSource = 0x60, "input source";
    AudioSpeakerVolume = 0x62, "audio speaker volume";
    RedBlackLevel = 0x6C, "red black level";
    GreenBlackLevel = 0x6E, "green black level";
    BlueBlackLevel = 0x70, "blue black level";
    Sharpness = 0x87, "sharpness";
    AudioMute = 0x8D, "audio mute";
    Orientation = 0xAA, "orientation";
    Settings = 0xB0, "settings";
    /// Firmware revision, reported as a `major.minor` pair.
    FirmwareLevel = 0xC9, "firmware level";
    /// Read-only: 1 = OSD closed, 2 = OSD active.
    OnScreenDisplay = 0xCA, "on-screen display";
    OsdLanguage = 0xCC, "OSD language";
    /// Display power management state.
    Dpms = 0xD6, "DPMS";
    ColorPresetB = 0xDC, "color preset B";
    /// MCCS version implemented by the display.
    VcpVersion = 0xDF, "VCP version";
    ColorPresetC = 0xE0, "color preset C";
    PowerControl = 0xE1, "power control";
    TopLeftScreenPurity = 0xE8, "top left screen purity";
    TopRightScreenPurity = 0xE9, "top right screen purity";
    BottomLeftScreenPurity = 0xEA, "bottom left screen purity";
    BottomRightScreenPurity = 0xEB, "bottom right screen purity";
    BlackStabilizer = 0xF9, "black stabilizer";
}

impl From<VcpCode> for u8 {
    fn from(code: VcpCode) -> Self {
        code.code()
    }
}

impl fmt::Display for VcpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} (0x{:02X})", self.code()),
            None => write!(f, "0x{:02X}", self.code()),
        }
    }
}
