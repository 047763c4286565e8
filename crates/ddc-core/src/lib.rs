//! # ddc-core
//!
//! Shared library for DDC/CI display control containing the frame codec,
//! the VCP command table, capability-string handling, and the EDID decoder.
//!
//! This crate has zero dependencies on OS APIs, I2C drivers, or threads.
//! Everything here is a pure function over byte slices, which is what makes
//! the runtime crate (`ddc-engine`) testable against scripted transports.
//!
//! # Architecture overview (for beginners)
//!
//! Most external monitors expose a small I2C bus on their video cable.  Two
//! devices live on that bus and are interesting to the host:
//!
//! - The **DDC/CI** command processor at address `0x6E`/`0x6F`.  Commands are
//!   wrapped in checksummed frames and let the host read or change settings
//!   such as brightness, contrast, or the active input.
//!
//! - The **EDID** EEPROM at address `0xA0`/`0xA1`.  It holds a fixed-layout
//!   128-byte block (plus extension blocks) describing the monitor: who made
//!   it, its physical size, and the video timings it supports.
//!
//! This crate defines:
//!
//! - **`protocol`** – How bytes travel over the bus.  Command frames are built
//!   here, reply frames are validated here, and the two framing generations
//!   ("legacy" and "message") are selected through [`ProtocolProfile`].
//!
//! - **`edid`** – The EDID decoder.  [`Edid::parse`] validates the header and
//!   checksum and every other field is derived on demand from the raw bytes.

pub mod edid;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `ddc_core::Edid` instead of `ddc_core::edid::block::Edid`.
pub use edid::block::{Edid, EdidError};
pub use edid::descriptor::{Descriptor, DetailedTiming};
pub use protocol::capabilities::Capabilities;
pub use protocol::frame::FrameError;
pub use protocol::profile::{ProtocolProfile, VcpReply, VcpValue};
pub use protocol::vcp::VcpCode;
