//! Protocol module containing the DDC/CI frame codec, protocol profiles,
//! the VCP command table, and capability-string handling.

pub mod capabilities;
pub mod frame;
pub mod profile;
pub mod vcp;

pub use capabilities::{decode_capability_chunk, Capabilities, CapabilityChunk};
pub use frame::{checksum, encode_frame, validate_reply, FrameError};
pub use profile::{ProtocolProfile, VcpReply, VcpResult, VcpValue};
pub use vcp::VcpCode;
