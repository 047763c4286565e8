//! Error type returned by every link operation.
//!
//! A disconnected or silent monitor is an ordinary operating condition, so
//! every failure is a value of [`DdcError`]; nothing in the engine panics on
//! hardware input.
//!
//! Failures fall in two classes:
//!
//! - **Transient**: the bus misbehaved or the reply was corrupt.  A read
//!   retries these up to its try count and only reports the aggregate
//!   outcome ([`DdcError::NoResponse`]).
//! - **Terminal**: everything else.  In particular [`DdcError::Unsupported`]
//!   reflects a firmware limit and stops a read immediately.

use ddc_core::protocol::capabilities::CapabilityError;
use ddc_core::{EdidError, FrameError, ProtocolProfile};
use thiserror::Error;

use crate::infrastructure::locator::DisplayId;
use crate::infrastructure::transport::TransportError;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DdcError {
    /// No matching hardware, a built-in panel, or no usable reply mode.
    #[error("no DDC/CI link available for {0}")]
    LinkUnavailable(DisplayId),

    #[error("transport failure: {0}")]
    TransportFailure(#[from] TransportError),

    #[error("reply checksum mismatch: computed 0x{computed:02X}, received 0x{received:02X}")]
    ChecksumMismatch { computed: u8, received: u8 },

    /// The reply failed validation for a reason other than its checksum.
    #[error("invalid reply: {0}")]
    InvalidReply(FrameError),

    /// The request could not be framed (value or payload out of range).
    #[error("request rejected before sending: {0}")]
    InvalidRequest(FrameError),

    #[error("VCP code 0x{code:02X} is not supported by the display")]
    Unsupported { code: u8 },

    #[error("no valid reply for VCP code 0x{code:02X} after {attempts} attempt(s)")]
    NoResponse { code: u8, attempts: u32 },

    #[error("malformed EDID: {0}")]
    MalformedEdid(#[from] EdidError),

    #[error("no EDID available for {0}")]
    EdidUnavailable(DisplayId),

    /// Three consecutive malformed chunks at the same offset.
    #[error("capability string assembly failed at offset {offset}")]
    CapabilityAssemblyFailed { offset: u16 },

    /// The assembled capability string does not follow the grammar.
    #[error("unreadable capability string: {0}")]
    InvalidCapabilities(#[from] CapabilityError),

    #[error("{operation} is not available in the {profile:?} protocol profile")]
    ProfileUnsupported {
        operation: &'static str,
        profile: ProtocolProfile,
    },
}

impl DdcError {
    /// Whether a read should retry after this failure.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DdcError::TransportFailure(_)
                | DdcError::ChecksumMismatch { .. }
                | DdcError::InvalidReply(_)
        )
    }

    /// Classifies a reply validation failure.
    pub(crate) fn from_reply(error: FrameError) -> Self {
        match error {
            FrameError::ChecksumMismatch { computed, received } => {
                DdcError::ChecksumMismatch { computed, received }
            }
            other => DdcError::InvalidReply(other),
        }
    }
}
