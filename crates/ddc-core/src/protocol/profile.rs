//! The two framing generations of VCP get/set commands.
//!
//! # Legacy vs message framing (for beginners)
//!
//! Early DDC/CI hosts spoke a fixed layout: every "get VCP" request is exactly
//! 5 bytes, every "set VCP" request exactly 7 bytes, and only the low byte of
//! each value is used.  The reply is an 11-byte buffer whose checksum sits at
//! a fixed index.
//!
//! The newer "message" layout treats every request as a variable-length
//! payload wrapped by [`encode_frame`], reads 16-bit values, honours the
//! result code inside the VCP reply, and adds the capability and
//! application-report sub-protocols.
//!
//! The two are kept apart on purpose: [`ProtocolProfile`] selects one of them
//! per link and each method below dispatches to the matching byte layout.

use serde::{Deserialize, Serialize};

use crate::protocol::frame::{
    checksum, encode_frame, reply_buffer_len, validate_reply, FrameError, DDC_ADDRESS,
    HOST_ADDRESS, REPLY_CHECKSUM_SEED,
};

/// Sub-command and response type bytes.
pub mod opcode {
    /// Get VCP feature request.
    pub const GET_VCP: u8 = 0x01;
    /// Get VCP feature reply.
    pub const VCP_REPLY: u8 = 0x02;
    /// Set VCP feature request.
    pub const SET_VCP: u8 = 0x03;
    /// Capabilities request.
    pub const CAPABILITIES_REQUEST: u8 = 0xF3;
    /// Capabilities reply.
    pub const CAPABILITIES_REPLY: u8 = 0xE3;
    /// Enable application report.
    pub const ENABLE_APP_REPORT: u8 = 0xF5;
}

/// Payload of a VCP reply: type, result, code, kind, max (2), current (2).
const VCP_REPLY_PAYLOAD_LEN: usize = 8;

/// Size of the buffer sampled for a VCP reply, in both profiles.
pub const VCP_REPLY_LEN: usize = reply_buffer_len(VCP_REPLY_PAYLOAD_LEN);

/// Length of a legacy "get VCP" frame.
pub const LEGACY_GET_LEN: usize = 5;

/// Length of a legacy "set VCP" frame.
pub const LEGACY_SET_LEN: usize = 7;

/// Result code inside a message-profile VCP reply marking an unsupported opcode.
const RESULT_UNSUPPORTED: u8 = 0x01;

/// Selects the framing generation used on a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolProfile {
    /// Fixed 5/7-byte frames with 1-byte values.
    Legacy,
    /// Variable-length frames with 2-byte values and sub-protocols.
    #[default]
    Message,
}

/// Whether the display accepted the queried opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VcpResult {
    Supported,
    Unsupported,
}

/// Current and maximum value of a VCP feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VcpValue {
    pub current: u16,
    pub maximum: u16,
}

impl VcpValue {
    /// Renders the current value as `"high.low"`, the encoding used by
    /// version-like features (VCP version, firmware level).
    pub fn as_version(&self) -> String {
        format!("{}.{}", self.current >> 8, self.current & 0xFF)
    }
}

/// A decoded "get VCP" reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VcpReply {
    /// Opcode echoed by the display.
    pub code: u8,
    pub result: VcpResult,
    /// VCP type byte (0 = set parameter, 1 = momentary); 0 in the legacy profile.
    pub kind: u8,
    pub value: VcpValue,
}

impl ProtocolProfile {
    /// Builds a "set VCP feature" command frame.
    ///
    /// # Errors
    ///
    /// The legacy profile returns [`FrameError::ValueOutOfRange`] for values
    /// above `0xFF`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ddc_core::ProtocolProfile;
    ///
    /// let frame = ProtocolProfile::Message.encode_set_vcp(0x10, 50).unwrap();
    /// assert_eq!(&frame[..6], &[0x51, 0x84, 0x03, 0x10, 0x00, 0x32]);
    /// ```
    pub fn encode_set_vcp(self, code: u8, value: u16) -> Result<Vec<u8>, FrameError> {
        match self {
            ProtocolProfile::Legacy => {
                let value = u8::try_from(value).map_err(|_| FrameError::ValueOutOfRange(value))?;
                let mut data: [u8; LEGACY_SET_LEN] =
                    [HOST_ADDRESS, 0x84, opcode::SET_VCP, code, 0x00, value, 0x00];
                data[LEGACY_SET_LEN - 1] = checksum(DDC_ADDRESS, &data[..LEGACY_SET_LEN - 1]);
                Ok(data.to_vec())
            }
            ProtocolProfile::Message => {
                let [high, low] = value.to_be_bytes();
                encode_frame(&[opcode::SET_VCP, code, high, low])
            }
        }
    }

    /// Builds a "get VCP feature" command frame.
    ///
    /// # Errors
    ///
    /// Never fails for a single opcode; the `Result` keeps both profiles
    /// behind the same signature.
    pub fn encode_get_vcp(self, code: u8) -> Result<Vec<u8>, FrameError> {
        match self {
            ProtocolProfile::Legacy => {
                let mut data: [u8; LEGACY_GET_LEN] =
                    [HOST_ADDRESS, 0x82, opcode::GET_VCP, code, 0x00];
                data[LEGACY_GET_LEN - 1] = checksum(DDC_ADDRESS, &data[..LEGACY_GET_LEN - 1]);
                Ok(data.to_vec())
            }
            ProtocolProfile::Message => encode_frame(&[opcode::GET_VCP, code]),
        }
    }

    /// Validates and decodes a "get VCP feature" reply for opcode `code`.
    ///
    /// # Errors
    ///
    /// Any [`FrameError`] means "no valid reply received".  An unsupported
    /// opcode is *not* an error here; it is reported through
    /// [`VcpReply::result`].
    pub fn decode_vcp_reply(self, code: u8, reply: &[u8]) -> Result<VcpReply, FrameError> {
        match self {
            ProtocolProfile::Legacy => decode_legacy_reply(code, reply),
            ProtocolProfile::Message => decode_message_reply(code, reply),
        }
    }

    /// Whether the capability and application-report sub-protocols exist.
    pub fn has_sub_protocols(self) -> bool {
        matches!(self, ProtocolProfile::Message)
    }
}

/// Builds the "enable application report" command frame.
///
/// # Errors
///
/// Never fails; see [`encode_frame`].
pub fn encode_enable_app_report() -> Result<Vec<u8>, FrameError> {
    encode_frame(&[opcode::ENABLE_APP_REPORT, 0x01])
}

// ── Reply decoding ────────────────────────────────────────────────────────────

fn decode_legacy_reply(code: u8, reply: &[u8]) -> Result<VcpReply, FrameError> {
    if reply.len() < VCP_REPLY_LEN {
        return Err(FrameError::InsufficientData {
            needed: VCP_REPLY_LEN,
            available: reply.len(),
        });
    }
    if reply[0] != DDC_ADDRESS {
        return Err(FrameError::UnexpectedAddress(reply[0]));
    }
    if reply[2] != opcode::VCP_REPLY {
        return Err(FrameError::UnexpectedResponseType {
            expected: opcode::VCP_REPLY,
            received: reply[2],
        });
    }
    if reply[4] != code {
        return Err(FrameError::OpcodeMismatch {
            expected: code,
            received: reply[4],
        });
    }

    let computed = checksum(REPLY_CHECKSUM_SEED, &reply[..VCP_REPLY_LEN - 1]);
    let received = reply[VCP_REPLY_LEN - 1];
    if computed != received {
        return Err(FrameError::ChecksumMismatch { computed, received });
    }

    Ok(VcpReply {
        code,
        result: VcpResult::Supported,
        kind: 0,
        value: VcpValue {
            current: u16::from(reply[9]),
            maximum: u16::from(reply[7]),
        },
    })
}

fn decode_message_reply(code: u8, reply: &[u8]) -> Result<VcpReply, FrameError> {
    // [0x02][result][opcode][type][max_hi][max_lo][cur_hi][cur_lo]
    const PAYLOAD_LEN: usize = 8;

    let p = validate_reply(reply, opcode::VCP_REPLY)?;
    if p.len() < PAYLOAD_LEN {
        return Err(FrameError::PayloadTooShort {
            declared: p.len(),
            needed: PAYLOAD_LEN,
        });
    }
    if p[2] != code {
        return Err(FrameError::OpcodeMismatch {
            expected: code,
            received: p[2],
        });
    }

    let result = if p[1] == RESULT_UNSUPPORTED {
        VcpResult::Unsupported
    } else {
        VcpResult::Supported
    };

    Ok(VcpReply {
        code,
        result,
        kind: p[3],
        value: VcpValue {
            current: u16::from_be_bytes([p[6], p[7]]),
            maximum: u16::from_be_bytes([p[4], p[5]]),
        },
    })
}

/// Builds a message-profile VCP reply frame as a display would send it.
pub fn encode_vcp_reply(code: u8, result: VcpResult, value: VcpValue) -> Vec<u8> {
    let [max_hi, max_lo] = value.maximum.to_be_bytes();
    let [cur_hi, cur_lo] = value.current.to_be_bytes();
    let rc = match result {
        VcpResult::Supported => 0x00,
        VcpResult::Unsupported => RESULT_UNSUPPORTED,
    };
    crate::protocol::frame::encode_reply(&[
        opcode::VCP_REPLY,
        rc,
        code,
        0x00,
        max_hi,
        max_lo,
        cur_hi,
        cur_lo,
    ])
}
