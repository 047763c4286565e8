//! Frame codec for DDC/CI command and reply frames.
//!
//! Wire format of a host → display command frame:
//! ```text
//! [0x51 host source][0x80 | payload_len][payload:N][checksum]
//! ```
//! Wire format of a display → host reply frame:
//! ```text
//! [0x6E source echo][0x80 | payload_len][response_type][fields:N-1][checksum]
//! ```
//!
//! The command checksum is the XOR of the destination address (`0x6E`) with
//! every byte before the checksum slot.  The reply checksum is the XOR of
//! the virtual host address (`0x50`) with every byte before its checksum slot.
//!
//! The checksum slot itself is never folded into the accumulator: the
//! checksum covers `frame[..len - 1]` only.

use thiserror::Error;

// ── Protocol constants ────────────────────────────────────────────────────────

/// 8-bit write address of the display's DDC/CI command processor.
pub const DDC_ADDRESS: u8 = 0x6E;

/// 8-bit read address of the display's DDC/CI command processor.
pub const DDC_REPLY_ADDRESS: u8 = 0x6F;

/// Source address the host puts at the front of every command frame.
pub const HOST_ADDRESS: u8 = 0x51;

/// Seed for reply checksums (the "virtual host address").
pub const REPLY_CHECKSUM_SEED: u8 = 0x50;

/// High bit set on the length byte of every frame.
pub const LENGTH_FLAG: u8 = 0x80;

/// Largest payload a single DDC/CI frame may carry.
pub const MAX_PAYLOAD_LEN: usize = 32;

/// Bytes a frame adds around its payload: address, length, checksum.
pub const FRAME_OVERHEAD: usize = 3;

/// Errors produced while building command frames or validating reply frames.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FrameError {
    /// The reply buffer is shorter than its own length byte requires.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The first reply byte is not the display's address echo.
    #[error("unexpected source address 0x{0:02X}")]
    UnexpectedAddress(u8),

    /// The recomputed checksum differs from the transmitted one.
    #[error("checksum mismatch: computed 0x{computed:02X}, received 0x{received:02X}")]
    ChecksumMismatch { computed: u8, received: u8 },

    /// The reply answers a different request than the one sent.
    #[error("unexpected response type 0x{received:02X}, expected 0x{expected:02X}")]
    UnexpectedResponseType { expected: u8, received: u8 },

    /// The reply payload is too short for the expected response type.
    #[error("reply payload of {declared} bytes is shorter than the {needed} bytes required")]
    PayloadTooShort { declared: usize, needed: usize },

    /// A VCP reply echoes another opcode than the one that was queried.
    #[error("reply echoes opcode 0x{received:02X}, expected 0x{expected:02X}")]
    OpcodeMismatch { expected: u8, received: u8 },

    /// The reply echoes another capability offset than the one requested.
    #[error("reply echoes offset {received}, expected {expected}")]
    OffsetMismatch { expected: u16, received: u16 },

    /// The payload does not fit into a single bus transaction.
    #[error("payload of {0} bytes exceeds the {MAX_PAYLOAD_LEN}-byte frame limit")]
    PayloadTooLong(usize),

    /// The legacy profile carries 1-byte values only.
    #[error("value {0} does not fit a legacy 1-byte frame")]
    ValueOutOfRange(u16),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// XOR-accumulates `bytes` onto `seed`.
///
/// # Examples
///
/// ```rust
/// use ddc_core::protocol::frame::{checksum, DDC_ADDRESS};
///
/// assert_eq!(checksum(DDC_ADDRESS, &[0x51, 0x82, 0x01, 0x10]), 0x6E ^ 0x51 ^ 0x82 ^ 0x01 ^ 0x10);
/// ```
pub fn checksum(seed: u8, bytes: &[u8]) -> u8 {
    bytes.iter().fold(seed, |acc, &b| acc ^ b)
}

/// Wraps `payload` into a complete host → display command frame.
///
/// # Errors
///
/// Returns [`FrameError::PayloadTooLong`] when the payload would overflow a
/// single bus transaction.
///
/// # Examples
///
/// ```rust
/// use ddc_core::protocol::frame::encode_frame;
///
/// let frame = encode_frame(&[0x01, 0x10]).unwrap();
/// assert_eq!(&frame[..4], &[0x51, 0x82, 0x01, 0x10]);
/// assert_eq!(frame.len(), 5);
/// ```
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(FrameError::PayloadTooLong(payload.len()));
    }

    let mut buf = Vec::with_capacity(payload.len() + FRAME_OVERHEAD);
    buf.push(HOST_ADDRESS);
    buf.push(LENGTH_FLAG | payload.len() as u8);
    buf.extend_from_slice(payload);
    buf.push(checksum(DDC_ADDRESS, &buf));
    Ok(buf)
}

/// Size of the reply buffer the host must sample to receive a payload of
/// `payload_len` bytes.
pub const fn reply_buffer_len(payload_len: usize) -> usize {
    payload_len + FRAME_OVERHEAD
}

/// Validates a display → host reply and returns its payload.
///
/// The returned slice starts with the response type byte.  Bytes after the
/// checksum slot (the transport usually samples a fixed-size buffer) are
/// ignored.
///
/// # Errors
///
/// - [`FrameError::UnexpectedAddress`] when byte 0 is not `0x6E`.
/// - [`FrameError::InsufficientData`] when the buffer ends before the checksum.
/// - [`FrameError::ChecksumMismatch`] when the trailer does not match.
/// - [`FrameError::UnexpectedResponseType`] when the payload answers a different request.
pub fn validate_reply(reply: &[u8], response_type: u8) -> Result<&[u8], FrameError> {
    let payload = validate_envelope(reply)?;

    match payload.first() {
        Some(&kind) if kind == response_type => Ok(payload),
        Some(&kind) => Err(FrameError::UnexpectedResponseType {
            expected: response_type,
            received: kind,
        }),
        None => Err(FrameError::PayloadTooShort {
            declared: 0,
            needed: 1,
        }),
    }
}

/// Validates address and checksum of a reply without looking at its payload.
///
/// A zero-length payload (the DDC/CI "null message" a busy display sends)
/// passes this check and yields an empty slice.
///
/// # Errors
///
/// See [`validate_reply`]; the response type is not checked.
pub fn validate_envelope(reply: &[u8]) -> Result<&[u8], FrameError> {
    if reply.len() < FRAME_OVERHEAD {
        return Err(FrameError::InsufficientData {
            needed: FRAME_OVERHEAD,
            available: reply.len(),
        });
    }

    if reply[0] != DDC_ADDRESS {
        return Err(FrameError::UnexpectedAddress(reply[0]));
    }

    let declared = (reply[1] & !LENGTH_FLAG) as usize;
    let checksum_at = 2 + declared;
    if reply.len() <= checksum_at {
        return Err(FrameError::InsufficientData {
            needed: checksum_at + 1,
            available: reply.len(),
        });
    }

    let computed = checksum(REPLY_CHECKSUM_SEED, &reply[..checksum_at]);
    let received = reply[checksum_at];
    if computed != received {
        return Err(FrameError::ChecksumMismatch { computed, received });
    }

    Ok(&reply[2..checksum_at])
}

/// Builds a well-formed reply frame around `payload`.
///
/// Used by scripted transports and tests to play the display's side of the
/// conversation.
pub fn encode_reply(payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(payload.len() + FRAME_OVERHEAD);
    buf.push(DDC_ADDRESS);
    buf.push(LENGTH_FLAG | (payload.len() as u8 & !LENGTH_FLAG));
    buf.extend_from_slice(payload);
    buf.push(checksum(REPLY_CHECKSUM_SEED, &buf));
    buf
}

// ── Tests ─────────────────────────────────────────────────────────────────────
