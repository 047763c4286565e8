//! Capability string chunks and the capability string grammar.
//!
//! A display exposes its capability string only in bounded pieces.  The host
//! asks for the bytes at a 16-bit offset and the display answers with at most
//! [`CAPABILITY_CHUNK_MAX`] bytes:
//!
//! ```text
//! request: [0xF3][offset_hi][offset_lo]
//! reply:   [0xE3][offset_hi][offset_lo][data:0..=32]
//! ```
//!
//! A chunk shorter than 32 bytes is the last one.  The reassembled bytes form
//! a null-terminated string such as:
//!
//! ```text
//! (prot(monitor)type(lcd)model(U2515H)cmds(01 02 03 0C E3 F3)vcp(02 10 12 14(05 08) 60(01 0F))mccs_ver(2.1))
//! ```
//!
//! [`Capabilities::parse`] turns that text into a structured value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::frame::{encode_frame, reply_buffer_len, validate_envelope, FrameError};
use crate::protocol::profile::opcode;

/// Most data bytes a single capability reply carries.
pub const CAPABILITY_CHUNK_MAX: usize = 32;

/// Bytes in a capability reply payload before the data: type + 16-bit offset.
const CHUNK_HEADER_LEN: usize = 3;

/// Size of the buffer sampled for one capability reply.
pub const CAPABILITY_REPLY_LEN: usize = reply_buffer_len(CAPABILITY_CHUNK_MAX + CHUNK_HEADER_LEN);

/// One decoded capability reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityChunk {
    pub offset: u16,
    pub data: Vec<u8>,
}

impl CapabilityChunk {
    /// A chunk shorter than the maximum terminates the string.
    pub fn is_last(&self) -> bool {
        self.data.len() < CAPABILITY_CHUNK_MAX
    }
}

/// Builds a capability request for the bytes starting at `offset`.
///
/// # Errors
///
/// Never fails; see [`encode_frame`].
pub fn encode_capabilities_request(offset: u16) -> Result<Vec<u8>, FrameError> {
    let [high, low] = offset.to_be_bytes();
    encode_frame(&[opcode::CAPABILITIES_REQUEST, high, low])
}

/// Validates one capability reply and extracts its data bytes.
///
/// The block length is the reply's declared length minus the 3 header bytes.
/// A negative block length (the reply is shorter than its own header, for
/// example a busy display's null message) is reported as
/// [`FrameError::PayloadTooShort`].
///
/// # Errors
///
/// Any [`FrameError`] marks the chunk as malformed.
pub fn decode_capability_chunk(
    reply: &[u8],
    expected_offset: u16,
) -> Result<CapabilityChunk, FrameError> {
    let payload = validate_envelope(reply)?;

    if payload.len() < CHUNK_HEADER_LEN {
        return Err(FrameError::PayloadTooShort {
            declared: payload.len(),
            needed: CHUNK_HEADER_LEN,
        });
    }
    if payload[0] != opcode::CAPABILITIES_REPLY {
        return Err(FrameError::UnexpectedResponseType {
            expected: opcode::CAPABILITIES_REPLY,
            received: payload[0],
        });
    }

    let offset = u16::from_be_bytes([payload[1], payload[2]]);
    if offset != expected_offset {
        return Err(FrameError::OffsetMismatch {
            expected: expected_offset,
            received: offset,
        });
    }

    Ok(CapabilityChunk {
        offset,
        data: payload[CHUNK_HEADER_LEN..].to_vec(),
    })
}

/// Builds a capability reply frame as a display would send it, padded to the
/// fixed buffer size a transport samples.
pub fn encode_capability_reply(offset: u16, data: &[u8]) -> Vec<u8> {
    let [high, low] = offset.to_be_bytes();
    let mut payload = Vec::with_capacity(data.len() + CHUNK_HEADER_LEN);
    payload.push(opcode::CAPABILITIES_REPLY);
    payload.push(high);
    payload.push(low);
    payload.extend_from_slice(data);
    let mut reply = crate::protocol::frame::encode_reply(&payload);
    reply.resize(reply.len().max(CAPABILITY_REPLY_LEN), 0);
    reply
}

/// Decodes the reassembled buffer as text, stopping at the first NUL.
pub fn decode_capability_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

// ── Capability string grammar ─────────────────────────────────────────────────

/// Errors produced by [`Capabilities::parse`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CapabilityError {
    /// A `(` has no matching `)`.
    #[error("unbalanced parentheses after {0:?}")]
    Unbalanced(String),

    /// A hex code list contains something that is not a hex byte.
    #[error("invalid hex byte {0:?} in {1} list")]
    InvalidHex(String, &'static str),
}

/// Structured view of a capability string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// `prot(...)`, usually `monitor`.
    pub protocol: Option<String>,
    /// `type(...)`, e.g. `lcd` or `crt`.
    pub kind: Option<String>,
    pub model: Option<String>,
    /// Supported DDC/CI sub-commands from `cmds(...)`.
    pub commands: Vec<u8>,
    /// Supported VCP codes; the value lists the permitted values when given.
    pub vcp: BTreeMap<u8, Vec<u8>>,
    /// `mccs_ver(...)`, e.g. `2.1`.
    pub mccs_version: Option<String>,
    /// Every other top-level entry, verbatim.
    pub other: BTreeMap<String, String>,
}

impl Capabilities {
    /// Parses a capability string.
    ///
    /// The outer parentheses are optional and whitespace between entries is
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError`] for unbalanced parentheses or malformed hex
    /// lists in `cmds(...)` / `vcp(...)`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ddc_core::Capabilities;
    ///
    /// let caps = Capabilities::parse("(prot(monitor)vcp(10 12 60(01 03))mccs_ver(2.1))").unwrap();
    /// assert_eq!(caps.protocol.as_deref(), Some("monitor"));
    /// assert_eq!(caps.vcp.get(&0x60), Some(&vec![0x01, 0x03]));
    /// ```
    pub fn parse(text: &str) -> Result<Self, CapabilityError> {
        let body = strip_outer_parens(text.trim());
        let mut caps = Capabilities::default();

        for (key, value) in entries(body)? {
            match key.as_str() {
                "prot" => caps.protocol = Some(value.to_string()),
                "type" => caps.kind = Some(value.to_string()),
                "model" => caps.model = Some(value.to_string()),
                "cmds" => caps.commands = parse_hex_list(value, "cmds")?,
                "vcp" => caps.vcp = parse_vcp_list(value)?,
                "mccs_ver" => caps.mccs_version = Some(value.to_string()),
                _ => {
                    caps.other.insert(key, value.to_string());
                }
            }
        }

        Ok(caps)
    }

    /// Whether the display lists `code` among its VCP features.
    pub fn supports_vcp(&self, code: u8) -> bool {
        self.vcp.contains_key(&code)
    }
}

fn strip_outer_parens(text: &str) -> &str {
    let Some(inner) = text.strip_prefix('(') else {
        return text;
    };
    match matching_close(inner) {
        Some(close) if close + 1 == inner.len() => &inner[..close],
        Some(_) => text,
        // Truncated strings lose their final `)`; keep reading the entries.
        None => inner,
    }
}

/// Index of the `)` closing an already-consumed `(`.
fn matching_close(text: &str) -> Option<usize> {
    let mut depth = 1usize;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Splits `key(value)key(value)...` into pairs.
fn entries(body: &str) -> Result<Vec<(String, &str)>, CapabilityError> {
    let mut out = Vec::new();
    let mut rest = body.trim_start();

    while !rest.is_empty() {
        let Some(open) = rest.find('(') else {
            // Trailing text without a value; nothing more to read.
            break;
        };
        let key = rest[..open].trim().to_ascii_lowercase();
        let after = &rest[open + 1..];
        let close = matching_close(after).ok_or_else(|| CapabilityError::Unbalanced(key.clone()))?;
        out.push((key, after[..close].trim()));
        rest = after[close + 1..].trim_start();
    }

    Ok(out)
}

fn parse_hex_list(text: &str, context: &'static str) -> Result<Vec<u8>, CapabilityError> {
    let mut out = Vec::new();
    let mut chars = text.chars().filter(|c| !c.is_whitespace()).peekable();

    while chars.peek().is_some() {
        let pair: String = chars.by_ref().take(2).collect();
        let byte =
            u8::from_str_radix(&pair, 16).map_err(|_| CapabilityError::InvalidHex(pair, context))?;
        out.push(byte);
    }

    Ok(out)
}

fn parse_vcp_list(text: &str) -> Result<BTreeMap<u8, Vec<u8>>, CapabilityError> {
    let mut out = BTreeMap::new();
    let mut rest = text.trim_start();

    while !rest.is_empty() {
        let digits = rest.get(..2).unwrap_or(rest);
        let code = u8::from_str_radix(digits, 16)
            .map_err(|_| CapabilityError::InvalidHex(digits.to_string(), "vcp"))?;
        rest = rest[digits.len()..].trim_start();

        let mut values = Vec::new();
        if let Some(after) = rest.strip_prefix('(') {
            let close = matching_close(after)
                .ok_or_else(|| CapabilityError::Unbalanced(format!("vcp {code:02X}")))?;
            values = parse_hex_list(&after[..close], "vcp value")?;
            rest = after[close + 1..].trim_start();
        }

        out.insert(code, values);
    }

    Ok(out)
}
