//! Capability assembler: reads the capability string chunk by chunk.
//!
//! Each round asks for the bytes at the current length of the assembled
//! buffer.  A chunk shorter than 32 bytes ends the string.  A malformed
//! chunk (bus failure, corrupt frame, wrong offset echo, or a reply shorter
//! than its own header) is retried at the same offset; three in a row abort
//! the whole assembly.  A good chunk resets that count.
//!
//! There is no cap on the number of rounds: a display that keeps returning
//! full chunks is read until the 16-bit offset field runs out.

use std::time::Duration;

use ddc_core::protocol::capabilities::{
    decode_capability_chunk, decode_capability_string, encode_capabilities_request,
    CAPABILITY_REPLY_LEN,
};
use tracing::{debug, warn};

use crate::application::transaction::TransactionEngine;
use crate::error::DdcError;

/// Consecutive malformed chunks tolerated at one offset.
pub const MAX_MALFORMED_CHUNKS: u32 = 3;

/// Reads and reassembles the capability string of the engine's display.
///
/// # Errors
///
/// - [`DdcError::ProfileUnsupported`] for the legacy profile.
/// - [`DdcError::CapabilityAssemblyFailed`] after [`MAX_MALFORMED_CHUNKS`]
///   malformed chunks in a row, or when the offset would overflow.
pub fn read_capabilities(
    engine: &TransactionEngine,
    min_delay: Duration,
) -> Result<String, DdcError> {
    let profile = engine.profile();
    if !profile.has_sub_protocols() {
        return Err(DdcError::ProfileUnsupported {
            operation: "capability query",
            profile,
        });
    }

    let mut buffer: Vec<u8> = Vec::new();
    let mut malformed = 0;

    loop {
        let offset = u16::try_from(buffer.len())
            .map_err(|_| DdcError::CapabilityAssemblyFailed { offset: u16::MAX })?;
        let request = encode_capabilities_request(offset).map_err(DdcError::InvalidRequest)?;

        let chunk = engine
            .exchange(request, CAPABILITY_REPLY_LEN, min_delay)
            .map_err(DdcError::from)
            .and_then(|reply| {
                decode_capability_chunk(&reply, offset).map_err(DdcError::from_reply)
            });

        match chunk {
            Ok(chunk) => {
                malformed = 0;
                debug!(display = %engine.display(), offset, len = chunk.data.len(), "capability chunk");
                buffer.extend_from_slice(&chunk.data);
                if chunk.is_last() {
                    break;
                }
            }
            Err(err) => {
                malformed += 1;
                warn!(display = %engine.display(), offset, malformed, "malformed capability chunk: {err}");
                if malformed >= MAX_MALFORMED_CHUNKS {
                    return Err(DdcError::CapabilityAssemblyFailed { offset });
                }
            }
        }
    }

    Ok(decode_capability_string(&buffer))
}
