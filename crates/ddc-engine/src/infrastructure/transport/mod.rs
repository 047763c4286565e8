//! Hardware transport contract.
//!
//! A transport moves one raw byte buffer to a display's I2C bus and, when
//! asked to, samples a reply buffer back.  Everything DDC/CI-specific (frame
//! layout, checksums, retries) lives above this layer; the transport only
//! knows addresses, byte counts, and reply transaction modes.
//!
//! # Reply transaction modes (for beginners)
//!
//! Graphics drivers expose several ways of reading a reply from the bus.  A
//! "simple" transaction is a plain I2C read.  A "DDC/CI reply" transaction
//! additionally understands the DDC/CI length byte and stops reading at the
//! end of the message.  Each bus advertises which modes it supports as a
//! bitmask; a link picks one of them when it is opened and keeps it.
//!
//! # Testability
//!
//! The [`Transport`] trait lets the engine run against
//! [`mock::ScriptedTransport`], which replays canned replies and records
//! every request it receives.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod mock;

/// Opaque identifier of a physical bus controller.
///
/// Several displays can sit behind one controller; transactions on the same
/// handle are serialized even when they target different displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BusHandle(pub u64);

impl fmt::Display for BusHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bus#{}", self.0)
    }
}

/// How the transport reads a reply from the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyTransaction {
    None,
    Simple,
    DdcCi,
    Combined,
    DisplayPortNative,
}

impl ReplyTransaction {
    /// Bit index of this mode in a [`TransactionTypes`] mask.
    pub fn bit(self) -> u32 {
        match self {
            ReplyTransaction::None => 0,
            ReplyTransaction::Simple => 1,
            ReplyTransaction::DdcCi => 2,
            ReplyTransaction::Combined => 3,
            ReplyTransaction::DisplayPortNative => 4,
        }
    }
}

/// The set of reply transaction modes a bus advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransactionTypes(pub u64);

impl TransactionTypes {
    pub fn from_modes(modes: &[ReplyTransaction]) -> Self {
        Self(modes.iter().fold(0, |mask, mode| mask | (1 << mode.bit())))
    }

    pub fn contains(&self, mode: ReplyTransaction) -> bool {
        self.0 & (1 << mode.bit()) != 0
    }

    /// The mode a link should use: DDC/CI replies when available, otherwise
    /// simple reads.
    pub fn preferred(&self) -> Option<ReplyTransaction> {
        [ReplyTransaction::DdcCi, ReplyTransaction::Simple]
            .into_iter()
            .find(|mode| self.contains(*mode))
    }
}

/// The reply half of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyRequest {
    /// Bus address the reply is read from (`0x6F` for DDC/CI, `0xA1` for EDID).
    pub address: u8,
    pub sub_address: Option<u8>,
    /// Number of bytes to sample.
    pub length: usize,
    pub transaction: ReplyTransaction,
    /// The transport waits at least this long after sending before sampling.
    pub min_delay: Duration,
}

/// One bus transaction: a send, optionally followed by a reply read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct I2cRequest {
    pub send_address: u8,
    pub data: Vec<u8>,
    /// E-DDC segment pointer for EDID pages beyond the first 256 bytes.
    pub segment: Option<u8>,
    /// `None` marks a fire-and-forget write.
    pub reply: Option<ReplyRequest>,
}

impl I2cRequest {
    pub fn write(send_address: u8, data: Vec<u8>) -> Self {
        Self {
            send_address,
            data,
            segment: None,
            reply: None,
        }
    }

    pub fn read(send_address: u8, data: Vec<u8>, reply: ReplyRequest) -> Self {
        Self {
            send_address,
            data,
            segment: None,
            reply: Some(reply),
        }
    }

    pub fn with_segment(mut self, segment: u8) -> Self {
        self.segment = Some(segment);
        self
    }

    /// Number of reply bytes the transport must sample (0 for a write).
    pub fn expected_reply_len(&self) -> usize {
        self.reply.as_ref().map_or(0, |r| r.length)
    }
}

/// Failures reported by a transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The display's controller exposes no usable I2C interface.
    #[error("no I2C interface available")]
    NoInterface,

    #[error("no acknowledge from bus address 0x{0:02X}")]
    NoAcknowledge(u8),

    #[error("I2C interface is busy")]
    Busy,

    /// The display or bus refused the transaction mode.  A VCP read treats
    /// this as the command being unsupported.
    #[error("transaction mode not supported")]
    UnsupportedMode,

    #[error("short reply: expected {expected} bytes, received {received}")]
    ShortReply { expected: usize, received: usize },

    #[error("transport I/O error: {0}")]
    Io(String),
}

/// Sends raw I2C transactions to one display's bus controller.
///
/// Implementations must not panic on a missing or unresponsive display; every
/// failure is returned as a [`TransportError`].  The engine guarantees that a
/// transport never sees two overlapping calls for the same [`BusHandle`].
pub trait Transport: Send + Sync {
    /// The controller this transport talks to.
    fn bus_handle(&self) -> BusHandle;

    /// Performs one transaction and returns the sampled reply bytes (empty for
    /// a write).
    fn send(&self, request: &I2cRequest) -> Result<Vec<u8>, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preferred_mode_favours_ddc_ci_replies() {
        let types = TransactionTypes::from_modes(&[ReplyTransaction::Simple, ReplyTransaction::DdcCi]);
        assert_eq!(types.preferred(), Some(ReplyTransaction::DdcCi));
    }

    #[test]
    fn test_preferred_mode_falls_back_to_simple() {
        let types = TransactionTypes::from_modes(&[ReplyTransaction::Simple, ReplyTransaction::Combined]);
        assert_eq!(types.preferred(), Some(ReplyTransaction::Simple));
    }

    #[test]
    fn test_no_preferred_mode_without_simple_or_ddc_ci() {
        let types = TransactionTypes::from_modes(&[ReplyTransaction::Combined]);
        assert_eq!(types.preferred(), None);
        assert_eq!(TransactionTypes::default().preferred(), None);
    }

    #[test]
    fn test_bitmask_matches_driver_layout() {
        let types = TransactionTypes::from_modes(&[ReplyTransaction::Simple, ReplyTransaction::DdcCi]);
        assert_eq!(types.0, 0b110);
    }

    #[test]
    fn test_write_request_expects_no_reply() {
        let request = I2cRequest::write(0x6E, vec![0x51, 0x80, 0xBE]);
        assert_eq!(request.expected_reply_len(), 0);
        assert_eq!(request.segment, None);
    }
}
