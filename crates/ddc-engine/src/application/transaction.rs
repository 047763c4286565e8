//! Transaction engine: write and read-with-retry against one display link.
//!
//! # Read state machine
//!
//! ```text
//!            ┌──────────── attempt < tries: recovery wait ───────────┐
//!            ▼                                                       │
//!   lease ─► send + sample ─► release ─► validate ──transient error──┘
//!                                           │
//!                     ┌─────────────────────┼──────────────────────┐
//!                     ▼                     ▼                      ▼
//!               unsupported flag      value decoded          tries exhausted
//!               (terminal, stop)      (return it)            (NoResponse)
//! ```
//!
//! Writes are never retried.  They hold the link for the configured settle
//! delay after the transport call so the display can apply the change.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use ddc_core::protocol::frame::{DDC_ADDRESS, DDC_REPLY_ADDRESS, HOST_ADDRESS};
use ddc_core::protocol::profile::{VcpResult, VCP_REPLY_LEN};
use ddc_core::{ProtocolProfile, VcpValue};
use tracing::{debug, error, warn};

use crate::error::DdcError;
use crate::infrastructure::link_serializer::LinkRegistry;
use crate::infrastructure::locator::DisplayId;
use crate::infrastructure::storage::config::TimingConfig;
use crate::infrastructure::transport::{
    I2cRequest, ReplyRequest, ReplyTransaction, Transport, TransportError,
};

/// Executes serialized transactions for one display.
///
/// The engine owns the display's transport; dropping the engine releases it.
pub struct TransactionEngine {
    display: DisplayId,
    transport: Box<dyn Transport>,
    reply_transaction: ReplyTransaction,
    profile: ProtocolProfile,
    registry: Arc<LinkRegistry>,
    timing: TimingConfig,
}

impl TransactionEngine {
    pub fn new(
        display: DisplayId,
        transport: Box<dyn Transport>,
        reply_transaction: ReplyTransaction,
        profile: ProtocolProfile,
        registry: Arc<LinkRegistry>,
        timing: TimingConfig,
    ) -> Self {
        Self {
            display,
            transport,
            reply_transaction,
            profile,
            registry,
            timing,
        }
    }

    pub fn display(&self) -> DisplayId {
        self.display
    }

    pub fn profile(&self) -> ProtocolProfile {
        self.profile
    }

    pub fn reply_transaction(&self) -> ReplyTransaction {
        self.reply_transaction
    }

    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    /// Runs one raw transaction while holding the link.
    ///
    /// The link stays held for `settle` after the transport returns, whether
    /// the call succeeded or not.
    pub fn transfer(
        &self,
        request: &I2cRequest,
        settle: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        let mut lease = self
            .registry
            .lease(self.display, self.transport.bus_handle());
        let result = self.transport.send(request);
        lease.settle_after(settle);
        result
    }

    /// Sends a command frame without sampling a reply.
    ///
    /// # Errors
    ///
    /// A transport failure is reported as [`DdcError::TransportFailure`]
    /// immediately; writes are not retried.
    pub fn write(&self, frame: Vec<u8>) -> Result<(), DdcError> {
        let request = I2cRequest::write(DDC_ADDRESS, frame);
        self.transfer(&request, self.timing.write_settle())?;
        Ok(())
    }

    /// Sets VCP feature `code` to `value`.
    ///
    /// # Errors
    ///
    /// [`DdcError::InvalidRequest`] when the profile cannot carry `value`,
    /// otherwise see [`TransactionEngine::write`].
    pub fn write_vcp(&self, code: u8, value: u16) -> Result<(), DdcError> {
        let frame = self
            .profile
            .encode_set_vcp(code, value)
            .map_err(DdcError::InvalidRequest)?;
        self.write(frame)
    }

    /// Sends a command frame and samples a `reply_len`-byte reply, once.
    ///
    /// The link is released as soon as the reply is sampled.
    pub fn exchange(
        &self,
        frame: Vec<u8>,
        reply_len: usize,
        min_delay: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        self.exchange_via(frame, reply_len, min_delay, self.reply_transaction)
    }

    fn exchange_via(
        &self,
        frame: Vec<u8>,
        reply_len: usize,
        min_delay: Duration,
        transaction: ReplyTransaction,
    ) -> Result<Vec<u8>, TransportError> {
        let request = I2cRequest::read(
            DDC_ADDRESS,
            frame,
            ReplyRequest {
                address: DDC_REPLY_ADDRESS,
                sub_address: Some(HOST_ADDRESS),
                length: reply_len,
                transaction,
                min_delay,
            },
        );
        self.transfer(&request, Duration::ZERO)
    }

    /// Reads VCP feature `code`, making at most `tries` attempts.
    ///
    /// # Errors
    ///
    /// - [`DdcError::Unsupported`] as soon as the display rejects the code.
    /// - [`DdcError::NoResponse`] when every attempt failed transiently.
    /// - [`DdcError::InvalidRequest`] if the request cannot be framed.
    pub fn read_vcp(
        &self,
        code: u8,
        tries: u32,
        min_delay: Duration,
    ) -> Result<VcpValue, DdcError> {
        self.read_vcp_via(code, tries, min_delay, self.reply_transaction)
    }

    /// Like [`TransactionEngine::read_vcp`], but samples the reply with
    /// `transaction` instead of the link's resolved mode.
    ///
    /// # Errors
    ///
    /// See [`TransactionEngine::read_vcp`].
    pub fn read_vcp_via(
        &self,
        code: u8,
        tries: u32,
        min_delay: Duration,
        transaction: ReplyTransaction,
    ) -> Result<VcpValue, DdcError> {
        let tries = tries.max(1);
        let frame = self
            .profile
            .encode_get_vcp(code)
            .map_err(DdcError::InvalidRequest)?;

        for attempt in 1..=tries {
            match self.read_attempt(code, &frame, min_delay, transaction) {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(display = %self.display, code, "VCP read took {attempt} tries");
                    }
                    return Ok(value);
                }
                Err(err) if !err.is_transient() => {
                    if matches!(err, DdcError::Unsupported { .. }) {
                        error!(display = %self.display, code, "VCP code is not supported");
                    }
                    return Err(err);
                }
                Err(err) => {
                    warn!(display = %self.display, code, attempt, "VCP read attempt failed: {err}");
                    if attempt < tries {
                        thread::sleep(self.timing.error_recovery_wait());
                    }
                }
            }
        }

        Err(DdcError::NoResponse {
            code,
            attempts: tries,
        })
    }

    fn read_attempt(
        &self,
        code: u8,
        frame: &[u8],
        min_delay: Duration,
        transaction: ReplyTransaction,
    ) -> Result<VcpValue, DdcError> {
        let sampled = self.exchange_via(frame.to_vec(), VCP_REPLY_LEN, min_delay, transaction);
        let reply = match sampled {
            Ok(reply) => reply,
            Err(TransportError::UnsupportedMode) => return Err(DdcError::Unsupported { code }),
            Err(e) => return Err(e.into()),
        };

        let decoded = self
            .profile
            .decode_vcp_reply(code, &reply)
            .map_err(DdcError::from_reply)?;

        match decoded.result {
            VcpResult::Supported => Ok(decoded.value),
            VcpResult::Unsupported => Err(DdcError::Unsupported { code }),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::transport::mock::ScriptedTransport;
    use crate::infrastructure::transport::BusHandle;
    use ddc_core::protocol::profile::encode_vcp_reply;
    use std::time::Instant;

    fn fast_timing() -> TimingConfig {
        TimingConfig {
            write_settle_ms: 0,
            min_reply_delay_ms: 0,
            error_recovery_wait_ms: 0,
            read_tries: 1,
        }
    }

    fn engine(transport: &ScriptedTransport, profile: ProtocolProfile) -> TransactionEngine {
        TransactionEngine::new(
            DisplayId(1),
            Box::new(transport.clone()),
            ReplyTransaction::DdcCi,
            profile,
            Arc::new(LinkRegistry::new()),
            fast_timing(),
        )
    }

    fn brightness_reply(current: u16, maximum: u16) -> Vec<u8> {
        encode_vcp_reply(0x10, VcpResult::Supported, VcpValue { current, maximum })
    }

    #[test]
    fn test_write_sends_one_frame_without_reply() {
        // Arrange
        let transport = ScriptedTransport::new(BusHandle(1));
        let engine = engine(&transport, ProtocolProfile::Message);

        // Act
        engine.write_vcp(0x10, 50).expect("write succeeds");

        // Assert
        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].send_address, 0x6E);
        assert_eq!(requests[0].data, vec![0x51, 0x84, 0x03, 0x10, 0x00, 0x32, 0x9A]);
        assert!(requests[0].reply.is_none());
    }

    #[test]
    fn test_write_failure_is_not_retried() {
        let transport = ScriptedTransport::new(BusHandle(1));
        transport.push_error(TransportError::NoAcknowledge(0x6E));
        let engine = engine(&transport, ProtocolProfile::Message);

        let result = engine.write_vcp(0x10, 50);

        assert_eq!(
            result,
            Err(DdcError::TransportFailure(TransportError::NoAcknowledge(0x6E)))
        );
        assert_eq!(transport.call_count(), 1);
    }

    #[test]
    fn test_legacy_write_refuses_wide_values_before_sending() {
        let transport = ScriptedTransport::new(BusHandle(1));
        let engine = engine(&transport, ProtocolProfile::Legacy);

        let result = engine.write_vcp(0x10, 0x1FF);

        assert!(matches!(result, Err(DdcError::InvalidRequest(_))));
        assert_eq!(transport.call_count(), 0);
    }

    #[test]
    fn test_read_returns_decoded_value() {
        // Arrange
        let transport = ScriptedTransport::new(BusHandle(1));
        transport.push_reply(brightness_reply(50, 100));
        let engine = engine(&transport, ProtocolProfile::Message);

        // Act
        let value = engine
            .read_vcp(0x10, 1, Duration::from_millis(10))
            .expect("read succeeds");

        // Assert
        assert_eq!(value, VcpValue { current: 50, maximum: 100 });
        let reply = transport.requests()[0].reply.clone().expect("reply requested");
        assert_eq!(reply.address, 0x6F);
        assert_eq!(reply.sub_address, Some(0x51));
        assert_eq!(reply.length, 11);
        assert_eq!(reply.transaction, ReplyTransaction::DdcCi);
        assert_eq!(reply.min_delay, Duration::from_millis(10));
    }

    #[test]
    fn test_read_can_override_reply_transaction() {
        let transport = ScriptedTransport::new(BusHandle(1));
        transport.push_reply(brightness_reply(20, 100));
        let engine = engine(&transport, ProtocolProfile::Message);

        let value = engine
            .read_vcp_via(0x10, 1, Duration::ZERO, ReplyTransaction::Simple)
            .expect("read succeeds");

        assert_eq!(value.current, 20);
        let reply = transport.requests()[0].reply.clone().expect("reply requested");
        assert_eq!(reply.transaction, ReplyTransaction::Simple);
        assert_eq!(engine.reply_transaction(), ReplyTransaction::DdcCi);
    }

    #[test]
    fn test_read_retries_transient_failures_then_succeeds() {
        let transport = ScriptedTransport::new(BusHandle(1));
        transport.push_error(TransportError::Busy);
        let mut corrupt = brightness_reply(50, 100);
        corrupt[10] ^= 0xFF;
        transport.push_reply(corrupt);
        transport.push_reply(brightness_reply(70, 100));
        let engine = engine(&transport, ProtocolProfile::Message);

        let value = engine.read_vcp(0x10, 5, Duration::ZERO).expect("third try succeeds");

        assert_eq!(value.current, 70);
        assert_eq!(transport.call_count(), 3);
    }

    #[test]
    fn test_read_exhausts_tries_with_no_response() {
        let transport = ScriptedTransport::new(BusHandle(1));
        transport.respond_always(Err(TransportError::NoAcknowledge(0x6E)));
        let engine = engine(&transport, ProtocolProfile::Message);

        let result = engine.read_vcp(0x10, 4, Duration::ZERO);

        assert_eq!(result, Err(DdcError::NoResponse { code: 0x10, attempts: 4 }));
        assert_eq!(transport.call_count(), 4);
    }

    #[test]
    fn test_zero_tries_still_makes_one_attempt() {
        let transport = ScriptedTransport::new(BusHandle(1));
        let engine = engine(&transport, ProtocolProfile::Message);

        let result = engine.read_vcp(0x10, 0, Duration::ZERO);

        assert_eq!(result, Err(DdcError::NoResponse { code: 0x10, attempts: 1 }));
        assert_eq!(transport.call_count(), 1);
    }

    #[test]
    fn test_unsupported_mode_from_transport_stops_immediately() {
        let transport = ScriptedTransport::new(BusHandle(1));
        transport.respond_always(Err(TransportError::UnsupportedMode));
        let engine = engine(&transport, ProtocolProfile::Legacy);

        let result = engine.read_vcp(0x10, 5, Duration::ZERO);

        assert_eq!(result, Err(DdcError::Unsupported { code: 0x10 }));
        assert_eq!(transport.call_count(), 1);
    }

    #[test]
    fn test_recovery_wait_separates_attempts() {
        // Arrange
        let transport = ScriptedTransport::new(BusHandle(1));
        let mut timing = fast_timing();
        timing.error_recovery_wait_ms = 30;
        let engine = TransactionEngine::new(
            DisplayId(1),
            Box::new(transport.clone()),
            ReplyTransaction::DdcCi,
            ProtocolProfile::Message,
            Arc::new(LinkRegistry::new()),
            timing,
        );

        // Act
        let started = Instant::now();
        let _ = engine.read_vcp(0x10, 3, Duration::ZERO);

        // Assert: two waits between three attempts, none after the last
        let recorded = transport.recorded();
        assert_eq!(recorded.len(), 3);
        assert!(recorded[1].at - recorded[0].at >= Duration::from_millis(30));
        assert!(recorded[2].at - recorded[1].at >= Duration::from_millis(30));
        assert!(started.elapsed() >= Duration::from_millis(60));
    }
}
