//! EDID retrieval: from the locator's cached copy or over the bus.
//!
//! Some displays only answer one of the two, so both are offered.
//!
//! The bus read talks to the EDID EEPROM rather than the DDC/CI processor.
//! Each 128-byte page is fetched by writing its offset to `0xA0` and reading
//! from `0xA1`; pages beyond the first 256 bytes also set the E-DDC segment.

use std::time::Duration;

use ddc_core::edid::EDID_BLOCK_LEN;
use ddc_core::Edid;
use tracing::{debug, error};

use crate::application::transaction::TransactionEngine;
use crate::error::DdcError;
use crate::infrastructure::locator::{DisplayId, DisplayLocator};
use crate::infrastructure::transport::{
    I2cRequest, ReplyRequest, ReplyTransaction, TransportError,
};

/// EEPROM write address (offset pointer).
pub const EDID_ADDRESS: u8 = 0xA0;

/// EEPROM read address.
pub const EDID_READ_ADDRESS: u8 = 0xA1;

/// Extension count field inside the base block.
const EXTENSION_COUNT_OFFSET: usize = 126;

/// Decodes the EDID the operating system cached for `display_id`.
///
/// # Errors
///
/// [`DdcError::EdidUnavailable`] when the locator has no entry,
/// [`DdcError::MalformedEdid`] when the entry fails validation.
pub fn edid_from_registry(
    locator: &dyn DisplayLocator,
    display_id: DisplayId,
) -> Result<Edid, DdcError> {
    let Some(bytes) = locator.registry_edid(display_id) else {
        error!(display = %display_id, "no EDID entry found");
        return Err(DdcError::EdidUnavailable(display_id));
    };
    Ok(Edid::parse(&bytes)?)
}

/// Reads the base block and every extension page over the bus.
///
/// The base block is validated before any extension page is requested.
///
/// # Errors
///
/// [`DdcError::TransportFailure`] if a page cannot be read,
/// [`DdcError::MalformedEdid`] if the base block is invalid.
pub fn edid_from_bus(engine: &TransactionEngine) -> Result<Edid, DdcError> {
    let mut raw = read_page(engine, 0)?;
    Edid::parse(&raw)?;

    let extensions = raw[EXTENSION_COUNT_OFFSET];
    debug!(display = %engine.display(), extensions, "read EDID base block");
    for page in 1..=extensions {
        raw.extend_from_slice(&read_page(engine, page)?);
    }

    Ok(Edid::parse(&raw)?)
}

fn read_page(engine: &TransactionEngine, page: u8) -> Result<Vec<u8>, DdcError> {
    let offset = if page % 2 == 0 { 0x00 } else { 0x80 };
    let mut request = I2cRequest::read(
        EDID_ADDRESS,
        vec![offset],
        ReplyRequest {
            address: EDID_READ_ADDRESS,
            sub_address: None,
            length: EDID_BLOCK_LEN,
            transaction: ReplyTransaction::Simple,
            min_delay: Duration::ZERO,
        },
    );
    if page >= 2 {
        request = request.with_segment(page / 2);
    }

    let mut bytes = engine.transfer(&request, Duration::ZERO)?;
    if bytes.len() < EDID_BLOCK_LEN {
        return Err(TransportError::ShortReply {
            expected: EDID_BLOCK_LEN,
            received: bytes.len(),
        }
        .into());
    }
    bytes.truncate(EDID_BLOCK_LEN);
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::link_serializer::LinkRegistry;
    use crate::infrastructure::locator::MockDisplayLocator;
    use crate::infrastructure::storage::config::TimingConfig;
    use crate::infrastructure::transport::mock::ScriptedTransport;
    use crate::infrastructure::transport::BusHandle;
    use ddc_core::edid::EDID_HEADER;
    use ddc_core::{EdidError, ProtocolProfile};
    use mockall::predicate::eq;
    use std::sync::Arc;

    fn block(extensions: u8, fill: u8) -> Vec<u8> {
        let mut edid = vec![fill; EDID_BLOCK_LEN];
        edid[..8].copy_from_slice(&EDID_HEADER);
        edid[EXTENSION_COUNT_OFFSET] = extensions;
        let sum = edid[..EDID_BLOCK_LEN - 1]
            .iter()
            .fold(0u8, |acc, &b| acc.wrapping_add(b));
        edid[EDID_BLOCK_LEN - 1] = 0u8.wrapping_sub(sum);
        edid
    }

    fn engine(transport: &ScriptedTransport) -> TransactionEngine {
        TransactionEngine::new(
            DisplayId(1),
            Box::new(transport.clone()),
            ReplyTransaction::DdcCi,
            ProtocolProfile::Message,
            Arc::new(LinkRegistry::new()),
            TimingConfig::default(),
        )
    }

    #[test]
    fn test_registry_edid_is_decoded() {
        // Arrange
        let mut locator = MockDisplayLocator::new();
        locator
            .expect_registry_edid()
            .with(eq(DisplayId(4)))
            .times(1)
            .returning(|_| Some(block(0, 0x00)));

        // Act
        let edid = edid_from_registry(&locator, DisplayId(4)).expect("valid EDID");

        // Assert
        assert_eq!(edid.extension_count(), 0);
    }

    #[test]
    fn test_missing_registry_entry_is_unavailable() {
        let mut locator = MockDisplayLocator::new();
        locator.expect_registry_edid().returning(|_| None);

        let result = edid_from_registry(&locator, DisplayId(4));

        assert_eq!(result, Err(DdcError::EdidUnavailable(DisplayId(4))));
    }

    #[test]
    fn test_corrupt_registry_entry_is_malformed() {
        let mut locator = MockDisplayLocator::new();
        locator.expect_registry_edid().returning(|_| {
            let mut bytes = block(0, 0x00);
            bytes[20] ^= 0x01;
            Some(bytes)
        });

        let result = edid_from_registry(&locator, DisplayId(4));

        assert!(matches!(
            result,
            Err(DdcError::MalformedEdid(EdidError::ChecksumMismatch { .. }))
        ));
    }

    #[test]
    fn test_bus_read_fetches_base_then_extension_pages() {
        // Arrange
        let transport = ScriptedTransport::new(BusHandle(1));
        transport.push_reply(block(2, 0x00));
        transport.push_reply(vec![0x02; EDID_BLOCK_LEN]);
        transport.push_reply(vec![0x70; EDID_BLOCK_LEN]);

        // Act
        let edid = edid_from_bus(&engine(&transport)).expect("valid EDID");

        // Assert
        assert_eq!(edid.raw().len(), 3 * EDID_BLOCK_LEN);
        assert_eq!(edid.extensions().count(), 2);
        let requests = transport.requests();
        let pages: Vec<(u8, Vec<u8>, Option<u8>)> = requests
            .iter()
            .map(|r| (r.send_address, r.data.clone(), r.segment))
            .collect();
        assert_eq!(
            pages,
            vec![
                (0xA0, vec![0x00], None),
                (0xA0, vec![0x80], None),
                (0xA0, vec![0x00], Some(1)),
            ]
        );
        let reply = requests[0].reply.clone().expect("reply requested");
        assert_eq!(reply.address, 0xA1);
        assert_eq!(reply.transaction, ReplyTransaction::Simple);
    }

    #[test]
    fn test_invalid_base_block_stops_before_extensions() {
        let transport = ScriptedTransport::new(BusHandle(1));
        let mut base = block(3, 0x00);
        base[0] = 0xAB;
        transport.push_reply(base);

        let result = edid_from_bus(&engine(&transport));

        assert_eq!(result, Err(DdcError::MalformedEdid(EdidError::BadHeader)));
        assert_eq!(transport.call_count(), 1);
    }

    #[test]
    fn test_short_page_is_a_transport_failure() {
        let transport = ScriptedTransport::new(BusHandle(1));
        transport.push_reply(vec![0x00; 64]);

        let result = edid_from_bus(&engine(&transport));

        assert_eq!(
            result,
            Err(DdcError::TransportFailure(TransportError::ShortReply {
                expected: 128,
                received: 64
            }))
        );
    }
}
