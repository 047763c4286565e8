//! Opening display links and the operations available on them.
//!
//! A [`DdcClient`] turns display identifiers into [`DisplayLink`]s.  Opening a
//! link resolves, once, everything that stays fixed for its lifetime: the
//! transport, the reply transaction mode, and the protocol profile.  Every
//! operation afterwards goes through the link's [`TransactionEngine`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use ddc_engine::infrastructure::locator::mock::StaticDisplayLocator;
//! use ddc_engine::infrastructure::transport::mock::ScriptedTransport;
//! use ddc_engine::infrastructure::transport::{BusHandle, ReplyTransaction, TransactionTypes};
//! use ddc_engine::{DdcClient, DisplayId, EngineConfig, LinkRegistry};
//! use ddc_core::VcpCode;
//!
//! let transport = ScriptedTransport::new(BusHandle(0));
//! let locator = StaticDisplayLocator::new().with_display(
//!     DisplayId(1),
//!     transport.clone(),
//!     TransactionTypes::from_modes(&[ReplyTransaction::DdcCi]),
//! );
//! let client = DdcClient::with_registry(
//!     Arc::new(locator),
//!     Arc::new(LinkRegistry::new()),
//!     EngineConfig::default(),
//! );
//!
//! let link = client.open_link(DisplayId(1)).unwrap();
//! link.write_command(VcpCode::Brightness, 50).unwrap();
//! assert_eq!(transport.call_count(), 1);
//! ```

use std::sync::Arc;
use std::time::Duration;

use ddc_core::protocol::profile::encode_enable_app_report;
use ddc_core::{Capabilities, Edid, ProtocolProfile, VcpCode, VcpValue};
use tracing::{debug, error, warn};

use crate::application::capability::read_capabilities;
use crate::application::edid_query::{edid_from_bus, edid_from_registry};
use crate::application::transaction::TransactionEngine;
use crate::error::DdcError;
use crate::infrastructure::link_serializer::LinkRegistry;
use crate::infrastructure::locator::{DisplayId, DisplayLocator, ScreenRef};
use crate::infrastructure::storage::config::{EdidSource, EngineConfig};
use crate::infrastructure::transport::ReplyTransaction;

/// Per-link overrides of the configured defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkOptions {
    pub reply_transaction: Option<ReplyTransaction>,
    pub profile: Option<ProtocolProfile>,
}

/// Opens links to displays found by a [`DisplayLocator`].
pub struct DdcClient {
    locator: Arc<dyn DisplayLocator>,
    registry: Arc<LinkRegistry>,
    config: EngineConfig,
}

impl DdcClient {
    /// Creates a client whose links share the process-wide gate registry.
    pub fn new(locator: Arc<dyn DisplayLocator>, config: EngineConfig) -> Self {
        Self::with_registry(locator, LinkRegistry::global(), config)
    }

    /// Creates a client with its own gate registry.
    pub fn with_registry(
        locator: Arc<dyn DisplayLocator>,
        registry: Arc<LinkRegistry>,
        config: EngineConfig,
    ) -> Self {
        Self {
            locator,
            registry,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Opens a link using the configured profile and reply mode.
    ///
    /// # Errors
    ///
    /// [`DdcError::LinkUnavailable`] for built-in panels, unknown displays, and
    /// buses that advertise no usable reply transaction mode.
    pub fn open_link(&self, display: DisplayId) -> Result<DisplayLink, DdcError> {
        self.open_link_with(display, LinkOptions::default())
    }

    /// Opens a link, letting `options` override the configured defaults.
    ///
    /// # Errors
    ///
    /// See [`DdcClient::open_link`].
    pub fn open_link_with(
        &self,
        display_id: DisplayId,
        options: LinkOptions,
    ) -> Result<DisplayLink, DdcError> {
        if self.locator.is_builtin(display_id) {
            debug!(display = %display_id, "built-in displays are not driven over DDC/CI");
            return Err(DdcError::LinkUnavailable(display_id));
        }

        let located = self
            .locator
            .locate(display_id)
            .ok_or(DdcError::LinkUnavailable(display_id))?;

        let requested = options
            .reply_transaction
            .or(self.config.protocol.reply_transaction);
        let reply_transaction = match requested.or_else(|| located.transaction_types.preferred()) {
            Some(mode) => mode,
            None => {
                error!(display = %display_id, "no supported reply transaction type found");
                return Err(DdcError::LinkUnavailable(display_id));
            }
        };
        let profile = options.profile.unwrap_or(self.config.protocol.profile);

        debug!(
            display = %display_id,
            bus = %located.transport.bus_handle(),
            ?reply_transaction,
            ?profile,
            "opened DDC/CI link"
        );

        let engine = TransactionEngine::new(
            display_id,
            located.transport,
            reply_transaction,
            profile,
            Arc::clone(&self.registry),
            self.config.timing.clone(),
        );

        Ok(DisplayLink {
            engine,
            locator: Arc::clone(&self.locator),
            edid_source: self.config.edid.source,
        })
    }

    /// Opens the link for the display showing `screen`.
    ///
    /// # Errors
    ///
    /// [`DdcError::LinkUnavailable`] (carrying the screen number) when the
    /// screen maps to no display, otherwise see [`DdcClient::open_link`].
    pub fn open_screen(&self, screen: &ScreenRef) -> Result<DisplayLink, DdcError> {
        let display = self
            .locator
            .display_for_screen(screen)
            .ok_or(DdcError::LinkUnavailable(DisplayId(screen.number)))?;
        self.open_link(display)
    }
}

/// An open link to one display.
///
/// Dropping the link releases its transport.
pub struct DisplayLink {
    engine: TransactionEngine,
    locator: Arc<dyn DisplayLocator>,
    edid_source: EdidSource,
}

impl DisplayLink {
    pub fn display_id(&self) -> DisplayId {
        self.engine.display()
    }

    pub fn profile(&self) -> ProtocolProfile {
        self.engine.profile()
    }

    pub fn reply_transaction(&self) -> ReplyTransaction {
        self.engine.reply_transaction()
    }

    // ── VCP commands ─────────────────────────────────────────────────────────

    /// Sets a VCP feature.
    ///
    /// # Errors
    ///
    /// [`DdcError::TransportFailure`] when the write did not reach the display,
    /// [`DdcError::InvalidRequest`] when the profile cannot carry `value`.
    pub fn write_command(&self, code: VcpCode, value: u16) -> Result<(), DdcError> {
        self.engine.write_vcp(code.code(), value)
    }

    /// Reads a VCP feature with an explicit try count and reply delay.
    ///
    /// # Errors
    ///
    /// [`DdcError::Unsupported`] or [`DdcError::NoResponse`]; see
    /// [`TransactionEngine::read_vcp`].
    pub fn read_command(
        &self,
        code: VcpCode,
        tries: u32,
        min_reply_delay: Duration,
    ) -> Result<VcpValue, DdcError> {
        self.engine.read_vcp(code.code(), tries, min_reply_delay)
    }

    /// Reads a VCP feature, sampling the reply with `reply_transaction` for
    /// this call only.
    ///
    /// # Errors
    ///
    /// See [`DisplayLink::read_command`].
    pub fn read_command_via(
        &self,
        code: VcpCode,
        tries: u32,
        min_reply_delay: Duration,
        reply_transaction: ReplyTransaction,
    ) -> Result<VcpValue, DdcError> {
        self.engine
            .read_vcp_via(code.code(), tries, min_reply_delay, reply_transaction)
    }

    /// Reads a VCP feature with the configured try count and reply delay.
    ///
    /// # Errors
    ///
    /// See [`DisplayLink::read_command`].
    pub fn read(&self, code: VcpCode) -> Result<VcpValue, DdcError> {
        let timing = self.engine.timing();
        self.read_command(code, timing.read_tries, timing.min_reply_delay())
    }

    // ── Sub-protocols ────────────────────────────────────────────────────────

    /// Reads the raw capability string.
    ///
    /// # Errors
    ///
    /// See [`read_capabilities`].
    pub fn capabilities(&self, min_reply_delay: Duration) -> Result<String, DdcError> {
        read_capabilities(&self.engine, min_reply_delay)
    }

    /// Reads and parses the capability string.
    ///
    /// # Errors
    ///
    /// [`DdcError::InvalidCapabilities`] when the text does not parse, otherwise
    /// see [`DisplayLink::capabilities`].
    pub fn parsed_capabilities(&self, min_reply_delay: Duration) -> Result<Capabilities, DdcError> {
        let text = self.capabilities(min_reply_delay)?;
        Ok(Capabilities::parse(&text)?)
    }

    /// Asks the display to start sending application reports.
    ///
    /// # Errors
    ///
    /// [`DdcError::ProfileUnsupported`] for the legacy profile, otherwise see
    /// [`TransactionEngine::write`].
    pub fn enable_app_report(&self) -> Result<(), DdcError> {
        self.require_sub_protocols("application report")?;
        let frame = encode_enable_app_report().map_err(DdcError::InvalidRequest)?;
        self.engine.write(frame)
    }

    /// MCCS version implemented by the display, e.g. `"2.1"`.
    ///
    /// # Errors
    ///
    /// [`DdcError::ProfileUnsupported`] for the legacy profile, whose 1-byte
    /// values cannot carry a version; otherwise see [`DisplayLink::read_command`].
    pub fn vcp_version(&self, min_reply_delay: Duration) -> Result<String, DdcError> {
        self.read_version(VcpCode::VcpVersion, "VCP version query", min_reply_delay)
    }

    /// Firmware revision of the display, e.g. `"1.3"`.
    ///
    /// # Errors
    ///
    /// See [`DisplayLink::vcp_version`].
    pub fn firmware_level(&self, min_reply_delay: Duration) -> Result<String, DdcError> {
        self.read_version(VcpCode::FirmwareLevel, "firmware level query", min_reply_delay)
    }

    /// Whether the display answers DDC/CI at all.
    ///
    /// Probes the VCP version feature with the configured timing.
    pub fn supported(&self) -> bool {
        match self.read(VcpCode::VcpVersion) {
            Ok(_) => true,
            Err(e) => {
                warn!(display = %self.display_id(), "display does not answer DDC/CI: {e}");
                false
            }
        }
    }

    fn read_version(
        &self,
        code: VcpCode,
        operation: &'static str,
        min_reply_delay: Duration,
    ) -> Result<String, DdcError> {
        self.require_sub_protocols(operation)?;
        let tries = self.engine.timing().read_tries;
        let value = self.read_command(code, tries, min_reply_delay)?;
        Ok(value.as_version())
    }

    fn require_sub_protocols(&self, operation: &'static str) -> Result<(), DdcError> {
        let profile = self.profile();
        if profile.has_sub_protocols() {
            Ok(())
        } else {
            Err(DdcError::ProfileUnsupported { operation, profile })
        }
    }

    // ── EDID ─────────────────────────────────────────────────────────────────

    /// The display's EDID, from the configured source.
    ///
    /// With [`EdidSource::RegistryThenBus`] a missing or corrupt cached copy
    /// falls back to a bus read.
    ///
    /// # Errors
    ///
    /// The error of the last source tried.
    pub fn edid(&self) -> Result<Edid, DdcError> {
        match self.edid_source {
            EdidSource::Registry => self.edid_from_registry(),
            EdidSource::Bus => self.edid_from_bus(),
            EdidSource::RegistryThenBus => self.edid_from_registry().or_else(|e| {
                debug!(display = %self.display_id(), "cached EDID unusable ({e}), reading over the bus");
                self.edid_from_bus()
            }),
        }
    }

    /// Decodes the EDID the operating system cached for this display.
    ///
    /// # Errors
    ///
    /// See [`edid_from_registry`].
    pub fn edid_from_registry(&self) -> Result<Edid, DdcError> {
        edid_from_registry(self.locator.as_ref(), self.display_id())
    }

    /// Reads the EDID over the display's bus.
    ///
    /// # Errors
    ///
    /// See [`edid_from_bus`].
    pub fn edid_from_bus(&self) -> Result<Edid, DdcError> {
        edid_from_bus(&self.engine)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
