//! ddc-engine library entry point.
//!
//! Re-exports the public modules so integration tests in `tests/` see the
//! same module tree as callers do.
//!
//! # How a request travels (for beginners)
//!
//! 1. A [`DdcClient`] asks its [`DisplayLocator`] for the display's transport
//!    and resolves the reply mode and protocol profile once.  The result is a
//!    [`DisplayLink`].
//! 2. Every operation on the link is framed by `ddc_core`, then handed to the
//!    link's transaction engine.
//! 3. The engine takes a lease from the [`LinkRegistry`] (one gate per display,
//!    one per bus) so no two transactions ever overlap on the wire.
//! 4. The reply is validated and decoded back in `ddc_core`; transient failures
//!    are retried, terminal ones are returned as a [`DdcError`].

pub mod application;
pub mod error;
pub mod infrastructure;

pub use application::link::{DdcClient, DisplayLink, LinkOptions};
pub use error::DdcError;
pub use infrastructure::link_serializer::LinkRegistry;
pub use infrastructure::locator::{DisplayId, DisplayLocator, LocatedDisplay, ScreenRef};
pub use infrastructure::storage::config::{EngineConfig, TimingConfig};
pub use infrastructure::transport::{
    BusHandle, I2cRequest, ReplyRequest, ReplyTransaction, TransactionTypes, Transport,
    TransportError,
};
