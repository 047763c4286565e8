//! Display locator contract.
//!
//! The locator is the platform glue that maps a display identifier (or an
//! on-screen reference) to the transport for its bus controller.  It also
//! answers whether a display is built in (laptop panels do not speak DDC/CI)
//! and serves the EDID the operating system cached when the display was
//! attached.

use std::fmt;

use crate::infrastructure::transport::{TransactionTypes, Transport};

pub mod mock;

/// Platform identifier of one display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DisplayId(pub u32);

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "display#{}", self.0)
    }
}

/// What the windowing system knows about a screen.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScreenRef {
    /// Screen number as reported by the windowing system.
    pub number: u32,
    pub name: String,
}

/// A located display: its transport plus the reply modes its bus advertises.
pub struct LocatedDisplay {
    pub transport: Box<dyn Transport>,
    pub transaction_types: TransactionTypes,
}

impl fmt::Debug for LocatedDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocatedDisplay")
            .field("bus", &self.transport.bus_handle())
            .field("transaction_types", &self.transaction_types)
            .finish()
    }
}

/// Finds displays and their transports.
#[cfg_attr(test, mockall::automock)]
pub trait DisplayLocator: Send + Sync {
    /// Built-in panels are never driven over DDC/CI.
    fn is_builtin(&self, display: DisplayId) -> bool;

    /// Returns the transport for `display`, or `None` when no matching
    /// hardware exists.
    fn locate(&self, display: DisplayId) -> Option<LocatedDisplay>;

    fn display_for_screen(&self, screen: &ScreenRef) -> Option<DisplayId>;

    /// The manufacturer EDID cached by the operating system, if any.
    fn registry_edid(&self, display: DisplayId) -> Option<Vec<u8>>;
}
