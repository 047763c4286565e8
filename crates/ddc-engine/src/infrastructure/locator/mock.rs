//! In-memory display locator for tests.

use std::collections::{HashMap, HashSet};

use super::{DisplayId, DisplayLocator, LocatedDisplay, ScreenRef};
use crate::infrastructure::transport::mock::ScriptedTransport;
use crate::infrastructure::transport::TransactionTypes;

/// A [`DisplayLocator`] over a fixed set of scripted displays.
#[derive(Default)]
pub struct StaticDisplayLocator {
    displays: HashMap<DisplayId, (ScriptedTransport, TransactionTypes)>,
    builtin: HashSet<DisplayId>,
    edids: HashMap<DisplayId, Vec<u8>>,
    screens: HashMap<u32, DisplayId>,
}

impl StaticDisplayLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an external display reachable through `transport`.
    pub fn with_display(
        mut self,
        display: DisplayId,
        transport: ScriptedTransport,
        transaction_types: TransactionTypes,
    ) -> Self {
        self.displays.insert(display, (transport, transaction_types));
        self
    }

    pub fn with_builtin(mut self, display: DisplayId) -> Self {
        self.builtin.insert(display);
        self
    }

    /// Stores a cached EDID for `display`.
    pub fn with_registry_edid(mut self, display: DisplayId, edid: Vec<u8>) -> Self {
        self.edids.insert(display, edid);
        self
    }

    pub fn with_screen(mut self, screen_number: u32, display: DisplayId) -> Self {
        self.screens.insert(screen_number, display);
        self
    }
}

impl DisplayLocator for StaticDisplayLocator {
    fn is_builtin(&self, display: DisplayId) -> bool {
        self.builtin.contains(&display)
    }

    fn locate(&self, display: DisplayId) -> Option<LocatedDisplay> {
        self.displays
            .get(&display)
            .map(|(transport, types)| LocatedDisplay {
                transport: Box::new(transport.clone()),
                transaction_types: *types,
            })
    }

    fn display_for_screen(&self, screen: &ScreenRef) -> Option<DisplayId> {
        self.screens.get(&screen.number).copied()
    }

    fn registry_edid(&self, display: DisplayId) -> Option<Vec<u8>> {
        self.edids.get(&display).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::transport::{BusHandle, ReplyTransaction, Transport};

    #[test]
    fn test_locates_registered_display() {
        // Arrange
        let types = TransactionTypes::from_modes(&[ReplyTransaction::DdcCi]);
        let locator = StaticDisplayLocator::new().with_display(
            DisplayId(1),
            ScriptedTransport::new(BusHandle(9)),
            types,
        );

        // Act
        let located = locator.locate(DisplayId(1)).expect("registered display");

        // Assert
        assert_eq!(located.transport.bus_handle(), BusHandle(9));
        assert_eq!(located.transaction_types, types);
        assert!(locator.locate(DisplayId(2)).is_none());
    }

    #[test]
    fn test_resolves_screens_and_cached_edid() {
        let locator = StaticDisplayLocator::new()
            .with_screen(3, DisplayId(42))
            .with_registry_edid(DisplayId(42), vec![0x00, 0xFF])
            .with_builtin(DisplayId(1));

        let screen = ScreenRef {
            number: 3,
            name: "DELL U2415".to_string(),
        };
        assert_eq!(locator.display_for_screen(&screen), Some(DisplayId(42)));
        assert_eq!(locator.registry_edid(DisplayId(42)), Some(vec![0x00, 0xFF]));
        assert!(locator.is_builtin(DisplayId(1)));
        assert!(!locator.is_builtin(DisplayId(42)));
    }
}
