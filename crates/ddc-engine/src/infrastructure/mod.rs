//! Infrastructure layer of the engine.
//!
//! Contains the contracts for OS-facing collaborators (bus transport and
//! display locator) together with their in-memory test doubles, the link
//! serializer that guards the bus, and configuration storage.
//!
//! **Dependency rule**: this layer may depend on `ddc_core` but MUST NOT
//! import the `application` layer.

pub mod link_serializer;
pub mod locator;
pub mod storage;
pub mod transport;
