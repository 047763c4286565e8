//! Application layer of the engine.
//!
//! # What lives here? (for beginners)
//!
//! The infrastructure layer knows how to move bytes across a bus; this layer
//! knows what those bytes mean.  Each use case combines the pure codec from
//! `ddc_core` with a transport behind the link serializer, and never talks to
//! the operating system directly.  That is why every use case can be tested
//! against a scripted transport.
//!
//! # Sub-modules
//!
//! - **`transaction`** – One display's transaction engine: serialized writes,
//!   reply sampling, and the read-with-retry state machine.
//!
//! - **`capability`** – Reassembles the capability string from 32-byte chunks.
//!
//! - **`edid_query`** – Fetches the EDID from the locator's cache or over the
//!   bus, page by page.
//!
//! - **`link`** – The public entry points: [`link::DdcClient`] opens links and
//!   [`link::DisplayLink`] exposes every operation on an open link.

pub mod capability;
pub mod edid_query;
pub mod link;
pub mod transaction;
