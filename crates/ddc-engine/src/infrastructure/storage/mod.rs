//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads and writes the TOML engine configuration and
//! supplies defaults when no file exists.

pub mod config;
