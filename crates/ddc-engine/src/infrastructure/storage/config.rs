//! TOML-based engine configuration.
//!
//! Every value has a default, so an empty file (or no file at all) yields a
//! working configuration.  Example:
//!
//! ```toml
//! [timing]
//! write_settle_ms = 20
//! min_reply_delay_ms = 10
//! error_recovery_wait_ms = 40
//! read_tries = 3
//!
//! [protocol]
//! profile = "message"
//! reply_transaction = "ddc_ci"
//!
//! [edid]
//! source = "registry_then_bus"
//! ```
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when the field is absent, which keeps older files readable
//! when new settings are added.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ddc_core::ProtocolProfile;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infrastructure::transport::ReplyTransaction;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub edid: EdidConfig,
}

/// Delays and retry counts applied around bus transactions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimingConfig {
    /// How long a link stays held after a write so the display can apply it.
    #[serde(default = "default_write_settle_ms")]
    pub write_settle_ms: u64,
    /// Minimum wait between sending a request and sampling its reply.
    #[serde(default = "default_min_reply_delay_ms")]
    pub min_reply_delay_ms: u64,
    /// Pause after a failed read attempt before the next one.
    #[serde(default = "default_error_recovery_wait_ms")]
    pub error_recovery_wait_ms: u64,
    /// Attempts made by [`DisplayLink::read`](crate::DisplayLink::read).
    #[serde(default = "default_read_tries")]
    pub read_tries: u32,
}

/// Framing generation and reply mode.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProtocolConfig {
    #[serde(default)]
    pub profile: ProtocolProfile,
    /// Forces a reply transaction mode instead of the bus's preferred one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_transaction: Option<ReplyTransaction>,
}

/// Where [`DisplayLink::edid`](crate::DisplayLink::edid) looks for the EDID.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EdidSource {
    /// The copy cached by the operating system.
    Registry,
    /// Read over the display's EDID bus address.
    Bus,
    /// Cached copy first, bus read when there is none or it is corrupt.
    #[default]
    RegistryThenBus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EdidConfig {
    #[serde(default)]
    pub source: EdidSource,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_write_settle_ms() -> u64 {
    20
}
fn default_min_reply_delay_ms() -> u64 {
    10
}
fn default_error_recovery_wait_ms() -> u64 {
    40
}
fn default_read_tries() -> u32 {
    1
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            write_settle_ms: default_write_settle_ms(),
            min_reply_delay_ms: default_min_reply_delay_ms(),
            error_recovery_wait_ms: default_error_recovery_wait_ms(),
            read_tries: default_read_tries(),
        }
    }
}

impl TimingConfig {
    pub fn write_settle(&self) -> Duration {
        Duration::from_millis(self.write_settle_ms)
    }

    pub fn min_reply_delay(&self) -> Duration {
        Duration::from_millis(self.min_reply_delay_ms)
    }

    pub fn error_recovery_wait(&self) -> Duration {
        Duration::from_millis(self.error_recovery_wait_ms)
    }
}

impl EngineConfig {
    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the TOML is malformed.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Renders the configuration as pretty TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Serialize`] if serialization fails.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Loads `EngineConfig` from `path`, returning the defaults if the file does
/// not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<EngineConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => EngineConfig::from_toml_str(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(EngineConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(path: &Path, config: &EngineConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = config.to_toml_string()?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("ddc-engine-config-{}", std::process::id()))
            .join(name)
    }

    // ── Defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn test_default_timing_matches_display_requirements() {
        // Arrange / Act
        let cfg = EngineConfig::default();

        // Assert
        assert_eq!(cfg.timing.write_settle(), Duration::from_millis(20));
        assert_eq!(cfg.timing.min_reply_delay(), Duration::from_millis(10));
        assert_eq!(cfg.timing.error_recovery_wait(), Duration::from_millis(40));
        assert_eq!(cfg.timing.read_tries, 1);
    }

    #[test]
    fn test_default_protocol_is_message_profile_without_override() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.protocol.profile, ProtocolProfile::Message);
        assert_eq!(cfg.protocol.reply_transaction, None);
        assert_eq!(cfg.edid.source, EdidSource::RegistryThenBus);
    }

    #[test]
    fn test_empty_toml_yields_defaults() {
        let cfg = EngineConfig::from_toml_str("").expect("empty file is valid");
        assert_eq!(cfg, EngineConfig::default());
    }

    // ── TOML parsing ──────────────────────────────────────────────────────────

    #[test]
    fn test_partial_toml_fills_missing_fields() {
        // Arrange
        let text = r#"
            [timing]
            read_tries = 5

            [protocol]
            profile = "legacy"
            reply_transaction = "simple"
        "#;

        // Act
        let cfg = EngineConfig::from_toml_str(text).expect("valid TOML");

        // Assert
        assert_eq!(cfg.timing.read_tries, 5);
        assert_eq!(cfg.timing.write_settle_ms, 20);
        assert_eq!(cfg.protocol.profile, ProtocolProfile::Legacy);
        assert_eq!(cfg.protocol.reply_transaction, Some(ReplyTransaction::Simple));
        assert_eq!(cfg.edid.source, EdidSource::RegistryThenBus);
    }

    #[test]
    fn test_unknown_profile_is_a_parse_error() {
        let result = EngineConfig::from_toml_str("[protocol]\nprofile = \"v3\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let mut cfg = EngineConfig::default();
        cfg.timing.error_recovery_wait_ms = 100;
        cfg.protocol.reply_transaction = Some(ReplyTransaction::DdcCi);
        cfg.edid.source = EdidSource::Bus;

        let text = cfg.to_toml_string().expect("serialize");
        let restored = EngineConfig::from_toml_str(&text).expect("deserialize");

        assert_eq!(cfg, restored);
        assert!(text.contains("reply_transaction = \"ddc_ci\""));
    }

    // ── File persistence ──────────────────────────────────────────────────────

    #[test]
    fn test_missing_file_loads_defaults() {
        let cfg = load_config(&scratch_path("does-not-exist.toml")).expect("defaults");
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn test_save_then_load_returns_same_config() {
        // Arrange
        let path = scratch_path("saved/engine.toml");
        let mut cfg = EngineConfig::default();
        cfg.timing.read_tries = 10;

        // Act
        save_config(&path, &cfg).expect("save");
        let loaded = load_config(&path).expect("load");

        // Assert
        assert_eq!(loaded, cfg);
        std::fs::remove_file(&path).ok();
    }
}
