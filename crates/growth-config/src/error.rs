// crates/growth-config/src/error.rs
// ============================================================================
// Module: Config Errors
// Description: The `NotConfigured`/`InvalidConfiguration` error family from
// spec §7, raised at setup time only.
// ============================================================================

use thiserror::Error;

/// Errors raised while building or loading an [`crate::SdkConfig`] (spec
/// §7: "pre-condition failures; thrown at setup").
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `setup` was never called, or was called with an empty configuration.
    #[error("the SDK has not been configured")]
    NotConfigured,
    /// A required field was missing or a supplied value was out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// The configuration source could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(String),
    /// The configuration file could not be read.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),
}
