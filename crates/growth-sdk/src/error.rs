// crates/growth-sdk/src/error.rs
// ============================================================================
// Module: SDK Error
// Description: The composed error type surfaced at the facade boundary
// (spec §7).
// Purpose: Internal crates keep their own error enums; this is the only
// place they get folded into one type a caller actually sees.
// Dependencies: growth-config, growth-journey, growth-providers, growth-store, thiserror
// ============================================================================

//! ## Overview
//! `SdkError` is composed only here, never threaded back down into
//! `growth-journey`/`growth-providers`/etc (spec §7: "composed into
//! `SdkError` only at the `GrowthSdk` facade boundary"). Most runtime
//! errors (a failed flush, a dropped broker emission) are absorbed and
//! logged rather than surfaced this way; this type covers setup-time
//! failures and the handful of calls (`report_purchase_completed`,
//! `refresh_profile`) where the caller needs to know a request failed.

use thiserror::Error;

/// Top-level error returned by [`crate::GrowthSdk`] methods.
#[derive(Debug, Error)]
pub enum SdkError {
    /// `setup` was given an invalid or incomplete configuration.
    #[error("configuration error: {0}")]
    Configuration(#[from] growth_config::ConfigError),
    /// An outbound HTTP call failed (spec §7: `Network{transport|http|decoding}`).
    #[error("network error: {0}")]
    Network(#[from] growth_providers::ProviderError),
    /// A local storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] growth_store::StoreError),
    /// A flow archive could not be resolved or presented.
    #[error("flow error: {0}")]
    Flow(#[from] FlowError),
    /// A StoreKit purchase could not be verified or fulfilled.
    #[error("store kit error: {0}")]
    StoreKit(#[from] StoreKitError),
    /// The journey engine rejected a command (never externally propagated
    /// in practice; see spec §7's "broker-update-only" surfacing rule).
    #[error("journey error: {0}")]
    Journey(#[from] growth_journey::JourneyError),
}

/// Errors presenting or resolving a `ShowFlow` archive (spec §7: `Flow{..}`).
///
/// Flow content itself (rendering, download transport) is out of core
/// scope (spec §1); this enum only covers the core's view of whether a
/// flow could be resolved at all.
#[derive(Debug, Error)]
pub enum FlowError {
    /// No flow archive is registered under this id.
    #[error("flow not found: {0}")]
    NotFound(String),
    /// The flow manifest failed to parse or referenced an unknown experiment.
    #[error("invalid flow manifest: {0}")]
    InvalidManifest(String),
    /// The flow archive failed to download.
    #[error("flow content failed to download: {0}")]
    DownloadFailed(String),
}

/// Errors from a StoreKit purchase report (spec §7: `StoreKit{..}`;
/// spec §1: "surfaced to the core as a `purchase_completed` signal").
#[derive(Debug, Error)]
pub enum StoreKitError {
    /// The user cancelled the purchase before it completed.
    #[error("purchase was cancelled")]
    Cancelled,
    /// The purchase is pending external action (e.g. parental approval).
    #[error("purchase is pending")]
    Pending,
    /// The purchase failed outright.
    #[error("purchase failed: {0}")]
    Failed(String),
    /// The signed transaction failed backend verification.
    #[error("purchase verification failed: {0}")]
    Verification(String),
    /// No StoreKit integration is configured.
    #[error("store kit is not configured")]
    NotConfigured,
}
