//! Error Types for tapsweep
//!
//! Each module owns its error enum; `SweepError` is the root that the wallet
//! and sweeper surfaces return.

use std::time::Duration;

use thiserror::Error;

use crate::address::AddressError;
use crate::builder::{BuildError, SigningError};
use crate::chain::NetworkError;
use crate::config::ConfigError;
use crate::keys::DerivationError;

/// Root error type
#[derive(Debug, Error)]
pub enum SweepError {
    /// Malformed seed phrase or derivation path
    #[error("derivation error: {0}")]
    Derivation(#[from] DerivationError),

    /// Tweak or address encoding failure
    #[error("address error: {0}")]
    Address(#[from] AddressError),

    /// Transaction construction or signing failure
    #[error("build error: {0}")]
    Build(#[from] BuildError),

    /// Chain source failure
    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Index did not finish in time
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl SweepError {
    /// Network failures and timeouts may succeed on a later run
    pub fn is_retryable(&self) -> bool {
        matches!(self, SweepError::Network(_) | SweepError::Timeout(_))
    }

    /// Stable code for reports
    pub fn error_code(&self) -> &'static str {
        match self {
            SweepError::Derivation(_) => "DERIVATION_ERROR",
            SweepError::Address(_) => "ADDRESS_ERROR",
            SweepError::Build(BuildError::InsufficientFunds { .. }) => "INSUFFICIENT_FUNDS",
            SweepError::Build(BuildError::Signing(_)) => "SIGNING_ERROR",
            SweepError::Build(BuildError::Address(_)) => "ADDRESS_ERROR",
            SweepError::Build(_) => "BUILD_ERROR",
            SweepError::Network(_) => "NETWORK_ERROR",
            SweepError::Config(_) => "CONFIG_ERROR",
            SweepError::Timeout(_) => "TIMEOUT",
        }
    }
}

impl From<SigningError> for SweepError {
    fn from(err: SigningError) -> Self {
        SweepError::Build(BuildError::Signing(err))
    }
}

/// Result type alias using SweepError
pub type Result<T> = std::result::Result<T, SweepError>;
