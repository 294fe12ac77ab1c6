//! Chain data provider contract
//!
//! The sweeper only needs three things from the network: the confirmed
//! balance of an address, its unspent outputs and a way to broadcast.

use async_trait::async_trait;

use crate::types::UnspentOutput;

/// Source of chain data and broadcast endpoint
#[async_trait]
pub trait ChainSource: Send + Sync {
    /// Spendable outputs locked to `address`
    async fn unspent_outputs(&self, address: &str) -> Result<Vec<UnspentOutput>, NetworkError>;

    /// Confirmed funded minus confirmed spent, in satoshis
    async fn confirmed_balance(&self, address: &str) -> Result<u64, NetworkError>;

    /// Submit a hex-encoded transaction, returning its txid
    async fn broadcast(&self, tx_hex: &str) -> Result<String, NetworkError>;
}

/// Errors surfaced from a chain source
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("address not found: {0}")]
    AddressNotFound(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("broadcast rejected: {0}")]
    BroadcastRejected(String),
}
