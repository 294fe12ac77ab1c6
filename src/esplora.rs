//! Esplora API Client
//!
//! Implements [`ChainSource`] over an Esplora REST API (mempool.space or
//! blockstream.info flavour).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::chain::{ChainSource, NetworkError};
use crate::types::UnspentOutput;

/// Esplora API endpoints
pub const SIGNET_URL: &str = "https://mempool.space/signet/api";
pub const TESTNET_URL: &str = "https://blockstream.info/testnet/api";

/// Default API for a network preset, if there is a public one
pub fn default_url(preset: &str) -> Option<&'static str> {
    match preset.to_lowercase().as_str() {
        "signet" => Some(SIGNET_URL),
        "testnet" | "testnet3" => Some(TESTNET_URL),
        _ => None,
    }
}

/// Esplora HTTP client
#[derive(Debug, Clone)]
pub struct EsploraClient {
    client: Client,
    base_url: String,
}

impl EsploraClient {
    /// Create a client with a per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, NetworkError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn address_info(&self, address: &str) -> Result<AddressInfo, NetworkError> {
        let url = format!("{}/address/{}", self.base_url, address);
        let resp = self.client.get(&url).send().await?;

        if !resp.status().is_success() {
            return Err(NetworkError::AddressNotFound(address.to_string()));
        }

        Ok(resp.json().await?)
    }
}

#[async_trait]
impl ChainSource for EsploraClient {
    async fn unspent_outputs(&self, address: &str) -> Result<Vec<UnspentOutput>, NetworkError> {
        let url = format!("{}/address/{}/utxo", self.base_url, address);
        let resp = self.client.get(&url).send().await?;

        if !resp.status().is_success() {
            return Err(NetworkError::AddressNotFound(address.to_string()));
        }

        let utxos: Vec<EsploraUtxo> = resp.json().await?;
        debug!(address, count = utxos.len(), "Fetched UTXOs");

        utxos.into_iter().map(EsploraUtxo::into_unspent).collect()
    }

    async fn confirmed_balance(&self, address: &str) -> Result<u64, NetworkError> {
        Ok(self.address_info(address).await?.chain_stats.balance())
    }

    async fn broadcast(&self, tx_hex: &str) -> Result<String, NetworkError> {
        let url = format!("{}/tx", self.base_url);
        let resp = self.client.post(&url).body(tx_hex.to_string()).send().await?;

        if !resp.status().is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            return Err(NetworkError::BroadcastRejected(error_text));
        }

        Ok(resp.text().await?.trim().to_string())
    }
}

/// UTXO entry from `/address/{a}/utxo`
#[derive(Debug, Clone, Deserialize)]
struct EsploraUtxo {
    txid: String,
    vout: u32,
    value: u64,
}

impl EsploraUtxo {
    fn into_unspent(self) -> Result<UnspentOutput, NetworkError> {
        UnspentOutput::from_hex_txid(&self.txid, self.vout, self.value)
            .map_err(|e| NetworkError::Parse(format!("txid {}: {}", self.txid, e)))
    }
}

/// Response from `/address/{a}`
#[derive(Debug, Clone, Deserialize)]
struct AddressInfo {
    chain_stats: ChainStats,
}

#[derive(Debug, Clone, Deserialize)]
struct ChainStats {
    funded_txo_sum: u64,
    spent_txo_sum: u64,
}

impl ChainStats {
    fn balance(&self) -> u64 {
        self.funded_txo_sum.saturating_sub(self.spent_txo_sum)
    }
}
