//! Shared types for the sweep flow

use std::str::FromStr;

use bitcoin::{OutPoint, Txid};
use serde::Serialize;

/// Spendable output reported by the chain source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnspentOutput {
    /// Funding transaction (displayed byte-reversed, as explorers do)
    pub txid: Txid,
    /// Output index within the funding transaction
    pub vout: u32,
    /// Value in satoshis
    pub value: u64,
}

impl UnspentOutput {
    pub fn new(txid: Txid, vout: u32, value: u64) -> Self {
        Self { txid, vout, value }
    }

    /// Parse from the hex txid an explorer returns
    pub fn from_hex_txid(
        txid: &str,
        vout: u32,
        value: u64,
    ) -> Result<Self, <Txid as FromStr>::Err> {
        Ok(Self::new(Txid::from_str(txid)?, vout, value))
    }

    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.txid, self.vout)
    }
}

/// What happened to one derivation index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SweepOutcome {
    /// Funds were swept and the transaction accepted by the network
    Swept {
        txid: String,
        inputs: usize,
        amount_sats: u64,
        fee_sats: u64,
    },
    /// Transaction built and signed but not broadcast
    DryRun {
        txid: String,
        inputs: usize,
        amount_sats: u64,
        fee_sats: u64,
        tx_hex: String,
    },
    /// Confirmed balance was zero
    Empty,
}

impl SweepOutcome {
    pub fn is_swept(&self) -> bool {
        matches!(self, SweepOutcome::Swept { .. })
    }
}
