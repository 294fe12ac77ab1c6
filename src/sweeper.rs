//! Wallet Sweeper
//!
//! Walks a range of derivation indices and consolidates whatever each wallet
//! holds into the destination address.
//!
//! # Flow (per index):
//! 1. Derive the wallet (address, script, tweaked signer)
//! 2. Confirmed balance of zero -> nothing to do
//! 3. List unspent outputs, build and sign the sweep
//! 4. Broadcast (skipped in dry-run mode)
//!
//! Indices are processed strictly one after another, each under its own
//! timeout. A failure is logged and recorded; the scan always continues.

use std::ops::Range;
use std::time::Duration;

use bitcoin::ScriptBuf;
use serde::Serialize;
use tracing::{debug, info};

use crate::builder::TransactionBuilder;
use crate::chain::ChainSource;
use crate::config::DEFAULT_INDEX_TIMEOUT_SECS;
use crate::error::SweepError;
use crate::keys::KeyChain;
use crate::logging::{log_index_error, log_index_outcome};
use crate::types::SweepOutcome;
use crate::wallet::Wallet;

/// Sequential sweeper over derived wallets
pub struct Sweeper<C> {
    chain: C,
    keychain: KeyChain,
    destination: String,
    destination_script: ScriptBuf,
    builder: TransactionBuilder,
    index_timeout: Duration,
    dry_run: bool,
}

impl<C: ChainSource> Sweeper<C> {
    /// Create a sweeper; the destination is checked against the key chain's
    /// network before anything is derived
    pub fn new(chain: C, keychain: KeyChain, destination: &str) -> Result<Self, SweepError> {
        let params = keychain.params().clone();
        let destination_script = params.destination_script(destination)?;

        Ok(Self {
            chain,
            keychain,
            destination: destination.trim().to_string(),
            destination_script,
            builder: TransactionBuilder::new(params),
            index_timeout: Duration::from_secs(DEFAULT_INDEX_TIMEOUT_SECS),
            dry_run: false,
        })
    }

    /// Set fee rate (sats/vbyte)
    pub fn with_fee_rate(mut self, fee_rate: f64) -> Self {
        self.builder = self.builder.with_fee_rate(fee_rate);
        self
    }

    /// Per-index time budget
    pub fn with_index_timeout(mut self, timeout: Duration) -> Self {
        self.index_timeout = timeout;
        self
    }

    /// Build and sign but never broadcast
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    /// Derive wallet `index`
    pub fn wallet(&self, index: u32) -> Result<Wallet, SweepError> {
        Wallet::from_keychain(&self.keychain, index)
    }

    /// Sweep one index, without the per-index timeout
    pub async fn sweep_index(&self, index: u32) -> Result<SweepOutcome, SweepError> {
        let wallet = self.wallet(index)?;
        self.sweep_wallet(&wallet).await
    }

    /// Sweep an already-derived wallet
    pub async fn sweep_wallet(&self, wallet: &Wallet) -> Result<SweepOutcome, SweepError> {
        let balance = self.chain.confirmed_balance(wallet.address()).await?;
        debug!(index = wallet.index(), address = wallet.address(), balance, "Checked balance");

        if balance == 0 {
            return Ok(SweepOutcome::Empty);
        }

        let utxos = self.chain.unspent_outputs(wallet.address()).await?;
        if utxos.is_empty() {
            return Ok(SweepOutcome::Empty);
        }

        let signed = self
            .builder
            .build_to_script(&utxos, wallet, &self.destination_script)?;
        let txid = signed.txid().to_string();

        if self.dry_run {
            return Ok(SweepOutcome::DryRun {
                txid,
                inputs: signed.input_count(),
                amount_sats: signed.send_amount(),
                fee_sats: signed.fee(),
                tx_hex: signed.to_hex(),
            });
        }

        let accepted = self.chain.broadcast(&signed.to_hex()).await?;
        if accepted != txid {
            debug!(expected = %txid, reported = %accepted, "Broadcast returned a different txid");
        }

        Ok(SweepOutcome::Swept {
            txid: accepted,
            inputs: signed.input_count(),
            amount_sats: signed.send_amount(),
            fee_sats: signed.fee(),
        })
    }

    /// Sweep every index in `range`, in order
    pub async fn run(&self, range: Range<u32>) -> SweepReport {
        info!(
            start = range.start,
            end = range.end,
            destination = %self.destination,
            dry_run = self.dry_run,
            "Starting sweep"
        );

        let mut report = SweepReport::default();

        for index in range {
            let wallet = match self.wallet(index) {
                Ok(wallet) => wallet,
                Err(e) => {
                    log_index_error(index, None, &e);
                    report.entries.push(IndexReport::failed(index, None, &e));
                    continue;
                }
            };

            let result = tokio::time::timeout(self.index_timeout, self.sweep_wallet(&wallet))
                .await
                .unwrap_or(Err(SweepError::Timeout(self.index_timeout)));

            let entry = match result {
                Ok(outcome) => {
                    log_index_outcome(index, wallet.address(), &outcome);
                    IndexReport::done(index, wallet.address(), outcome)
                }
                Err(e) => {
                    log_index_error(index, Some(wallet.address()), &e);
                    IndexReport::failed(index, Some(wallet.address()), &e)
                }
            };
            report.entries.push(entry);
        }

        info!(
            swept = report.swept_count(),
            empty = report.empty_count(),
            failed = report.failed_count(),
            total_sats = report.total_swept_sats(),
            "Sweep finished"
        );

        report
    }
}

/// Result of one index
#[derive(Debug, Clone, Serialize)]
pub struct IndexReport {
    pub index: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<SweepOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FailureReport>,
}

impl IndexReport {
    fn done(index: u32, address: &str, outcome: SweepOutcome) -> Self {
        Self {
            index,
            address: Some(address.to_string()),
            outcome: Some(outcome),
            error: None,
        }
    }

    fn failed(index: u32, address: Option<&str>, error: &SweepError) -> Self {
        Self {
            index,
            address: address.map(str::to_string),
            outcome: None,
            error: Some(FailureReport {
                code: error.error_code(),
                message: error.to_string(),
                retryable: error.is_retryable(),
            }),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Why an index failed
#[derive(Debug, Clone, Serialize)]
pub struct FailureReport {
    pub code: &'static str,
    pub message: String,
    pub retryable: bool,
}

/// Per-index results of a run, in index order
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    pub entries: Vec<IndexReport>,
}

impl SweepReport {
    fn outcomes(&self) -> impl Iterator<Item = &SweepOutcome> {
        self.entries.iter().filter_map(|e| e.outcome.as_ref())
    }

    /// Indices swept or built in dry-run mode
    pub fn swept_count(&self) -> usize {
        self.outcomes()
            .filter(|o| !matches!(o, SweepOutcome::Empty))
            .count()
    }

    pub fn empty_count(&self) -> usize {
        self.outcomes()
            .filter(|o| matches!(o, SweepOutcome::Empty))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_failed()).count()
    }

    /// Satoshis sent to the destination
    pub fn total_swept_sats(&self) -> u64 {
        self.outcomes()
            .map(|o| match o {
                SweepOutcome::Swept { amount_sats, .. } | SweepOutcome::DryRun { amount_sats, .. } => {
                    *amount_sats
                }
                SweepOutcome::Empty => 0,
            })
            .sum()
    }

    pub fn total_fee_sats(&self) -> u64 {
        self.outcomes()
            .map(|o| match o {
                SweepOutcome::Swept { fee_sats, .. } | SweepOutcome::DryRun { fee_sats, .. } => {
                    *fee_sats
                }
                SweepOutcome::Empty => 0,
            })
            .sum()
    }
}
