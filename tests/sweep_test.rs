//! Sweeper Integration Tests
//!
//! Drives the full derive -> query -> build -> broadcast flow against an
//! in-memory chain source. No network access.
//!
//! Seed phrase: the BIP-86 test mnemonic ("abandon" x11 + "about").
//! - index 0: tb1p5cyxnuxmeuwuvkwfem96lqzszd02n6xdcjrs20cac6yqjjwudpxqp3mvzv
//! - index 1: tb1p4qhjn9zdvkux4e44uhx8tc55attvtyu358kutcqkudyccelu0wasjpkd5c

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bitcoin::hashes::Hash;
use bitcoin::{Amount, Txid};
use tapsweep::{
    decode_transaction, ChainSource, KeyChain, NetworkError, NetworkParams, SeedPhrase,
    SweepOutcome, Sweeper, UnspentOutput,
};

const MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
const ADDRESS_0: &str = "tb1p5cyxnuxmeuwuvkwfem96lqzszd02n6xdcjrs20cac6yqjjwudpxqp3mvzv";
const ADDRESS_1: &str = "tb1p4qhjn9zdvkux4e44uhx8tc55attvtyu358kutcqkudyccelu0wasjpkd5c";
const DESTINATION: &str = "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx";

/// In-memory chain: confirmed balance is the sum of an address's UTXOs
#[derive(Default)]
struct MockChain {
    utxos: HashMap<String, Vec<UnspentOutput>>,
    failing: Vec<String>,
    slow: Vec<String>,
    reject_broadcast: bool,
    broadcasts: Mutex<Vec<String>>,
}

impl MockChain {
    fn fund(mut self, address: &str, values: &[u64]) -> Self {
        let utxos = values
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let txid = Txid::from_byte_array([i as u8 + 1; 32]);
                UnspentOutput::new(txid, i as u32, *value)
            })
            .collect();
        self.utxos.insert(address.to_string(), utxos);
        self
    }

    fn failing(mut self, address: &str) -> Self {
        self.failing.push(address.to_string());
        self
    }

    fn slow(mut self, address: &str) -> Self {
        self.slow.push(address.to_string());
        self
    }

    fn broadcasts(&self) -> Vec<String> {
        self.broadcasts.lock().unwrap().clone()
    }

    async fn check(&self, address: &str) -> Result<(), NetworkError> {
        if self.failing.iter().any(|a| a == address) {
            return Err(NetworkError::AddressNotFound(address.to_string()));
        }
        if self.slow.iter().any(|a| a == address) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        Ok(())
    }
}

#[async_trait]
impl ChainSource for MockChain {
    async fn unspent_outputs(&self, address: &str) -> Result<Vec<UnspentOutput>, NetworkError> {
        self.check(address).await?;
        Ok(self.utxos.get(address).cloned().unwrap_or_default())
    }

    async fn confirmed_balance(&self, address: &str) -> Result<u64, NetworkError> {
        self.check(address).await?;
        Ok(self
            .utxos
            .get(address)
            .map(|u| u.iter().map(|o| o.value).sum())
            .unwrap_or(0))
    }

    async fn broadcast(&self, tx_hex: &str) -> Result<String, NetworkError> {
        if self.reject_broadcast {
            return Err(NetworkError::BroadcastRejected(
                "min relay fee not met".to_string(),
            ));
        }
        let tx = decode_transaction(tx_hex)
            .map_err(|e| NetworkError::BroadcastRejected(e.to_string()))?;
        self.broadcasts.lock().unwrap().push(tx_hex.to_string());
        Ok(tx.compute_txid().to_string())
    }
}

fn keychain() -> KeyChain {
    let seed = SeedPhrase::parse(MNEMONIC).unwrap();
    KeyChain::new(&seed, &NetworkParams::signet()).unwrap()
}

fn sweeper(chain: MockChain) -> Sweeper<MockChain> {
    Sweeper::new(chain, keychain(), DESTINATION).unwrap()
}

#[tokio::test]
async fn test_sweep_funded_index() {
    let sweeper = sweeper(MockChain::default().fund(ADDRESS_0, &[1_000]));

    let outcome = sweeper.sweep_index(0).await.unwrap();
    match outcome {
        SweepOutcome::Swept {
            inputs,
            amount_sats,
            fee_sats,
            ..
        } => {
            assert_eq!(inputs, 1);
            assert_eq!(amount_sats, 842);
            assert_eq!(fee_sats, 158);
        }
        other => panic!("expected swept, got {:?}", other),
    }

    let broadcasts = sweeper.chain().broadcasts();
    assert_eq!(broadcasts.len(), 1);
    let tx = decode_transaction(&broadcasts[0]).unwrap();
    assert_eq!(tx.input.len(), 1);
    assert_eq!(tx.output.len(), 1);
    assert_eq!(tx.output[0].value, Amount::from_sat(842));
}

#[tokio::test]
async fn test_empty_index_is_not_an_error() {
    let sweeper = sweeper(MockChain::default());

    let outcome = sweeper.sweep_index(3).await.unwrap();
    assert_eq!(outcome, SweepOutcome::Empty);
    assert!(sweeper.chain().broadcasts().is_empty());
}

#[tokio::test]
async fn test_run_continues_past_failures() {
    let chain = MockChain::default()
        .failing(ADDRESS_0)
        .fund(ADDRESS_1, &[20_000, 30_000]);
    let report = sweeper(chain).run(0..4).await;

    assert_eq!(report.entries.len(), 4);
    let indices: Vec<u32> = report.entries.iter().map(|e| e.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);

    let first = &report.entries[0];
    assert_eq!(first.address.as_deref(), Some(ADDRESS_0));
    assert_eq!(first.error.as_ref().unwrap().code, "NETWORK_ERROR");

    match report.entries[1].outcome.as_ref().unwrap() {
        SweepOutcome::Swept {
            inputs,
            amount_sats,
            ..
        } => {
            assert_eq!(*inputs, 2);
            // 2*106 + 42 + 10 = 264
            assert_eq!(*amount_sats, 50_000 - 264);
        }
        other => panic!("expected swept, got {:?}", other),
    }

    assert_eq!(report.swept_count(), 1);
    assert_eq!(report.empty_count(), 2);
    assert_eq!(report.failed_count(), 1);
}

#[tokio::test]
async fn test_insufficient_funds_reported() {
    let report = sweeper(MockChain::default().fund(ADDRESS_0, &[158])).run(0..1).await;

    let error = report.entries[0].error.as_ref().unwrap();
    assert_eq!(error.code, "INSUFFICIENT_FUNDS");
    assert!(!error.retryable);
}

#[tokio::test]
async fn test_index_timeout() {
    let chain = MockChain::default()
        .slow(ADDRESS_0)
        .fund(ADDRESS_1, &[5_000]);
    let sweeper = sweeper(chain).with_index_timeout(Duration::from_millis(50));

    let report = sweeper.run(0..2).await;

    let error = report.entries[0].error.as_ref().unwrap();
    assert_eq!(error.code, "TIMEOUT");
    assert!(error.retryable);
    assert!(report.entries[1].outcome.as_ref().unwrap().is_swept());
}

#[tokio::test]
async fn test_dry_run_never_broadcasts() {
    let sweeper = sweeper(MockChain::default().fund(ADDRESS_0, &[10_000]))
        .with_dry_run(true)
        .with_fee_rate(2.0);

    let outcome = sweeper.sweep_index(0).await.unwrap();
    match outcome {
        SweepOutcome::DryRun {
            txid,
            amount_sats,
            fee_sats,
            tx_hex,
            ..
        } => {
            assert_eq!(fee_sats, 316);
            assert_eq!(amount_sats, 10_000 - 316);
            let tx = decode_transaction(&tx_hex).unwrap();
            assert_eq!(tx.compute_txid().to_string(), txid);
        }
        other => panic!("expected dry run, got {:?}", other),
    }
    assert!(sweeper.chain().broadcasts().is_empty());
}

#[tokio::test]
async fn test_rejected_broadcast() {
    let chain = MockChain {
        reject_broadcast: true,
        ..MockChain::default()
    }
    .fund(ADDRESS_0, &[10_000]);

    let err = sweeper(chain).sweep_index(0).await.unwrap_err();
    assert_eq!(err.error_code(), "NETWORK_ERROR");
    assert!(err.to_string().contains("min relay fee"));
}

#[test]
fn test_destination_checked_up_front() {
    let err = Sweeper::new(
        MockChain::default(),
        keychain(),
        "bc1p5cyxnuxmeuwuvkwfem96lqzszd02n6xdcjrs20cac6yqjjwudpxqkedrcr",
    )
    .err()
    .unwrap();
    assert_eq!(err.error_code(), "ADDRESS_ERROR");
}

#[tokio::test]
async fn test_out_of_range_index_is_recorded() {
    let start = (1u32 << 31) - 1;
    let report = sweeper(MockChain::default()).run(start..start + 2).await;

    assert_eq!(report.entries[0].outcome, Some(SweepOutcome::Empty));
    let error = report.entries[1].error.as_ref().unwrap();
    assert_eq!(error.code, "DERIVATION_ERROR");
    assert!(report.entries[1].address.is_none());
}
