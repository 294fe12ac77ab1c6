//! Taproot Wallet Sweeper
//!
//! Derives BIP-86 key-path-only taproot wallets from a BIP-39 seed phrase,
//! checks each derived address for funds through an Esplora API, and sweeps
//! every wallet that holds anything into one destination address.
//!
//! # Architecture
//!
//! - `keys` / `address` / `wallet`: deterministic derivation and outputs
//! - `fee` / `builder`: fee math, transaction assembly and signing
//! - `chain` / `esplora`: chain data and broadcast
//! - `sweeper`: sequential per-index orchestration
//!
//! Signet and testnet are supported out of the box. Mainnet parameters are
//! refused by the configuration layer.
//!
//! # Usage
//!
//! ```bash
//! export TAPSWEEP_MNEMONIC="..."
//! tapsweep addresses --config sweep.toml --count 5
//! tapsweep sweep --config sweep.toml --dry-run
//! ```

pub mod address;
pub mod builder;
pub mod chain;
pub mod config;
pub mod error;
pub mod esplora;
pub mod fee;
pub mod keys;
pub mod logging;
pub mod network;
pub mod sweeper;
pub mod types;
pub mod units;
pub mod wallet;

pub use address::{build_output, AddressError, TaprootOutput};
pub use builder::{
    decode_transaction, BuildError, SignedTransaction, SigningError, TransactionBuilder,
    UnsignedTransaction,
};
pub use chain::{ChainSource, NetworkError};
pub use config::{ConfigError, SweepConfig};
pub use error::SweepError;
pub use esplora::EsploraClient;
pub use fee::estimate_fee;
pub use keys::{derive, DerivationError, KeyChain, KeyMaterial, SeedPhrase};
pub use network::NetworkParams;
pub use sweeper::{SweepReport, Sweeper};
pub use types::{SweepOutcome, UnspentOutput};
pub use wallet::Wallet;
