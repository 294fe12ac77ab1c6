//! Sweep Transaction Builder
//!
//! Consolidates every unspent output of one wallet into a single output at
//! the destination. Two phases:
//!
//! 1. `prepare` - inputs, fee, the one output, plus each input's spend
//!    condition (prevout script + value, internal key)
//! 2. `sign` - BIP-341 key-path sighash per input, BIP-340 signature with the
//!    tweaked key, single-element witness
//!
//! There is never a change output and never a script-path witness.

use bitcoin::{
    absolute::LockTime,
    consensus::encode,
    hashes::Hash,
    secp256k1::Message,
    sighash::{Prevouts, SighashCache, TapSighashType},
    taproot,
    transaction::Version,
    Amount, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness, XOnlyPublicKey,
};
use secp256k1::SECP256K1;

use crate::address::{tap_tweak, AddressError};
use crate::fee::{estimate_fee, DEFAULT_FEE_RATE};
use crate::network::NetworkParams;
use crate::types::UnspentOutput;
use crate::wallet::Wallet;

/// Builds signed sweep transactions
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    /// Network the destination address must belong to
    params: NetworkParams,
    /// Fee rate (sats/vbyte)
    fee_rate: f64,
}

impl TransactionBuilder {
    /// Create a builder at the default fee rate
    pub fn new(params: NetworkParams) -> Self {
        Self {
            params,
            fee_rate: DEFAULT_FEE_RATE,
        }
    }

    /// Override the fee rate
    pub fn with_fee_rate(mut self, fee_rate: f64) -> Self {
        self.fee_rate = fee_rate;
        self
    }

    pub fn fee_rate(&self) -> f64 {
        self.fee_rate
    }

    pub fn params(&self) -> &NetworkParams {
        &self.params
    }

    /// Build and sign a sweep of `utxos` to `destination`
    pub fn build(
        &self,
        utxos: &[UnspentOutput],
        wallet: &Wallet,
        destination: &str,
    ) -> Result<SignedTransaction, BuildError> {
        let destination_script = self.params.destination_script(destination)?;
        self.build_to_script(utxos, wallet, &destination_script)
    }

    /// Build and sign a sweep to an already-decoded locking script
    pub fn build_to_script(
        &self,
        utxos: &[UnspentOutput],
        wallet: &Wallet,
        destination_script: &ScriptBuf,
    ) -> Result<SignedTransaction, BuildError> {
        let unsigned = self.prepare(utxos, wallet, destination_script)?;
        sign(unsigned, wallet)
    }

    /// Assemble the unsigned sweep transaction
    pub fn prepare(
        &self,
        utxos: &[UnspentOutput],
        wallet: &Wallet,
        destination_script: &ScriptBuf,
    ) -> Result<UnsignedTransaction, BuildError> {
        let mut inputs = Vec::with_capacity(utxos.len());
        let mut spends = Vec::with_capacity(utxos.len());
        let mut total_input: u64 = 0;

        for utxo in utxos {
            inputs.push(TxIn {
                previous_output: utxo.outpoint(),
                script_sig: ScriptBuf::new(),
                sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
                witness: Witness::new(),
            });

            spends.push(SpendCondition {
                prevout: TxOut {
                    value: Amount::from_sat(utxo.value),
                    script_pubkey: wallet.output_script().clone(),
                },
                internal_key: wallet.internal_key(),
            });

            total_input = total_input
                .checked_add(utxo.value)
                .ok_or(BuildError::ValueOverflow)?;
        }

        let fee = estimate_fee(inputs.len(), 1, self.fee_rate);

        if total_input <= fee {
            return Err(BuildError::InsufficientFunds { total_input, fee });
        }
        let send_amount = total_input - fee;

        let tx = Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: inputs,
            output: vec![TxOut {
                value: Amount::from_sat(send_amount),
                script_pubkey: destination_script.clone(),
            }],
        };

        Ok(UnsignedTransaction {
            tx,
            spends,
            total_input,
            fee,
            send_amount,
        })
    }
}

/// What an input needs for key-path signing
#[derive(Debug, Clone)]
pub struct SpendCondition {
    /// The output being spent (wallet script + value)
    pub prevout: TxOut,
    /// Untweaked key the output commits to
    pub internal_key: XOnlyPublicKey,
}

/// Unsigned transaction ready for signing
#[derive(Debug, Clone)]
pub struct UnsignedTransaction {
    tx: Transaction,
    spends: Vec<SpendCondition>,
    total_input: u64,
    fee: u64,
    send_amount: u64,
}

impl UnsignedTransaction {
    pub fn transaction(&self) -> &Transaction {
        &self.tx
    }

    pub fn spends(&self) -> &[SpendCondition] {
        &self.spends
    }

    pub fn total_input(&self) -> u64 {
        self.total_input
    }

    pub fn fee(&self) -> u64 {
        self.fee
    }

    pub fn send_amount(&self) -> u64 {
        self.send_amount
    }
}

/// Sign every input with the wallet's tweaked key and finalize witnesses
pub fn sign(
    unsigned: UnsignedTransaction,
    wallet: &Wallet,
) -> Result<SignedTransaction, BuildError> {
    let UnsignedTransaction {
        mut tx,
        spends,
        total_input,
        fee,
        send_amount,
    } = unsigned;

    let signer = wallet.signer();
    let output_key = signer.output_key();

    // Every input must commit to the key we are about to sign with
    for (i, spend) in spends.iter().enumerate() {
        let tweak = tap_tweak(&spend.internal_key)?;
        let (expected, _parity) = spend
            .internal_key
            .add_tweak(SECP256K1, &tweak)
            .map_err(|_| AddressError::TweakFailed)?;
        if expected != output_key {
            return Err(SigningError::KeyMismatch { input: i }.into());
        }
    }

    let prevouts: Vec<TxOut> = spends.iter().map(|s| s.prevout.clone()).collect();
    let prevouts = Prevouts::All(prevouts.as_slice());

    let signatures = {
        let mut sighash_cache = SighashCache::new(&tx);
        let mut signatures = Vec::with_capacity(tx.input.len());

        for i in 0..tx.input.len() {
            let sighash = sighash_cache
                .taproot_key_spend_signature_hash(i, &prevouts, TapSighashType::Default)
                .map_err(|e| SigningError::SigningFailed(e.to_string()))?;
            let digest = sighash.to_byte_array();

            let signature = signer.sign(&digest);

            SECP256K1
                .verify_schnorr(&signature, &Message::from_digest(digest), &output_key)
                .map_err(|_| SigningError::VerificationFailed { input: i })?;

            signatures.push(taproot::Signature {
                signature,
                sighash_type: TapSighashType::Default,
            });
        }

        signatures
    };

    for (input, signature) in tx.input.iter_mut().zip(signatures) {
        input.witness = Witness::from_slice(&[signature.to_vec()]);
    }

    Ok(SignedTransaction {
        tx,
        total_input,
        fee,
        send_amount,
    })
}

/// Fully signed sweep transaction
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    tx: Transaction,
    total_input: u64,
    fee: u64,
    send_amount: u64,
}

impl SignedTransaction {
    pub fn transaction(&self) -> &Transaction {
        &self.tx
    }

    pub fn txid(&self) -> Txid {
        self.tx.compute_txid()
    }

    pub fn input_count(&self) -> usize {
        self.tx.input.len()
    }

    pub fn total_input(&self) -> u64 {
        self.total_input
    }

    pub fn fee(&self) -> u64 {
        self.fee
    }

    pub fn send_amount(&self) -> u64 {
        self.send_amount
    }

    /// Actual virtual size, for comparison against the estimate
    pub fn vsize(&self) -> usize {
        self.tx.vsize()
    }

    /// Consensus wire encoding
    pub fn to_bytes(&self) -> Vec<u8> {
        encode::serialize(&self.tx)
    }

    /// Hex of the wire encoding, as accepted by broadcast endpoints
    pub fn to_hex(&self) -> String {
        encode::serialize_hex(&self.tx)
    }
}

/// Parse a hex-encoded transaction
pub fn decode_transaction(tx_hex: &str) -> Result<Transaction, BuildError> {
    let bytes = hex::decode(tx_hex.trim()).map_err(|e| BuildError::Decode(e.to_string()))?;
    encode::deserialize(&bytes).map_err(|e| BuildError::Decode(e.to_string()))
}

/// Signing errors
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("signing failed: {0}")]
    SigningFailed(String),

    #[error("input {input}: wallet key does not match the spend condition")]
    KeyMismatch { input: usize },

    #[error("input {input}: signature failed verification")]
    VerificationFailed { input: usize },
}

/// Builder errors
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("insufficient funds: {total_input} sats in, fee {fee} sats leaves nothing to send")]
    InsufficientFunds { total_input: u64, fee: u64 },

    #[error("input values overflow")]
    ValueOverflow,

    #[error("address error: {0}")]
    Address(#[from] AddressError),

    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error("invalid transaction encoding: {0}")]
    Decode(String),
}
