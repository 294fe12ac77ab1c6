//! Key-Path Taproot Outputs
//!
//! Turns an internal (untweaked) x-only key into the witness v1 output that
//! locks a wallet's funds, and the bech32m address that encodes it.
//!
//! # How it works:
//! 1. t = H_TapTweak(P), BIP-341 tagged hash with no script tree
//! 2. Q = P + t*G
//! 3. output script = OP_1 <Q>
//! 4. address = bech32m(hrp, v1, Q)

use bitcoin::bech32::segwit;
use bitcoin::hashes::Hash;
use bitcoin::key::TweakedPublicKey;
use bitcoin::secp256k1::Scalar;
use bitcoin::{ScriptBuf, TapTweakHash, XOnlyPublicKey};
use secp256k1::SECP256K1;

use crate::network::NetworkParams;

/// A wallet's receiving output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaprootOutput {
    /// bech32m address (tb1p... on signet/testnet)
    pub address: String,
    /// Locking script: OP_1 <32-byte output key>
    pub output_script: ScriptBuf,
    /// Tweaked output key
    pub output_key: XOnlyPublicKey,
}

/// Compute the key-path-only TapTweak scalar for an internal key
pub fn tap_tweak(internal_key: &XOnlyPublicKey) -> Result<Scalar, AddressError> {
    let hash = TapTweakHash::from_key_and_tweak(*internal_key, None);
    Scalar::from_be_bytes(hash.to_byte_array()).map_err(|_| AddressError::InvalidScalar)
}

/// Build the output script and address for an internal key
pub fn build_output(
    params: &NetworkParams,
    internal_key: &XOnlyPublicKey,
) -> Result<TaprootOutput, AddressError> {
    let tweak = tap_tweak(internal_key)?;

    // Fails only when P + t*G is the point at infinity
    let (output_key, _parity) = internal_key
        .add_tweak(SECP256K1, &tweak)
        .map_err(|_| AddressError::TweakFailed)?;

    let address = segwit::encode_v1(params.hrp()?, &output_key.serialize())
        .map_err(|e| AddressError::Encoding(e.to_string()))?;

    let output_script =
        ScriptBuf::new_p2tr_tweaked(TweakedPublicKey::dangerous_assume_tweaked(output_key));

    Ok(TaprootOutput {
        address,
        output_script,
        output_key,
    })
}

/// Parse x-only public key from hex string
pub fn parse_x_only_pubkey(hex_str: &str) -> Result<XOnlyPublicKey, AddressError> {
    let bytes = hex::decode(hex_str).map_err(|_| AddressError::InvalidKey)?;
    if bytes.len() != 32 {
        return Err(AddressError::InvalidKey);
    }
    XOnlyPublicKey::from_slice(&bytes).map_err(|_| AddressError::InvalidKey)
}

/// Errors for output and address construction
#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    #[error("failed to apply tweak to internal key")]
    TweakFailed,
    #[error("invalid scalar value for tweak")]
    InvalidScalar,
    #[error("invalid key")]
    InvalidKey,
    #[error("address encoding failed: {0}")]
    Encoding(String),
    #[error("invalid destination address: {0}")]
    InvalidDestination(String),
    #[error("address is for another network: expected {expected}, found {found}")]
    WrongNetwork { expected: String, found: String },
}
