//! Deterministic BIP-86 Key Derivation
//!
//! Derives single-key taproot key material from a BIP-39 seed phrase.
//!
//! # Key Hierarchy
//!
//! ```text
//! seed phrase ── PBKDF2 (empty passphrase) ──> 64-byte seed
//! └── m                       master Xpriv (network version bytes)
//!     └── m/86'/0'/0'         account (exported as watch-only xpub)
//!         └── m/86'/0'/0'/0/i wallet i, i < 2^31
//! ```
//!
//! Derivation is a pure function of (seed phrase, network, index). Nothing
//! here is cached across calls beyond the master key held by [`KeyChain`].

use std::fmt;
use std::str::FromStr;

use bip39::Mnemonic;
use bitcoin::bip32::{self, ChildNumber, DerivationPath, Xpriv, Xpub};
use bitcoin::key::Keypair;
use bitcoin::secp256k1::{schnorr, Message, PublicKey};
use bitcoin::XOnlyPublicKey;
use secp256k1::SECP256K1;

use crate::address::{tap_tweak, AddressError};
use crate::network::NetworkParams;

/// BIP-86 purpose (`86'`)
pub const PURPOSE_TAPROOT: ChildNumber = ChildNumber::Hardened { index: 86 };

/// Coin type (`0'`)
pub const COIN_TYPE: ChildNumber = ChildNumber::Hardened { index: 0 };

/// Account (`0'`)
pub const ACCOUNT: ChildNumber = ChildNumber::Hardened { index: 0 };

/// External (receive) chain (`0`)
pub const EXTERNAL_CHAIN: ChildNumber = ChildNumber::Normal { index: 0 };

/// `m/86'/0'/0'`
pub const ACCOUNT_PATH: &[ChildNumber] = &[PURPOSE_TAPROOT, COIN_TYPE, ACCOUNT];

/// Build `m/86'/0'/0'/0/index`
pub fn wallet_path(index: u32) -> Result<DerivationPath, DerivationError> {
    let child =
        ChildNumber::from_normal_idx(index).map_err(|_| DerivationError::IndexOutOfRange(index))?;

    let mut path = ACCOUNT_PATH.to_vec();
    path.push(EXTERNAL_CHAIN);
    path.push(child);
    Ok(DerivationPath::from(path))
}

/// Error type for key derivation operations.
#[derive(Debug, thiserror::Error)]
pub enum DerivationError {
    #[error("invalid seed phrase: {0}")]
    InvalidMnemonic(String),

    #[error("BIP32 derivation error: {0}")]
    Bip32(#[from] bip32::Error),

    #[error("index {0} is out of range for non-hardened derivation")]
    IndexOutOfRange(u32),
}

/// Validated BIP-39 seed phrase
///
/// The words never appear in `Debug` output.
#[derive(Clone)]
pub struct SeedPhrase(Mnemonic);

impl SeedPhrase {
    /// Parse and validate (word list, word count, checksum)
    pub fn parse(phrase: &str) -> Result<Self, DerivationError> {
        Mnemonic::parse_normalized(phrase)
            .map(Self)
            .map_err(|e| DerivationError::InvalidMnemonic(e.to_string()))
    }

    /// Number of words in the phrase
    pub fn word_count(&self) -> usize {
        self.0.word_count()
    }

    fn to_seed(&self) -> [u8; 64] {
        self.0.to_seed("")
    }
}

impl FromStr for SeedPhrase {
    type Err = DerivationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for SeedPhrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SeedPhrase(<redacted>, {} words)", self.word_count())
    }
}

/// Master key for one seed phrase on one network
pub struct KeyChain {
    master: Xpriv,
    params: NetworkParams,
}

impl KeyChain {
    /// Stretch the seed phrase and create the master key
    pub fn new(seed: &SeedPhrase, params: &NetworkParams) -> Result<Self, DerivationError> {
        let master = Xpriv::new_master(params.network_kind(), &seed.to_seed())?;
        Ok(Self {
            master,
            params: params.clone(),
        })
    }

    /// Network parameters this chain was created for
    pub fn params(&self) -> &NetworkParams {
        &self.params
    }

    /// Derive key material for wallet `index`
    pub fn derive(&self, index: u32) -> Result<KeyMaterial, DerivationError> {
        let path = wallet_path(index)?;
        let child = self.master.derive_priv(SECP256K1, &path)?;
        Ok(KeyMaterial::new(child, path))
    }

    /// Account-level extended public key, serialized with the network's
    /// public version bytes
    pub fn account_xpub(&self) -> Result<String, DerivationError> {
        let account = self.master.derive_priv(SECP256K1, &ACCOUNT_PATH)?;
        let xpub = Xpub::from_priv(SECP256K1, &account);
        Ok(self.params.encode_xpub(&xpub))
    }
}

impl fmt::Debug for KeyChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyChain")
            .field("master", &"<redacted>")
            .field("params", &self.params)
            .finish()
    }
}

/// Derive key material for `index` directly from a seed phrase
pub fn derive(
    seed: &SeedPhrase,
    params: &NetworkParams,
    index: u32,
) -> Result<KeyMaterial, DerivationError> {
    KeyChain::new(seed, params)?.derive(index)
}

/// Untweaked key material for one wallet
pub struct KeyMaterial {
    xpriv: Xpriv,
    path: DerivationPath,
    public_key: PublicKey,
    internal_key: XOnlyPublicKey,
}

impl KeyMaterial {
    fn new(xpriv: Xpriv, path: DerivationPath) -> Self {
        let public_key = PublicKey::from_secret_key(SECP256K1, &xpriv.private_key);
        let (internal_key, _parity) = public_key.x_only_public_key();
        Self {
            xpriv,
            path,
            public_key,
            internal_key,
        }
    }

    /// Full derivation path
    pub fn path(&self) -> &DerivationPath {
        &self.path
    }

    /// 33-byte compressed public key
    pub fn public_key_bytes(&self) -> [u8; 33] {
        self.public_key.serialize()
    }

    /// 32-byte x-only internal key (compressed key without its parity byte)
    pub fn internal_key_bytes(&self) -> [u8; 32] {
        self.internal_key.serialize()
    }

    /// Internal key
    pub fn internal_key(&self) -> XOnlyPublicKey {
        self.internal_key
    }

    /// Apply the key-path TapTweak to get the signing key
    pub fn tweaked(&self) -> Result<TweakedKeyMaterial, AddressError> {
        let tweak = tap_tweak(&self.internal_key)?;
        let keypair = Keypair::from_secret_key(SECP256K1, &self.xpriv.private_key)
            .add_xonly_tweak(SECP256K1, &tweak)
            .map_err(|_| AddressError::TweakFailed)?;
        Ok(TweakedKeyMaterial { keypair })
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("path", &self.path)
            .field("internal_key", &self.internal_key)
            .finish_non_exhaustive()
    }
}

/// Tweaked keypair used only for key-path signing
pub struct TweakedKeyMaterial {
    keypair: Keypair,
}

impl TweakedKeyMaterial {
    /// Output key this keypair signs for
    pub fn output_key(&self) -> XOnlyPublicKey {
        self.keypair.x_only_public_key().0
    }

    /// BIP-340 signature over a sighash digest
    pub fn sign(&self, sighash: &[u8; 32]) -> schnorr::Signature {
        let msg = Message::from_digest(*sighash);
        SECP256K1.sign_schnorr(&msg, &self.keypair)
    }
}

impl fmt::Debug for TweakedKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TweakedKeyMaterial")
            .field("output_key", &self.output_key())
            .finish_non_exhaustive()
    }
}
