//! Network Parameters
//!
//! Address prefixes and extended-key version bytes for the chain being swept.
//! One `NetworkParams` value is built at startup and handed to both key
//! derivation and address construction, so the two can never disagree.
//!
//! There is no mainnet preset and no `Default` impl; the caller
//! must name the target chain.

use bitcoin::base58;
use bitcoin::bech32::{self, Hrp};
use bitcoin::bip32::Xpub;
use bitcoin::hashes::Hash;
use bitcoin::script::witness_program::WitnessProgram;
use bitcoin::script::witness_version::WitnessVersion;
use bitcoin::{NetworkKind, PubkeyHash, ScriptBuf, ScriptHash};
use serde::{Deserialize, Serialize};

use crate::address::AddressError;

/// Bitcoin mainnet `xpub` version bytes
pub const MAINNET_XPUB: u32 = 0x0488_b21e;

/// Bitcoin mainnet `xprv` version bytes
pub const MAINNET_XPRV: u32 = 0x0488_ade4;

/// Chain-specific encoding parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkParams {
    /// Human-readable part for segwit addresses (e.g. "tb")
    pub bech32_hrp: String,
    /// Extended public key version bytes
    pub bip32_public: u32,
    /// Extended private key version bytes
    pub bip32_private: u32,
    /// Base58 prefix byte for P2PKH addresses
    pub pubkey_hash: u8,
    /// Base58 prefix byte for P2SH addresses
    pub script_hash: u8,
}

impl NetworkParams {
    /// Bitcoin signet, with `vpub`/`vprv` extended-key versions
    pub fn signet() -> Self {
        Self {
            bech32_hrp: "tb".to_string(),
            bip32_public: 0x045f_1cf6,
            bip32_private: 0x045f_18bc,
            pubkey_hash: 0x6f,
            script_hash: 0xc4,
        }
    }

    /// Bitcoin testnet, with `tpub`/`tprv` extended-key versions
    pub fn testnet() -> Self {
        Self {
            bech32_hrp: "tb".to_string(),
            bip32_public: 0x0435_87cf,
            bip32_private: 0x0435_8394,
            pubkey_hash: 0x6f,
            script_hash: 0xc4,
        }
    }

    /// Bitcoin regtest
    pub fn regtest() -> Self {
        Self {
            bech32_hrp: "bcrt".to_string(),
            ..Self::testnet()
        }
    }

    /// Look up a preset by name
    pub fn from_preset(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "signet" => Some(Self::signet()),
            "testnet" | "testnet3" => Some(Self::testnet()),
            "regtest" => Some(Self::regtest()),
            _ => None,
        }
    }

    /// Whether these parameters collide with Bitcoin mainnet encodings
    pub fn is_production(&self) -> bool {
        self.bech32_hrp.eq_ignore_ascii_case("bc")
            || self.bip32_public == MAINNET_XPUB
            || self.bip32_private == MAINNET_XPRV
            || self.pubkey_hash == 0x00
            || self.script_hash == 0x05
    }

    /// Network kind used when creating the BIP-32 master key
    pub fn network_kind(&self) -> NetworkKind {
        if self.bip32_private == MAINNET_XPRV {
            NetworkKind::Main
        } else {
            NetworkKind::Test
        }
    }

    /// Parsed human-readable part
    pub fn hrp(&self) -> Result<Hrp, AddressError> {
        Hrp::parse(&self.bech32_hrp).map_err(|e| AddressError::Encoding(e.to_string()))
    }

    /// Serialize an extended public key with this network's version bytes
    pub fn encode_xpub(&self, xpub: &Xpub) -> String {
        let mut data = xpub.encode();
        data[0..4].copy_from_slice(&self.bip32_public.to_be_bytes());
        base58::encode_check(&data)
    }

    /// Decode a destination address into its locking script
    ///
    /// Segwit addresses must carry this network's hrp; base58 addresses must
    /// carry its P2PKH or P2SH prefix byte.
    pub fn destination_script(&self, address: &str) -> Result<ScriptBuf, AddressError> {
        let address = address.trim();
        let expected_prefix = format!("{}1", self.bech32_hrp.to_lowercase());

        if address.to_lowercase().starts_with(&expected_prefix) {
            return self.segwit_script(address);
        }

        match base58::decode_check(address) {
            Ok(payload) => self.base58_script(address, &payload),
            Err(_) => match bech32::segwit::decode(address) {
                Ok((hrp, _, _)) => Err(AddressError::WrongNetwork {
                    expected: self.bech32_hrp.clone(),
                    found: hrp.to_lowercase(),
                }),
                Err(e) => Err(AddressError::InvalidDestination(format!(
                    "{}: {}",
                    address, e
                ))),
            },
        }
    }

    fn segwit_script(&self, address: &str) -> Result<ScriptBuf, AddressError> {
        let (hrp, version, program) = bech32::segwit::decode(address)
            .map_err(|e| AddressError::InvalidDestination(format!("{}: {}", address, e)))?;

        if hrp.to_lowercase() != self.bech32_hrp.to_lowercase() {
            return Err(AddressError::WrongNetwork {
                expected: self.bech32_hrp.clone(),
                found: hrp.to_lowercase(),
            });
        }

        let version = WitnessVersion::try_from(version.to_u8())
            .map_err(|e| AddressError::InvalidDestination(e.to_string()))?;
        let program = WitnessProgram::new(version, &program)
            .map_err(|e| AddressError::InvalidDestination(e.to_string()))?;

        Ok(ScriptBuf::new_witness_program(&program))
    }

    fn base58_script(&self, address: &str, payload: &[u8]) -> Result<ScriptBuf, AddressError> {
        if payload.len() != 21 {
            return Err(AddressError::InvalidDestination(format!(
                "{}: base58 payload must be 21 bytes, got {}",
                address,
                payload.len()
            )));
        }

        let mut hash = [0u8; 20];
        hash.copy_from_slice(&payload[1..]);

        match payload[0] {
            prefix if prefix == self.pubkey_hash => {
                Ok(ScriptBuf::new_p2pkh(&PubkeyHash::from_byte_array(hash)))
            }
            prefix if prefix == self.script_hash => {
                Ok(ScriptBuf::new_p2sh(&ScriptHash::from_byte_array(hash)))
            }
            prefix => Err(AddressError::WrongNetwork {
                expected: format!(
                    "base58 prefix 0x{:02x} or 0x{:02x}",
                    self.pubkey_hash, self.script_hash
                ),
                found: format!("0x{:02x}", prefix),
            }),
        }
    }
}
