//! Derived Taproot Wallet
//!
//! One wallet per derivation index: address, locking script and the tweaked
//! signer, recomputed from the seed on every run and never persisted.

use bitcoin::bip32::DerivationPath;
use bitcoin::{ScriptBuf, XOnlyPublicKey};

use crate::address::build_output;
use crate::error::SweepError;
use crate::keys::{KeyChain, SeedPhrase, TweakedKeyMaterial};
use crate::network::NetworkParams;

/// Key-path-only taproot wallet at `m/86'/0'/0'/0/index`
#[derive(Debug)]
pub struct Wallet {
    index: u32,
    address: String,
    path: DerivationPath,
    output_script: ScriptBuf,
    internal_key: XOnlyPublicKey,
    signer: TweakedKeyMaterial,
}

impl Wallet {
    /// Derive wallet `index` from an existing key chain
    pub fn from_keychain(chain: &KeyChain, index: u32) -> Result<Self, SweepError> {
        let keys = chain.derive(index)?;
        let output = build_output(chain.params(), &keys.internal_key())?;
        let signer = keys.tweaked()?;

        Ok(Self {
            index,
            address: output.address,
            path: keys.path().clone(),
            output_script: output.output_script,
            internal_key: keys.internal_key(),
            signer,
        })
    }

    /// Derive wallet `index` straight from a seed phrase
    pub fn derive(
        seed: &SeedPhrase,
        params: &NetworkParams,
        index: u32,
    ) -> Result<Self, SweepError> {
        let chain = KeyChain::new(seed, params)?;
        Self::from_keychain(&chain, index)
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn path(&self) -> &DerivationPath {
        &self.path
    }

    /// Path in `m/86'/0'/0'/0/i` notation
    pub fn path_string(&self) -> String {
        let children: Vec<String> = self.path.as_ref().iter().map(|c| c.to_string()).collect();
        format!("m/{}", children.join("/"))
    }

    pub fn output_script(&self) -> &ScriptBuf {
        &self.output_script
    }

    pub fn internal_key(&self) -> XOnlyPublicKey {
        self.internal_key
    }

    pub(crate) fn signer(&self) -> &TweakedKeyMaterial {
        &self.signer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_wallet_known_answer() {
        let seed = SeedPhrase::parse(MNEMONIC).unwrap();
        let wallet = Wallet::derive(&seed, &NetworkParams::signet(), 0).unwrap();

        assert_eq!(
            wallet.address(),
            "tb1p5cyxnuxmeuwuvkwfem96lqzszd02n6xdcjrs20cac6yqjjwudpxqp3mvzv"
        );
        assert_eq!(wallet.path_string(), "m/86'/0'/0'/0/0");
        assert_eq!(
            hex::encode(wallet.internal_key().serialize()),
            "cc8a4bc64d897bddc5fbc2f670f7a8ba0b386779106cf1223c6fc5d7cd6fc115"
        );
    }

    #[test]
    fn test_second_wallet() {
        let seed = SeedPhrase::parse(MNEMONIC).unwrap();
        let wallet = Wallet::derive(&seed, &NetworkParams::signet(), 1).unwrap();

        assert_eq!(
            wallet.address(),
            "tb1p4qhjn9zdvkux4e44uhx8tc55attvtyu358kutcqkudyccelu0wasjpkd5c"
        );
        assert_eq!(wallet.path_string(), "m/86'/0'/0'/0/1");
    }

    #[test]
    fn test_signer_owns_output_script() {
        let seed = SeedPhrase::parse(MNEMONIC).unwrap();
        let wallet = Wallet::derive(&seed, &NetworkParams::signet(), 5).unwrap();

        let program = &wallet.output_script().as_bytes()[2..];
        assert_eq!(program, &wallet.signer().output_key().serialize());
    }

    #[test]
    fn test_out_of_range_index() {
        let seed = SeedPhrase::parse(MNEMONIC).unwrap();
        let err = Wallet::derive(&seed, &NetworkParams::signet(), 1 << 31).unwrap_err();
        assert_eq!(err.error_code(), "DERIVATION_ERROR");
    }
}
