//! Configuration for tapsweep
//!
//! Settings come from three layers, later ones winning:
//!
//! 1. TOML file (`--config`)
//! 2. `TAPSWEEP_*` environment variables
//! 3. command-line flags (applied by the binary)
//!
//! # Environment Variables
//! - `TAPSWEEP_NETWORK` - preset name: "signet", "testnet" or "regtest"
//! - `TAPSWEEP_ESPLORA_URL` - Esplora API base URL
//! - `TAPSWEEP_DESTINATION` - address receiving all swept funds
//! - `TAPSWEEP_START_INDEX`, `TAPSWEEP_COUNT` - derivation index range
//! - `TAPSWEEP_FEE_RATE` - sats/vbyte
//! - `TAPSWEEP_REQUEST_TIMEOUT_SECS`, `TAPSWEEP_INDEX_TIMEOUT_SECS`
//! - `TAPSWEEP_LOG_LEVEL`, `TAPSWEEP_LOG_JSON`
//!
//! The seed phrase is read only from `TAPSWEEP_MNEMONIC`. It is never part of
//! [`SweepConfig`] and never accepted from the config file.

use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::esplora;
use crate::fee::DEFAULT_FEE_RATE;
use crate::keys::SeedPhrase;
use crate::logging::LogLevel;
use crate::network::NetworkParams;

/// Environment variable holding the seed phrase
pub const MNEMONIC_ENV: &str = "TAPSWEEP_MNEMONIC";

/// Number of indices scanned when not configured
pub const DEFAULT_COUNT: u32 = 10;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_INDEX_TIMEOUT_SECS: u64 = 60;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    MissingValue(String),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("unknown network preset: {0} (expected signet, testnet or regtest)")]
    UnknownPreset(String),

    #[error("network parameters match Bitcoin mainnet; refusing to run")]
    ProductionNetwork,

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("fee rate must be a finite, non-negative number, got {0}")]
    InvalidFeeRate(f64),
}

/// Network selection: a preset name or a full parameter table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum NetworkSetting {
    Preset(String),
    Custom(NetworkParams),
}

impl NetworkSetting {
    /// Resolve to concrete parameters, refusing mainnet lookalikes
    pub fn params(&self) -> Result<NetworkParams, ConfigError> {
        let params = match self {
            NetworkSetting::Preset(name) => NetworkParams::from_preset(name)
                .ok_or_else(|| ConfigError::UnknownPreset(name.clone()))?,
            NetworkSetting::Custom(params) => params.clone(),
        };

        if params.is_production() {
            return Err(ConfigError::ProductionNetwork);
        }
        Ok(params)
    }

    fn preset_name(&self) -> Option<&str> {
        match self {
            NetworkSetting::Preset(name) => Some(name.as_str()),
            NetworkSetting::Custom(_) => None,
        }
    }
}

/// On-disk layout; every key optional so env and flags can fill gaps
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    network: Option<NetworkSetting>,
    esplora_url: Option<String>,
    destination: Option<String>,
    start_index: Option<u32>,
    count: Option<u32>,
    fee_rate: Option<f64>,
    request_timeout_secs: Option<u64>,
    index_timeout_secs: Option<u64>,
    log_level: Option<String>,
    log_json: Option<bool>,
}

/// Resolved sweep settings
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Target chain; required, never defaulted
    pub network: Option<NetworkSetting>,
    /// Esplora base URL; falls back to the preset's public API
    pub esplora_url: Option<String>,
    /// Address receiving all swept funds
    pub destination: Option<String>,
    /// First derivation index
    pub start_index: u32,
    /// Number of indices to scan
    pub count: u32,
    /// Fee rate (sats/vbyte)
    pub fee_rate: f64,
    /// HTTP request timeout
    pub request_timeout: Duration,
    /// Budget for one index, chain queries and broadcast included
    pub index_timeout: Duration,
    /// Log level
    pub log_level: LogLevel,
    /// JSON log output
    pub log_json: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            network: None,
            esplora_url: None,
            destination: None,
            start_index: 0,
            count: DEFAULT_COUNT,
            fee_rate: DEFAULT_FEE_RATE,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            index_timeout: Duration::from_secs(DEFAULT_INDEX_TIMEOUT_SECS),
            log_level: LogLevel::Info,
            log_json: false,
        }
    }
}

impl SweepConfig {
    /// Load the optional file, then the process environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    /// Parse TOML text
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(contents)?;
        let defaults = Self::default();

        Ok(Self {
            network: file.network,
            esplora_url: file.esplora_url,
            destination: file.destination,
            start_index: file.start_index.unwrap_or(defaults.start_index),
            count: file.count.unwrap_or(defaults.count),
            fee_rate: file.fee_rate.unwrap_or(defaults.fee_rate),
            request_timeout: file
                .request_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            index_timeout: file
                .index_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.index_timeout),
            log_level: file
                .log_level
                .as_deref()
                .map(LogLevel::from)
                .unwrap_or(defaults.log_level),
            log_json: file.log_json.unwrap_or(defaults.log_json),
        })
    }

    /// Apply `TAPSWEEP_*` overrides from `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(network) = lookup("TAPSWEEP_NETWORK") {
            self.network = Some(NetworkSetting::Preset(network));
        }
        if let Some(url) = lookup("TAPSWEEP_ESPLORA_URL") {
            self.esplora_url = Some(url);
        }
        if let Some(destination) = lookup("TAPSWEEP_DESTINATION") {
            self.destination = Some(destination);
        }
        if let Some(value) = lookup("TAPSWEEP_START_INDEX") {
            self.start_index = parse_var("TAPSWEEP_START_INDEX", &value)?;
        }
        if let Some(value) = lookup("TAPSWEEP_COUNT") {
            self.count = parse_var("TAPSWEEP_COUNT", &value)?;
        }
        if let Some(value) = lookup("TAPSWEEP_FEE_RATE") {
            self.fee_rate = parse_var("TAPSWEEP_FEE_RATE", &value)?;
        }
        if let Some(value) = lookup("TAPSWEEP_REQUEST_TIMEOUT_SECS") {
            self.request_timeout =
                Duration::from_secs(parse_var("TAPSWEEP_REQUEST_TIMEOUT_SECS", &value)?);
        }
        if let Some(value) = lookup("TAPSWEEP_INDEX_TIMEOUT_SECS") {
            self.index_timeout =
                Duration::from_secs(parse_var("TAPSWEEP_INDEX_TIMEOUT_SECS", &value)?);
        }
        if let Some(value) = lookup("TAPSWEEP_LOG_LEVEL") {
            self.log_level = LogLevel::from(value.as_str());
        }
        if let Some(value) = lookup("TAPSWEEP_LOG_JSON") {
            self.log_json = matches!(value.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        Ok(())
    }

    /// Network parameters for this run
    pub fn params(&self) -> Result<NetworkParams, ConfigError> {
        self.network
            .as_ref()
            .ok_or_else(|| ConfigError::MissingValue("network".to_string()))?
            .params()
    }

    /// Esplora URL, defaulting to the preset's public API
    pub fn esplora_url(&self) -> Result<String, ConfigError> {
        if let Some(url) = &self.esplora_url {
            return Ok(url.clone());
        }

        self.network
            .as_ref()
            .and_then(NetworkSetting::preset_name)
            .and_then(esplora::default_url)
            .map(str::to_string)
            .ok_or_else(|| ConfigError::MissingValue("esplora_url".to_string()))
    }

    /// Destination address, which sweeping requires
    pub fn destination(&self) -> Result<&str, ConfigError> {
        self.destination
            .as_deref()
            .ok_or_else(|| ConfigError::MissingValue("destination".to_string()))
    }

    /// Checks shared by every command
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.params()?;

        if !self.fee_rate.is_finite() || self.fee_rate < 0.0 {
            return Err(ConfigError::InvalidFeeRate(self.fee_rate));
        }

        if self.start_index.checked_add(self.count).is_none() {
            return Err(ConfigError::InvalidValue(
                "count".to_string(),
                format!("start {} + count {} overflows", self.start_index, self.count),
            ));
        }

        Ok(())
    }

    /// Derivation indices to scan
    pub fn index_range(&self) -> std::ops::Range<u32> {
        self.start_index..self.start_index.saturating_add(self.count)
    }
}

/// Read the seed phrase from `TAPSWEEP_MNEMONIC`
pub fn seed_phrase_from_env() -> Result<SeedPhrase, crate::error::SweepError> {
    seed_phrase_from(|key| env::var(key).ok())
}

/// Read the seed phrase through `lookup`
pub fn seed_phrase_from<F>(lookup: F) -> Result<SeedPhrase, crate::error::SweepError>
where
    F: Fn(&str) -> Option<String>,
{
    let phrase = lookup(MNEMONIC_ENV)
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingValue(MNEMONIC_ENV.to_string()))?;
    Ok(SeedPhrase::parse(&phrase)?)
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(name.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_preset_file() {
        let config = SweepConfig::from_toml(
            r#"
            network = "signet"
            destination = "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx"
            count = 25
            fee_rate = 2.5
            "#,
        )
        .unwrap();

        config.validate().unwrap();
        assert_eq!(config.params().unwrap(), NetworkParams::signet());
        assert_eq!(config.esplora_url().unwrap(), esplora::SIGNET_URL);
        assert_eq!(config.count, 25);
        assert_eq!(config.fee_rate, 2.5);
        assert_eq!(config.index_range(), 0..25);
        assert_eq!(config.index_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_inline_network_table() {
        let config = SweepConfig::from_toml(
            r#"
            esplora_url = "http://127.0.0.1:3002"

            [network]
            bech32_hrp = "bcrt"
            bip32_public = 0x043587cf
            bip32_private = 0x04358394
            pubkey_hash = 0x6f
            script_hash = 0xc4
            "#,
        )
        .unwrap();

        assert_eq!(config.params().unwrap(), NetworkParams::regtest());
        assert_eq!(config.esplora_url().unwrap(), "http://127.0.0.1:3002");
    }

    #[test]
    fn test_network_is_required() {
        let config = SweepConfig::from_toml("count = 3").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingValue(name)) if name == "network"
        ));
    }

    #[test]
    fn test_mainnet_refused() {
        let config = SweepConfig::from_toml(r#"network = "mainnet""#).unwrap();
        assert!(matches!(config.params(), Err(ConfigError::UnknownPreset(_))));

        let config = SweepConfig::from_toml(
            r#"
            [network]
            bech32_hrp = "bc"
            bip32_public = 0x0488b21e
            bip32_private = 0x0488ade4
            pubkey_hash = 0x00
            script_hash = 0x05
            "#,
        )
        .unwrap();
        assert!(matches!(config.params(), Err(ConfigError::ProductionNetwork)));
    }

    #[test]
    fn test_regtest_needs_url() {
        let config = SweepConfig::from_toml(r#"network = "regtest""#).unwrap();
        assert!(matches!(
            config.esplora_url(),
            Err(ConfigError::MissingValue(_))
        ));
    }

    #[test]
    fn test_invalid_fee_rate() {
        for rate in ["-1.0", "nan", "inf"] {
            let mut config = SweepConfig::from_toml(r#"network = "signet""#).unwrap();
            config.apply_env(lookup(&[("TAPSWEEP_FEE_RATE", rate)])).unwrap();
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidFeeRate(_))
            ));
        }
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = SweepConfig::from_toml(
            r#"
            network = "testnet"
            count = 5
            "#,
        )
        .unwrap();

        config
            .apply_env(lookup(&[
                ("TAPSWEEP_NETWORK", "signet"),
                ("TAPSWEEP_COUNT", "7"),
                ("TAPSWEEP_START_INDEX", "3"),
                ("TAPSWEEP_LOG_JSON", "true"),
                ("TAPSWEEP_INDEX_TIMEOUT_SECS", "5"),
            ]))
            .unwrap();

        assert_eq!(config.params().unwrap(), NetworkParams::signet());
        assert_eq!(config.index_range(), 3..10);
        assert!(config.log_json);
        assert_eq!(config.index_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_bad_env_value() {
        let mut config = SweepConfig::default();
        let err = config
            .apply_env(lookup(&[("TAPSWEEP_COUNT", "ten")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(name, _) if name == "TAPSWEEP_COUNT"));
    }

    #[test]
    fn test_range_overflow() {
        let mut config = SweepConfig::from_toml(r#"network = "signet""#).unwrap();
        config.start_index = u32::MAX;
        config.count = 2;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(_, _))
        ));
    }

    #[test]
    fn test_mnemonic_not_accepted_in_file() {
        let result = SweepConfig::from_toml(
            r#"
            network = "signet"
            mnemonic = "abandon abandon abandon"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_seed_phrase_from_env() {
        let phrase = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
        let seed = seed_phrase_from(lookup(&[(MNEMONIC_ENV, phrase)])).unwrap();
        assert_eq!(seed.word_count(), 12);

        let err = seed_phrase_from(lookup(&[])).unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");

        let err = seed_phrase_from(lookup(&[(MNEMONIC_ENV, "abandon abandon")])).unwrap_err();
        assert_eq!(err.error_code(), "DERIVATION_ERROR");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "network = \"signet\"").unwrap();
        writeln!(file, "destination = \"tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx\"").unwrap();
        writeln!(file, "log_level = \"debug\"").unwrap();

        let config = SweepConfig::from_file(file.path()).unwrap();
        assert_eq!(
            config.destination().unwrap(),
            "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx"
        );
        assert_eq!(config.log_level, LogLevel::Debug);

        let missing = file.path().with_extension("missing");
        assert!(matches!(
            SweepConfig::from_file(&missing),
            Err(ConfigError::Io { .. })
        ));
    }
}
