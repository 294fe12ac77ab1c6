//! tapsweep CLI
//!
//! Entry point for sweeping, listing derived addresses and exporting the
//! account xpub.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tapsweep::config::{seed_phrase_from_env, NetworkSetting, SweepConfig};
use tapsweep::logging::init_logging;
use tapsweep::units::sats_to_display;
use tapsweep::{EsploraClient, KeyChain, SweepOutcome, Sweeper, Wallet};

#[derive(Parser)]
#[command(name = "tapsweep")]
#[command(about = "Sweep BIP-86 taproot wallets derived from a seed phrase")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command
#[derive(Args)]
struct Common {
    /// Path to TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Network preset (signet, testnet, regtest)
    #[arg(long)]
    network: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sweep funded wallets into the destination address
    Sweep {
        #[command(flatten)]
        common: Common,

        /// First derivation index
        #[arg(short, long)]
        start: Option<u32>,

        /// Number of indices to scan
        #[arg(short = 'n', long)]
        count: Option<u32>,

        /// Destination address
        #[arg(short, long)]
        destination: Option<String>,

        /// Fee rate in sats/vbyte
        #[arg(short, long)]
        fee_rate: Option<f64>,

        /// Build and sign, but do not broadcast
        #[arg(long)]
        dry_run: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List derived addresses (offline)
    Addresses {
        #[command(flatten)]
        common: Common,

        /// First derivation index
        #[arg(short, long)]
        start: Option<u32>,

        /// Number of addresses
        #[arg(short = 'n', long)]
        count: Option<u32>,
    },

    /// Print the account extended public key (offline, watch-only)
    Xpub {
        #[command(flatten)]
        common: Common,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Sweep {
            common,
            start,
            count,
            destination,
            fee_rate,
            dry_run,
            json,
        } => {
            let mut config = load_config(&common)?;
            config.start_index = start.unwrap_or(config.start_index);
            config.count = count.unwrap_or(config.count);
            config.fee_rate = fee_rate.unwrap_or(config.fee_rate);
            if destination.is_some() {
                config.destination = destination;
            }
            run_sweep(finish_config(config)?, dry_run, json).await?;
        }
        Commands::Addresses {
            common,
            start,
            count,
        } => {
            let mut config = load_config(&common)?;
            config.start_index = start.unwrap_or(config.start_index);
            config.count = count.unwrap_or(config.count);
            list_addresses(finish_config(config)?)?;
        }
        Commands::Xpub { common } => {
            let config = finish_config(load_config(&common)?)?;
            let keychain = KeyChain::new(&seed_phrase_from_env()?, &config.params()?)?;
            println!("{}", keychain.account_xpub()?);
        }
    }

    Ok(())
}

/// File, then environment, then the shared flags
fn load_config(common: &Common) -> Result<SweepConfig, Box<dyn std::error::Error>> {
    let mut config = SweepConfig::load(common.config.as_deref())?;
    if let Some(network) = &common.network {
        config.network = Some(NetworkSetting::Preset(network.clone()));
    }
    Ok(config)
}

/// Validate once every layer is applied, then start logging
fn finish_config(config: SweepConfig) -> Result<SweepConfig, Box<dyn std::error::Error>> {
    config.validate()?;
    init_logging(config.log_level, config.log_json)?;
    Ok(config)
}

async fn run_sweep(
    config: SweepConfig,
    dry_run: bool,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let params = config.params()?;
    let keychain = KeyChain::new(&seed_phrase_from_env()?, &params)?;
    let client = EsploraClient::new(&config.esplora_url()?, config.request_timeout)?;

    tracing::info!(esplora = client.base_url(), "Using Esplora API");

    let sweeper = Sweeper::new(client, keychain, config.destination()?)?
        .with_fee_rate(config.fee_rate)
        .with_index_timeout(config.index_timeout)
        .with_dry_run(dry_run);

    let report = sweeper.run(config.index_range()).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for entry in &report.entries {
        let address = entry.address.as_deref().unwrap_or("-");
        match (&entry.outcome, &entry.error) {
            (Some(SweepOutcome::Swept { txid, amount_sats, .. }), _) => {
                println!(
                    "{:>6}  {}  swept {}  txid {}",
                    entry.index,
                    address,
                    sats_to_display(*amount_sats),
                    txid
                );
            }
            (
                Some(SweepOutcome::DryRun {
                    txid,
                    amount_sats,
                    tx_hex,
                    ..
                }),
                _,
            ) => {
                println!(
                    "{:>6}  {}  would sweep {}  txid {}",
                    entry.index,
                    address,
                    sats_to_display(*amount_sats),
                    txid
                );
                println!("        {}", tx_hex);
            }
            (Some(SweepOutcome::Empty), _) => {
                println!("{:>6}  {}  no funds", entry.index, address);
            }
            (None, Some(error)) => {
                println!(
                    "{:>6}  {}  error [{}] {}",
                    entry.index, address, error.code, error.message
                );
            }
            (None, None) => {}
        }
    }

    println!();
    println!(
        "{} swept, {} empty, {} failed; {} to {} (fees {})",
        report.swept_count(),
        report.empty_count(),
        report.failed_count(),
        sats_to_display(report.total_swept_sats()),
        sweeper.destination(),
        sats_to_display(report.total_fee_sats()),
    );

    Ok(())
}

fn list_addresses(config: SweepConfig) -> Result<(), Box<dyn std::error::Error>> {
    let keychain = KeyChain::new(&seed_phrase_from_env()?, &config.params()?)?;

    for index in config.index_range() {
        let wallet = Wallet::from_keychain(&keychain, index)?;
        println!("{:<20} {}", wallet.path_string(), wallet.address());
    }

    Ok(())
}
