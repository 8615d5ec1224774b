#![forbid(unsafe_code)]
//! minichain CLI: build a ledger from batch plans, or verify an exported chain.

use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

use minichain::batch::{apply_batches, load_batches};
use minichain::blockchain::{Block, Ledger};
use minichain::config::{load_config, Config};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./minichain.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append the batches in a JSON plan file to a fresh ledger
    Run {
        /// JSON array of batch plans
        #[arg(long)]
        batches: PathBuf,
        /// Where to write the resulting blocks (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Check the integrity of an exported chain
    Verify {
        /// JSON array of blocks, as written by `run`
        chain: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Level was checked by load_config.
    let level = config.logging.level().unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Run { batches, out } => run(&config, batches, out),
        Commands::Verify { chain } => verify(&config, chain),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(
    config: &Config,
    batches: PathBuf,
    out: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let plans = load_batches(&batches)?;
    let mut ledger = Ledger::new(config.genesis_transactions(), config.hasher());
    info!(
        "Building ledger with {} digest from {} batches",
        config.chain.digest,
        plans.len()
    );

    apply_batches(&mut ledger, plans, config)?;
    ledger.validate()?;
    info!("Ledger of {} blocks is valid", ledger.len());

    let json = serde_json::to_string_pretty(ledger.blocks())?;
    match out {
        Some(path) => {
            fs::write(&path, json)?;
            info!("Wrote chain to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn verify(config: &Config, chain: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let contents = fs::read_to_string(&chain)?;
    let blocks: Vec<Block> = serde_json::from_str(&contents)?;
    let ledger = Ledger::from_blocks(blocks, config.hasher())?;

    ledger.validate()?;
    ledger.verify_consensus()?;
    info!(
        "Chain {} is valid: {} blocks, tip {}",
        chain.display(),
        ledger.len(),
        ledger.last_block().hash()
    );
    Ok(())
}
