//! # Signer Runtime
//!
//! ## Commands
//!
//! | Command | Effect |
//! |---------|--------|
//! | `run` | Register validators, prune on schedule, wait for Ctrl+C |
//! | `export [--output FILE]` | Write the EIP-3076 interchange document |
//! | `import FILE` | Rejected: importing is not supported |
//! | `prune` | Prune every configured validator once with the configured tunables |

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use qs_01_slashing_protection::SlashingProtection;
use tracing::info;
use tracing_subscriber::EnvFilter;

use signer_runtime::{SignerConfig, SignerRuntime, StorageBackend};

#[derive(Parser, Debug)]
#[command(name = "signer-runtime")]
#[command(about = "Remote signer slashing protection", long_about = None)]
struct Args {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data directory (overrides config and QS_DATA_DIR)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Storage backend: memory, file or rocksdb
    #[arg(short, long, global = true)]
    backend: Option<StorageBackend>,

    /// Log filter, e.g. `info` or `qs_01_slashing_protection=debug`
    #[arg(long, global = true, default_value = "info")]
    log: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the signer until interrupted
    Run,
    /// Export slashing protection history
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Import slashing protection history
    Import {
        /// Interchange document to import
        input: PathBuf,
    },
    /// Prune history once and exit
    Prune,
}

fn load_config(args: &Args) -> Result<SignerConfig> {
    let mut config = SignerConfig::load(args.config.as_deref())?;
    config.apply_env()?;
    if let Some(dir) = &args.data_dir {
        config.storage.data_dir = dir.clone();
    }
    if let Some(backend) = args.backend {
        config.storage.backend = backend;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(io::stderr)
        .init();

    let config = load_config(&args)?;
    let runtime = SignerRuntime::open(config)?;

    match args.command {
        Command::Run => run(runtime).await,
        Command::Export { output } => export(&runtime, output),
        Command::Import { input } => import(&runtime, input),
        Command::Prune => prune(&runtime),
    }
}

async fn run(runtime: SignerRuntime) -> Result<()> {
    info!("===========================================");
    info!("  Signer Runtime v{}", env!("CARGO_PKG_VERSION"));
    info!("  Backend: {}", runtime.config().storage.backend);
    info!("===========================================");

    let scheduler = runtime.start();

    info!("Signer is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl+C")?;

    runtime.shutdown();
    if let Some(handle) = scheduler {
        handle.await.context("joining pruning scheduler")?;
    }
    info!("Shutdown complete");
    Ok(())
}

fn export(runtime: &SignerRuntime, output: Option<PathBuf>) -> Result<()> {
    let engine = runtime.engine();
    match output {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("creating {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            engine.export(&mut writer)?;
            writer
                .into_inner()
                .map_err(|e| e.into_error())
                .and_then(|file| file.sync_all())
                .with_context(|| format!("finishing {}", path.display()))?;
            info!("Exported slashing protection history to {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            engine.export(&mut writer)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}

fn import(runtime: &SignerRuntime, input: PathBuf) -> Result<()> {
    let mut file = File::open(&input).with_context(|| format!("opening {}", input.display()))?;
    runtime
        .engine()
        .import(&mut file)
        .with_context(|| format!("importing {}", input.display()))
}

fn prune(runtime: &SignerRuntime) -> Result<()> {
    let summary = runtime.engine().prune()?;
    info!(
        "Pruned {} validators: {} blocks, {} attestations deleted",
        summary.validators_pruned, summary.blocks_deleted, summary.attestations_deleted
    );
    Ok(())
}
