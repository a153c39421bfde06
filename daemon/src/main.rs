//! plancheck: maintenance CLI for a plancheck data directory.

use anyhow::Context;
use clap::Parser;
use plancheck_node::{
    init_logging, AcceptanceService, LogFormat, NodeConfig, ShutdownController, Sweeper,
};
use plancheck_types::AcceptanceKey;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "plancheck", about = "plancheck acceptance store maintenance")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// CLI flags and env vars override them.
    #[arg(long, env = "PLANCHECK_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for LMDB storage.
    #[arg(long, env = "PLANCHECK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "PLANCHECK_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "PLANCHECK_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct KeyArgs {
    #[arg(long)]
    provider: String,

    #[arg(long)]
    plan: String,

    #[arg(long)]
    location: Option<String>,
}

impl KeyArgs {
    fn key(&self) -> AcceptanceKey {
        let key = AcceptanceKey::new(self.provider.as_str(), self.plan.as_str());
        match &self.location {
            Some(location) => key.at(location.as_str()),
            None => key,
        }
    }
}

#[derive(clap::Subcommand)]
enum Command {
    /// Expire overdue verifications and recompute the affected records.
    Sweep {
        /// Entries per batch (defaults to ledger.sweep_batch_size).
        #[arg(long)]
        batch_size: Option<usize>,

        /// Keep sweeping every SECS seconds until SIGINT/SIGTERM.
        #[arg(long, value_name = "SECS")]
        every: Option<u64>,
    },
    /// Print the acceptance record as JSON.
    Show(KeyArgs),
    /// Print the confidence factor breakdown and explanation as JSON.
    Explain(KeyArgs),
    /// Rebuild the acceptance record from its live verifications.
    Recompute(KeyArgs),
    /// Cross-check the LMDB databases and indexes.
    Check,
}

fn load_config(cli: &Cli) -> anyhow::Result<NodeConfig> {
    let mut config = match &cli.config {
        Some(path) => NodeConfig::from_toml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => NodeConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    Ok(config)
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(config.log_format, &config.log_level)?;

    if let Command::Check = cli.command {
        plancheck_store_lmdb::check_data_dir(&config.data_dir).map_err(anyhow::Error::msg)?;
    }
    let service = Arc::new(
        AcceptanceService::open_lmdb(&config)
            .with_context(|| format!("opening {}", config.data_dir.display()))?,
    );

    match cli.command {
        Command::Sweep { batch_size, every } => {
            let batch_size = batch_size.unwrap_or(config.ledger.sweep_batch_size);
            match every {
                None => {
                    let worker = Arc::clone(&service);
                    let summary =
                        tokio::task::spawn_blocking(move || worker.sweep_all(batch_size)).await??;
                    print_json(&summary)?;
                }
                Some(secs) => {
                    let controller = ShutdownController::new();
                    let sweeper = Sweeper::new(
                        Arc::clone(&service),
                        Duration::from_secs(secs.max(1)),
                        batch_size,
                    );
                    let run = sweeper.run(controller.subscribe());
                    tokio::pin!(run);
                    // A fatal sweep error ends the loop without waiting for a signal.
                    let totals = tokio::select! {
                        totals = &mut run => totals?,
                        _ = controller.wait_for_signal() => run.await?,
                    };
                    print_json(&totals)?;
                }
            }
        }
        Command::Show(args) => match service.get_acceptance(&args.key())? {
            Some(record) => print_json(&record)?,
            None => anyhow::bail!("no acceptance record for {}", args.key()),
        },
        Command::Explain(args) => match service.explain_confidence(&args.key())? {
            Some(explained) => print_json(&explained)?,
            None => anyhow::bail!("no acceptance record for {}", args.key()),
        },
        Command::Recompute(args) => {
            let recomputed = service.recompute(&args.key())?;
            tracing::info!(
                key = %args.key(),
                written = recomputed.written,
                status = %recomputed.record.status,
                "recomputed"
            );
            print_json(&recomputed)?;
        }
        Command::Check => {
            let report = service.store().check_integrity()?;
            print_json(&report)?;
            if !report.is_healthy() {
                anyhow::bail!("integrity check found {} problem(s)", report.errors.len());
            }
        }
    }

    Ok(())
}
