//! Batch NFT minter.
//!
//! Configure by editing the settings (TOML) and secrets (JSON) files, then run one of
//! `minter --single`, `minter --multi` or `minter --newacc`.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use anyhow::Context;
use clap::{ArgGroup, Parser};
use ethers::utils::to_checksum;
use batch_minter::{
    accounts::load_master,
    config::{Config, Secrets},
    minter::{generate_account, AutoConfirm, Minter, RunOutcome, RunPlan, RunReport},
    utils::logging::init_logging,
    RpcChainClient,
};

/// Directory the log file is written to when LOGGING is on
const LOG_DIR: &str = "logs";

#[derive(Parser, Debug)]
#[command(name = "minter", version, about = "Mint NFTs in a batch from a single account or from many derived accounts")]
#[command(group(ArgGroup::new("mode").required(true).args(["single", "multi", "newacc"])))]
struct Cli {
    /// Single mode: the master account mints everything
    #[arg(long)]
    single: bool,

    /// Multi mode: derive accounts from the master account and mint from them
    #[arg(long)]
    multi: bool,

    /// Generate a new account, display its key and quit
    #[arg(long)]
    newacc: bool,

    /// Settings file
    #[arg(long, value_name = "FILE", default_value = "settings.toml")]
    settings: PathBuf,

    /// Secrets file holding PRIVATE_KEY and PROVIDER
    #[arg(long, value_name = "FILE", default_value = "secrets.json")]
    secrets: PathBuf,

    /// Run without asking for confirmation
    #[arg(short, long)]
    yes: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.newacc {
        // the settings only decide whether the key also goes to a log file
        let logging = Config::load(&cli.settings).map(|c| c.settings.logging).unwrap_or(false);
        start_logging(logging)?;
        let report = generate_account()?;
        println!("Address: {}", to_checksum(&report.master.address, None));
        println!("PRIVATE KEY: {}", report.master.secret_hex());
        return Ok(());
    }

    let config = Config::load(&cli.settings)
        .with_context(|| format!("Failed to load settings from {}", cli.settings.display()))?;
    let secrets = Secrets::load(&cli.secrets)
        .with_context(|| format!("Failed to load secrets from {}", cli.secrets.display()))?;
    start_logging(config.settings.logging)?;

    let master = load_master(&secrets.private_key)?;
    let chain = RpcChainClient::new(secrets.provider.clone(), config.chain_id)?;
    let minter = Minter::new(&chain, &config);

    println!("======================= NFT-MINTER =======================");
    let report = match (cli.single, cli.yes) {
        (true, true) => minter.run_single(&master, &mut AutoConfirm).await?,
        (true, false) => minter.run_single(&master, &mut |plan: &RunPlan| prompt(plan, &config)).await?,
        (false, true) => minter.run_multi(&master, &mut AutoConfirm).await?,
        (false, false) => minter.run_multi(&master, &mut |plan: &RunPlan| prompt(plan, &config)).await?,
    };
    print_report(&report);
    Ok(())
}

fn start_logging(to_file: bool) -> anyhow::Result<()> {
    let dir = to_file.then(|| Path::new(LOG_DIR));
    if let Some(path) = init_logging(dir).context("Failed to set up logging")? {
        println!("Logging to {}", path.display());
    }
    Ok(())
}

/// Show the plan and ask the operator
fn prompt(plan: &RunPlan, config: &Config) -> bool {
    for line in plan.summary(config) {
        println!("{}", line);
    }
    print!("Run? Enter y for yes ");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    let run = matches!(answer.trim(), "y" | "Y");
    println!("{}", if run { "Running..." } else { "Not executed." });
    run
}

fn print_report(report: &RunReport) {
    if report.outcome == RunOutcome::Declined {
        return;
    }
    for (i, address) in report.accounts.iter().enumerate() {
        println!("Account ({}): {}", i + 1, to_checksum(address, None));
    }
    for (step, batch) in &report.batches {
        println!(
            "[{}] submitted: {}, failed: {}, skipped: {}",
            step,
            batch.submitted_count(),
            batch.failed_count(),
            batch.skipped_count()
        );
        for tx in batch.submitted() {
            println!("  {} -> {}  {:?}", tx.sender, tx.receiver, tx.hash);
        }
    }
}
