//! dsmz - Command-line access to the DSMZ BacDive and LPSN APIs
//!
//! Runs one search, retrieves every matching record concurrently and writes
//! them as JSON lines.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "dsmz")]
#[command(about = "Retrieve BacDive strains and LPSN names as JSON lines")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./dsmz.toml or ~/.config/dsmz/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Use the internal development APIs instead of the public ones
    #[arg(long, global = true)]
    dev: bool,

    /// Maximum attempts per request
    #[arg(long, global = true)]
    max_retries: Option<u32>,

    /// Maximum simultaneous requests
    #[arg(long, global = true)]
    max_in_flight: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Search and retrieve BacDive strains
    Bacdive(cmd::bacdive::BacdiveArgs),
    /// Search and retrieve LPSN records
    Lpsn(cmd::lpsn::LpsnArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let progress = dsmz_core::ProgressContext::new();

    // TTY: progress bar shows activity, logs quiet unless --debug
    // non-TTY: logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = is_tty && !cli.debug;
    dsmz_core::init_logging(quiet, cli.debug, multi)?;

    let mut config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    // CLI flags override the config file
    if let Some(n) = cli.max_retries {
        config.http.max_retries = n;
    }
    if let Some(n) = cli.max_in_flight {
        config.http.max_in_flight = n;
    }
    let deployment = dsmz_core::Deployment::from_dev_flag(cli.dev);

    match cli.command {
        Command::Bacdive(args) => cmd::bacdive::run(args, &config, deployment, &progress),
        Command::Lpsn(args) => cmd::lpsn::run(args, &config, deployment, &progress),
        Command::Config => {
            cmd::show_config(&config, deployment);
            Ok(())
        }
    }
}
