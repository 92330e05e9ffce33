//! revived — the Revive recovery daemon.
//!
//! Loads `revive.toml`, registers command-backed recovery methods and
//! probe-backed components, and runs the monitoring loop until Ctrl-C.
//!
//! # Usage
//!
//! ```text
//! revived run --config /etc/revive/revive.toml
//! revived run --config revive.toml --log-json
//! revived check --config revive.toml
//! ```

mod daemon;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info,revived=debug,revive=debug";

#[derive(Parser)]
#[command(name = "revived", about = "Revive recovery daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Monitor the configured components and recover them when unhealthy.
    Run {
        /// Path to the daemon config.
        #[arg(long, default_value = "revive.toml")]
        config: PathBuf,

        /// Emit logs as JSON lines.
        #[arg(long)]
        log_json: bool,
    },
    /// Parse and validate a config file without starting anything.
    Check {
        #[arg(long, default_value = "revive.toml")]
        config: PathBuf,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run { config, log_json } => {
            init_tracing(log_json);
            daemon::run(&config).await
        }
        Command::Check { config } => {
            init_tracing(false);
            let loaded = daemon::load_config(&config)?;
            println!("{}", daemon::summary(&loaded));
            Ok(())
        }
    }
}
