//! `r7702` command-line tool.
//!
//! # Usage
//!
//! ```bash
//! # Delegate the account in PRIVATE_KEY to the default implementation
//! r7702 setup-delegation
//!
//! # Check delegation status of any account
//! r7702 status --account 0x...
//!
//! # Sign an authorization offline
//! r7702 sign --nonce 0 --digest eip7702
//!
//! # Use a custom config path and log level
//! RUST_LOG=debug r7702 --config ./r7702.toml approve
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to TOML configuration file (default: `r7702.toml`)
//! - `PRIVATE_KEY`, `RPC_URL`, `CHAIN_ID`, `SMART_ACCOUNT_IMPLEMENTATION` - Overrides
//! - `RUST_LOG` - Log level filter (default: `info`)
//!
//! A `.env` file in the working directory is loaded first.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use r7702_cli::cli::Cli;
use r7702_cli::commands;

#[tokio::main]
async fn main() {
    // Missing .env is fine; variables may come from the shell
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = commands::run(cli).await {
        tracing::error!("r7702 failed: {e}");
        std::process::exit(1);
    }
}
