//! Command-line arguments.

use std::path::PathBuf;

use alloy_primitives::Address;
use clap::{Parser, Subcommand};
use r7702::AuthorizationDigest;
use r7702::networks::ChainId;

use crate::config::DEFAULT_CONFIG_PATH;

/// EIP-7702 delegation, approvals and batch transfers.
#[derive(Parser, Debug)]
#[command(name = "r7702", version, about)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, short, env = "CONFIG", default_value = DEFAULT_CONFIG_PATH, global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Delegate the configured account to the implementation contract
    SetupDelegation {
        /// Digest to sign (`abi-tuple` or `eip7702`)
        #[arg(long)]
        digest: Option<AuthorizationDigest>,
        /// Gas limit of the delegation transaction
        #[arg(long)]
        gas_limit: Option<u64>,
    },
    /// Show whether an account is delegated to the implementation
    Status {
        /// Account to check; defaults to the configured account
        #[arg(long)]
        account: Option<Address>,
    },
    /// Build and sign an authorization offline and print it as JSON
    Sign {
        /// Authorization nonce
        #[arg(long)]
        nonce: u64,
        /// Chain ID; defaults to the configured chain
        #[arg(long)]
        chain_id: Option<ChainId>,
        /// Implementation address; defaults to the configured one
        #[arg(long)]
        implementation: Option<Address>,
        /// Digest to sign (`abi-tuple` or `eip7702`)
        #[arg(long)]
        digest: Option<AuthorizationDigest>,
    },
    /// Grant the configured token approvals to the delegated account
    Approve {
        /// Spender to approve; defaults to the configured account
        #[arg(long)]
        spender: Option<Address>,
    },
    /// Execute the configured transfers as one batch
    BatchTransfer {
        /// Gas limit of the batch transaction
        #[arg(long)]
        gas_limit: Option<u64>,
    },
    /// Print the approval guide for token owners
    Guide,
}
