//! Command-line driver for EIP-7702 delegated accounts.
//!
//! - [`config`] - TOML configuration with environment expansion and overrides
//! - [`cli`] - Argument parsing
//! - [`commands`] - One function per subcommand

pub mod cli;
pub mod commands;
pub mod config;
