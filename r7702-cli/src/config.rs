//! Command-line configuration.
//!
//! Loads configuration from a TOML file with support for environment variable
//! expansion in string values. Variables use `$VAR` or `${VAR}` syntax.
//!
//! # Example Configuration
//!
//! ```toml
//! rpc_url = "https://sepolia.base.org"
//! private_key = "$PRIVATE_KEY"
//! chain_id = 84532
//! implementation = "0x000100abaad02f1cfc8bbe32bd5a564817339e72"
//! digest = "eip7702"
//! receipt_timeout_secs = 120
//!
//! [delegation]
//! gas_limit = 100000
//!
//! [batch]
//! gas_limit = 1000000
//!
//! [[approvals]]
//! owner_private_key = "${USER_KEY_1}"
//! tokens = [{ address = "0x036CbD53842c5426634e7929541eC2318f3dCF7e", amount = "100" }]
//!
//! [[transfers]]
//! token = "0x036CbD53842c5426634e7929541eC2318f3dCF7e"
//! from = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8"
//! to = "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC"
//! amount = "10"
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to configuration file (default: `r7702.toml`)
//! - `PRIVATE_KEY` - Override the delegating account's key
//! - `RPC_URL` - Override the RPC endpoint
//! - `CHAIN_ID` - Override the chain ID (decimal or `0x` hex)
//! - `SMART_ACCOUNT_IMPLEMENTATION` - Override the implementation address

use std::path::{Path, PathBuf};

use alloy_primitives::utils::{ParseUnits, parse_units};
use alloy_primitives::{Address, U256};
use alloy_signer_local::PrivateKeySigner;
use r7702::networks::{BASE_SEPOLIA, ChainId, DEFAULT_IMPLEMENTATION, network_by_chain_id};
use r7702::{AuthorizationDigest, AuthorizationError, parse_signing_key};
use r7702_chain::batch::DEFAULT_BATCH_GAS_LIMIT;
use r7702_chain::delegation::DEFAULT_DELEGATION_GAS_LIMIT;
use r7702_chain::{ApprovalGrant, TokenTransfer};
use serde::{Deserialize, Serialize};
use url::Url;

/// Default configuration file name.
pub const DEFAULT_CONFIG_PATH: &str = "r7702.toml";

/// Errors raised while loading or resolving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// Path of the file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The file is not valid TOML or does not match the schema.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// An environment override could not be parsed.
    #[error("invalid {name}: {reason}")]
    InvalidOverride {
        /// Variable name.
        name: &'static str,
        /// Parse failure.
        reason: String,
    },
    /// A required value is absent or still references an unset variable.
    #[error("missing {0} (set it in the config file or the environment)")]
    Missing(&'static str),
    /// The RPC URL is malformed.
    #[error("invalid rpc_url: {0}")]
    Url(#[from] url::ParseError),
    /// A private key is malformed.
    #[error(transparent)]
    Key(#[from] AuthorizationError),
    /// A token amount could not be converted to base units.
    #[error("invalid amount {amount:?}: {reason}")]
    Amount {
        /// The configured amount.
        amount: String,
        /// Conversion failure.
        reason: String,
    },
    /// Decimals were not configured and the token is not a known one.
    #[error("decimals for token {0} not configured and token is unknown on this chain")]
    UnknownDecimals(Address),
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP RPC endpoint URL.
    #[serde(default)]
    pub rpc_url: Option<String>,

    /// Requests per second allowed against the endpoint (unlimited if unset).
    #[serde(default)]
    pub rpc_rate_limit: Option<u32>,

    /// Private key of the account to delegate (hex, with or without `0x`).
    #[serde(default)]
    pub private_key: Option<String>,

    /// Chain the authorization is bound to (default: Base Sepolia).
    #[serde(default = "default_chain_id")]
    pub chain_id: ChainId,

    /// Delegation implementation contract.
    #[serde(default = "default_implementation")]
    pub implementation: Address,

    /// Digest the authorization is signed over.
    #[serde(default = "default_digest")]
    pub digest: AuthorizationDigest,

    /// Seconds to wait for a receipt before giving up.
    #[serde(default = "default_receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,

    /// Delegation transaction settings.
    #[serde(default)]
    pub delegation: DelegationSection,

    /// Batch transaction settings.
    #[serde(default)]
    pub batch: BatchSection,

    /// Token owners and the allowances they grant.
    #[serde(default)]
    pub approvals: Vec<ApprovalConfig>,

    /// Transfers executed by `batch-transfer`, in order.
    #[serde(default)]
    pub transfers: Vec<TransferConfig>,
}

/// `[delegation]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationSection {
    /// Gas limit of the delegation transaction.
    #[serde(default = "default_delegation_gas_limit")]
    pub gas_limit: u64,
}

impl Default for DelegationSection {
    fn default() -> Self {
        Self {
            gas_limit: default_delegation_gas_limit(),
        }
    }
}

/// `[batch]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSection {
    /// Gas limit of the batch transaction.
    #[serde(default = "default_batch_gas_limit")]
    pub gas_limit: u64,
}

impl Default for BatchSection {
    fn default() -> Self {
        Self {
            gas_limit: default_batch_gas_limit(),
        }
    }
}

/// One token owner in `[[approvals]]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalConfig {
    /// The owner's private key.
    pub owner_private_key: String,
    /// Tokens and amounts to approve.
    #[serde(default)]
    pub tokens: Vec<TokenAmount>,
}

/// A token and a human-readable amount.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenAmount {
    /// ERC-20 contract.
    pub address: Address,
    /// Amount in whole units, e.g. `"100"` or `"0.01"`.
    pub amount: String,
    /// Display symbol; looked up from known tokens if unset.
    #[serde(default)]
    pub symbol: Option<String>,
    /// Token decimals; looked up from known tokens if unset.
    #[serde(default)]
    pub decimals: Option<u8>,
}

/// One entry in `[[transfers]]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// ERC-20 contract.
    pub token: Address,
    /// Owner the tokens are pulled from.
    pub from: Address,
    /// Recipient.
    pub to: Address,
    /// Amount in whole units.
    pub amount: String,
    /// Token decimals; looked up from known tokens if unset.
    #[serde(default)]
    pub decimals: Option<u8>,
}

const fn default_chain_id() -> ChainId {
    BASE_SEPOLIA
}

const fn default_implementation() -> Address {
    DEFAULT_IMPLEMENTATION
}

const fn default_digest() -> AuthorizationDigest {
    AuthorizationDigest::Eip7702
}

const fn default_receipt_timeout_secs() -> u64 {
    120
}

const fn default_delegation_gas_limit() -> u64 {
    DEFAULT_DELEGATION_GAS_LIMIT
}

const fn default_batch_gas_limit() -> u64 {
    DEFAULT_BATCH_GAS_LIMIT
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: None,
            rpc_rate_limit: None,
            private_key: None,
            chain_id: default_chain_id(),
            implementation: default_implementation(),
            digest: default_digest(),
            receipt_timeout_secs: default_receipt_timeout_secs(),
            delegation: DelegationSection::default(),
            batch: BatchSection::default(),
            approvals: Vec::new(),
            transfers: Vec::new(),
        }
    }
}

impl Config {
    /// Loads configuration from `path`, using defaults if the file does not exist.
    ///
    /// String values are expanded from the process environment, then
    /// `PRIVATE_KEY`, `RPC_URL`, `CHAIN_ID` and `SMART_ACCOUNT_IMPLEMENTATION`
    /// override the file values.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or an override
    /// is malformed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = if path.exists() {
            std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            String::new()
        };
        Self::from_toml_str(&content, |name| std::env::var(name).ok())
    }

    /// Parses `content`, resolving variables and overrides through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or an override is malformed.
    pub fn from_toml_str<F>(content: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let expanded = expand_env_vars(content, &lookup);
        let mut config: Self = toml::from_str(&expanded)?;
        config.apply_overrides(&lookup)?;
        Ok(config)
    }

    fn apply_overrides<F>(&mut self, lookup: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("PRIVATE_KEY").filter(|v| !v.trim().is_empty()) {
            self.private_key = Some(key);
        }
        if let Some(url) = lookup("RPC_URL").filter(|v| !v.trim().is_empty()) {
            self.rpc_url = Some(url);
        }
        if let Some(chain_id) = lookup("CHAIN_ID").filter(|v| !v.trim().is_empty()) {
            self.chain_id =
                parse_chain_id(&chain_id).map_err(|reason| ConfigError::InvalidOverride {
                    name: "CHAIN_ID",
                    reason,
                })?;
        }
        if let Some(implementation) =
            lookup("SMART_ACCOUNT_IMPLEMENTATION").filter(|v| !v.trim().is_empty())
        {
            self.implementation = implementation
                .trim()
                .parse::<Address>()
                .map_err(|e| ConfigError::InvalidOverride {
                    name: "SMART_ACCOUNT_IMPLEMENTATION",
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }

    /// The signer of the delegating account.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if no key is configured and
    /// [`ConfigError::Key`] if it is malformed.
    pub fn require_signer(&self) -> Result<PrivateKeySigner, ConfigError> {
        let key = resolved(self.private_key.as_deref()).ok_or(ConfigError::Missing("PRIVATE_KEY"))?;
        Ok(parse_signing_key(key)?)
    }

    /// The RPC endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if no URL is configured and
    /// [`ConfigError::Url`] if it is malformed.
    pub fn require_rpc_url(&self) -> Result<Url, ConfigError> {
        let url = resolved(self.rpc_url.as_deref()).ok_or(ConfigError::Missing("RPC_URL"))?;
        Ok(Url::parse(url)?)
    }

    /// Owner signers and their grants, with amounts in base units.
    ///
    /// # Errors
    ///
    /// Returns an error if a key, amount or token's decimals cannot be resolved.
    pub fn approval_grants(&self) -> Result<(Vec<PrivateKeySigner>, Vec<ApprovalGrant>), ConfigError> {
        let mut signers = Vec::with_capacity(self.approvals.len());
        let mut grants = Vec::new();
        for owner in &self.approvals {
            let key = resolved(Some(&owner.owner_private_key))
                .ok_or(ConfigError::Missing("owner_private_key"))?;
            let signer = parse_signing_key(key)?;
            for token in &owner.tokens {
                let known = self.known_token(token.address);
                let decimals = token
                    .decimals
                    .or(known.map(|(_, decimals)| decimals))
                    .ok_or(ConfigError::UnknownDecimals(token.address))?;
                let symbol = token
                    .symbol
                    .clone()
                    .or_else(|| known.map(|(symbol, _)| symbol.to_owned()))
                    .unwrap_or_else(|| token.address.to_string());
                grants.push(ApprovalGrant {
                    owner: signer.address(),
                    token: token.address,
                    symbol,
                    decimals,
                    amount: to_base_units(&token.amount, decimals)?,
                });
            }
            signers.push(signer);
        }
        Ok((signers, grants))
    }

    /// The configured transfers with amounts in base units.
    ///
    /// # Errors
    ///
    /// Returns an error if an amount or a token's decimals cannot be resolved.
    pub fn token_transfers(&self) -> Result<Vec<TokenTransfer>, ConfigError> {
        self.transfers
            .iter()
            .map(|t| {
                let decimals = t
                    .decimals
                    .or(self.known_token(t.token).map(|(_, decimals)| decimals))
                    .ok_or(ConfigError::UnknownDecimals(t.token))?;
                Ok(TokenTransfer {
                    token: t.token,
                    from: t.from,
                    to: t.to,
                    amount: to_base_units(&t.amount, decimals)?,
                })
            })
            .collect()
    }

    fn known_token(&self, address: Address) -> Option<(&'static str, u8)> {
        network_by_chain_id(self.chain_id)
            .and_then(|network| network.find_token(address).map(|t| (t.symbol, t.decimals)))
    }
}

/// Returns the value unless it is blank or still an unexpanded `$VAR`.
fn resolved(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.starts_with('$'))
}

fn parse_chain_id(value: &str) -> Result<ChainId, String> {
    let value = value.trim();
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => ChainId::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|e| e.to_string())
}

fn to_base_units(amount: &str, decimals: u8) -> Result<U256, ConfigError> {
    let invalid = |reason: String| ConfigError::Amount {
        amount: amount.to_owned(),
        reason,
    };
    match parse_units(amount.trim(), decimals).map_err(|e| invalid(e.to_string()))? {
        ParseUnits::U256(value) => Ok(value),
        ParseUnits::I256(_) => Err(invalid("amount must be non-negative".into())),
    }
}

/// Expands `$VAR` and `${VAR}` patterns in a string via `lookup`.
///
/// Unresolved variables are left as-is.
fn expand_env_vars<F>(input: &str, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }
        let braced = chars.next_if_eq(&'{').is_some();

        let mut var_name = String::new();
        let mut closed = false;
        while let Some(&c) = chars.peek() {
            if braced {
                if c == '}' {
                    chars.next();
                    closed = true;
                    break;
                }
            } else if !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            var_name.push(c);
            chars.next();
        }

        match lookup(&var_name).filter(|_| !var_name.is_empty()) {
            Some(value) => result.push_str(&value),
            None => {
                result.push('$');
                if braced {
                    result.push('{');
                }
                result.push_str(&var_name);
                if closed {
                    result.push('}');
                }
            }
        }
    }

    result
}
