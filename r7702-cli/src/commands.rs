//! Subcommand implementations.

use std::time::Duration;

use alloy_network::EthereumWallet;
use alloy_primitives::{Address, B256};
use alloy_signer_local::PrivateKeySigner;
use r7702::networks::network_by_chain_id;
use r7702::{
    AuthorizationDigest, AuthorizationRequest, AuthorizationSignature, DelegationStatus,
    build_authorization, sign_authorization_hash_with,
};
use r7702_chain::{
    ApprovalStatus, BatchTransferParams, DelegationOutcome, DelegationParams, HttpChainClient,
    ReadOnlyChainClient, delegation_status, ensure_approvals, execute_batch_transfer,
    setup_delegation,
};
use serde::Serialize;

use crate::cli::{Cli, Command};
use crate::config::Config;

type BoxError = Box<dyn std::error::Error>;

/// Loads configuration and runs the selected subcommand.
///
/// # Errors
///
/// Returns an error if configuration is incomplete, a chain call fails or a
/// flow does not reach its goal.
pub async fn run(cli: Cli) -> Result<(), BoxError> {
    let config = Config::load_from(&cli.config)?;
    tracing::debug!(path = %cli.config.display(), chain_id = config.chain_id, "Loaded configuration");

    match cli.command {
        Command::SetupDelegation { digest, gas_limit } => {
            setup(&config, digest, gas_limit).await
        }
        Command::Status { account } => status(&config, account).await,
        Command::Sign {
            nonce,
            chain_id,
            implementation,
            digest,
        } => {
            let signer = config.require_signer()?;
            let output = sign(
                &signer,
                chain_id.unwrap_or(config.chain_id),
                implementation.unwrap_or(config.implementation),
                nonce,
                digest.unwrap_or(config.digest),
            )?;
            #[allow(clippy::print_stdout)]
            {
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            Ok(())
        }
        Command::Approve { spender } => approve(&config, spender).await,
        Command::BatchTransfer { gas_limit } => batch_transfer(&config, gas_limit).await,
        Command::Guide => {
            guide();
            Ok(())
        }
    }
}

fn connect(config: &Config, signers: Vec<PrivateKeySigner>) -> Result<HttpChainClient, BoxError> {
    let url = config.require_rpc_url()?;
    let mut signers = signers.into_iter();
    let first = signers.next().ok_or("at least one signer is required")?;
    let mut wallet = EthereumWallet::from(first);
    for signer in signers {
        wallet.register_signer(signer);
    }
    let client = HttpChainClient::connect(&[(url, config.rpc_rate_limit)], wallet)?
        .with_receipt_timeout(Duration::from_secs(config.receipt_timeout_secs));
    Ok(client)
}

async fn setup(
    config: &Config,
    digest: Option<AuthorizationDigest>,
    gas_limit: Option<u64>,
) -> Result<(), BoxError> {
    let signer = config.require_signer()?;
    let network = network_by_chain_id(config.chain_id).map_or("unknown network", |n| n.name);
    tracing::info!(
        account = %signer.address(),
        chain_id = config.chain_id,
        network,
        implementation = %config.implementation,
        "Setting up delegation"
    );

    let params = DelegationParams::new(config.chain_id, config.implementation)
        .with_digest(digest.unwrap_or(config.digest))
        .with_gas_limit(gas_limit.unwrap_or(config.delegation.gas_limit));
    let client = connect(config, vec![signer.clone()])?;

    match setup_delegation(&client, &signer, &params).await? {
        DelegationOutcome::AlreadyDelegated => {
            tracing::info!("Account is already delegated, nothing to do");
            Ok(())
        }
        DelegationOutcome::Submitted {
            receipt, status, ..
        } => {
            tracing::info!(
                tx = %receipt.transaction_hash,
                block = ?receipt.block_number,
                gas_used = receipt.gas_used,
                "Delegation transaction mined"
            );
            if status.is_delegated() {
                tracing::info!("Delegation in effect; the account can now execute batches");
                Ok(())
            } else {
                Err(format!("delegation not in effect after inclusion: {status}").into())
            }
        }
    }
}

async fn status(config: &Config, account: Option<Address>) -> Result<(), BoxError> {
    let account = match account {
        Some(account) => account,
        None => config.require_signer()?.address(),
    };
    let url = config.require_rpc_url()?;
    let client = ReadOnlyChainClient::read_only(&[(url, config.rpc_rate_limit)])?;
    let status = delegation_status(&client, account, config.implementation).await?;
    match &status {
        DelegationStatus::Delegated => {
            tracing::info!(account = %account, implementation = %config.implementation, "Delegated");
        }
        DelegationStatus::NotDelegated => {
            tracing::info!(account = %account, "Not delegated");
        }
        DelegationStatus::DelegatedElsewhere(unexpected) => {
            tracing::warn!(
                account = %account,
                expected = %unexpected.expected,
                found = %unexpected.found,
                delegate = ?unexpected.delegate,
                "Account code does not match the implementation"
            );
        }
    }
    Ok(())
}

/// Offline authorization printed by `sign`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedOutput {
    /// Address of the signing account.
    pub signer: Address,
    /// The authorization request.
    pub request: AuthorizationRequest,
    /// Which digest was signed.
    pub digest_kind: AuthorizationDigest,
    /// The signed digest.
    pub digest: B256,
    /// The normalized signature.
    pub signature: AuthorizationSignature,
}

/// Builds and signs an authorization without touching the network.
///
/// # Errors
///
/// Returns an error if the request is invalid or signing fails.
pub fn sign(
    signer: &PrivateKeySigner,
    chain_id: u64,
    implementation: Address,
    nonce: u64,
    digest_kind: AuthorizationDigest,
) -> Result<SignedOutput, r7702::AuthorizationError> {
    let request = build_authorization(alloy_primitives::U256::from(chain_id), implementation, nonce)?;
    let digest = request.digest(digest_kind);
    let signature = sign_authorization_hash_with(signer, &digest)?;
    Ok(SignedOutput {
        signer: signer.address(),
        request,
        digest_kind,
        digest,
        signature,
    })
}

async fn approve(config: &Config, spender: Option<Address>) -> Result<(), BoxError> {
    let spender = match spender {
        Some(spender) => spender,
        None => config.require_signer()?.address(),
    };
    let (signers, grants) = config.approval_grants()?;
    if grants.is_empty() {
        tracing::warn!("No approvals configured");
        return Ok(());
    }
    tracing::info!(spender = %spender, grants = grants.len(), "Getting token approvals");

    let client = connect(config, signers)?;
    let reports = ensure_approvals(&client, spender, &grants).await;

    let mut failed = 0usize;
    for report in &reports {
        let grant = &report.grant;
        if let Some(balance) = report.balance {
            tracing::info!(owner = %grant.owner, token = %grant.symbol, balance = %grant.format(balance), "Balance");
        }
        match &report.result {
            Ok(ApprovalStatus::AlreadyApproved { allowance }) => {
                tracing::info!(owner = %grant.owner, token = %grant.symbol, allowance = %grant.format(*allowance), "Already approved");
            }
            Ok(ApprovalStatus::Approved { receipt }) => {
                tracing::info!(
                    owner = %grant.owner,
                    token = %grant.symbol,
                    amount = %grant.format(grant.amount),
                    tx = %receipt.transaction_hash,
                    block = ?receipt.block_number,
                    "Approved"
                );
            }
            Err(e) => {
                failed += 1;
                tracing::error!(owner = %grant.owner, token = %grant.symbol, error = %e, "Approval failed");
            }
        }
    }

    if failed > 0 {
        return Err(format!("{failed} of {} approvals failed", reports.len()).into());
    }
    tracing::info!("Approval process complete; the delegated account can now batch transfer approved tokens");
    Ok(())
}

async fn batch_transfer(config: &Config, gas_limit: Option<u64>) -> Result<(), BoxError> {
    let signer = config.require_signer()?;
    let account = signer.address();
    let mut params = BatchTransferParams::new(config.token_transfers()?);
    params.gas_limit = gas_limit.unwrap_or(config.batch.gas_limit);
    tracing::info!(account = %account, transfers = params.transfers.len(), "Executing batch transfer");

    let client = connect(config, vec![signer])?;
    let report = execute_batch_transfer(&client, account, &params).await?;
    tracing::info!(
        tx = %report.receipt.transaction_hash,
        block = ?report.receipt.block_number,
        gas_used = report.receipt.gas_used,
        average_gas_per_transfer = report.average_gas_per_transfer(),
        "Batch transfer confirmed"
    );
    Ok(())
}

const GUIDE: &[&str] = &[
    "EIP-7702 batch transfer approvals",
    "To use batch transfers, token owners approve the delegated account.",
    "Steps for owners:",
    "  1. Load the owner wallet",
    "  2. Approve the delegated account for each token: token.approve(delegatedAccount, amount)",
    "  3. The delegated account can then batch transfer on the owner's behalf",
    "Security notes:",
    "  - Only approve trusted delegated accounts",
    "  - Approve only the amount you want transferred",
    "  - Revoke approvals when no longer needed",
    "Configure owners under [[approvals]] and run `r7702 approve` to submit approvals.",
];

fn guide() {
    for line in GUIDE {
        tracing::info!("{line}");
    }
}
