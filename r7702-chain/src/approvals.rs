//! ERC-20 approvals granted by token owners to a delegated account.
//!
//! Before a delegated account can pull tokens with `transferFrom`, each owner
//! must approve it as a spender. [`ensure_approvals`] checks the current
//! allowance of every grant and only submits `approve` where it falls short.

use alloy_primitives::utils::format_units;
use alloy_primitives::{Address, Bytes, TxKind, U256};
use alloy_rpc_types_eth::{TransactionInput, TransactionRequest};
use alloy_sol_types::SolCall;

use crate::client::{ChainClient, ReceiptSummary};
use crate::contract::IERC20;
use crate::error::FlowError;

/// One owner's allowance for one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalGrant {
    /// Token owner; must be a signer known to the chain client.
    pub owner: Address,
    /// ERC-20 contract.
    pub token: Address,
    /// Display symbol.
    pub symbol: String,
    /// Token decimals, used to render amounts.
    pub decimals: u8,
    /// Required allowance in base units.
    pub amount: U256,
}

impl ApprovalGrant {
    /// Renders `value` in whole token units.
    #[must_use]
    pub fn format(&self, value: U256) -> String {
        format_units(value, self.decimals).unwrap_or_else(|_| value.to_string())
    }
}

/// What happened to a grant that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalStatus {
    /// The allowance already covered the amount.
    AlreadyApproved {
        /// The allowance that was found.
        allowance: U256,
    },
    /// An `approve` transaction was mined.
    Approved {
        /// Its receipt.
        receipt: ReceiptSummary,
    },
}

/// Per-grant result of [`ensure_approvals`].
#[derive(Debug)]
pub struct ApprovalReport {
    /// The grant this report is about.
    pub grant: ApprovalGrant,
    /// Owner's token balance, if it could be read.
    pub balance: Option<U256>,
    /// Outcome of the grant.
    pub result: Result<ApprovalStatus, FlowError>,
}

impl ApprovalReport {
    /// Whether the allowance is in place after the run.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

fn view_call(token: Address, data: Vec<u8>) -> TransactionRequest {
    TransactionRequest {
        to: Some(TxKind::Call(token)),
        input: TransactionInput::new(Bytes::from(data)),
        ..Default::default()
    }
}

fn decode_uint(contract: Address, data: &[u8]) -> Result<U256, FlowError> {
    if data.len() < 32 {
        return Err(FlowError::Decode {
            contract,
            reason: format!("expected a 32-byte word, got {} bytes", data.len()),
        });
    }
    Ok(U256::from_be_slice(&data[..32]))
}

/// Reads `allowance(owner, spender)` on `token`.
///
/// # Errors
///
/// Returns [`FlowError::Chain`] if the call fails and [`FlowError::Decode`]
/// if the return data is too short.
pub async fn read_allowance<C: ChainClient>(
    client: &C,
    token: Address,
    owner: Address,
    spender: Address,
) -> Result<U256, FlowError> {
    let data = IERC20::allowanceCall { owner, spender }.abi_encode();
    let output = client.call(view_call(token, data)).await?;
    decode_uint(token, &output)
}

/// Reads `balanceOf(account)` on `token`.
///
/// # Errors
///
/// Returns [`FlowError::Chain`] if the call fails and [`FlowError::Decode`]
/// if the return data is too short.
pub async fn read_balance<C: ChainClient>(
    client: &C,
    token: Address,
    account: Address,
) -> Result<U256, FlowError> {
    let data = IERC20::balanceOfCall { account }.abi_encode();
    let output = client.call(view_call(token, data)).await?;
    decode_uint(token, &output)
}

/// Builds `approve(spender, amount)` sent by `owner`.
#[must_use]
pub fn approve_request(
    owner: Address,
    token: Address,
    spender: Address,
    amount: U256,
) -> TransactionRequest {
    let data = IERC20::approveCall { spender, amount }.abi_encode();
    TransactionRequest {
        from: Some(owner),
        to: Some(TxKind::Call(token)),
        input: TransactionInput::new(Bytes::from(data)),
        ..Default::default()
    }
}

async fn ensure_one<C: ChainClient>(
    client: &C,
    spender: Address,
    grant: &ApprovalGrant,
) -> Result<ApprovalStatus, FlowError> {
    let allowance = read_allowance(client, grant.token, grant.owner, spender).await?;
    if allowance >= grant.amount {
        #[cfg(feature = "telemetry")]
        tracing::info!(
            owner = %grant.owner,
            token = %grant.symbol,
            allowance = %grant.format(allowance),
            "Allowance already sufficient"
        );
        return Ok(ApprovalStatus::AlreadyApproved { allowance });
    }

    #[cfg(feature = "telemetry")]
    tracing::info!(
        owner = %grant.owner,
        token = %grant.symbol,
        amount = %grant.format(grant.amount),
        spender = %spender,
        "Approving spender"
    );
    let tx = approve_request(grant.owner, grant.token, spender, grant.amount);
    let tx_hash = client.submit_transaction(tx).await?;
    let receipt = client.await_receipt(tx_hash).await?;
    if !receipt.status {
        return Err(FlowError::TransactionReverted(tx_hash));
    }
    Ok(ApprovalStatus::Approved { receipt })
}

/// Makes sure `spender` may pull each grant's amount from its owner.
///
/// Grants are processed in order. A failing grant is recorded in its report
/// and the remaining grants are still processed.
pub async fn ensure_approvals<C: ChainClient>(
    client: &C,
    spender: Address,
    grants: &[ApprovalGrant],
) -> Vec<ApprovalReport> {
    let mut reports = Vec::with_capacity(grants.len());
    for grant in grants {
        let balance = read_balance(client, grant.token, grant.owner).await;
        #[cfg(feature = "telemetry")]
        if let Err(e) = &balance {
            tracing::warn!(owner = %grant.owner, token = %grant.symbol, error = %e, "Could not read balance");
        }
        let balance = balance.ok();
        #[cfg(feature = "telemetry")]
        if let Some(balance) = balance.filter(|b| *b < grant.amount) {
            tracing::warn!(
                owner = %grant.owner,
                token = %grant.symbol,
                balance = %grant.format(balance),
                "Balance below approved amount"
            );
        }

        let result = ensure_one(client, spender, grant).await;
        #[cfg(feature = "telemetry")]
        if let Err(e) = &result {
            tracing::error!(owner = %grant.owner, token = %grant.symbol, error = %e, "Approval failed");
        }
        reports.push(ApprovalReport {
            grant: grant.clone(),
            balance,
            result,
        });
    }
    reports
}
