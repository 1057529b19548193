//! One-shot delegation of an externally-owned account.
//!
//! [`setup_delegation`] runs the whole procedure for one account: it checks
//! the account's current code, reads the nonce, signs an authorization for
//! the implementation, submits a type-4 transaction carrying it and then
//! re-reads the code to classify the outcome.
//!
//! The nonce is read once and the transaction is submitted right after
//! signing. Another transaction from the same account landing in between
//! makes the authorization stale; the node then skips it and the final
//! status reports the account as not delegated.

use alloy_eips::eip7702::SignedAuthorization;
use alloy_primitives::{Address, TxKind, U256};
use alloy_rpc_types_eth::TransactionRequest;
use alloy_signer_local::PrivateKeySigner;
use r7702::networks::{ChainId, DEFAULT_IMPLEMENTATION};
use r7702::{
    AuthorizationDigest, DelegationStatus, build_authorization, sign_authorization_hash_with,
    verify_delegation,
};

use crate::client::{ChainClient, ReceiptSummary};
use crate::error::FlowError;

/// Gas limit of the delegation transaction.
pub const DEFAULT_DELEGATION_GAS_LIMIT: u64 = 100_000;

/// EIP-2718 type of set-code transactions.
pub const EIP7702_TX_TYPE: u8 = 4;

/// Inputs to [`setup_delegation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelegationParams {
    /// Chain the authorization is bound to. Must match the node.
    pub chain_id: ChainId,
    /// Contract the account delegates to.
    pub implementation: Address,
    /// Digest the authorization signature is computed over.
    pub digest: AuthorizationDigest,
    /// Gas limit of the delegation transaction.
    pub gas_limit: u64,
}

impl DelegationParams {
    /// Parameters with the default gas limit, signing the EIP-7702 digest
    /// that network validators recover the authority from.
    #[must_use]
    pub const fn new(chain_id: ChainId, implementation: Address) -> Self {
        Self {
            chain_id,
            implementation,
            digest: AuthorizationDigest::Eip7702,
            gas_limit: DEFAULT_DELEGATION_GAS_LIMIT,
        }
    }

    /// Sets the digest kind.
    #[must_use]
    pub const fn with_digest(mut self, digest: AuthorizationDigest) -> Self {
        self.digest = digest;
        self
    }

    /// Sets the gas limit.
    #[must_use]
    pub const fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }
}

impl Default for DelegationParams {
    fn default() -> Self {
        Self::new(r7702::networks::BASE_SEPOLIA, DEFAULT_IMPLEMENTATION)
    }
}

/// The self-addressed transaction that carries an authorization.
///
/// Sent from and to the delegating account, with zero value and empty data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegationTransaction {
    /// The delegating account, both sender and recipient.
    pub account: Address,
    /// Signed authorization entries.
    pub authorization_list: Vec<SignedAuthorization>,
    /// Gas limit.
    pub gas_limit: u64,
}

impl DelegationTransaction {
    /// Builds the RPC request. Nonce and fees are left to the client.
    #[must_use]
    pub fn into_request(self) -> TransactionRequest {
        TransactionRequest {
            from: Some(self.account),
            to: Some(TxKind::Call(self.account)),
            value: Some(U256::ZERO),
            gas: Some(self.gas_limit),
            authorization_list: Some(self.authorization_list),
            transaction_type: Some(EIP7702_TX_TYPE),
            ..Default::default()
        }
    }
}

/// Result of [`setup_delegation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DelegationOutcome {
    /// The account was already delegated to the implementation; nothing was sent.
    AlreadyDelegated,
    /// A delegation transaction was mined.
    Submitted {
        /// Receipt of the delegation transaction.
        receipt: ReceiptSummary,
        /// The authorization that was attached.
        authorization: SignedAuthorization,
        /// Delegation state read back after inclusion.
        status: DelegationStatus,
    },
}

impl DelegationOutcome {
    /// Whether the account ends up delegated to the expected implementation.
    #[must_use]
    pub const fn is_delegated(&self) -> bool {
        match self {
            Self::AlreadyDelegated => true,
            Self::Submitted { status, .. } => status.is_delegated(),
        }
    }
}

/// Reads the code of `account` and classifies it against `implementation`.
///
/// # Errors
///
/// Returns [`FlowError::Chain`] if the code cannot be read.
pub async fn delegation_status<C: ChainClient>(
    client: &C,
    account: Address,
    implementation: Address,
) -> Result<DelegationStatus, FlowError> {
    let code = client.get_account_code(account).await?;
    Ok(verify_delegation(&code, implementation))
}

/// Delegates the signer's account to `params.implementation`.
///
/// Returns [`DelegationOutcome::AlreadyDelegated`] without signing anything
/// when the account's code already equals the expected marker. An account
/// delegated to a different implementation is re-delegated.
///
/// With [`AuthorizationDigest::Eip7702`] the authorization nonce is the
/// account nonce plus one, since the account also pays for the transaction
/// and its nonce is incremented before the authorization list is processed.
///
/// # Errors
///
/// - [`FlowError::ChainIdMismatch`] if the node serves another chain
/// - [`FlowError::Authorization`] if the request is invalid or signing fails
/// - [`FlowError::Chain`] if a query fails or the node rejects the transaction
/// - [`FlowError::TransactionReverted`] if the transaction was mined but failed
pub async fn setup_delegation<C: ChainClient>(
    client: &C,
    signer: &PrivateKeySigner,
    params: &DelegationParams,
) -> Result<DelegationOutcome, FlowError> {
    let account = signer.address();

    let network = client.chain_id().await?;
    if network != params.chain_id {
        return Err(FlowError::ChainIdMismatch {
            configured: params.chain_id,
            network,
        });
    }

    let initial = delegation_status(client, account, params.implementation).await?;
    if initial.is_delegated() {
        #[cfg(feature = "telemetry")]
        tracing::info!(account = %account, implementation = %params.implementation, "Account already delegated");
        return Ok(DelegationOutcome::AlreadyDelegated);
    }
    #[cfg(feature = "telemetry")]
    if let DelegationStatus::DelegatedElsewhere(unexpected) = &initial {
        tracing::warn!(account = %account, found = %unexpected.found, "Account has other code, re-delegating");
    }

    let account_nonce = client.get_transaction_count(account).await?;
    let nonce = match params.digest {
        AuthorizationDigest::AbiTuple => account_nonce,
        AuthorizationDigest::Eip7702 => account_nonce.saturating_add(1),
    };
    let request = build_authorization(U256::from(params.chain_id), params.implementation, nonce)?;
    let digest = request.digest(params.digest);
    let signature = sign_authorization_hash_with(signer, &digest)?;
    let authorization = request.signed(&signature);

    #[cfg(feature = "telemetry")]
    tracing::info!(
        account = %account,
        chain_id = params.chain_id,
        implementation = %params.implementation,
        nonce,
        digest_kind = %params.digest,
        "Submitting delegation transaction"
    );

    let tx = DelegationTransaction {
        account,
        authorization_list: vec![authorization.clone()],
        gas_limit: params.gas_limit,
    };
    let tx_hash = client.submit_transaction(tx.into_request()).await?;
    let receipt = client.await_receipt(tx_hash).await?;
    if !receipt.status {
        return Err(FlowError::TransactionReverted(tx_hash));
    }

    let status = delegation_status(client, account, params.implementation).await?;
    #[cfg(feature = "telemetry")]
    match &status {
        DelegationStatus::Delegated => {
            tracing::info!(account = %account, tx = %tx_hash, block = ?receipt.block_number, "Delegation confirmed");
        }
        other => {
            tracing::warn!(account = %account, tx = %tx_hash, status = %other, "Delegation not in effect after inclusion");
        }
    }

    Ok(DelegationOutcome::Submitted {
        receipt,
        authorization,
        status,
    })
}
