//! Batched token transfers executed by a delegated account.
//!
//! Every transfer becomes a `transferFrom(from, to, amount)` call on its
//! token. The calls are wrapped in a single `executeBatch` sent by the
//! delegated account to itself, so the delegation implementation runs them
//! in order within one transaction.

use alloy_primitives::{Address, Bytes, TxKind, U256};
use alloy_rpc_types_eth::{TransactionInput, TransactionRequest};
use alloy_sol_types::SolCall;
use r7702::DelegationMarker;

use crate::client::{ChainClient, ReceiptSummary};
use crate::contract::{IBatchExecutor, IERC20};
use crate::error::FlowError;

/// Gas limit of a batch transaction.
pub const DEFAULT_BATCH_GAS_LIMIT: u64 = 1_000_000;

/// A pull of `amount` of `token` from `from` to `to`.
///
/// `from` must have approved the delegated account for at least `amount`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenTransfer {
    /// ERC-20 contract.
    pub token: Address,
    /// Owner the tokens are pulled from.
    pub from: Address,
    /// Recipient.
    pub to: Address,
    /// Amount in base units.
    pub amount: U256,
}

impl TokenTransfer {
    /// The `transferFrom` call on the token, with zero value.
    #[must_use]
    pub fn as_call(&self) -> IBatchExecutor::Call {
        let data = IERC20::transferFromCall {
            from: self.from,
            to: self.to,
            amount: self.amount,
        }
        .abi_encode();
        IBatchExecutor::Call {
            target: self.token,
            value: U256::ZERO,
            data: Bytes::from(data),
        }
    }
}

/// Encodes `executeBatch` calldata for `transfers`, preserving order.
#[must_use]
pub fn encode_batch(transfers: &[TokenTransfer]) -> Bytes {
    let calls = transfers.iter().map(TokenTransfer::as_call).collect();
    Bytes::from(IBatchExecutor::executeBatchCall { calls }.abi_encode())
}

/// Inputs to [`execute_batch_transfer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchTransferParams {
    /// Transfers in execution order.
    pub transfers: Vec<TokenTransfer>,
    /// Gas limit of the batch transaction.
    pub gas_limit: u64,
}

impl BatchTransferParams {
    /// Parameters with the default gas limit.
    #[must_use]
    pub const fn new(transfers: Vec<TokenTransfer>) -> Self {
        Self {
            transfers,
            gas_limit: DEFAULT_BATCH_GAS_LIMIT,
        }
    }
}

/// Result of a mined batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    /// Receipt of the batch transaction.
    pub receipt: ReceiptSummary,
    /// Number of transfers in the batch.
    pub transfer_count: usize,
    /// Implementation the account was delegated to when the batch was sent.
    pub delegate: Address,
}

impl BatchReport {
    /// Gas used divided by the number of transfers, rounded down.
    #[must_use]
    pub fn average_gas_per_transfer(&self) -> u64 {
        u64::try_from(self.transfer_count)
            .ok()
            .filter(|n| *n > 0)
            .map_or(0, |n| self.receipt.gas_used / n)
    }
}

/// Sends `params.transfers` as one `executeBatch` from `account` to itself.
///
/// # Errors
///
/// - [`FlowError::EmptyBatch`] if there is nothing to transfer
/// - [`FlowError::AccountNotDelegated`] if the account's code is not a delegation marker
/// - [`FlowError::Chain`] if a query or the submission fails
/// - [`FlowError::TransactionReverted`] if the batch was mined but failed
pub async fn execute_batch_transfer<C: ChainClient>(
    client: &C,
    account: Address,
    params: &BatchTransferParams,
) -> Result<BatchReport, FlowError> {
    if params.transfers.is_empty() {
        return Err(FlowError::EmptyBatch);
    }

    let code = client.get_account_code(account).await?;
    let delegate = DelegationMarker::parse(&code)
        .ok_or(FlowError::AccountNotDelegated(account))?
        .implementation();

    #[cfg(feature = "telemetry")]
    tracing::info!(
        account = %account,
        delegate = %delegate,
        transfers = params.transfers.len(),
        gas_limit = params.gas_limit,
        "Submitting batch transfer"
    );

    let tx = TransactionRequest {
        from: Some(account),
        to: Some(TxKind::Call(account)),
        value: Some(U256::ZERO),
        gas: Some(params.gas_limit),
        input: TransactionInput::new(encode_batch(&params.transfers)),
        ..Default::default()
    };
    let tx_hash = client.submit_transaction(tx).await?;
    let receipt = client.await_receipt(tx_hash).await?;
    if !receipt.status {
        return Err(FlowError::TransactionReverted(tx_hash));
    }

    let report = BatchReport {
        receipt,
        transfer_count: params.transfers.len(),
        delegate,
    };
    #[cfg(feature = "telemetry")]
    tracing::info!(
        tx = %tx_hash,
        block = ?receipt.block_number,
        gas_used = receipt.gas_used,
        average_gas = report.average_gas_per_transfer(),
        "Batch transfer confirmed"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockChainClient;
    use alloy_primitives::address;

    const ACCOUNT: Address = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");
    const IMPL: Address = address!("000100abaad02f1cfc8bbe32bd5a564817339e72");
    const USDC: Address = address!("036cbd53842c5426634e7929541ec2318f3dcf7e");
    const WETH: Address = address!("4200000000000000000000000000000000000006");
    const ALICE: Address = address!("70997970c51812dc3a010c7d01b50e0d17dc79c8");
    const BOB: Address = address!("3c44cdddb6a900fa2b585dd299e03d12fa4293bc");

    fn transfers() -> Vec<TokenTransfer> {
        vec![
            TokenTransfer {
                token: USDC,
                from: ALICE,
                to: BOB,
                amount: U256::from(1_000_000),
            },
            TokenTransfer {
                token: WETH,
                from: BOB,
                to: ALICE,
                amount: U256::from(5u64) * U256::from(10u64).pow(U256::from(15)),
            },
        ]
    }

    #[test]
    fn test_transfer_call_shape() {
        let call = transfers()[0].as_call();
        assert_eq!(call.target, USDC);
        assert_eq!(call.value, U256::ZERO);
        assert_eq!(&call.data[..4], IERC20::transferFromCall::SELECTOR.as_slice());
        let decoded = IERC20::transferFromCall::abi_decode(&call.data).unwrap();
        assert_eq!(decoded.from, ALICE);
        assert_eq!(decoded.to, BOB);
        assert_eq!(decoded.amount, U256::from(1_000_000));
    }

    #[test]
    fn test_encode_batch_preserves_order() {
        let data = encode_batch(&transfers());
        let decoded = IBatchExecutor::executeBatchCall::abi_decode(&data).unwrap();
        assert_eq!(decoded.calls.len(), 2);
        assert_eq!(decoded.calls[0].target, USDC);
        assert_eq!(decoded.calls[1].target, WETH);
        assert_eq!(decoded.calls[1].data, transfers()[1].as_call().data);
    }

    #[tokio::test]
    async fn test_refuses_undelegated_account() {
        let client = MockChainClient::new(8453);
        let err = execute_batch_transfer(&client, ACCOUNT, &BatchTransferParams::new(transfers()))
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::AccountNotDelegated(a) if a == ACCOUNT));
        assert!(client.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_refuses_contract_code() {
        let client = MockChainClient::new(8453);
        client.set_code(ACCOUNT, vec![0x60, 0x80, 0x60, 0x40]);
        let err = execute_batch_transfer(&client, ACCOUNT, &BatchTransferParams::new(transfers()))
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::AccountNotDelegated(_)));
    }

    #[tokio::test]
    async fn test_empty_batch_rejected() {
        let client = MockChainClient::new(8453);
        let err = execute_batch_transfer(&client, ACCOUNT, &BatchTransferParams::new(vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::EmptyBatch));
    }

    #[tokio::test]
    async fn test_batch_submitted_to_self() {
        let client = MockChainClient::new(8453).with_gas_used(120_000);
        client.set_code(ACCOUNT, DelegationMarker::new(IMPL).to_code());

        let report = execute_batch_transfer(&client, ACCOUNT, &BatchTransferParams::new(transfers()))
            .await
            .unwrap();
        assert_eq!(report.transfer_count, 2);
        assert_eq!(report.delegate, IMPL);
        assert_eq!(report.average_gas_per_transfer(), 60_000);

        let submitted = client.submitted();
        assert_eq!(submitted.len(), 1);
        let tx = &submitted[0];
        assert_eq!(tx.from, Some(ACCOUNT));
        assert_eq!(tx.to, Some(TxKind::Call(ACCOUNT)));
        assert_eq!(tx.gas, Some(DEFAULT_BATCH_GAS_LIMIT));
        assert_eq!(tx.input.input(), Some(&encode_batch(&transfers())));
    }

    #[tokio::test]
    async fn test_reverted_batch() {
        let client = MockChainClient::new(8453);
        client.set_code(ACCOUNT, DelegationMarker::new(IMPL).to_code());
        client.revert_submissions();
        let err = execute_batch_transfer(&client, ACCOUNT, &BatchTransferParams::new(transfers()))
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::TransactionReverted(_)));
    }

    #[test]
    fn test_average_gas_with_no_transfers() {
        let report = BatchReport {
            receipt: ReceiptSummary {
                transaction_hash: Default::default(),
                status: true,
                block_number: None,
                gas_used: 50_000,
            },
            transfer_count: 0,
            delegate: IMPL,
        };
        assert_eq!(report.average_gas_per_transfer(), 0);
    }
}
