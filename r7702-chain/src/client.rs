//! The chain-client seam the flows are written against.

use std::sync::Arc;

use alloy_primitives::{Address, Bytes, TxHash};
use alloy_rpc_types_eth::TransactionRequest;

use crate::error::ChainError;

/// Outcome of a mined transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptSummary {
    /// Hash of the transaction.
    pub transaction_hash: TxHash,
    /// `true` if execution succeeded.
    pub status: bool,
    /// Block the transaction was included in.
    pub block_number: Option<u64>,
    /// Gas consumed by the transaction.
    pub gas_used: u64,
}

/// Account queries, transaction submission and receipt retrieval.
///
/// Implementations hold no delegation state; every call reflects the node's
/// view at the time it is made.
pub trait ChainClient: Send + Sync {
    /// Returns the network's chain ID.
    fn chain_id(&self) -> impl Future<Output = Result<u64, ChainError>> + Send;

    /// Returns the code at `address`; empty for plain accounts.
    fn get_account_code(
        &self,
        address: Address,
    ) -> impl Future<Output = Result<Bytes, ChainError>> + Send;

    /// Returns the transaction count (nonce) of `address`.
    fn get_transaction_count(
        &self,
        address: Address,
    ) -> impl Future<Output = Result<u64, ChainError>> + Send;

    /// Executes a read-only call and returns its output.
    fn call(&self, tx: TransactionRequest)
    -> impl Future<Output = Result<Bytes, ChainError>> + Send;

    /// Signs and submits a transaction, returning its hash.
    fn submit_transaction(
        &self,
        tx: TransactionRequest,
    ) -> impl Future<Output = Result<TxHash, ChainError>> + Send;

    /// Waits, with a bounded timeout, for the receipt of `tx_hash`.
    fn await_receipt(
        &self,
        tx_hash: TxHash,
    ) -> impl Future<Output = Result<ReceiptSummary, ChainError>> + Send;
}

impl<T: ChainClient> ChainClient for Arc<T> {
    fn chain_id(&self) -> impl Future<Output = Result<u64, ChainError>> + Send {
        (**self).chain_id()
    }

    fn get_account_code(
        &self,
        address: Address,
    ) -> impl Future<Output = Result<Bytes, ChainError>> + Send {
        (**self).get_account_code(address)
    }

    fn get_transaction_count(
        &self,
        address: Address,
    ) -> impl Future<Output = Result<u64, ChainError>> + Send {
        (**self).get_transaction_count(address)
    }

    fn call(
        &self,
        tx: TransactionRequest,
    ) -> impl Future<Output = Result<Bytes, ChainError>> + Send {
        (**self).call(tx)
    }

    fn submit_transaction(
        &self,
        tx: TransactionRequest,
    ) -> impl Future<Output = Result<TxHash, ChainError>> + Send {
        (**self).submit_transaction(tx)
    }

    fn await_receipt(
        &self,
        tx_hash: TxHash,
    ) -> impl Future<Output = Result<ReceiptSummary, ChainError>> + Send {
        (**self).await_receipt(tx_hash)
    }
}
