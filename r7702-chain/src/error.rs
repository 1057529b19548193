//! Error types for chain access and the delegation flows.

use std::time::Duration;

use alloy_primitives::{Address, TxHash};
use alloy_transport::TransportError;
use r7702::AuthorizationError;

/// Errors raised by a [`ChainClient`](crate::ChainClient).
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// RPC transport error.
    #[error(transparent)]
    Transport(TransportError),
    /// The node refused the request, e.g. a transaction with a stale nonce.
    ///
    /// The node's message is kept verbatim.
    #[error("rejected by node (code {code}): {message}")]
    Rejected {
        /// JSON-RPC error code.
        code: i64,
        /// JSON-RPC error message.
        message: String,
    },
    /// No receipt appeared within the configured wait.
    #[error("no receipt for transaction {tx_hash} after {timeout:?}")]
    ReceiptTimeout {
        /// The submitted transaction.
        tx_hash: TxHash,
        /// How long the client waited.
        timeout: Duration,
    },
    /// Client setup failed.
    #[error("{0}")]
    Custom(String),
}

impl From<TransportError> for ChainError {
    fn from(e: TransportError) -> Self {
        match e.as_error_resp() {
            Some(payload) => Self::Rejected {
                code: payload.code,
                message: payload.message.to_string(),
            },
            None => Self::Transport(e),
        }
    }
}

/// Errors raised by the delegation, approval and batch-transfer flows.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// Building or signing the authorization failed.
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
    /// The chain client failed; submission rejections are passed through unchanged.
    #[error(transparent)]
    Chain(#[from] ChainError),
    /// The configured chain ID is not the network's.
    #[error("configured chain id {configured} does not match network chain id {network}")]
    ChainIdMismatch {
        /// Chain ID from the flow parameters.
        configured: u64,
        /// Chain ID reported by the node.
        network: u64,
    },
    /// The account's code is not a delegation marker.
    #[error("account {0} is not delegated")]
    AccountNotDelegated(Address),
    /// The transaction was mined but reverted.
    #[error("transaction {0} reverted")]
    TransactionReverted(TxHash),
    /// A contract returned data that could not be decoded.
    #[error("malformed return data from {contract}: {reason}")]
    Decode {
        /// The contract that was called.
        contract: Address,
        /// What was wrong with the data.
        reason: String,
    },
    /// A batch with no transfers was requested.
    #[error("batch contains no transfers")]
    EmptyBatch,
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_json_rpc::ErrorPayload;
    use alloy_transport::TransportErrorKind;

    #[test]
    fn test_error_response_becomes_rejected() {
        let e = TransportError::ErrorResp(ErrorPayload {
            code: -32000,
            message: "nonce too low".into(),
            data: None,
        });
        let ChainError::Rejected { code, message } = ChainError::from(e) else {
            panic!("expected a rejection");
        };
        assert_eq!(code, -32000);
        assert_eq!(message, "nonce too low");
    }

    #[test]
    fn test_transport_failure_stays_transport() {
        let e = TransportErrorKind::custom_str("connection refused");
        let err = ChainError::from(e);
        assert!(matches!(err, ChainError::Transport(_)));
        assert_eq!(err.to_string(), "connection refused");
    }
}
