//! In-memory [`ChainClient`] for flow tests.

use std::collections::HashMap;
use std::sync::Mutex;

use alloy_primitives::{Address, B256, Bytes, TxHash};
use alloy_rpc_types_eth::TransactionRequest;

use crate::client::{ChainClient, ReceiptSummary};
use crate::error::ChainError;

#[derive(Debug, Default)]
struct State {
    code: HashMap<Address, Bytes>,
    nonces: HashMap<Address, u64>,
    call_results: HashMap<(Address, Bytes), Bytes>,
    submitted: Vec<TransactionRequest>,
    code_after_submit: Option<(Address, Bytes)>,
    reject_with: Option<(i64, String)>,
    reverted: bool,
}

/// Scripted chain state. Submissions are recorded and mined immediately.
#[derive(Debug)]
pub struct MockChainClient {
    chain_id: u64,
    gas_used: u64,
    state: Mutex<State>,
}

impl MockChainClient {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            gas_used: 21_000,
            state: Mutex::default(),
        }
    }

    pub fn with_gas_used(mut self, gas_used: u64) -> Self {
        self.gas_used = gas_used;
        self
    }

    pub fn set_code(&self, address: Address, code: impl Into<Bytes>) {
        self.state.lock().unwrap().code.insert(address, code.into());
    }

    pub fn set_nonce(&self, address: Address, nonce: u64) {
        self.state.lock().unwrap().nonces.insert(address, nonce);
    }

    pub fn set_call_result(&self, to: Address, calldata: Vec<u8>, result: Vec<u8>) {
        self.state
            .lock()
            .unwrap()
            .call_results
            .insert((to, calldata.into()), result.into());
    }

    /// Code installed at `address` once any transaction is mined.
    pub fn set_code_after_submit(&self, address: Address, code: impl Into<Bytes>) {
        self.state.lock().unwrap().code_after_submit = Some((address, code.into()));
    }

    pub fn reject_submissions(&self, code: i64, message: &str) {
        self.state.lock().unwrap().reject_with = Some((code, message.to_owned()));
    }

    pub fn revert_submissions(&self) {
        self.state.lock().unwrap().reverted = true;
    }

    pub fn submitted(&self) -> Vec<TransactionRequest> {
        self.state.lock().unwrap().submitted.clone()
    }
}

impl ChainClient for MockChainClient {
    async fn chain_id(&self) -> Result<u64, ChainError> {
        Ok(self.chain_id)
    }

    async fn get_account_code(&self, address: Address) -> Result<Bytes, ChainError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .code
            .get(&address)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_transaction_count(&self, address: Address) -> Result<u64, ChainError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .nonces
            .get(&address)
            .copied()
            .unwrap_or_default())
    }

    async fn call(&self, tx: TransactionRequest) -> Result<Bytes, ChainError> {
        let state = self.state.lock().unwrap();
        let to = tx.to.and_then(|kind| kind.to().copied()).unwrap_or_default();
        let input = tx.input.input().cloned().unwrap_or_default();
        state
            .call_results
            .get(&(to, input))
            .cloned()
            .ok_or_else(|| ChainError::Rejected {
                code: 3,
                message: "execution reverted".into(),
            })
    }

    async fn submit_transaction(&self, tx: TransactionRequest) -> Result<TxHash, ChainError> {
        let mut state = self.state.lock().unwrap();
        if let Some((code, message)) = state.reject_with.clone() {
            return Err(ChainError::Rejected { code, message });
        }
        if let Some(from) = tx.from {
            *state.nonces.entry(from).or_default() += 1;
        }
        if let Some((address, code)) = state.code_after_submit.take() {
            state.code.insert(address, code);
        }
        state.submitted.push(tx);
        Ok(B256::with_last_byte(u8::try_from(state.submitted.len()).unwrap_or(u8::MAX)))
    }

    async fn await_receipt(&self, tx_hash: TxHash) -> Result<ReceiptSummary, ChainError> {
        let reverted = self.state.lock().unwrap().reverted;
        Ok(ReceiptSummary {
            transaction_hash: tx_hash,
            status: !reverted,
            block_number: Some(1),
            gas_used: self.gas_used,
        })
    }
}
