#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Chain access and end-to-end flows for EIP-7702 delegated accounts.
//!
//! The flows are written against the [`ChainClient`] trait so they can run
//! over any alloy provider ([`Eip155ChainClient`]) or an in-memory double.
//!
//! # Modules
//!
//! - [`client`] - The [`ChainClient`] seam and receipt summaries
//! - [`provider`] - Alloy HTTP provider implementation with fallback and throttling
//! - [`delegation`] - One-shot delegation setup and status checks
//! - [`approvals`] - ERC-20 allowance checks and approvals for a spender
//! - [`batch`] - Batched `transferFrom` calls through the delegated account
//! - [`contract`] - Solidity interfaces
//! - [`error`] - Error types
//!
//! # Feature Flags
//!
//! - `telemetry` - Emits `tracing` spans and events for RPC calls and flow steps

/// Awaits a future, instrumenting it with `$span` when `telemetry` is enabled.
macro_rules! traced {
    ($fut:expr, $span:expr) => {{
        #[cfg(feature = "telemetry")]
        {
            use tracing::Instrument;
            $fut.instrument($span).await
        }
        #[cfg(not(feature = "telemetry"))]
        {
            $fut.await
        }
    }};
}

pub mod approvals;
pub mod batch;
pub mod client;
pub mod contract;
pub mod delegation;
pub mod error;
pub mod provider;

#[cfg(test)]
mod testing;

pub use approvals::{ApprovalGrant, ApprovalReport, ApprovalStatus, ensure_approvals};
pub use batch::{BatchReport, BatchTransferParams, TokenTransfer, execute_batch_transfer};
pub use client::{ChainClient, ReceiptSummary};
pub use delegation::{
    DelegationOutcome, DelegationParams, DelegationTransaction, delegation_status,
    setup_delegation,
};
pub use error::{ChainError, FlowError};
pub use provider::{Eip155ChainClient, HttpChainClient, ReadOnlyChainClient};
