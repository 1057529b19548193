#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for EIP-7702 account delegation.
//!
//! An externally-owned account delegates its code to an implementation
//! contract by signing an authorization `(chainId, address, nonce)` and
//! attaching it to a type-4 transaction. Once included, the account's code
//! becomes the 23-byte delegation marker `0xef0100 || address`.
//!
//! This crate holds the pure, synchronous part of that procedure:
//!
//! - [`authorization`] - Building requests and computing their digests
//! - [`signature`] - Deterministic signing and `{yParity, r, s}` normalization
//! - [`marker`] - Delegation markers and the three-way delegation check
//! - [`networks`] - Well-known chains, tokens and the default implementation
//! - [`error`] - Error types
//!
//! Chain access lives in the `r7702-chain` crate.
//!
//! # Example
//!
//! ```rust
//! use alloy_primitives::{U256, address};
//! use r7702::{build_authorization, verify_delegation, DelegationMarker, DelegationStatus};
//!
//! let implementation = address!("000100abaad02f1cfc8bbe32bd5a564817339e72");
//! let request = build_authorization(U256::from(84532), implementation, 0).unwrap();
//! let digest = request.hash();
//! assert_eq!(digest, request.hash());
//!
//! let code = DelegationMarker::new(implementation).to_bytes();
//! assert_eq!(verify_delegation(&code, implementation), DelegationStatus::Delegated);
//! ```
//!
//! # Feature Flags
//!
//! - `telemetry` - Emits `tracing` events when signing

pub mod authorization;
pub mod error;
pub mod marker;
pub mod networks;
pub mod signature;

pub use authorization::{
    AuthorizationDigest, AuthorizationRequest, build_authorization, hash_authorization,
};
pub use error::{AuthorizationError, AuthorizationField};
pub use marker::{
    DELEGATION_PREFIX, DelegationMarker, DelegationStatus, UnexpectedCode, verify_delegation,
    verify_delegation_hex,
};
pub use signature::{
    AuthorizationSignature, parse_signing_key, sign_authorization_hash,
    sign_authorization_hash_with,
};
