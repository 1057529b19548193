//! Authorization requests and their canonical digests.
//!
//! An [`AuthorizationRequest`] is the `(chainId, address, nonce)` triple an
//! account signs to delegate its code to an implementation contract. It is
//! built fresh for every delegation attempt: the nonce binds it to the
//! account's transaction count at signing time, so a cached request goes
//! stale as soon as the account sends anything else.

use std::fmt;
use std::str::FromStr;

use alloy_eips::eip7702::{Authorization, SignedAuthorization};
use alloy_primitives::{Address, B256, U256, keccak256};
use serde::{Deserialize, Serialize};

use crate::error::{AuthorizationError, AuthorizationField};
use crate::signature::AuthorizationSignature;

/// Size of the ABI tuple encoding of `(uint256, address, uint256)`.
pub const ABI_TUPLE_ENCODED_LEN: usize = 96;

/// Largest nonce an authorization may carry (EIP-2681 caps account nonces at `2^64 - 2`).
pub const MAX_AUTHORIZATION_NONCE: u64 = u64::MAX - 1;

/// An unsigned delegation authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationRequest {
    /// Chain the authorization is valid on.
    pub chain_id: U256,
    /// Implementation contract the account delegates to.
    pub address: Address,
    /// Account nonce at signing time.
    pub nonce: u64,
}

/// Builds an authorization request, rejecting malformed inputs.
///
/// The triple is returned unchanged when it is valid. The caller is
/// responsible for reading `nonce` from the network immediately before
/// signing; no transaction from the same account may be sent in between.
///
/// # Errors
///
/// Returns [`AuthorizationError::InvalidInput`] when `chain_id` is zero,
/// `implementation` is the zero address, or `nonce` exceeds
/// [`MAX_AUTHORIZATION_NONCE`].
pub fn build_authorization(
    chain_id: U256,
    implementation: Address,
    nonce: u64,
) -> Result<AuthorizationRequest, AuthorizationError> {
    if chain_id.is_zero() {
        return Err(AuthorizationError::invalid(
            AuthorizationField::ChainId,
            "chain id must be non-zero",
        ));
    }
    if implementation.is_zero() {
        return Err(AuthorizationError::invalid(
            AuthorizationField::Address,
            "implementation address must be non-zero",
        ));
    }
    if nonce > MAX_AUTHORIZATION_NONCE {
        return Err(AuthorizationError::invalid(
            AuthorizationField::Nonce,
            format!("nonce {nonce} exceeds {MAX_AUTHORIZATION_NONCE}"),
        ));
    }
    Ok(AuthorizationRequest {
        chain_id,
        address: implementation,
        nonce,
    })
}

/// Hashes a request with the ABI tuple digest.
///
/// Equivalent to `keccak256(abi.encode(uint256 chainId, address implementation, uint256 nonce))`.
#[must_use]
pub fn hash_authorization(request: &AuthorizationRequest) -> B256 {
    keccak256(request.abi_encode())
}

impl AuthorizationRequest {
    /// Parses a request from textual inputs, as found in configuration files.
    ///
    /// `chain_id` accepts decimal or `0x`-prefixed hex; `address` accepts any
    /// letter case.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizationError::InvalidInput`] naming the first field
    /// that fails to parse or validate.
    pub fn parse(chain_id: &str, address: &str, nonce: &str) -> Result<Self, AuthorizationError> {
        let chain_id = U256::from_str(chain_id.trim())
            .map_err(|e| AuthorizationError::invalid(AuthorizationField::ChainId, e.to_string()))?;
        let address = Address::from_str(address.trim())
            .map_err(|e| AuthorizationError::invalid(AuthorizationField::Address, e.to_string()))?;
        let nonce = nonce
            .trim()
            .parse::<u64>()
            .map_err(|e| AuthorizationError::invalid(AuthorizationField::Nonce, e.to_string()))?;
        build_authorization(chain_id, address, nonce)
    }

    /// Canonical fixed-width encoding: three 32-byte big-endian words.
    #[must_use]
    pub fn abi_encode(&self) -> [u8; ABI_TUPLE_ENCODED_LEN] {
        let mut out = [0u8; ABI_TUPLE_ENCODED_LEN];
        out[..32].copy_from_slice(&self.chain_id.to_be_bytes::<32>());
        out[32..64].copy_from_slice(self.address.into_word().as_slice());
        out[64..].copy_from_slice(&U256::from(self.nonce).to_be_bytes::<32>());
        out
    }

    /// The ABI tuple digest, see [`hash_authorization`].
    #[must_use]
    pub fn hash(&self) -> B256 {
        hash_authorization(self)
    }

    /// The EIP-7702 signing digest: `keccak256(0x05 || rlp([chain_id, address, nonce]))`.
    #[must_use]
    pub fn eip7702_signature_hash(&self) -> B256 {
        self.as_eip7702().signature_hash()
    }

    /// Computes the digest selected by `kind`.
    #[must_use]
    pub fn digest(&self, kind: AuthorizationDigest) -> B256 {
        match kind {
            AuthorizationDigest::AbiTuple => self.hash(),
            AuthorizationDigest::Eip7702 => self.eip7702_signature_hash(),
        }
    }

    /// Converts into alloy's unsigned authorization type.
    #[must_use]
    pub const fn as_eip7702(&self) -> Authorization {
        Authorization {
            chain_id: self.chain_id,
            address: self.address,
            nonce: self.nonce,
        }
    }

    /// Combines the request with its signature into an authorization-list entry.
    ///
    /// The entry is not checked here; validators recover the authority when
    /// the delegation transaction is executed.
    #[must_use]
    pub fn signed(&self, signature: &AuthorizationSignature) -> SignedAuthorization {
        SignedAuthorization::new_unchecked(
            self.as_eip7702(),
            signature.y_parity,
            signature.r,
            signature.s,
        )
    }
}

/// Which digest an authorization signature is computed over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthorizationDigest {
    /// `keccak256` of the ABI tuple encoding.
    #[default]
    AbiTuple,
    /// The EIP-7702 magic-prefixed RLP digest checked by network validators.
    Eip7702,
}

impl AuthorizationDigest {
    /// Returns the configuration name of the digest.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AbiTuple => "abi-tuple",
            Self::Eip7702 => "eip7702",
        }
    }
}

impl fmt::Display for AuthorizationDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthorizationDigest {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abi-tuple" | "abi" => Ok(Self::AbiTuple),
            "eip7702" | "eip-7702" => Ok(Self::Eip7702),
            other => Err(format!(
                "unknown authorization digest '{other}', expected 'abi-tuple' or 'eip7702'"
            )),
        }
    }
}
