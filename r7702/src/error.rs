//! Error types for authorization building, signing and delegation checks.

use std::fmt;

/// The authorization field an input error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthorizationField {
    /// The EIP-155 chain identifier.
    ChainId,
    /// The implementation (delegate) address.
    Address,
    /// The account nonce.
    Nonce,
    /// The on-chain code value being classified.
    Code,
    /// The signature's `y` parity.
    YParity,
}

impl AuthorizationField {
    /// Returns the wire name of the field, as it appears in an authorization-list entry.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ChainId => "chainId",
            Self::Address => "address",
            Self::Nonce => "nonce",
            Self::Code => "code",
            Self::YParity => "yParity",
        }
    }
}

impl fmt::Display for AuthorizationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced by the delegation authorizer.
///
/// None of these are retried internally. Input errors are raised before any
/// cryptographic work happens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorizationError {
    /// A request field is malformed or out of range.
    #[error("invalid {field}: {reason}")]
    InvalidInput {
        /// Which field was rejected.
        field: AuthorizationField,
        /// Human-readable reason.
        reason: String,
    },

    /// The signing key could not be parsed or is not a valid secp256k1 scalar.
    #[error("invalid signing key: {0}")]
    InvalidKey(String),

    /// The signer failed to produce a signature.
    #[error("signing failed: {0}")]
    Signing(String),

    /// The signature does not recover to any address for the given digest.
    #[error("signature recovery failed: {0}")]
    Recovery(String),
}

impl AuthorizationError {
    /// Creates an [`AuthorizationError::InvalidInput`] for `field`.
    #[must_use]
    pub fn invalid(field: AuthorizationField, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    /// Returns the offending field for input errors.
    #[must_use]
    pub const fn field(&self) -> Option<AuthorizationField> {
        match self {
            Self::InvalidInput { field, .. } => Some(*field),
            Self::InvalidKey(_) | Self::Signing(_) | Self::Recovery(_) => None,
        }
    }
}
