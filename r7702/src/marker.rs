//! Delegation markers and post-submission verification.
//!
//! A delegated account's code is exactly `0xef0100 || implementation`
//! (23 bytes). Anything else is either a plain account (empty code) or an
//! account delegated to, or deployed as, something other than what the caller
//! expects. [`verify_delegation`] keeps those cases apart so callers can tell
//! whether a new authorization is needed at all.

use std::fmt;

use alloy_primitives::{Address, Bytes, hex};

use crate::error::{AuthorizationError, AuthorizationField};

/// Prefix of delegation designator code.
pub const DELEGATION_PREFIX: [u8; 3] = [0xef, 0x01, 0x00];

/// Length of a delegation designator: prefix + 20-byte address.
pub const DELEGATION_MARKER_LENGTH: usize = 23;

/// The on-chain code value of an account delegated to an implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DelegationMarker(Address);

impl DelegationMarker {
    /// The marker for delegation to `implementation`.
    #[must_use]
    pub const fn new(implementation: Address) -> Self {
        Self(implementation)
    }

    /// The implementation address this marker points at.
    #[must_use]
    pub const fn implementation(&self) -> Address {
        self.0
    }

    /// Raw 23-byte code value.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; DELEGATION_MARKER_LENGTH] {
        let mut out = [0u8; DELEGATION_MARKER_LENGTH];
        out[..3].copy_from_slice(&DELEGATION_PREFIX);
        out[3..].copy_from_slice(self.0.as_slice());
        out
    }

    /// Code value as [`Bytes`].
    #[must_use]
    pub fn to_code(&self) -> Bytes {
        Bytes::copy_from_slice(&self.to_bytes())
    }

    /// Parses a code value that is a well-formed delegation marker.
    #[must_use]
    pub fn parse(code: &[u8]) -> Option<Self> {
        if code.len() != DELEGATION_MARKER_LENGTH || code[..3] != DELEGATION_PREFIX {
            return None;
        }
        Some(Self(Address::from_slice(&code[3..])))
    }

    /// Whether `code` is exactly this marker.
    #[must_use]
    pub fn matches(&self, code: &[u8]) -> bool {
        code == self.to_bytes().as_slice()
    }
}

/// Lowercase hex, `0x`-prefixed: `0xef0100` followed by the address.
impl fmt::Display for DelegationMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.to_bytes()))
    }
}

/// Code found at an account that is neither empty nor the expected marker.
///
/// Reported rather than treated as fatal: the account may be validly
/// delegated to a different implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unexpected account code {found}, expected {expected}")]
pub struct UnexpectedCode {
    /// The code observed on-chain.
    pub found: Bytes,
    /// The marker that was expected.
    pub expected: DelegationMarker,
    /// The delegate, when `found` is itself a delegation marker.
    pub delegate: Option<Address>,
}

/// Delegation state of an account relative to one implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DelegationStatus {
    /// Code equals the marker for the expected implementation.
    Delegated,
    /// The account has no code.
    NotDelegated,
    /// The account has some other code: another marker or contract code.
    DelegatedElsewhere(UnexpectedCode),
}

impl DelegationStatus {
    /// Whether the account is delegated to the expected implementation.
    #[must_use]
    pub const fn is_delegated(&self) -> bool {
        matches!(self, Self::Delegated)
    }

    /// Whether issuing a new authorization would change anything.
    #[must_use]
    pub const fn needs_authorization(&self) -> bool {
        !self.is_delegated()
    }
}

impl fmt::Display for DelegationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delegated => f.write_str("delegated"),
            Self::NotDelegated => f.write_str("not delegated"),
            Self::DelegatedElsewhere(UnexpectedCode {
                delegate: Some(delegate),
                ..
            }) => write!(f, "delegated elsewhere ({delegate})"),
            Self::DelegatedElsewhere(unexpected) => {
                write!(f, "unexpected code ({})", unexpected.found)
            }
        }
    }
}

/// Classifies `current_code` against the marker for `implementation`.
#[must_use]
pub fn verify_delegation(current_code: &[u8], implementation: Address) -> DelegationStatus {
    let expected = DelegationMarker::new(implementation);
    if expected.matches(current_code) {
        return DelegationStatus::Delegated;
    }
    if current_code.is_empty() {
        return DelegationStatus::NotDelegated;
    }
    DelegationStatus::DelegatedElsewhere(UnexpectedCode {
        found: Bytes::copy_from_slice(current_code),
        expected,
        delegate: DelegationMarker::parse(current_code).map(|m| m.implementation()),
    })
}

/// Hex-string variant of [`verify_delegation`], case-insensitive in both inputs.
///
/// `"0x"` and `""` are the empty code value.
///
/// # Errors
///
/// Returns [`AuthorizationError::InvalidInput`] if either input is not valid hex.
pub fn verify_delegation_hex(
    current_code: &str,
    implementation: &str,
) -> Result<DelegationStatus, AuthorizationError> {
    let code = hex::decode(current_code.trim())
        .map_err(|e| AuthorizationError::invalid(AuthorizationField::Code, e.to_string()))?;
    let implementation = implementation
        .trim()
        .parse::<Address>()
        .map_err(|e| AuthorizationError::invalid(AuthorizationField::Address, e.to_string()))?;
    Ok(verify_delegation(&code, implementation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const IMPL_A: Address = address!("000100abaad02f1cfc8bbe32bd5a564817339e72");
    const IMPL_B: Address = address!("aabbccddeeff00112233445566778899aabbccdd");

    #[test]
    fn test_marker_format() {
        let marker = DelegationMarker::new(IMPL_A);
        assert_eq!(
            marker.to_string(),
            "0xef0100000100abaad02f1cfc8bbe32bd5a564817339e72"
        );
        assert_eq!(marker.to_bytes().len(), DELEGATION_MARKER_LENGTH);
        assert_eq!(marker.to_code().len(), DELEGATION_MARKER_LENGTH);
    }

    #[test]
    fn test_marker_parse() {
        let code = DelegationMarker::new(IMPL_B).to_bytes();
        assert_eq!(DelegationMarker::parse(&code).map(|m| m.implementation()), Some(IMPL_B));
        assert!(DelegationMarker::parse(&code[..22]).is_none());
        assert!(DelegationMarker::parse(&[0x60, 0x80, 0x60, 0x40]).is_none());
        let mut wrong_prefix = code;
        wrong_prefix[2] = 0x01;
        assert!(DelegationMarker::parse(&wrong_prefix).is_none());
    }

    #[test]
    fn test_three_way_classification() {
        assert_eq!(verify_delegation(&[], IMPL_A), DelegationStatus::NotDelegated);
        assert_eq!(
            verify_delegation(&DelegationMarker::new(IMPL_A).to_bytes(), IMPL_A),
            DelegationStatus::Delegated
        );
        match verify_delegation(&DelegationMarker::new(IMPL_B).to_bytes(), IMPL_A) {
            DelegationStatus::DelegatedElsewhere(unexpected) => {
                assert_eq!(unexpected.delegate, Some(IMPL_B));
                assert_eq!(unexpected.expected, DelegationMarker::new(IMPL_A));
            }
            other => panic!("expected DelegatedElsewhere, got {other:?}"),
        }
    }

    #[test]
    fn test_contract_code_is_delegated_elsewhere() {
        let status = verify_delegation(&[0x60, 0x80, 0x60, 0x40, 0x52], IMPL_A);
        match status {
            DelegationStatus::DelegatedElsewhere(unexpected) => {
                assert_eq!(unexpected.delegate, None);
                assert_eq!(unexpected.found.len(), 5);
            }
            other => panic!("expected DelegatedElsewhere, got {other:?}"),
        }
    }

    #[test]
    fn test_marker_with_trailing_bytes_is_not_delegated() {
        let mut code = DelegationMarker::new(IMPL_A).to_bytes().to_vec();
        code.push(0x00);
        assert!(matches!(
            verify_delegation(&code, IMPL_A),
            DelegationStatus::DelegatedElsewhere(UnexpectedCode { delegate: None, .. })
        ));
    }

    #[test]
    fn test_hex_comparison_is_case_insensitive() {
        let upper_code = "0xEF0100AABBCCDDEEFF00112233445566778899AABBCCDD";
        let lower_impl = "0xaabbccddeeff00112233445566778899aabbccdd";
        assert_eq!(
            verify_delegation_hex(upper_code, lower_impl).unwrap(),
            DelegationStatus::Delegated
        );

        let lower_code = "0xef0100aabbccddeeff00112233445566778899aabbccdd";
        let upper_impl = "0xAABBCCDDEEFF00112233445566778899AABBCCDD";
        assert_eq!(
            verify_delegation_hex(lower_code, upper_impl).unwrap(),
            DelegationStatus::Delegated
        );
    }

    #[test]
    fn test_hex_empty_code() {
        let implementation = "0x000100abaad02f1cfc8bbe32bd5a564817339e72";
        assert_eq!(
            verify_delegation_hex("0x", implementation).unwrap(),
            DelegationStatus::NotDelegated
        );
        assert_eq!(
            verify_delegation_hex("", implementation).unwrap(),
            DelegationStatus::NotDelegated
        );
    }

    #[test]
    fn test_hex_rejects_malformed_input() {
        let err = verify_delegation_hex("0xzz", "0x000100abaad02f1cfc8bbe32bd5a564817339e72")
            .unwrap_err();
        assert_eq!(err.field(), Some(AuthorizationField::Code));

        let err = verify_delegation_hex("0x", "0x1234").unwrap_err();
        assert_eq!(err.field(), Some(AuthorizationField::Address));
    }

    #[test]
    fn test_verify_is_idempotent() {
        let code = DelegationMarker::new(IMPL_B).to_bytes();
        let first = verify_delegation(&code, IMPL_A);
        for _ in 0..8 {
            assert_eq!(verify_delegation(&code, IMPL_A), first);
        }
    }

    #[test]
    fn test_needs_authorization() {
        assert!(!DelegationStatus::Delegated.needs_authorization());
        assert!(DelegationStatus::NotDelegated.needs_authorization());
        let elsewhere = verify_delegation(&DelegationMarker::new(IMPL_B).to_bytes(), IMPL_A);
        assert!(elsewhere.needs_authorization());
    }
}
