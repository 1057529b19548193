//! Authorization signing and signature normalization.
//!
//! Signatures are produced with RFC 6979 deterministic nonces, so the same
//! key and digest always yield the same `(yParity, r, s)` triple.

use alloy_primitives::{Address, B256, Signature, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use serde::{Deserialize, Serialize};

use crate::error::{AuthorizationError, AuthorizationField};

/// A secp256k1 signature in the `{yParity, r, s}` form used by authorization lists.
///
/// This is never the legacy `v = 27/28` recovery-id form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationSignature {
    /// Parity of the `y` coordinate of the signature's `R` point, `0` or `1`.
    pub y_parity: u8,
    /// The `r` scalar.
    pub r: U256,
    /// The `s` scalar (low-s normalized).
    pub s: U256,
}

impl From<Signature> for AuthorizationSignature {
    fn from(signature: Signature) -> Self {
        Self {
            y_parity: u8::from(signature.v()),
            r: signature.r(),
            s: signature.s(),
        }
    }
}

impl AuthorizationSignature {
    /// Converts back into alloy's [`Signature`].
    #[must_use]
    pub fn as_signature(&self) -> Signature {
        Signature::new(self.r, self.s, self.y_parity == 1)
    }

    /// Recovers the address that produced this signature over `digest`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizationError::InvalidInput`] if `y_parity` is not `0`
    /// or `1`, and [`AuthorizationError::Recovery`] if no public key matches.
    pub fn recover(&self, digest: &B256) -> Result<Address, AuthorizationError> {
        if self.y_parity > 1 {
            return Err(AuthorizationError::invalid(
                AuthorizationField::YParity,
                format!("must be 0 or 1, got {}", self.y_parity),
            ));
        }
        self.as_signature()
            .recover_address_from_prehash(digest)
            .map_err(|e| AuthorizationError::Recovery(e.to_string()))
    }
}

/// Parses a hex-encoded private key, with or without a `0x` prefix.
///
/// # Errors
///
/// Returns [`AuthorizationError::InvalidKey`] if the string is not a valid key.
pub fn parse_signing_key(key: &str) -> Result<PrivateKeySigner, AuthorizationError> {
    key.trim()
        .parse::<PrivateKeySigner>()
        .map_err(|e| AuthorizationError::InvalidKey(e.to_string()))
}

/// Signs an authorization digest with a raw 32-byte private key.
///
/// # Errors
///
/// Returns [`AuthorizationError::InvalidKey`] if `private_key` is zero or not
/// below the curve order.
pub fn sign_authorization_hash(
    private_key: &B256,
    digest: &B256,
) -> Result<AuthorizationSignature, AuthorizationError> {
    let signer = PrivateKeySigner::from_bytes(private_key)
        .map_err(|e| AuthorizationError::InvalidKey(e.to_string()))?;
    sign_authorization_hash_with(&signer, digest)
}

/// Signs an authorization digest with an existing signer.
///
/// The digest is signed as-is, without any message prefix.
///
/// # Errors
///
/// Returns [`AuthorizationError::Signing`] if the signer fails.
pub fn sign_authorization_hash_with<S>(
    signer: &S,
    digest: &B256,
) -> Result<AuthorizationSignature, AuthorizationError>
where
    S: SignerSync + ?Sized,
{
    let signature = signer
        .sign_hash_sync(digest)
        .map_err(|e| AuthorizationError::Signing(e.to_string()))?;
    #[cfg(feature = "telemetry")]
    tracing::debug!(digest = %digest, y_parity = signature.v(), "Signed authorization digest");
    Ok(signature.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorization::{AuthorizationDigest, build_authorization};
    use alloy_primitives::{address, b256, uint};
    use rand::RngExt;
    use rand::rng;

    /// Well-known development key (first default account of local dev nodes).
    const TEST_KEY: B256 =
        b256!("ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80");
    const TEST_ADDRESS: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
    const IMPLEMENTATION: Address = address!("000100abaad02f1cfc8bbe32bd5a564817339e72");

    fn sepolia_digest(kind: AuthorizationDigest) -> B256 {
        build_authorization(U256::from(84532), IMPLEMENTATION, 0)
            .unwrap()
            .digest(kind)
    }

    #[test]
    fn test_sign_golden_vector_abi_tuple() {
        let signature =
            sign_authorization_hash(&TEST_KEY, &sepolia_digest(AuthorizationDigest::AbiTuple))
                .unwrap();
        assert_eq!(signature.y_parity, 1);
        assert_eq!(
            signature.r,
            uint!(0xce397c628486c3044054daa8155a7a963cc385c83d88e310bc31a8e274d5a0a4_U256)
        );
        assert_eq!(
            signature.s,
            uint!(0x76d550a84714fc06bdd65af5499d4ce084d4d20fce34eddba8c6c28a2754b51c_U256)
        );
    }

    #[test]
    fn test_sign_golden_vector_eip7702() {
        let signature =
            sign_authorization_hash(&TEST_KEY, &sepolia_digest(AuthorizationDigest::Eip7702))
                .unwrap();
        assert_eq!(signature.y_parity, 1);
        assert_eq!(
            signature.r,
            uint!(0x485f5818cab51fccabcd583fc332cd03a6e9754930861b47e5605a22c6bbe24f_U256)
        );
        assert_eq!(
            signature.s,
            uint!(0x011a6680e7d2dc481915b1be58195f53e97293fac3724a3d0e6f758d3f087f87_U256)
        );
    }

    #[test]
    fn test_sign_is_reproducible() {
        let digest = sepolia_digest(AuthorizationDigest::AbiTuple);
        let first = sign_authorization_hash(&TEST_KEY, &digest).unwrap();
        let second = sign_authorization_hash(&TEST_KEY, &digest).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_signature_recovers_signer() {
        let digest = sepolia_digest(AuthorizationDigest::AbiTuple);
        let signature = sign_authorization_hash(&TEST_KEY, &digest).unwrap();
        assert_eq!(signature.recover(&digest).unwrap(), TEST_ADDRESS);
    }

    #[test]
    fn test_signature_recovers_random_signers() {
        for _ in 0..16 {
            let signer = PrivateKeySigner::random();
            let digest = B256::from(rng().random::<[u8; 32]>());
            let signature = sign_authorization_hash_with(&signer, &digest).unwrap();
            assert!(signature.y_parity <= 1);
            assert_eq!(signature.recover(&digest).unwrap(), signer.address());
        }
    }

    #[test]
    fn test_signature_is_low_s() {
        let half_order =
            uint!(0x7fffffffffffffffffffffffffffffff5d576e7357a4501ddfe92f46681b20a0_U256);
        for _ in 0..16 {
            let digest = B256::from(rng().random::<[u8; 32]>());
            let signature = sign_authorization_hash(&TEST_KEY, &digest).unwrap();
            assert!(signature.s <= half_order);
        }
    }

    #[test]
    fn test_sign_rejects_zero_key() {
        let err = sign_authorization_hash(&B256::ZERO, &B256::repeat_byte(1)).unwrap_err();
        assert!(matches!(err, AuthorizationError::InvalidKey(_)));
    }

    #[test]
    fn test_parse_signing_key() {
        let signer =
            parse_signing_key("0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80")
                .unwrap();
        assert_eq!(signer.address(), TEST_ADDRESS);
        assert!(matches!(
            parse_signing_key("0xUserPrivateKey1"),
            Err(AuthorizationError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_recover_rejects_bad_parity() {
        let digest = sepolia_digest(AuthorizationDigest::AbiTuple);
        let mut signature = sign_authorization_hash(&TEST_KEY, &digest).unwrap();
        signature.y_parity = 27;
        let err = signature.recover(&digest).unwrap_err();
        assert!(matches!(err, AuthorizationError::InvalidInput { .. }));
        assert_eq!(err.field(), Some(AuthorizationField::YParity));
    }

    #[test]
    fn test_signature_serializes_camel_case() {
        let signature = AuthorizationSignature {
            y_parity: 1,
            r: U256::from(2),
            s: U256::from(3),
        };
        let json = serde_json::to_value(signature).unwrap();
        assert_eq!(json["yParity"], 1);
        assert_eq!(json["r"], "0x2");
        assert_eq!(json["s"], "0x3");
    }
}
