//! Schnorr-style message signatures (`SigV1` / `SigV2`).
//!
//! A signature is the 5-byte ASCII header followed by a base58 blob of
//! `c (32) || r (32) || mode (1)`. V1 signs `Keccak256(message)`; V2 signs
//! a domain-separated hash binding the signer's address keys and the mode
//! (0 = spend key, 1 = view key):
//!
//! ```text
//! h = Keccak256("MoneroMessageSignature\0" || K_s || K_v || mode
//!               || varint(len) || message)
//! ```
//!
//! Verification recomputes `R' = c*K + r*G` and accepts iff
//! `Hs(h || K || R') == c`, trying the spend key first, then the view key.

use curve25519_dalek::edwards::CompressedEdwardsY;
use curve25519_dalek::Scalar;
use rand::rngs::OsRng;
use zeroize::Zeroize;

use crate::address::Address;
use crate::curve::{decompress, scalar_mul_base};
use crate::errors::{CryptoError, CryptoResult};
use crate::hash::{keccak256, keccak256_to_scalar};
use crate::varint::encode_varint;

const HEADER_V1: &str = "SigV1";
const HEADER_V2: &str = "SigV2";
const DOMAIN_V2: &[u8] = b"MoneroMessageSignature\0";

/// Which wallet key produced a message signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerKeyType {
    Spend,
    View,
}

impl SignerKeyType {
    fn mode(self) -> u8 {
        match self {
            SignerKeyType::Spend => 0,
            SignerKeyType::View => 1,
        }
    }
}

/// Result of verifying a message signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageVerification {
    /// Whether the signature checks out.
    pub valid: bool,
    /// Signature version (1 or 2).
    pub version: u8,
    /// Which key verified, when `valid`.
    pub key_type: Option<SignerKeyType>,
}

/// Sign a message with the given secret key (V2 format).
pub fn sign_message_v2(
    message: &[u8],
    secret: &Scalar,
    address: &Address,
    key_type: SignerKeyType,
) -> CryptoResult<String> {
    let public = match key_type {
        SignerKeyType::Spend => address.spend_public,
        SignerKeyType::View => address.view_public,
    };
    if scalar_mul_base(secret).compress() != public {
        return Err(CryptoError::Internal(
            "secret does not match the address key".into(),
        ));
    }

    let h = message_hash_v2(message, address, key_type.mode());
    let (c, r) = schnorr_sign(&h, secret, &public);

    let mut blob = [0u8; 65];
    blob[..32].copy_from_slice(&c.to_bytes());
    blob[32..64].copy_from_slice(&r.to_bytes());
    blob[64] = key_type.mode();

    let encoded = base58_monero::encode(&blob)
        .map_err(|e| CryptoError::Internal(format!("base58 encode: {e:?}")))?;
    Ok(format!("{HEADER_V2}{encoded}"))
}

/// Verify a `SigV1`/`SigV2` signature against an address.
pub fn verify_message(
    message: &[u8],
    address: &Address,
    signature: &str,
) -> CryptoResult<MessageVerification> {
    let (version, body) = if let Some(rest) = signature.strip_prefix(HEADER_V1) {
        (1u8, rest)
    } else if let Some(rest) = signature.strip_prefix(HEADER_V2) {
        (2u8, rest)
    } else {
        return Err(CryptoError::SignatureInvalid(
            "missing SigV1/SigV2 header".into(),
        ));
    };

    let blob =
        base58_monero::decode(body).map_err(|e| CryptoError::Base58DecodeFailed(format!("{e:?}")))?;
    if blob.len() != 65 {
        return Err(CryptoError::InvalidLength {
            field: "signature blob".into(),
            expected: 65,
            actual: blob.len(),
        });
    }

    let mut c_bytes = [0u8; 32];
    c_bytes.copy_from_slice(&blob[..32]);
    let mut r_bytes = [0u8; 32];
    r_bytes.copy_from_slice(&blob[32..64]);
    let c = Scalar::from_bytes_mod_order(c_bytes);
    let r = Scalar::from_bytes_mod_order(r_bytes);

    // Spend first, then view.
    for key_type in [SignerKeyType::Spend, SignerKeyType::View] {
        let public = match key_type {
            SignerKeyType::Spend => address.spend_public,
            SignerKeyType::View => address.view_public,
        };
        let h = match version {
            1 => keccak256(message),
            _ => message_hash_v2(message, address, key_type.mode()),
        };
        if schnorr_check(&h, &public, &c, &r)? {
            return Ok(MessageVerification {
                valid: true,
                version,
                key_type: Some(key_type),
            });
        }
    }

    Ok(MessageVerification {
        valid: false,
        version,
        key_type: None,
    })
}

fn message_hash_v2(message: &[u8], address: &Address, mode: u8) -> [u8; 32] {
    let mut data =
        Vec::with_capacity(DOMAIN_V2.len() + 64 + 1 + 10 + message.len());
    data.extend_from_slice(DOMAIN_V2);
    data.extend_from_slice(&address.spend_public.0);
    data.extend_from_slice(&address.view_public.0);
    data.push(mode);
    data.extend_from_slice(&encode_varint(message.len() as u64));
    data.extend_from_slice(message);
    keccak256(&data)
}

fn schnorr_sign(h: &[u8; 32], secret: &Scalar, public: &CompressedEdwardsY) -> (Scalar, Scalar) {
    let mut nonce = Scalar::random(&mut OsRng);
    let big_r = scalar_mul_base(&nonce);

    let mut data = Vec::with_capacity(96);
    data.extend_from_slice(h);
    data.extend_from_slice(&public.0);
    data.extend_from_slice(big_r.compress().as_bytes());
    let c = keccak256_to_scalar(&data);

    let r = nonce - c * secret;
    nonce.zeroize();
    (c, r)
}

fn schnorr_check(
    h: &[u8; 32],
    public: &CompressedEdwardsY,
    c: &Scalar,
    r: &Scalar,
) -> CryptoResult<bool> {
    let key = decompress(&public.0, "signer public key")?;
    let big_r = crate::curve::vartime_double_scalar_mul_base(c, &key, r);

    let mut data = Vec::with_capacity(96);
    data.extend_from_slice(h);
    data.extend_from_slice(&public.0);
    data.extend_from_slice(big_r.compress().as_bytes());
    Ok(keccak256_to_scalar(&data) == *c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{AddressFormat, AddressNetwork};
    use crate::keys::LegacyKeys;

    fn fixture() -> (LegacyKeys, Address) {
        let keys = LegacyKeys::derive(&[21u8; 32]);
        let addr = Address::standard(
            AddressNetwork::Testnet,
            AddressFormat::Legacy,
            keys.spend_public,
            keys.view_public,
        );
        (keys, addr)
    }

    #[test]
    fn test_spend_signature_roundtrip() {
        let (keys, addr) = fixture();
        let sig = sign_message_v2(b"hello salvium", &keys.spend_secret, &addr, SignerKeyType::Spend)
            .unwrap();
        assert!(sig.starts_with("SigV2"));

        let result = verify_message(b"hello salvium", &addr, &sig).unwrap();
        assert!(result.valid);
        assert_eq!(result.version, 2);
        assert_eq!(result.key_type, Some(SignerKeyType::Spend));
    }

    #[test]
    fn test_view_signature_identified() {
        let (keys, addr) = fixture();
        let sig =
            sign_message_v2(b"view mode", &keys.view_secret, &addr, SignerKeyType::View).unwrap();
        let result = verify_message(b"view mode", &addr, &sig).unwrap();
        assert!(result.valid);
        assert_eq!(result.key_type, Some(SignerKeyType::View));
    }

    #[test]
    fn test_flipped_message_byte_fails() {
        let (keys, addr) = fixture();
        let sig = sign_message_v2(b"payload", &keys.spend_secret, &addr, SignerKeyType::Spend)
            .unwrap();
        let result = verify_message(b"paYload", &addr, &sig).unwrap();
        assert!(!result.valid);
        assert_eq!(result.key_type, None);
    }

    #[test]
    fn test_wrong_address_fails() {
        let (keys, addr) = fixture();
        let other_keys = LegacyKeys::derive(&[22u8; 32]);
        let other = Address::standard(
            AddressNetwork::Testnet,
            AddressFormat::Legacy,
            other_keys.spend_public,
            other_keys.view_public,
        );
        let sig = sign_message_v2(b"payload", &keys.spend_secret, &addr, SignerKeyType::Spend)
            .unwrap();
        assert!(!verify_message(b"payload", &other, &sig).unwrap().valid);
    }

    #[test]
    fn test_missing_header_rejected() {
        let (_, addr) = fixture();
        assert!(matches!(
            verify_message(b"m", &addr, "NotASig"),
            Err(CryptoError::SignatureInvalid(_))
        ));
    }

    #[test]
    fn test_wrong_secret_rejected_at_signing() {
        let (keys, addr) = fixture();
        assert!(sign_message_v2(b"m", &keys.view_secret, &addr, SignerKeyType::Spend).is_err());
    }
}
