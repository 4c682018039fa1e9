//! Legacy CryptoNote key tree and output-key derivations.
//!
//! The derivation chain is the classic one:
//!
//! ```text
//! k_s = reduce32(master)                 K_s = k_s * G
//! k_v = reduce32(Keccak256(k_s))         K_v = k_v * G
//! ```
//!
//! Output recognition and spending both run through the ECDH derivation
//! `D = 8 * k_v * R` (cofactor cleared) and the per-output scalar
//! `Hs(D || varint(i))`.

use curve25519_dalek::edwards::CompressedEdwardsY;
use curve25519_dalek::Scalar;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::curve::{decompress, reduce32, scalar_mul_base};
use crate::errors::CryptoResult;
use crate::hash::{keccak256, keccak256_to_scalar};
use crate::varint::encode_varint;

/// Domain prefix for legacy subaddress scalars ("SubAddr" plus a NUL).
const SUBADDRESS_PREFIX: &[u8] = b"SubAddr\0";

/// The legacy spend/view key pairs.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct LegacyKeys {
    /// Private spend key `k_s`.
    pub spend_secret: Scalar,
    /// Private view key `k_v`.
    pub view_secret: Scalar,
    /// Public spend key `K_s`.
    #[zeroize(skip)]
    pub spend_public: CompressedEdwardsY,
    /// Public view key `K_v`.
    #[zeroize(skip)]
    pub view_public: CompressedEdwardsY,
}

impl LegacyKeys {
    /// Derive the full legacy tree from the 32-byte master secret.
    pub fn derive(master: &[u8; 32]) -> Self {
        let spend_secret = reduce32(master);
        let view_secret = reduce32(&keccak256(spend_secret.as_bytes()));
        let spend_public = scalar_mul_base(&spend_secret).compress();
        let view_public = scalar_mul_base(&view_secret).compress();
        LegacyKeys {
            spend_secret,
            view_secret,
            spend_public,
            view_public,
        }
    }
}

/// ECDH key derivation `D = 8 * secret * P`, compressed.
///
/// Used both ways: receiver computes `8 * k_v * R`, sender `8 * r * K_v`.
pub fn generate_key_derivation(
    secret: &Scalar,
    point: &CompressedEdwardsY,
) -> CryptoResult<[u8; 32]> {
    let p = decompress(&point.0, "key derivation point")?;
    let shared = (secret * p).mul_by_cofactor();
    Ok(shared.compress().to_bytes())
}

/// Per-output derivation scalar `Hs(D || varint(i))`.
pub fn derivation_to_scalar(derivation: &[u8; 32], output_index: u64) -> Scalar {
    let mut data = Vec::with_capacity(32 + 10);
    data.extend_from_slice(derivation);
    data.extend_from_slice(&encode_varint(output_index));
    keccak256_to_scalar(&data)
}

/// Expected one-time public key `Hs(D||i)*G + K_spend`.
///
/// The scanner compares this against the on-chain output key; `spend_public`
/// is the main or subaddress spend key the candidate is tested against.
pub fn derive_one_time_public(
    derivation: &[u8; 32],
    output_index: u64,
    spend_public: &CompressedEdwardsY,
) -> CryptoResult<CompressedEdwardsY> {
    let h = derivation_to_scalar(derivation, output_index);
    let spend = decompress(&spend_public.0, "spend public key")?;
    Ok((scalar_mul_base(&h) + spend).compress())
}

/// One-time secret key for a recognized output.
///
/// Main address: `k_o = Hs(D||i) + k_s`. Subaddress `(major, minor)`: the
/// subaddress scalar is added on top.
pub fn derive_one_time_secret(
    derivation: &[u8; 32],
    output_index: u64,
    spend_secret: &Scalar,
    subaddress: Option<Scalar>,
) -> Scalar {
    let mut k = derivation_to_scalar(derivation, output_index) + spend_secret;
    if let Some(m) = subaddress {
        k += m;
    }
    k
}

/// Legacy subaddress scalar `Hs("SubAddr\0" || k_v || major || minor)`.
///
/// The index `(0, 0)` is the main address and has no scalar.
pub fn subaddress_scalar(view_secret: &Scalar, major: u32, minor: u32) -> Scalar {
    let mut data = Vec::with_capacity(8 + 32 + 8);
    data.extend_from_slice(SUBADDRESS_PREFIX);
    data.extend_from_slice(view_secret.as_bytes());
    data.extend_from_slice(&major.to_le_bytes());
    data.extend_from_slice(&minor.to_le_bytes());
    keccak256_to_scalar(&data)
}

/// Legacy subaddress spend key `K_s + m * G`.
pub fn subaddress_spend_public(
    spend_public: &CompressedEdwardsY,
    sub_scalar: &Scalar,
) -> CryptoResult<CompressedEdwardsY> {
    let base = decompress(&spend_public.0, "account spend key")?;
    Ok((base + scalar_mul_base(sub_scalar)).compress())
}

/// Legacy subaddress view key `k_v * K_s^(i,j)`.
pub fn subaddress_view_public(
    view_secret: &Scalar,
    subaddress_spend: &CompressedEdwardsY,
) -> CryptoResult<CompressedEdwardsY> {
    let spend = decompress(&subaddress_spend.0, "subaddress spend key")?;
    Ok((view_secret * spend).compress())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::scalar_mul_base;

    fn test_keys() -> LegacyKeys {
        LegacyKeys::derive(&[7u8; 32])
    }

    #[test]
    fn test_derive_is_deterministic() {
        let a = LegacyKeys::derive(&[1u8; 32]);
        let b = LegacyKeys::derive(&[1u8; 32]);
        assert_eq!(a.spend_public, b.spend_public);
        assert_eq!(a.view_public, b.view_public);
    }

    #[test]
    fn test_view_key_depends_on_spend_key() {
        let a = LegacyKeys::derive(&[1u8; 32]);
        let b = LegacyKeys::derive(&[2u8; 32]);
        assert_ne!(a.view_secret, b.view_secret);
        assert_ne!(a.spend_secret, b.spend_secret);
    }

    #[test]
    fn test_ecdh_agreement() {
        // Sender r / receiver k_v agree on 8*r*k_v*G.
        let keys = test_keys();
        let tx_secret = Scalar::from(12345u64);
        let tx_public = scalar_mul_base(&tx_secret).compress();

        let receiver_side = generate_key_derivation(&keys.view_secret, &tx_public).unwrap();
        let sender_side =
            generate_key_derivation(&tx_secret, &keys.view_public).unwrap();
        assert_eq!(receiver_side, sender_side);
    }

    #[test]
    fn test_one_time_key_pair_matches() {
        let keys = test_keys();
        let tx_secret = Scalar::from(999u64);
        let tx_public = scalar_mul_base(&tx_secret).compress();
        let derivation = generate_key_derivation(&keys.view_secret, &tx_public).unwrap();

        let one_time_public =
            derive_one_time_public(&derivation, 3, &keys.spend_public).unwrap();
        let one_time_secret =
            derive_one_time_secret(&derivation, 3, &keys.spend_secret, None);

        assert_eq!(
            scalar_mul_base(&one_time_secret).compress(),
            one_time_public
        );
    }

    #[test]
    fn test_subaddress_one_time_key_pair_matches() {
        let keys = test_keys();
        let m = subaddress_scalar(&keys.view_secret, 2, 17);
        let sub_spend = subaddress_spend_public(&keys.spend_public, &m).unwrap();

        let tx_secret = Scalar::from(31337u64);
        let tx_public = scalar_mul_base(&tx_secret).compress();
        let derivation = generate_key_derivation(&keys.view_secret, &tx_public).unwrap();

        let one_time_public = derive_one_time_public(&derivation, 0, &sub_spend).unwrap();
        let one_time_secret =
            derive_one_time_secret(&derivation, 0, &keys.spend_secret, Some(m));

        assert_eq!(
            scalar_mul_base(&one_time_secret).compress(),
            one_time_public
        );
    }

    #[test]
    fn test_subaddress_scalars_distinct_per_index() {
        let keys = test_keys();
        let a = subaddress_scalar(&keys.view_secret, 0, 1);
        let b = subaddress_scalar(&keys.view_secret, 1, 0);
        assert_ne!(a, b);
    }
}
