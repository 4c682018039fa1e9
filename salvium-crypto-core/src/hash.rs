//! Hash primitives: Keccak-256 and keyed variable-length Blake2b.
//!
//! Keccak-256 here is the CryptoNote variant (original Keccak padding, not
//! NIST SHA3) used for checksums, legacy derivations and signature hashing.
//!
//! Blake2b follows RFC 7693: output lengths 1..=64 and an optional key of up
//! to 64 bytes. Both are hash parameters, so a 32-byte digest is not a
//! truncation of the 64-byte one, and the keyed mode is not a plain
//! prefix-the-key construction. Every CARROT derivation runs through the
//! keyed mode with the parent secret as key.

use curve25519_dalek::Scalar;
use sha3::{Digest, Keccak256};

/// Keccak-256 of arbitrary data.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Keccak-256 reduced to a scalar mod l (CryptoNote `Hs`).
pub fn keccak256_to_scalar(data: &[u8]) -> Scalar {
    Scalar::from_bytes_mod_order(keccak256(data))
}

/// Variable-length keyed Blake2b into a caller-provided buffer.
///
/// `out.len()` must be 1..=64 and `key.len()` at most 64 bytes (both
/// enforced by the parameter block). An empty key selects the unkeyed mode.
pub fn blake2b_into(data: &[u8], key: &[u8], out: &mut [u8]) {
    let mut params = blake2b_simd::Params::new();
    params.hash_length(out.len());
    if !key.is_empty() {
        params.key(key);
    }
    out.copy_from_slice(params.hash(data).as_bytes());
}

/// Keyed Blake2b with a fixed output length.
pub fn blake2b_fixed<const N: usize>(data: &[u8], key: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    blake2b_into(data, key, &mut out);
    out
}

/// Keyed Blake2b-24 (view tags).
pub fn blake2b_3(data: &[u8], key: &[u8]) -> [u8; 3] {
    blake2b_fixed::<3>(data, key)
}

/// Keyed Blake2b-64 (amount and payment-id masks).
pub fn blake2b_8(data: &[u8], key: &[u8]) -> [u8; 8] {
    blake2b_fixed::<8>(data, key)
}

/// Keyed Blake2b-128 (Janus anchors).
pub fn blake2b_16(data: &[u8], key: &[u8]) -> [u8; 16] {
    blake2b_fixed::<16>(data, key)
}

/// Keyed Blake2b-256 (secrets and generators).
pub fn blake2b_32(data: &[u8], key: &[u8]) -> [u8; 32] {
    blake2b_fixed::<32>(data, key)
}

/// Keyed Blake2b-512 (pre-reduction scalar material).
pub fn blake2b_64(data: &[u8], key: &[u8]) -> [u8; 64] {
    blake2b_fixed::<64>(data, key)
}

/// Keyed Blake2b-512 reduced to a scalar mod l (wide reduction).
pub fn blake2b_scalar(data: &[u8], key: &[u8]) -> Scalar {
    Scalar::from_bytes_mod_order_wide(&blake2b_64(data, key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak256_empty() {
        // CryptoNote cn_fast_hash of the empty string.
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_keccak256_abc() {
        assert_eq!(
            hex::encode(keccak256(b"abc")),
            "4e03657aea45a94fc7d47ba826c8d667c0d1e6e33a64a036ec44f58fa12d6c45"
        );
    }

    #[test]
    fn test_blake2b_512_abc_rfc7693() {
        // RFC 7693 appendix A test vector.
        assert_eq!(
            hex::encode(blake2b_64(b"abc", b"")),
            "ba80a53f981c4d0d6a2797b69f12f6e94c212f14685ac4b74b12bb6fdbffa2d1\
             7d87c5392aab792dc252d5de4533cc9518d38aa8dbf1925ab92386edd4009923"
        );
    }

    #[test]
    fn test_blake2b_truncation_is_parameterized() {
        // Blake2b-256 is NOT a prefix of Blake2b-512: the output length is a
        // hash parameter.
        let h32 = blake2b_32(b"abc", b"");
        let h64 = blake2b_64(b"abc", b"");
        assert_ne!(&h32[..], &h64[..32]);
    }

    #[test]
    fn test_blake2b_keyed_differs_from_unkeyed() {
        let unkeyed = blake2b_32(b"payload", b"");
        let keyed = blake2b_32(b"payload", b"some key material");
        assert_ne!(unkeyed, keyed);
    }

    #[test]
    fn test_blake2b_keyed_is_not_key_prefixing() {
        // RFC keyed mode initializes the parameter block with the key
        // length; hashing key-then-data unkeyed gives something else.
        let keyed = blake2b_32(b"payload", b"k");
        let mut concat = Vec::new();
        concat.push(b'k');
        concat.extend_from_slice(b"payload");
        assert_ne!(keyed, blake2b_32(&concat, b""));
    }

    #[test]
    fn test_blake2b_keyed_deterministic() {
        let a = blake2b_16(b"payload", b"k");
        let b = blake2b_16(b"payload", b"k");
        assert_eq!(a, b);
    }

    #[test]
    fn test_keccak_to_scalar_reduces() {
        let s = keccak256_to_scalar(b"anything");
        // Canonical by construction.
        assert_eq!(Scalar::from_canonical_bytes(s.to_bytes()).unwrap(), s);
    }
}
