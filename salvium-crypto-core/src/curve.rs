//! Curve helpers over the twisted-Edwards 25519 group.
//!
//! Thin wrappers around `curve25519-dalek` plus the Salvium generators:
//! `G` (the Ed25519 basepoint), `H` (the Pedersen amount generator,
//! `8·hash_to_point(G)`) and `T` (the CARROT second key generator). Scalar
//! and point arithmetic on secret inputs is constant-time in dalek; the
//! explicitly `vartime` helpers are for verification paths only.

use curve25519_dalek::constants::{ED25519_BASEPOINT_POINT, ED25519_BASEPOINT_TABLE};
use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};
use curve25519_dalek::traits::Identity;
use curve25519_dalek::Scalar;

use crate::errors::{CryptoError, CryptoResult};

pub use monero_generators::hash_to_point;

/// The Pedersen amount generator `H`.
pub fn amount_generator() -> EdwardsPoint {
    *monero_generators::H
}

/// The CARROT second key generator `T`.
pub fn key_generator_t() -> EdwardsPoint {
    *monero_generators::T
}

/// `s · G`.
pub fn scalar_mul_base(s: &Scalar) -> EdwardsPoint {
    ED25519_BASEPOINT_TABLE * s
}

/// Pedersen commitment `C = mask·G + amount·H`.
pub fn commit(amount: u64, mask: &Scalar) -> EdwardsPoint {
    ED25519_BASEPOINT_TABLE * mask + Scalar::from(amount) * *monero_generators::H
}

/// Coinbase commitment `C = 1·G + amount·H` (identity mask).
pub fn zero_commit(amount: u64) -> EdwardsPoint {
    ED25519_BASEPOINT_POINT + Scalar::from(amount) * *monero_generators::H
}

/// `a·G + b·T` — the CARROT two-generator key composition.
pub fn scalar_mul_gt(a: &Scalar, b: &Scalar) -> EdwardsPoint {
    ED25519_BASEPOINT_TABLE * a + b * *monero_generators::T
}

/// `a·P + b·G`, variable time. Verification paths only.
pub fn vartime_double_scalar_mul_base(a: &Scalar, P: &EdwardsPoint, b: &Scalar) -> EdwardsPoint {
    EdwardsPoint::vartime_double_scalar_mul_basepoint(a, P, b)
}

/// Decompress a 32-byte point, rejecting non-points.
pub fn decompress(bytes: &[u8; 32], context: &str) -> CryptoResult<EdwardsPoint> {
    CompressedEdwardsY(*bytes)
        .decompress()
        .ok_or_else(|| CryptoError::PointDecompressionFailed(context.into()))
}

/// Parse a canonical scalar, rejecting values >= l.
pub fn scalar_from_canonical(bytes: &[u8; 32], context: &str) -> CryptoResult<Scalar> {
    Option::<Scalar>::from(Scalar::from_canonical_bytes(*bytes))
        .ok_or_else(|| CryptoError::NonCanonicalScalar(context.into()))
}

/// Reduce 32 little-endian bytes mod l (CryptoNote `sc_reduce32`).
pub fn reduce32(bytes: &[u8; 32]) -> Scalar {
    Scalar::from_bytes_mod_order(*bytes)
}

/// Reduce 64 little-endian bytes mod l (CryptoNote `sc_reduce`).
pub fn reduce64(bytes: &[u8; 64]) -> Scalar {
    Scalar::from_bytes_mod_order_wide(bytes)
}

/// Whether the compressed encoding is a valid point in the prime-order
/// subgroup.
pub fn is_valid_torsion_free(bytes: &[u8; 32]) -> bool {
    match CompressedEdwardsY(*bytes).decompress() {
        Some(p) => p.is_torsion_free(),
        None => false,
    }
}

/// Whether the point is the group identity.
pub fn is_identity(point: &EdwardsPoint) -> bool {
    *point == EdwardsPoint::identity()
}

/// Constant-time equality of two 32-byte values.
#[inline]
#[must_use]
pub fn constant_time_eq_32(a: &[u8; 32], b: &[u8; 32]) -> bool {
    let mut diff = 0u8;
    for i in 0..32 {
        diff |= a[i] ^ b[i];
    }
    diff == 0
}
