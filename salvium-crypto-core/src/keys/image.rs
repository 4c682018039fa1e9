//! Key image generation.
//!
//! Every spend publishes `I = k_o * Hp(K_o)`: unique per output, unlinkable
//! to the output without the one-time secret, and the double-spend index of
//! the whole ledger.

use curve25519_dalek::edwards::CompressedEdwardsY;
use curve25519_dalek::Scalar;
use monero_generators::hash_to_point;

/// Compute the key image `I = k_o * Hp(K_o)`.
///
/// `one_time_public` is the compressed on-chain output key; for CARROT
/// outputs `k_o` is the G-component of the one-time secret.
pub fn key_image(one_time_secret: &Scalar, one_time_public: &CompressedEdwardsY) -> CompressedEdwardsY {
    let hp = hash_to_point(one_time_public.0);
    (one_time_secret * hp).compress()
}
