//! CARROT subaddress derivation.
//!
//! ```text
//! s^j_gen     = H_32[s_ga](j_major, j_minor)
//! k^j_subscal = H_n[s^j_gen](K_s, j_major, j_minor)
//! K^j_s       = k^j_subscal * K_s        (j != (0,0))
//! K^j_v       = k_vi * K^j_s
//! ```
//!
//! Index `(0, 0)` is the main address: `K^0_s = K_s` with no scalar applied.

use curve25519_dalek::edwards::CompressedEdwardsY;
use curve25519_dalek::Scalar;

use crate::carrot::domains;
use crate::carrot::transcript::Transcript;
use crate::curve::decompress;
use crate::errors::CryptoResult;
use crate::hash::{blake2b_32, blake2b_scalar};

/// Per-index generator secret `s^j_gen`.
pub fn index_generator(generate_address: &[u8; 32], major: u32, minor: u32) -> [u8; 32] {
    let transcript = Transcript::new(domains::ADDRESS_INDEX_GEN)
        .push_u32(major)
        .push_u32(minor)
        .finish();
    blake2b_32(&transcript, generate_address)
}

/// Subaddress scalar `k^j_subscal`.
pub fn subaddress_scalar(
    account_spend_pubkey: &CompressedEdwardsY,
    index_gen: &[u8; 32],
    major: u32,
    minor: u32,
) -> Scalar {
    let transcript = Transcript::new(domains::SUBADDRESS_SCALAR)
        .push(&account_spend_pubkey.0)
        .push_u32(major)
        .push_u32(minor)
        .finish();
    blake2b_scalar(&transcript, index_gen)
}

/// Subaddress spend key `K^j_s = k^j_subscal * K_s`.
pub fn subaddress_spend_pubkey(
    account_spend_pubkey: &CompressedEdwardsY,
    sub_scalar: &Scalar,
) -> CryptoResult<CompressedEdwardsY> {
    let base = decompress(&account_spend_pubkey.0, "account spend key")?;
    Ok((sub_scalar * base).compress())
}

/// Subaddress view key `K^j_v = k_vi * K^j_s`.
pub fn subaddress_view_pubkey(
    view_incoming: &Scalar,
    subaddress_spend: &CompressedEdwardsY,
) -> CryptoResult<CompressedEdwardsY> {
    let spend = decompress(&subaddress_spend.0, "subaddress spend key")?;
    Ok((view_incoming * spend).compress())
}
