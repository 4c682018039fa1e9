//! Legacy RingCT ECDH blobs: encrypted amounts, commitment masks, view tags.
//!
//! Everything here keys off the per-output shared-secret scalar
//! `Hs(D || varint(i))` where `D = 8 * k_v * R`.
//!
//! ```text
//! amount_enc = amount XOR Hs("amount" || shared_secret)[0..8]
//! mask       = Hs("commitment_mask" || shared_secret)
//! view_tag   = Keccak256("view_tag" || D || varint(i))[0]
//! ```

use curve25519_dalek::Scalar;

use crate::hash::{keccak256, keccak256_to_scalar};
use crate::keys::legacy::derivation_to_scalar;
use crate::varint::encode_varint;

/// Domain prefix for the amount encryption factor.
const AMOUNT_DOMAIN: &[u8] = b"amount";

/// Domain prefix for the deterministic commitment mask.
const COMMITMENT_MASK_DOMAIN: &[u8] = b"commitment_mask";

/// Domain prefix for the legacy 1-byte view tag.
const VIEW_TAG_DOMAIN: &[u8] = b"view_tag";

/// Deterministic commitment mask `Hs("commitment_mask" || shared_secret)`.
pub fn commitment_mask(shared_secret: &Scalar) -> Scalar {
    let mut data = Vec::with_capacity(COMMITMENT_MASK_DOMAIN.len() + 32);
    data.extend_from_slice(COMMITMENT_MASK_DOMAIN);
    data.extend_from_slice(shared_secret.as_bytes());
    keccak256_to_scalar(&data)
}

/// Encrypt an amount for the ecdhInfo blob.
pub fn encrypt_amount(amount: u64, shared_secret: &Scalar) -> [u8; 8] {
    let factor = amount_factor(shared_secret);
    let mut out = amount.to_le_bytes();
    for i in 0..8 {
        out[i] ^= factor[i];
    }
    out
}

/// Decrypt an 8-byte ecdhInfo amount.
pub fn decrypt_amount(encrypted: &[u8; 8], shared_secret: &Scalar) -> u64 {
    let factor = amount_factor(shared_secret);
    let mut out = [0u8; 8];
    for i in 0..8 {
        out[i] = encrypted[i] ^ factor[i];
    }
    u64::from_le_bytes(out)
}

/// Legacy 1-byte view tag for output `i` of a transaction.
pub fn legacy_view_tag(derivation: &[u8; 32], output_index: u64) -> u8 {
    let mut data = Vec::with_capacity(VIEW_TAG_DOMAIN.len() + 32 + 10);
    data.extend_from_slice(VIEW_TAG_DOMAIN);
    data.extend_from_slice(derivation);
    data.extend_from_slice(&encode_varint(output_index));
    keccak256(&data)[0]
}

/// Shared-secret scalar and mask for output `i` in one step.
pub fn output_secrets(derivation: &[u8; 32], output_index: u64) -> (Scalar, Scalar) {
    let shared = derivation_to_scalar(derivation, output_index);
    let mask = commitment_mask(&shared);
    (shared, mask)
}

/// Tail byte appended to the derivation for payment-id encryption.
const PAYMENT_ID_TAIL: u8 = 0x8d;

/// XOR mask for the 8-byte encrypted payment id in tx extra.
pub fn payment_id_mask(derivation: &[u8; 32]) -> [u8; 8] {
    let mut data = Vec::with_capacity(33);
    data.extend_from_slice(derivation);
    data.push(PAYMENT_ID_TAIL);
    let digest = keccak256(&data);
    let mut mask = [0u8; 8];
    mask.copy_from_slice(&digest[..8]);
    mask
}

fn amount_factor(shared_secret: &Scalar) -> [u8; 32] {
    let mut data = Vec::with_capacity(AMOUNT_DOMAIN.len() + 32);
    data.extend_from_slice(AMOUNT_DOMAIN);
    data.extend_from_slice(shared_secret.as_bytes());
    keccak256(&data)
}
