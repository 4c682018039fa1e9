//! Single-signer CLSAG signing.
//!
//! ```text
//! I = x * Hp(P_l)                       key image
//! D = z * Hp(P_l),  z = mask_l - mask'  auxiliary commitment key
//! (μ_P, μ_C) aggregation coefficients
//!
//! at the real index l:
//!   L_l = α G,  R_l = α Hp(P_l)
//! at decoy index i (random s_i):
//!   L_i = s_i G + c_i (μ_P P_i + μ_C (C_i - C'))
//!   R_i = s_i Hp(P_i) + c_i (μ_P I + μ_C D)
//! close the ring:
//!   s_l = α - c_l (μ_P x + μ_C z)
//! ```
//!
//! `D` is stored divided by 8; verification undoes the cofactor clearing.

use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::Scalar;
use monero_generators::hash_to_point;
use rand::rngs::OsRng;
use zeroize::Zeroize;

use super::hash::{clsag_mixing_coefficients, clsag_round_hash};
use super::RingMember;
use crate::curve::{commit, decompress, scalar_mul_base};
use crate::errors::{CryptoError, CryptoResult};

/// A CLSAG signature as serialized into the transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClsagSignature {
    /// Response scalars, one per ring member.
    pub s: Vec<[u8; 32]>,
    /// Challenge at ring index 1.
    pub c1: [u8; 32],
    /// Auxiliary commitment key `D / 8`, compressed.
    pub d: [u8; 32],
}

/// Result of signing one input.
#[derive(Debug, Clone)]
pub struct ClsagOutput {
    /// The signature.
    pub signature: ClsagSignature,
    /// The pseudo-output commitment this input contributes to balancing.
    pub pseudo_out: [u8; 32],
    /// The input's key image.
    pub key_image: [u8; 32],
}

/// Sign one transaction input with CLSAG.
///
/// * `message` — the transaction prefix hash
/// * `ring` — ring members sorted by global index; `real_index` locates ours
/// * `one_time_secret` — `k_o` of the spent output
/// * `real_mask` — the commitment mask of the spent output
/// * `pseudo_mask` — the mask chosen for this input's pseudo-output
/// * `amount` — the spent amount (pseudo-output commits to it)
pub fn sign_clsag(
    message: &[u8; 32],
    ring: &[RingMember],
    real_index: usize,
    one_time_secret: &Scalar,
    real_mask: &Scalar,
    pseudo_mask: &Scalar,
    amount: u64,
) -> CryptoResult<ClsagOutput> {
    let ring_size = ring.len();
    if ring_size < 2 {
        return Err(CryptoError::RingSizeTooSmall {
            actual: ring_size,
            minimum: 2,
        });
    }
    if real_index >= ring_size {
        return Err(CryptoError::RingIndexOutOfBounds {
            index: real_index,
            ring_size,
        });
    }

    let mut ring_keys = Vec::with_capacity(ring_size);
    let mut ring_commitments = Vec::with_capacity(ring_size);
    for (i, member) in ring.iter().enumerate() {
        ring_keys.push(decompress(&member.key, &format!("ring key {i}"))?);
        ring_commitments.push(decompress(&member.commitment, &format!("ring commitment {i}"))?);
    }

    // The real ring slot must actually hold our key.
    let expected_key = scalar_mul_base(one_time_secret);
    if ring_keys[real_index] != expected_key {
        return Err(CryptoError::Internal(
            "one-time secret does not open the real ring slot".into(),
        ));
    }

    let pseudo_out = commit(amount, pseudo_mask);
    let mut z = real_mask - pseudo_mask;

    let hp_real = hash_to_point(ring[real_index].key);
    let key_image = one_time_secret * hp_real;
    let d_point = z * hp_real;
    let inv_eight = Scalar::from(8u64).invert();
    let d_inv8 = d_point * inv_eight;

    let (mu_p, mu_c) = clsag_mixing_coefficients(
        &ring_keys,
        &ring_commitments,
        &key_image,
        &d_inv8,
        &pseudo_out,
    );

    let hp_values: Vec<EdwardsPoint> = ring
        .iter()
        .map(|member| hash_to_point(member.key))
        .collect();

    let mut rng = OsRng;
    let mut alpha = Scalar::random(&mut rng);
    let mut s_scalars: Vec<Scalar> = (0..ring_size).map(|_| Scalar::random(&mut rng)).collect();

    // Challenge at each index; c[(l+1) % n] seeds the walk.
    let mut challenges = vec![Scalar::ZERO; ring_size];

    let l_real = scalar_mul_base(&alpha);
    let r_real = alpha * hp_real;
    let mut next = (real_index + 1) % ring_size;
    challenges[next] = clsag_round_hash(
        &ring_keys,
        &ring_commitments,
        &pseudo_out,
        message,
        &key_image,
        &d_inv8,
        &l_real,
        &r_real,
    );

    // Walk the decoys until the challenge for the real index is produced.
    while next != real_index {
        let i = next;
        let c = challenges[i];
        let c_p = mu_p * c;
        let c_c = mu_c * c;
        let l_point =
            scalar_mul_base(&s_scalars[i]) + c_p * ring_keys[i] + c_c * (ring_commitments[i] - pseudo_out);
        let r_point = s_scalars[i] * hp_values[i] + c_p * key_image + c_c * d_point;
        next = (i + 1) % ring_size;
        challenges[next] = clsag_round_hash(
            &ring_keys,
            &ring_commitments,
            &pseudo_out,
            message,
            &key_image,
            &d_inv8,
            &l_point,
            &r_point,
        );
    }

    // Close the ring at the real index.
    let c_real = challenges[real_index];
    s_scalars[real_index] = alpha - c_real * (mu_p * one_time_secret + mu_c * z);

    alpha.zeroize();
    z.zeroize();

    let signature = ClsagSignature {
        s: s_scalars.iter().map(|s| s.to_bytes()).collect(),
        c1: challenges[1 % ring_size].to_bytes(),
        d: d_inv8.compress().to_bytes(),
    };

    Ok(ClsagOutput {
        signature,
        pseudo_out: pseudo_out.compress().to_bytes(),
        key_image: key_image.compress().to_bytes(),
    })
}
