//! CLSAG verification.
//!
//! Replays the challenge walk from `c1`, processing ring indices
//! `1, 2, …, n-1, 0`, and accepts only if the walk closes back on `c1`.

use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::Scalar;
use monero_generators::hash_to_point;

use super::hash::{clsag_mixing_coefficients, clsag_round_hash};
use super::sign::ClsagSignature;
use super::RingMember;
use crate::curve::{decompress, scalar_mul_base};
use crate::errors::{CryptoError, CryptoResult};

/// Verify a CLSAG signature against its ring and message.
pub fn verify_clsag(
    signature: &ClsagSignature,
    key_image: &[u8; 32],
    pseudo_out: &[u8; 32],
    ring: &[RingMember],
    message: &[u8; 32],
) -> CryptoResult<()> {
    let ring_size = ring.len();
    if ring_size < 2 {
        return Err(CryptoError::RingSizeTooSmall {
            actual: ring_size,
            minimum: 2,
        });
    }
    if signature.s.len() != ring_size {
        return Err(CryptoError::SignatureInvalid(format!(
            "s count {} != ring size {ring_size}",
            signature.s.len()
        )));
    }

    let d_inv8 = decompress(&signature.d, "signature D")?;
    let key_image_point = decompress(key_image, "key image")?;
    let pseudo_out_point = decompress(pseudo_out, "pseudo out")?;

    let mut ring_keys = Vec::with_capacity(ring_size);
    let mut ring_commitments = Vec::with_capacity(ring_size);
    for (i, member) in ring.iter().enumerate() {
        ring_keys.push(decompress(&member.key, &format!("ring key {i}"))?);
        ring_commitments.push(decompress(&member.commitment, &format!("ring commitment {i}"))?);
    }

    let s_scalars: Vec<Scalar> = signature
        .s
        .iter()
        .map(|bytes| Scalar::from_bytes_mod_order(*bytes))
        .collect();

    let (mu_p, mu_c) = clsag_mixing_coefficients(
        &ring_keys,
        &ring_commitments,
        &key_image_point,
        &d_inv8,
        &pseudo_out_point,
    );

    // Undo the /8 storage encoding.
    let d_point = d_inv8 * Scalar::from(8u64);

    let hp_values: Vec<EdwardsPoint> = ring
        .iter()
        .map(|member| hash_to_point(member.key))
        .collect();

    let c1 = Scalar::from_bytes_mod_order(signature.c1);
    let mut c = c1;

    for step in 0..ring_size {
        let idx = (step + 1) % ring_size;
        let s = s_scalars[idx];
        let c_p = mu_p * c;
        let c_c = mu_c * c;

        let l_point = scalar_mul_base(&s)
            + c_p * ring_keys[idx]
            + c_c * (ring_commitments[idx] - pseudo_out_point);
        let r_point = s * hp_values[idx] + c_p * key_image_point + c_c * d_point;

        c = clsag_round_hash(
            &ring_keys,
            &ring_commitments,
            &pseudo_out_point,
            message,
            &key_image_point,
            &d_inv8,
            &l_point,
            &r_point,
        );
    }

    if c == c1 {
        Ok(())
    } else {
        Err(CryptoError::SignatureInvalid("challenge walk did not close".into()))
    }
}
