//! TCLSAG: the three-column ring signature for CARROT-era transactions.
//!
//! CARROT one-time keys live over two generators (`K_o = x G + y T`) and
//! fork-10 outputs carry an asset-type commitment, so the fork-10 signature
//! extends CLSAG in two ways:
//!
//! 1. Responses come in pairs `(s_i, t_i)` so the `L` equation can absorb
//!    the `T` component: `L_i = s_i G + t_i T + c_i W_i`.
//! 2. A third aggregated column covers asset commitments, with its own
//!    coefficient `μ_A` and auxiliary key `E = w * Hp(P_l)` (stored `/8`),
//!    where `w` opens `A_l - A'` over `G`.
//!
//! ```text
//! W_i = μ_P P_i + μ_C (C_i - C') + μ_A (A_i - A')
//! L_i = s_i G + t_i T + c_i W_i
//! R_i = s_i Hp(P_i) + c_i (μ_P I + μ_C D + μ_A E)
//! s_l = α  - c_l (μ_P x + μ_C z + μ_A w)
//! t_l = α_t - c_l μ_P y
//! ```
//!
//! With `y = z_asset = 0` this degenerates to CLSAG semantics, so pre-carrot
//! outputs remain spendable after the fork.

use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::Scalar;
use monero_generators::hash_to_point;
use rand::rngs::OsRng;
use zeroize::Zeroize;

use super::hash::{tclsag_mixing_coefficients, tclsag_round_hash};
use super::TaggedRingMember;
use crate::curve::{commit, decompress, key_generator_t, scalar_mul_base};
use crate::errors::{CryptoError, CryptoResult};
use crate::hash::keccak256;

/// Domain prefix for deriving an asset's base commitment point.
const ASSET_POINT_DOMAIN: &[u8] = b"asset_type_commitment";

/// The unblinded asset-type commitment `A(tag) = Hp(Keccak256(domain || tag))`.
pub fn asset_commitment_point(asset_type: &str) -> EdwardsPoint {
    let mut data = Vec::with_capacity(ASSET_POINT_DOMAIN.len() + asset_type.len());
    data.extend_from_slice(ASSET_POINT_DOMAIN);
    data.extend_from_slice(asset_type.as_bytes());
    hash_to_point(keccak256(&data))
}

/// A blinded pseudo asset commitment `A' = A(tag) + w G`.
pub fn blinded_asset_commitment(asset_type: &str, blind: &Scalar) -> EdwardsPoint {
    asset_commitment_point(asset_type) + scalar_mul_base(blind)
}

/// A TCLSAG signature as serialized into the transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TclsagSignature {
    /// G-column responses, one per ring member.
    pub s: Vec<[u8; 32]>,
    /// T-column responses, one per ring member.
    pub t: Vec<[u8; 32]>,
    /// Challenge at ring index 1.
    pub c1: [u8; 32],
    /// Auxiliary commitment key `D / 8`, compressed.
    pub d: [u8; 32],
    /// Auxiliary asset key `E / 8`, compressed.
    pub e: [u8; 32],
}

/// Result of signing one fork-10 input.
#[derive(Debug, Clone)]
pub struct TclsagOutput {
    /// The signature.
    pub signature: TclsagSignature,
    /// The pseudo-output commitment for this input.
    pub pseudo_out: [u8; 32],
    /// The blinded pseudo asset commitment for this input.
    pub pseudo_asset_out: [u8; 32],
    /// The input's key image.
    pub key_image: [u8; 32],
}

/// Sign one input with TCLSAG.
///
/// * `one_time_secret` — the G component `x` of the spent output's secret
/// * `one_time_secret_t` — the T component `y` (zero for legacy outputs)
/// * `asset_blind` — the blinding `w'` used in this input's pseudo asset
///   commitment; ring asset commitments are the unblinded `A(tag)` points
#[allow(clippy::too_many_arguments)]
pub fn sign_tclsag(
    message: &[u8; 32],
    ring: &[TaggedRingMember],
    real_index: usize,
    one_time_secret: &Scalar,
    one_time_secret_t: &Scalar,
    real_mask: &Scalar,
    pseudo_mask: &Scalar,
    amount: u64,
    asset_type: &str,
    asset_blind: &Scalar,
) -> CryptoResult<TclsagOutput> {
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
    let mut ring_assets = Vec::with_capacity(ring_size);
    for (i, member) in ring.iter().enumerate() {
        ring_keys.push(decompress(&member.key, &format!("ring key {i}"))?);
        ring_commitments.push(decompress(&member.commitment, &format!("ring commitment {i}"))?);
        ring_assets.push(decompress(
            &member.asset_commitment,
            &format!("ring asset commitment {i}"),
        )?);
    }

    let expected_key =
        scalar_mul_base(one_time_secret) + one_time_secret_t * key_generator_t();
    if ring_keys[real_index] != expected_key {
        return Err(CryptoError::Internal(
            "one-time secrets do not open the real ring slot".into(),
        ));
    }

    let pseudo_out = commit(amount, pseudo_mask);
    let pseudo_asset_out = blinded_asset_commitment(asset_type, asset_blind);
    let mut z = real_mask - pseudo_mask;
    // Ring asset commitments are unblinded, so A_l - A' opens to -w'.
    let mut w = -asset_blind;

    let hp_real = hash_to_point(ring[real_index].key);
    let key_image = one_time_secret * hp_real;
    let d_point = z * hp_real;
    let e_point = w * hp_real;
    let inv_eight = Scalar::from(8u64).invert();
    let d_inv8 = d_point * inv_eight;
    let e_inv8 = e_point * inv_eight;

    let (mu_p, mu_c, mu_a) = tclsag_mixing_coefficients(
        &ring_keys,
        &ring_commitments,
        &ring_assets,
        &key_image,
        &d_inv8,
        &e_inv8,
        &pseudo_out,
        &pseudo_asset_out,
    );

    let hp_values: Vec<EdwardsPoint> = ring
        .iter()
        .map(|member| hash_to_point(member.key))
        .collect();

    let mut rng = OsRng;
    let mut alpha = Scalar::random(&mut rng);
    let mut alpha_t = Scalar::random(&mut rng);
    let mut s_scalars: Vec<Scalar> = (0..ring_size).map(|_| Scalar::random(&mut rng)).collect();
    let mut t_scalars: Vec<Scalar> = (0..ring_size).map(|_| Scalar::random(&mut rng)).collect();

    let mut challenges = vec![Scalar::ZERO; ring_size];

    let l_real = scalar_mul_base(&alpha) + alpha_t * key_generator_t();
    let r_real = alpha * hp_real;
    let mut next = (real_index + 1) % ring_size;
    challenges[next] = tclsag_round_hash(
        &ring_keys,
        &ring_commitments,
        &ring_assets,
        &pseudo_out,
        &pseudo_asset_out,
        message,
        &key_image,
        &d_inv8,
        &e_inv8,
        &l_real,
        &r_real,
    );

    while next != real_index {
        let i = next;
        let c = challenges[i];
        let w_i = mu_p * ring_keys[i]
            + mu_c * (ring_commitments[i] - pseudo_out)
            + mu_a * (ring_assets[i] - pseudo_asset_out);
        let l_point =
            scalar_mul_base(&s_scalars[i]) + t_scalars[i] * key_generator_t() + c * w_i;
        let r_point =
            s_scalars[i] * hp_values[i] + c * (mu_p * key_image + mu_c * d_point + mu_a * e_point);
        next = (i + 1) % ring_size;
        challenges[next] = tclsag_round_hash(
            &ring_keys,
            &ring_commitments,
            &ring_assets,
            &pseudo_out,
            &pseudo_asset_out,
            message,
            &key_image,
            &d_inv8,
            &e_inv8,
            &l_point,
            &r_point,
        );
    }

    let c_real = challenges[real_index];
    s_scalars[real_index] =
        alpha - c_real * (mu_p * one_time_secret + mu_c * z + mu_a * w);
    t_scalars[real_index] = alpha_t - c_real * (mu_p * one_time_secret_t);

    alpha.zeroize();
    alpha_t.zeroize();
    z.zeroize();
    w.zeroize();

    let signature = TclsagSignature {
        s: s_scalars.iter().map(|s| s.to_bytes()).collect(),
        t: t_scalars.iter().map(|t| t.to_bytes()).collect(),
        c1: challenges[1 % ring_size].to_bytes(),
        d: d_inv8.compress().to_bytes(),
        e: e_inv8.compress().to_bytes(),
    };

    Ok(TclsagOutput {
        signature,
        pseudo_out: pseudo_out.compress().to_bytes(),
        pseudo_asset_out: pseudo_asset_out.compress().to_bytes(),
        key_image: key_image.compress().to_bytes(),
    })
}

/// Verify a TCLSAG signature against its ring and message.
#[allow(clippy::too_many_arguments)]
pub fn verify_tclsag(
    signature: &TclsagSignature,
    key_image: &[u8; 32],
    pseudo_out: &[u8; 32],
    pseudo_asset_out: &[u8; 32],
    ring: &[TaggedRingMember],
    message: &[u8; 32],
) -> CryptoResult<()> {
    let ring_size = ring.len();
    if ring_size < 2 {
        return Err(CryptoError::RingSizeTooSmall {
            actual: ring_size,
            minimum: 2,
        });
    }
    if signature.s.len() != ring_size || signature.t.len() != ring_size {
        return Err(CryptoError::SignatureInvalid(format!(
            "response counts ({}, {}) != ring size {ring_size}",
            signature.s.len(),
            signature.t.len()
        )));
    }

    let d_inv8 = decompress(&signature.d, "signature D")?;
    let e_inv8 = decompress(&signature.e, "signature E")?;
    let key_image_point = decompress(key_image, "key image")?;
    let pseudo_out_point = decompress(pseudo_out, "pseudo out")?;
    let pseudo_asset_point = decompress(pseudo_asset_out, "pseudo asset out")?;

    let mut ring_keys = Vec::with_capacity(ring_size);
    let mut ring_commitments = Vec::with_capacity(ring_size);
    let mut ring_assets = Vec::with_capacity(ring_size);
    for (i, member) in ring.iter().enumerate() {
        ring_keys.push(decompress(&member.key, &format!("ring key {i}"))?);
        ring_commitments.push(decompress(&member.commitment, &format!("ring commitment {i}"))?);
        ring_assets.push(decompress(
            &member.asset_commitment,
            &format!("ring asset commitment {i}"),
        )?);
    }

    let s_scalars: Vec<Scalar> = signature
        .s
        .iter()
        .map(|b| Scalar::from_bytes_mod_order(*b))
        .collect();
    let t_scalars: Vec<Scalar> = signature
        .t
        .iter()
        .map(|b| Scalar::from_bytes_mod_order(*b))
        .collect();

    let (mu_p, mu_c, mu_a) = tclsag_mixing_coefficients(
        &ring_keys,
        &ring_commitments,
        &ring_assets,
        &key_image_point,
        &d_inv8,
        &e_inv8,
        &pseudo_out_point,
        &pseudo_asset_point,
    );

    let d_point = d_inv8 * Scalar::from(8u64);
    let e_point = e_inv8 * Scalar::from(8u64);

    let hp_values: Vec<EdwardsPoint> = ring
        .iter()
        .map(|member| hash_to_point(member.key))
        .collect();

    let c1 = Scalar::from_bytes_mod_order(signature.c1);
    let mut c = c1;

    for step in 0..ring_size {
        let idx = (step + 1) % ring_size;
        let w_i = mu_p * ring_keys[idx]
            + mu_c * (ring_commitments[idx] - pseudo_out_point)
            + mu_a * (ring_assets[idx] - pseudo_asset_point);
        let l_point =
            scalar_mul_base(&s_scalars[idx]) + t_scalars[idx] * key_generator_t() + c * w_i;
        let r_point = s_scalars[idx] * hp_values[idx]
            + c * (mu_p * key_image_point + mu_c * d_point + mu_a * e_point);

        c = tclsag_round_hash(
            &ring_keys,
            &ring_commitments,
            &ring_assets,
            &pseudo_out_point,
            &pseudo_asset_point,
            message,
            &key_image_point,
            &d_inv8,
            &e_inv8,
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
