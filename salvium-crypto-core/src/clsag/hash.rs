//! Challenge and aggregation hashes for CLSAG and TCLSAG.

use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::Scalar;
use sha3::{Digest, Keccak256};

use super::constants::{
    pad_domain_separator, CLSAG_AGG_0, CLSAG_AGG_1, CLSAG_ROUND, TCLSAG_AGG_0, TCLSAG_AGG_1,
    TCLSAG_AGG_2, TCLSAG_ROUND,
};

fn finalize_scalar(hasher: Keccak256) -> Scalar {
    let digest = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&digest);
    Scalar::from_bytes_mod_order(bytes)
}

fn agg_hash(
    domain: &[u8],
    columns: &[&[EdwardsPoint]],
    tail_points: &[&EdwardsPoint],
) -> Scalar {
    let mut hasher = Keccak256::new();
    hasher.update(pad_domain_separator(domain));
    for column in columns {
        for point in *column {
            hasher.update(point.compress().as_bytes());
        }
    }
    for point in tail_points {
        hasher.update(point.compress().as_bytes());
    }
    finalize_scalar(hasher)
}

/// CLSAG mixing coefficients `(μ_P, μ_C)`.
///
/// ```text
/// μ_P = H(CLSAG_agg_0 || P[] || C[] || I || D || pseudo_out)
/// μ_C = H(CLSAG_agg_1 || P[] || C[] || I || D || pseudo_out)
/// ```
pub fn clsag_mixing_coefficients(
    ring_keys: &[EdwardsPoint],
    ring_commitments: &[EdwardsPoint],
    key_image: &EdwardsPoint,
    d_inv8: &EdwardsPoint,
    pseudo_out: &EdwardsPoint,
) -> (Scalar, Scalar) {
    let columns: [&[EdwardsPoint]; 2] = [ring_keys, ring_commitments];
    let tail = [key_image, d_inv8, pseudo_out];
    (
        agg_hash(CLSAG_AGG_0, &columns, &tail),
        agg_hash(CLSAG_AGG_1, &columns, &tail),
    )
}

/// CLSAG per-round challenge.
///
/// ```text
/// c' = H(CLSAG_round || P[] || C[] || pseudo_out || msg || I || D || L || R)
/// ```
#[allow(clippy::too_many_arguments)]
pub fn clsag_round_hash(
    ring_keys: &[EdwardsPoint],
    ring_commitments: &[EdwardsPoint],
    pseudo_out: &EdwardsPoint,
    message: &[u8; 32],
    key_image: &EdwardsPoint,
    d_inv8: &EdwardsPoint,
    l_point: &EdwardsPoint,
    r_point: &EdwardsPoint,
) -> Scalar {
    let mut hasher = Keccak256::new();
    hasher.update(pad_domain_separator(CLSAG_ROUND));
    for key in ring_keys {
        hasher.update(key.compress().as_bytes());
    }
    for commitment in ring_commitments {
        hasher.update(commitment.compress().as_bytes());
    }
    hasher.update(pseudo_out.compress().as_bytes());
    hasher.update(message);
    hasher.update(key_image.compress().as_bytes());
    hasher.update(d_inv8.compress().as_bytes());
    hasher.update(l_point.compress().as_bytes());
    hasher.update(r_point.compress().as_bytes());
    finalize_scalar(hasher)
}

/// TCLSAG mixing coefficients `(μ_P, μ_C, μ_A)` over three ring columns.
#[allow(clippy::too_many_arguments)]
pub fn tclsag_mixing_coefficients(
    ring_keys: &[EdwardsPoint],
    ring_commitments: &[EdwardsPoint],
    ring_asset_commitments: &[EdwardsPoint],
    key_image: &EdwardsPoint,
    d_inv8: &EdwardsPoint,
    e_inv8: &EdwardsPoint,
    pseudo_out: &EdwardsPoint,
    pseudo_asset_out: &EdwardsPoint,
) -> (Scalar, Scalar, Scalar) {
    let columns: [&[EdwardsPoint]; 3] = [ring_keys, ring_commitments, ring_asset_commitments];
    let tail = [key_image, d_inv8, e_inv8, pseudo_out, pseudo_asset_out];
    (
        agg_hash(TCLSAG_AGG_0, &columns, &tail),
        agg_hash(TCLSAG_AGG_1, &columns, &tail),
        agg_hash(TCLSAG_AGG_2, &columns, &tail),
    )
}

/// TCLSAG per-round challenge over three ring columns.
#[allow(clippy::too_many_arguments)]
pub fn tclsag_round_hash(
    ring_keys: &[EdwardsPoint],
    ring_commitments: &[EdwardsPoint],
    ring_asset_commitments: &[EdwardsPoint],
    pseudo_out: &EdwardsPoint,
    pseudo_asset_out: &EdwardsPoint,
    message: &[u8; 32],
    key_image: &EdwardsPoint,
    d_inv8: &EdwardsPoint,
    e_inv8: &EdwardsPoint,
    l_point: &EdwardsPoint,
    r_point: &EdwardsPoint,
) -> Scalar {
    let mut hasher = Keccak256::new();
    hasher.update(pad_domain_separator(TCLSAG_ROUND));
    for key in ring_keys {
        hasher.update(key.compress().as_bytes());
    }
    for commitment in ring_commitments {
        hasher.update(commitment.compress().as_bytes());
    }
    for asset in ring_asset_commitments {
        hasher.update(asset.compress().as_bytes());
    }
    hasher.update(pseudo_out.compress().as_bytes());
    hasher.update(pseudo_asset_out.compress().as_bytes());
    hasher.update(message);
    hasher.update(key_image.compress().as_bytes());
    hasher.update(d_inv8.compress().as_bytes());
    hasher.update(e_inv8.compress().as_bytes());
    hasher.update(l_point.compress().as_bytes());
    hasher.update(r_point.compress().as_bytes());
    finalize_scalar(hasher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use curve25519_dalek::constants::ED25519_BASEPOINT_POINT;

    #[test]
    fn test_mixing_coefficients_deterministic_and_distinct() {
        let p = ED25519_BASEPOINT_POINT;
        let ring = vec![p, p];
        let (mu_p1, mu_c1) = clsag_mixing_coefficients(&ring, &ring, &p, &p, &p);
        let (mu_p2, mu_c2) = clsag_mixing_coefficients(&ring, &ring, &p, &p, &p);
        assert_eq!(mu_p1, mu_p2);
        assert_eq!(mu_c1, mu_c2);
        assert_ne!(mu_p1, mu_c1);
    }

    #[test]
    fn test_round_hash_binds_message() {
        let p = ED25519_BASEPOINT_POINT;
        let ring = vec![p, p];
        let c1 = clsag_round_hash(&ring, &ring, &p, &[0u8; 32], &p, &p, &p, &p);
        let c2 = clsag_round_hash(&ring, &ring, &p, &[1u8; 32], &p, &p, &p, &p);
        assert_ne!(c1, c2);
    }

    #[test]
    fn test_tclsag_coefficients_all_distinct() {
        let p = ED25519_BASEPOINT_POINT;
        let ring = vec![p, p];
        let (mu_p, mu_c, mu_a) =
            tclsag_mixing_coefficients(&ring, &ring, &ring, &p, &p, &p, &p, &p);
        assert_ne!(mu_p, mu_c);
        assert_ne!(mu_c, mu_a);
        assert_ne!(mu_p, mu_a);
    }

    #[test]
    fn test_tclsag_domain_separated_from_clsag() {
        let p = ED25519_BASEPOINT_POINT;
        let ring = vec![p, p];
        let clsag = clsag_round_hash(&ring, &ring, &p, &[0u8; 32], &p, &p, &p, &p);
        let tclsag =
            tclsag_round_hash(&ring, &ring, &ring, &p, &p, &[0u8; 32], &p, &p, &p, &p, &p);
        assert_ne!(clsag, tclsag);
    }
}
