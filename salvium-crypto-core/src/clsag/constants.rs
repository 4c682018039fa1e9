//! Ring-signature domain separators.
//!
//! The CLSAG strings match the reference rctSigs implementation; the TCLSAG
//! strings extend the same scheme for the three-column variant.

/// CLSAG round-hash domain separator.
pub const CLSAG_ROUND: &[u8] = b"CLSAG_round";

/// CLSAG aggregation domain for the key column coefficient `μ_P`.
pub const CLSAG_AGG_0: &[u8] = b"CLSAG_agg_0";

/// CLSAG aggregation domain for the commitment column coefficient `μ_C`.
pub const CLSAG_AGG_1: &[u8] = b"CLSAG_agg_1";

/// TCLSAG round-hash domain separator.
pub const TCLSAG_ROUND: &[u8] = b"TCLSAG_round";

/// TCLSAG aggregation domain for the asset column coefficient `μ_A`.
///
/// `μ_P` and `μ_C` reuse the `agg_0`/`agg_1` strings with the TCLSAG prefix.
pub const TCLSAG_AGG_2: &[u8] = b"TCLSAG_agg_2";

/// TCLSAG aggregation domain for `μ_P`.
pub const TCLSAG_AGG_0: &[u8] = b"TCLSAG_agg_0";

/// TCLSAG aggregation domain for `μ_C`.
pub const TCLSAG_AGG_1: &[u8] = b"TCLSAG_agg_1";

/// Pad a domain separator into a 32-byte key slot.
#[inline]
#[must_use]
pub fn pad_domain_separator(domain: &[u8]) -> [u8; 32] {
    let mut padded = [0u8; 32];
    let len = domain.len().min(32);
    padded[..len].copy_from_slice(&domain[..len]);
    padded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_domain_separator() {
        let padded = pad_domain_separator(CLSAG_ROUND);
        assert_eq!(&padded[..11], CLSAG_ROUND);
        assert_eq!(&padded[11..], &[0u8; 21]);
    }

    #[test]
    fn test_domains_distinct() {
        assert_ne!(CLSAG_AGG_0, CLSAG_AGG_1);
        assert_ne!(CLSAG_ROUND, TCLSAG_ROUND);
    }
}
