//! Precomputed subaddress tables.
//!
//! The scanner's ownership oracle: a map from candidate address spend keys
//! to `(major, minor)` indices over the lookahead grid, built once per
//! wallet open for both the legacy and the carrot derivations.

use std::collections::HashMap;

use curve25519_dalek::edwards::CompressedEdwardsY;
use curve25519_dalek::Scalar;

use salvium_common::consts::{MAJOR_LOOKAHEAD, MINOR_LOOKAHEAD};
use salvium_common::WalletResult;
use salvium_crypto_core::carrot::{self, CarrotKeys};
use salvium_crypto_core::keys::legacy::{self, LegacyKeys};

/// Spend-pubkey → index tables for both address generations.
pub struct SubaddressTable {
    legacy: HashMap<[u8; 32], (u32, u32)>,
    carrot: HashMap<[u8; 32], (u32, u32)>,
    majors: u32,
    minors: u32,
}

impl SubaddressTable {
    /// Precompute the `majors x minors` grid for both key trees.
    ///
    /// Index `(0, 0)` maps the main-address spend keys.
    pub fn new(
        legacy_keys: &LegacyKeys,
        carrot_keys: &CarrotKeys,
        majors: u32,
        minors: u32,
    ) -> WalletResult<Self> {
        let mut legacy_map = HashMap::with_capacity((majors * minors) as usize);
        let mut carrot_map = HashMap::with_capacity((majors * minors) as usize);

        legacy_map.insert(legacy_keys.spend_public.0, (0, 0));
        carrot_map.insert(carrot_keys.account_spend_public.0, (0, 0));

        for major in 0..majors {
            for minor in 0..minors {
                if major == 0 && minor == 0 {
                    continue;
                }
                let m = legacy::subaddress_scalar(&legacy_keys.view_secret, major, minor);
                let legacy_spend =
                    legacy::subaddress_spend_public(&legacy_keys.spend_public, &m)?;
                legacy_map.insert(legacy_spend.0, (major, minor));

                let index_gen =
                    carrot::index_generator(&carrot_keys.generate_address, major, minor);
                let sub_scalar = carrot::subaddress_scalar(
                    &carrot_keys.account_spend_public,
                    &index_gen,
                    major,
                    minor,
                );
                let carrot_spend =
                    carrot::subaddress_spend_pubkey(&carrot_keys.account_spend_public, &sub_scalar)?;
                carrot_map.insert(carrot_spend.0, (major, minor));
            }
        }

        Ok(SubaddressTable {
            legacy: legacy_map,
            carrot: carrot_map,
            majors,
            minors,
        })
    }

    /// Default lookahead grid (50 x 200).
    pub fn with_default_lookahead(
        legacy_keys: &LegacyKeys,
        carrot_keys: &CarrotKeys,
    ) -> WalletResult<Self> {
        Self::new(legacy_keys, carrot_keys, MAJOR_LOOKAHEAD, MINOR_LOOKAHEAD)
    }

    /// Look up a candidate legacy spend key.
    pub fn lookup_legacy(&self, spend_public: &[u8; 32]) -> Option<(u32, u32)> {
        self.legacy.get(spend_public).copied()
    }

    /// Look up a candidate carrot address spend key.
    pub fn lookup_carrot(&self, spend_public: &[u8; 32]) -> Option<(u32, u32)> {
        self.carrot.get(spend_public).copied()
    }

    /// Legacy subaddress scalar for an index; `None` for the main address.
    pub fn legacy_scalar(&self, keys: &LegacyKeys, index: (u32, u32)) -> Option<Scalar> {
        if index == (0, 0) {
            None
        } else {
            Some(legacy::subaddress_scalar(&keys.view_secret, index.0, index.1))
        }
    }

    /// Carrot subaddress scalar for an index; `None` for the main address.
    pub fn carrot_scalar(&self, keys: &CarrotKeys, index: (u32, u32)) -> Option<Scalar> {
        if index == (0, 0) {
            None
        } else {
            let index_gen = carrot::index_generator(&keys.generate_address, index.0, index.1);
            Some(carrot::subaddress_scalar(
                &keys.account_spend_public,
                &index_gen,
                index.0,
                index.1,
            ))
        }
    }

    /// Carrot spend pubkey for an index (main key for `(0,0)`).
    pub fn carrot_spend_pubkey(
        &self,
        keys: &CarrotKeys,
        index: (u32, u32),
    ) -> WalletResult<CompressedEdwardsY> {
        match self.carrot_scalar(keys, index) {
            None => Ok(keys.account_spend_public),
            Some(scal) => {
                Ok(carrot::subaddress_spend_pubkey(&keys.account_spend_public, &scal)?)
            }
        }
    }

    /// Grid bounds `(majors, minors)`.
    pub fn lookahead(&self) -> (u32, u32) {
        (self.majors, self.minors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> (LegacyKeys, CarrotKeys, SubaddressTable) {
        let legacy_keys = LegacyKeys::derive(&[17u8; 32]);
        let carrot_keys = CarrotKeys::derive(&[17u8; 32]).unwrap();
        let table = SubaddressTable::new(&legacy_keys, &carrot_keys, 3, 5).unwrap();
        (legacy_keys, carrot_keys, table)
    }

    #[test]
    fn test_main_address_is_zero_zero() {
        let (legacy_keys, carrot_keys, table) = tables();
        assert_eq!(table.lookup_legacy(&legacy_keys.spend_public.0), Some((0, 0)));
        assert_eq!(
            table.lookup_carrot(&carrot_keys.account_spend_public.0),
            Some((0, 0))
        );
    }

    #[test]
    fn test_grid_coverage() {
        let (legacy_keys, _, table) = tables();
        let m = legacy::subaddress_scalar(&legacy_keys.view_secret, 2, 4);
        let spend = legacy::subaddress_spend_public(&legacy_keys.spend_public, &m).unwrap();
        assert_eq!(table.lookup_legacy(&spend.0), Some((2, 4)));

        // Outside the grid: unknown.
        let m_out = legacy::subaddress_scalar(&legacy_keys.view_secret, 3, 0);
        let spend_out = legacy::subaddress_spend_public(&legacy_keys.spend_public, &m_out).unwrap();
        assert_eq!(table.lookup_legacy(&spend_out.0), None);
    }

    #[test]
    fn test_carrot_lookup_matches_derivation() {
        let (_, carrot_keys, table) = tables();
        let spend = table.carrot_spend_pubkey(&carrot_keys, (1, 3)).unwrap();
        assert_eq!(table.lookup_carrot(&spend.0), Some((1, 3)));
    }

    #[test]
    fn test_table_size_is_bounded_by_grid() {
        let (_, _, table) = tables();
        assert_eq!(table.lookahead(), (3, 5));
    }
}
