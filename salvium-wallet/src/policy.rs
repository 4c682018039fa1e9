//! Fork policy: which transaction shape is valid at which height.
//!
//! A pure decision table from `(height, network)` to hard-fork version,
//! transaction version, RCT type, signature scheme and asset tag.

use salvium_common::consts::{ASSET_SAL, ASSET_SAL1};
use salvium_common::Network;

/// RingCT envelope types by fork era.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RctType {
    /// HF1–2: Bulletproofs+ range proofs.
    BulletproofPlus = 6,
    /// HF3–5: full proofs over outputs and pseudo-inputs.
    FullProofs = 7,
    /// HF6–9: the SAL1 rebase era.
    SalviumZero = 8,
    /// HF10+: carrot outputs, TCLSAG.
    SalviumOne = 9,
}

impl RctType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Ring signature scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigType {
    Clsag,
    Tclsag,
}

/// The four transaction kinds the wallet can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxType {
    Transfer,
    Stake,
    Burn,
    Convert,
}

impl TxType {
    /// Wire discriminant used in the serialized prefix.
    pub fn as_u8(self) -> u8 {
        match self {
            TxType::Transfer => 0,
            TxType::Stake => 1,
            TxType::Burn => 2,
            TxType::Convert => 3,
        }
    }
}

/// The resolved policy for one height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForkPolicy {
    pub hf_version: u8,
    /// Transaction version for TRANSFER; see [`ForkPolicy::tx_version_for`].
    pub tx_version: u64,
    pub rct_type: RctType,
    pub sig_type: SigType,
    pub asset_type: &'static str,
    pub carrot_active: bool,
}

impl ForkPolicy {
    /// Transaction version for the given type: non-TRANSFER types stay at
    /// version 2 before HF10 and move to 4 with it.
    pub fn tx_version_for(&self, tx_type: TxType) -> u64 {
        match tx_type {
            TxType::Transfer => self.tx_version,
            _ if self.hf_version >= 10 => 4,
            _ => 2,
        }
    }
}

/// `(activation height, hf version)` ladders per network.
fn fork_heights(network: Network) -> &'static [(u64, u8)] {
    match network {
        Network::Mainnet => &[(1, 1), (89_000, 2), (96_500, 3), (160_000, 6), (250_000, 10)],
        Network::Testnet => &[(1, 1), (250, 2), (500, 3), (815, 6), (1_100, 10)],
        Network::Stagenet => &[(1, 1), (300, 2), (600, 3), (900, 6), (1_200, 10)],
    }
}

/// Resolve the fork policy for a height.
pub fn policy(height: u64, network: Network) -> ForkPolicy {
    let mut hf = 1u8;
    for &(activation, version) in fork_heights(network) {
        if height >= activation {
            hf = version;
        }
    }

    let (tx_version, rct_type, sig_type, asset_type) = match hf {
        1 => (2, RctType::BulletproofPlus, SigType::Clsag, ASSET_SAL),
        2 => (3, RctType::BulletproofPlus, SigType::Clsag, ASSET_SAL),
        3..=5 => (3, RctType::FullProofs, SigType::Clsag, ASSET_SAL),
        6..=9 => (3, RctType::SalviumZero, SigType::Clsag, ASSET_SAL1),
        _ => (4, RctType::SalviumOne, SigType::Tclsag, ASSET_SAL1),
    };

    ForkPolicy {
        hf_version: hf,
        tx_version,
        rct_type,
        sig_type,
        asset_type,
        carrot_active: hf >= 10,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_testnet_matrix() {
        let p = policy(100, Network::Testnet);
        assert_eq!(
            (p.hf_version, p.tx_version, p.rct_type.as_u8(), p.sig_type, p.asset_type),
            (1, 2, 6, SigType::Clsag, "SAL")
        );

        let p = policy(815, Network::Testnet);
        assert_eq!(
            (p.hf_version, p.tx_version, p.rct_type.as_u8(), p.sig_type, p.asset_type),
            (6, 3, 8, SigType::Clsag, "SAL1")
        );

        let p = policy(1_100, Network::Testnet);
        assert_eq!(
            (p.hf_version, p.tx_version, p.rct_type.as_u8(), p.sig_type, p.asset_type),
            (10, 4, 9, SigType::Tclsag, "SAL1")
        );
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        assert_eq!(policy(249, Network::Testnet).hf_version, 1);
        assert_eq!(policy(250, Network::Testnet).hf_version, 2);
        assert_eq!(policy(1_099, Network::Testnet).hf_version, 6);
        assert_eq!(policy(1_100, Network::Testnet).carrot_active, true);
    }

    #[test]
    fn test_non_transfer_version_rule() {
        let pre = policy(815, Network::Testnet);
        assert_eq!(pre.tx_version_for(TxType::Transfer), 3);
        assert_eq!(pre.tx_version_for(TxType::Stake), 2);
        assert_eq!(pre.tx_version_for(TxType::Burn), 2);

        let post = policy(1_100, Network::Testnet);
        assert_eq!(post.tx_version_for(TxType::Transfer), 4);
        assert_eq!(post.tx_version_for(TxType::Convert), 4);
    }

    #[test]
    fn test_mainnet_ladder_shape() {
        assert_eq!(policy(1, Network::Mainnet).hf_version, 1);
        assert!(policy(300_000, Network::Mainnet).carrot_active);
        assert_eq!(policy(100_000, Network::Mainnet).asset_type, "SAL");
    }
}
