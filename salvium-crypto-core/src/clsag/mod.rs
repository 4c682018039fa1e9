//! Ring signatures: CLSAG (hard forks 1–9) and TCLSAG (fork 10+).
//!
//! CLSAG proves, for one undisclosed ring position `l`, knowledge of the
//! one-time secret of `P_l` and of the discrete log of `C_l - pseudo_out`
//! (the commitment balance), while binding the key image `I = x * Hp(P_l)`.
//!
//! TCLSAG extends the ring with the `T` generator component of CARROT
//! one-time keys and with a third aggregated column over per-asset
//! commitments, so a single signature covers `(K_o, C - C', A - A')`.

mod constants;
mod hash;
mod sign;
mod tclsag;
mod verify;

pub use constants::{CLSAG_AGG_0, CLSAG_AGG_1, CLSAG_ROUND, TCLSAG_AGG_2, TCLSAG_ROUND};
pub use hash::{clsag_mixing_coefficients, clsag_round_hash};
pub use sign::{sign_clsag, ClsagOutput, ClsagSignature};
pub use tclsag::{
    asset_commitment_point, blinded_asset_commitment, sign_tclsag, verify_tclsag, TclsagOutput,
    TclsagSignature,
};
pub use verify::verify_clsag;

/// One ring entry: an on-chain one-time key and its amount commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingMember {
    /// One-time output public key.
    pub key: [u8; 32],
    /// Pedersen amount commitment of the output.
    pub commitment: [u8; 32],
}

/// One TCLSAG ring entry: key, amount commitment, asset commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaggedRingMember {
    /// One-time output public key.
    pub key: [u8; 32],
    /// Pedersen amount commitment of the output.
    pub commitment: [u8; 32],
    /// Asset-type commitment of the output.
    pub asset_commitment: [u8; 32],
}
