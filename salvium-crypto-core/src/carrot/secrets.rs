//! The CARROT account secret tree.
//!
//! ```text
//! k_ps = reduce64(Blake2b_64("Carrot prove-spend key",       key = master))
//! s_vb =          Blake2b_32("Carrot view-balance secret",   key = master)
//! k_vi = reduce64(Blake2b_64("Carrot incoming view key",     key = s_vb))
//! k_gi = reduce64(Blake2b_64("Carrot generate-image key",    key = s_vb))
//! s_ga =          Blake2b_32("Carrot generate-address secret", key = s_vb)
//!
//! K_s = k_gi * G + k_ps * T
//! K_v = k_vi * K_s
//! ```
//!
//! The view-incoming key is tied to the account spend key through `K_v`, so
//! it can recognize incoming enotes but cannot be reused to derive outgoing
//! capability.

use curve25519_dalek::edwards::CompressedEdwardsY;
use curve25519_dalek::Scalar;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::carrot::domains;
use crate::carrot::transcript::Transcript;
use crate::curve::{decompress, scalar_mul_gt};
use crate::errors::CryptoResult;
use crate::hash::{blake2b_32, blake2b_scalar};

/// Full CARROT key material for one wallet.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct CarrotKeys {
    /// Prove-spend key `k_ps` (T component of the spend key).
    pub prove_spend: Scalar,
    /// View-balance secret `s_vb`.
    pub view_balance: [u8; 32],
    /// View-incoming key `k_vi`.
    pub view_incoming: Scalar,
    /// Generate-image key `k_gi` (G component of the spend key).
    pub generate_image: Scalar,
    /// Generate-address secret `s_ga`.
    pub generate_address: [u8; 32],
    /// Account spend pubkey `K_s = k_gi G + k_ps T`.
    #[zeroize(skip)]
    pub account_spend_public: CompressedEdwardsY,
    /// Main-address view pubkey `K_v = k_vi K_s`.
    #[zeroize(skip)]
    pub main_view_public: CompressedEdwardsY,
}

impl CarrotKeys {
    /// Derive the full tree from the 32-byte master secret.
    pub fn derive(master: &[u8; 32]) -> CryptoResult<Self> {
        let prove_spend =
            blake2b_scalar(&Transcript::new(domains::PROVE_SPEND_KEY).finish(), master);
        let view_balance =
            blake2b_32(&Transcript::new(domains::VIEW_BALANCE_SECRET).finish(), master);
        let view_incoming = blake2b_scalar(
            &Transcript::new(domains::INCOMING_VIEW_KEY).finish(),
            &view_balance,
        );
        let generate_image = blake2b_scalar(
            &Transcript::new(domains::GENERATE_IMAGE_KEY).finish(),
            &view_balance,
        );
        let generate_address = blake2b_32(
            &Transcript::new(domains::GENERATE_ADDRESS_SECRET).finish(),
            &view_balance,
        );

        let account_spend_public = scalar_mul_gt(&generate_image, &prove_spend).compress();
        let spend_point = decompress(&account_spend_public.0, "carrot spend key")?;
        let main_view_public = (view_incoming * spend_point).compress();

        Ok(CarrotKeys {
            prove_spend,
            view_balance,
            view_incoming,
            generate_image,
            generate_address,
            account_spend_public,
            main_view_public,
        })
    }
}
