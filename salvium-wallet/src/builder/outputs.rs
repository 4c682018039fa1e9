//! Output-side construction: one-time addresses, view tags, amount
//! encryption and commitments for legacy and carrot destinations.

use curve25519_dalek::edwards::CompressedEdwardsY;
use curve25519_dalek::Scalar;
use rand::rngs::OsRng;
use rand::RngCore;

use salvium_common::WalletResult;
use salvium_crypto_core::address::{Address, AddressKind};
use salvium_crypto_core::carrot::{self, EnoteType};
use salvium_crypto_core::curve::{commit, decompress, scalar_mul_base};
use salvium_crypto_core::ecdh;
use salvium_crypto_core::keys::legacy;

/// One constructed output.
pub struct PlannedOutput {
    pub amount: u64,
    pub mask: Scalar,
    pub commitment: [u8; 32],
    pub output_key: [u8; 32],
    pub view_tag_1: Option<u8>,
    pub view_tag_3: Option<[u8; 3]>,
    pub encrypted_amount: [u8; 8],
    pub encrypted_anchor: Option<[u8; 16]>,
    /// XOR mask for an 8-byte encrypted payment id carried in tx extra.
    pub pid_mask: [u8; 8],
    pub asset_type: String,
    pub is_change: bool,
}

/// All outputs of a transaction plus the pubkeys that go into extra.
pub struct PlannedOutputs {
    pub outputs: Vec<PlannedOutput>,
    /// One ephemeral pubkey per output, in output order.
    pub output_pub_keys: Vec<[u8; 32]>,
}

/// A destination with its planned amount and change flag.
pub struct OutputRequest {
    pub address: Address,
    pub amount: u64,
    pub is_change: bool,
}

fn random_scalar() -> Scalar {
    let mut wide = [0u8; 64];
    OsRng.fill_bytes(&mut wide);
    Scalar::from_bytes_mod_order_wide(&wide)
}

/// Build legacy (pre-carrot) outputs.
///
/// Every output gets its own ephemeral key `r_i`: `R_i = r_i G` for main
/// addresses, `R_i = r_i K_s` for subaddresses, with the ECDH run against
/// the destination's view key.
pub fn plan_legacy_outputs(
    requests: &[OutputRequest],
    asset_type: &str,
) -> WalletResult<PlannedOutputs> {
    let mut outputs = Vec::with_capacity(requests.len());
    let mut pub_keys = Vec::with_capacity(requests.len());

    for (index, request) in requests.iter().enumerate() {
        let r = random_scalar();
        let tx_pub = match request.address.kind {
            AddressKind::Subaddress => {
                let spend = decompress(&request.address.spend_public.0, "destination spend key")?;
                (r * spend).compress()
            }
            _ => scalar_mul_base(&r).compress(),
        };

        let derivation =
            legacy::generate_key_derivation(&r, &request.address.view_public)?;
        let output_key = legacy::derive_one_time_public(
            &derivation,
            index as u64,
            &request.address.spend_public,
        )?;
        let (shared, mask) = ecdh::output_secrets(&derivation, index as u64);
        let commitment = commit(request.amount, &mask).compress().to_bytes();
        let encrypted_amount = ecdh::encrypt_amount(request.amount, &shared);
        let view_tag = ecdh::legacy_view_tag(&derivation, index as u64);

        outputs.push(PlannedOutput {
            amount: request.amount,
            mask,
            commitment,
            output_key: output_key.to_bytes(),
            view_tag_1: Some(view_tag),
            view_tag_3: None,
            encrypted_amount,
            encrypted_anchor: None,
            pid_mask: ecdh::payment_id_mask(&derivation),
            asset_type: asset_type.to_string(),
            is_change: request.is_change,
        });
        pub_keys.push(tx_pub.to_bytes());
    }

    Ok(PlannedOutputs {
        outputs,
        output_pub_keys: pub_keys,
    })
}

/// Build carrot outputs.
///
/// `input_context` must be the final one (derived from the first input's
/// key image), so inputs are prepared before outputs.
pub fn plan_carrot_outputs(
    requests: &[OutputRequest],
    asset_type: &str,
    input_context: &[u8; carrot::INPUT_CONTEXT_BYTES],
) -> WalletResult<PlannedOutputs> {
    let mut outputs = Vec::with_capacity(requests.len());
    let mut pub_keys = Vec::with_capacity(requests.len());

    for request in requests {
        let mut anchor = [0u8; carrot::JANUS_ANCHOR_BYTES];
        OsRng.fill_bytes(&mut anchor);
        let payment_id = request.address.payment_id.unwrap_or([0u8; 8]);

        let ephemeral_secret = carrot::derive_ephemeral_secret(
            &anchor,
            input_context,
            &request.address.spend_public,
            &payment_id,
        );
        let ephemeral_pub =
            carrot::make_ephemeral_pubkey(&ephemeral_secret, &request.address.spend_public)?;
        let shared =
            carrot::ecdh_sender(&ephemeral_secret, &request.address.view_public)?;
        let sender_receiver =
            carrot::sender_receiver_secret(&shared, &ephemeral_pub, input_context);

        let enote_type = if request.is_change {
            EnoteType::Change
        } else {
            EnoteType::Payment
        };
        let mask = carrot::make_amount_blinding_factor(
            &sender_receiver,
            request.amount,
            &request.address.spend_public,
            enote_type,
        );
        let commitment = carrot::make_amount_commitment(request.amount, &mask);
        let output_key = carrot::one_time_address(
            &request.address.spend_public,
            &sender_receiver,
            &commitment,
        )?;
        let view_tag = carrot::view_tag(&shared, input_context, &output_key);
        let encrypted_amount =
            carrot::make_encrypted_amount(request.amount, &sender_receiver, &output_key);
        let encrypted_anchor = carrot::encrypt_anchor(&anchor, &sender_receiver, &output_key);

        outputs.push(PlannedOutput {
            amount: request.amount,
            mask,
            commitment: commitment.to_bytes(),
            output_key: output_key.to_bytes(),
            view_tag_1: None,
            view_tag_3: Some(view_tag),
            encrypted_amount,
            encrypted_anchor: Some(encrypted_anchor),
            pid_mask: carrot::encrypt_payment_id(&[0u8; 8], &sender_receiver, &output_key),
            asset_type: asset_type.to_string(),
            is_change: request.is_change,
        });
        pub_keys.push(ephemeral_pub.to_bytes());
    }

    Ok(PlannedOutputs {
        outputs,
        output_pub_keys: pub_keys,
    })
}

/// Choose pseudo-output masks so the transaction balances:
/// `Σ mask'_in == Σ mask_out`, making `Σ C'_in - Σ C_out = fee·H`.
pub fn balance_pseudo_masks(num_inputs: usize, output_masks: &[Scalar]) -> Vec<Scalar> {
    assert!(num_inputs > 0);
    let output_sum: Scalar = output_masks.iter().sum();
    let mut masks: Vec<Scalar> = (0..num_inputs - 1).map(|_| random_scalar()).collect();
    let partial: Scalar = masks.iter().sum();
    masks.push(output_sum - partial);
    masks
}

/// Check a constructed transaction balances over commitments.
pub fn commitments_balance(
    pseudo_outs: &[[u8; 32]],
    out_commitments: &[[u8; 32]],
    fee: u64,
) -> WalletResult<bool> {
    let mut lhs: curve25519_dalek::edwards::EdwardsPoint =
        curve25519_dalek::traits::Identity::identity();
    for pseudo in pseudo_outs {
        lhs = lhs + decompress(pseudo, "pseudo out")?;
    }
    let mut rhs: curve25519_dalek::edwards::EdwardsPoint =
        curve25519_dalek::traits::Identity::identity();
    for commitment in out_commitments {
        rhs = rhs + decompress(commitment, "out commitment")?;
    }
    rhs = rhs + Scalar::from(fee) * salvium_crypto_core::curve::amount_generator();
    Ok(lhs == rhs)
}
