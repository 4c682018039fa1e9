//! Input-side preparation: UTXO selection, global-index resolution,
//! one-time secret derivation and ring assembly.

use std::collections::HashMap;

use curve25519_dalek::edwards::CompressedEdwardsY;
use curve25519_dalek::Scalar;
use tracing::debug;

use salvium_common::{WalletError, WalletResult};
use salvium_crypto_core::carrot;
use salvium_crypto_core::keys::legacy;

use crate::node::NodeClient;
use crate::ring_selection::{DecoySelector, SelectedRing};
use crate::storage::{WalletOutput, WalletStorage};

use super::WalletContext;

/// One input ready for signing.
pub struct PreparedInput {
    pub source: WalletOutput,
    /// G-component one-time secret.
    pub one_time_secret: Scalar,
    /// T-component one-time secret (zero for legacy outputs).
    pub one_time_secret_t: Scalar,
    /// Commitment mask of the spent output.
    pub mask: Scalar,
    pub ring: SelectedRing,
    /// Ring member `(key, commitment)` pairs aligned with `ring.indices`.
    pub ring_keys: Vec<[u8; 32]>,
    pub ring_commitments: Vec<[u8; 32]>,
}

/// Greedy UTXO selection: best-fit single coin when one covers the target,
/// otherwise accumulate oldest-first.
///
/// `candidates` must already be filtered to spendable outputs of the right
/// asset, sorted oldest-first (storage order).
pub fn select_utxos(candidates: &[WalletOutput], target: u64) -> WalletResult<Vec<WalletOutput>> {
    let available: u64 = candidates.iter().map(|o| o.amount).sum();
    if available < target {
        return Err(WalletError::InsufficientBalance {
            available,
            required: target,
        });
    }

    // Coin of best fit: the smallest single output covering the target.
    if let Some(best) = candidates
        .iter()
        .filter(|o| o.amount >= target)
        .min_by_key(|o| o.amount)
    {
        return Ok(vec![best.clone()]);
    }

    let mut picked = Vec::new();
    let mut sum = 0u64;
    for output in candidates {
        picked.push(output.clone());
        sum += output.amount;
        if sum >= target {
            return Ok(picked);
        }
    }
    // The availability check above makes this unreachable.
    Err(WalletError::InsufficientBalance {
        available,
        required: target,
    })
}

/// Resolve missing global indices for the selected outputs, batched by
/// transaction hash.
///
/// Outputs whose index the node did not return stay unresolved and are
/// reported back so the caller can defer them.
pub async fn resolve_global_indices(
    node: &dyn NodeClient,
    storage: &mut dyn WalletStorage,
    selected: &mut [WalletOutput],
) -> WalletResult<Vec<[u8; 32]>> {
    let mut by_tx: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, output) in selected.iter().enumerate() {
        if output.global_index.is_none() {
            by_tx.entry(output.tx_hash.clone()).or_default().push(i);
        }
    }

    let mut unresolved = Vec::new();
    for (tx_hash, positions) in by_tx {
        let response = node.get_output_indexes(&tx_hash).await?;
        for pos in positions {
            let output = &mut selected[pos];
            // Carrot-era outputs index within their asset set.
            let table = if output.is_carrot {
                response
                    .asset_type_output_indices
                    .as_deref()
                    .unwrap_or(&response.indices)
            } else {
                &response.indices
            };
            match table.get(output.output_index as usize) {
                Some(&index) => {
                    output.global_index = Some(index);
                    storage.set_global_index(&output.key_image, index)?;
                }
                None => {
                    debug!(
                        tx = %tx_hash,
                        output_index = output.output_index,
                        "node returned no global index, deferring output"
                    );
                    unresolved.push(output.key_image);
                }
            }
        }
    }
    Ok(unresolved)
}

/// Derive the one-time secrets for a selected output.
///
/// Legacy: `k_o = Hs(8 k_v R || i) + k_s (+ subaddress scalar)`, T part zero.
/// Carrot: G part `k_gi + ext_g`, T part `k_ps + ext_t`, both scaled by the
/// subaddress scalar for non-main indices.
pub fn derive_input_secrets(
    ctx: &WalletContext<'_>,
    output: &WalletOutput,
) -> WalletResult<(Scalar, Scalar)> {
    if output.is_carrot {
        let shared = output.carrot_shared_secret.ok_or_else(|| {
            WalletError::PolicyViolation("carrot output without shared secret".into())
        })?;
        let commitment_bytes = output.commitment.ok_or_else(|| {
            WalletError::PolicyViolation("carrot output without commitment".into())
        })?;
        let commitment = CompressedEdwardsY(commitment_bytes);
        let ext_g = carrot::extension_g(&shared, &commitment);
        let ext_t = carrot::extension_t(&shared, &commitment);
        let (base_g, base_t) = match ctx.table.carrot_scalar(ctx.carrot, output.subaddress_index) {
            None => (ctx.carrot.generate_image, ctx.carrot.prove_spend),
            Some(sub) => (sub * ctx.carrot.generate_image, sub * ctx.carrot.prove_spend),
        };
        Ok((base_g + ext_g, base_t + ext_t))
    } else {
        let derivation = legacy::generate_key_derivation(
            &ctx.legacy.view_secret,
            &CompressedEdwardsY(output.tx_pub_key),
        )?;
        let sub_scalar = ctx.table.legacy_scalar(ctx.legacy, output.subaddress_index);
        let secret = legacy::derive_one_time_secret(
            &derivation,
            output.output_index,
            &ctx.legacy.spend_secret,
            sub_scalar,
        );
        Ok((secret, Scalar::ZERO))
    }
}

/// Assemble the ring for one input: draw decoys, fetch their keys and
/// commitments, pin our own slot.
pub async fn build_ring(
    node: &dyn NodeClient,
    selector: &DecoySelector,
    distribution: &[u64],
    output: &WalletOutput,
) -> WalletResult<(SelectedRing, Vec<[u8; 32]>, Vec<[u8; 32]>)> {
    let global_index = output.global_index.ok_or_else(|| {
        WalletError::Internal("ring assembly requires a resolved global index".into())
    })?;
    let ring = selector.select_ring(distribution, global_index)?;

    let entries = node.get_outs(&output.asset_type, &ring.indices).await?;
    if entries.len() != ring.indices.len() {
        return Err(WalletError::RpcError {
            code: -1,
            message: format!(
                "get_outs returned {} entries for {} indices",
                entries.len(),
                ring.indices.len()
            ),
        });
    }

    let mut keys = Vec::with_capacity(entries.len());
    let mut commitments = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        if i == ring.real_position {
            // Our slot carries our on-chain data; trust local state over
            // whatever the node answered.
            keys.push(output.output_public_key);
            commitments.push(output.commitment.ok_or_else(|| {
                WalletError::PolicyViolation("selected output without commitment".into())
            })?);
            continue;
        }
        keys.push(decode32(&entry.key, "ring key")?);
        commitments.push(decode32(&entry.mask, "ring commitment")?);
    }
    Ok((ring, keys, commitments))
}

fn decode32(hex_str: &str, field: &str) -> WalletResult<[u8; 32]> {
    let bytes =
        hex::decode(hex_str).map_err(|e| WalletError::ParseError(format!("{field}: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| WalletError::ParseError(format!("{field}: expected 32 bytes")))
}
